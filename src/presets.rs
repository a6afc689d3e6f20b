//! Pre-configured policies for the booking domain.
//!
//! These encode the profiles the app actually ships with, so call sites do
//! not hand-assemble backoff/jitter combinations.
//!
//! - [`api_retry`]: idempotent API reads (search, availability, details).
//! - [`search_retry`]: interactive search-as-you-type; gives up quickly.
//! - [`booking_submit_retry`]: booking submission is NOT retried — it is
//!   non-idempotent, and a duplicate submit is worse than a failed one.
//!   Callers pair it with [`crate::fallback::with_fallback_if`] instead.
//! - [`mobile_reduce_options`]: the payload reduction profile applied on
//!   slow connections.

use std::time::Duration;

use crate::optimizer::ReduceOptions;
use crate::retry::RetryPolicy;
use crate::{Backoff, Jitter};

const API_RETRIES: usize = 3;
const API_INITIAL_DELAY: Duration = Duration::from_secs(1);
const API_MAX_DELAY: Duration = Duration::from_secs(10);
const API_JITTER_FRACTION: f64 = 0.1;

const SEARCH_RETRIES: usize = 2;
const SEARCH_INITIAL_DELAY: Duration = Duration::from_millis(300);
const SEARCH_MAX_DELAY: Duration = Duration::from_secs(2);

const MOBILE_ARRAY_LIMIT: usize = 10;

/// Default retry profile for idempotent API reads: 3 retries, exponential
/// backoff 1s→10s, 10% additive jitter, retry on retryable kinds only.
pub fn api_retry() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(API_RETRIES)
        .backoff(
            Backoff::exponential(API_INITIAL_DELAY)
                .with_max(API_MAX_DELAY)
                .expect("max exceeds initial delay"),
        )
        .jitter(Jitter::proportional(API_JITTER_FRACTION).expect("valid fraction"))
        .build()
}

/// Tight profile for interactive search: fail fast so the UI can fall back
/// to cached results.
pub fn search_retry() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(SEARCH_RETRIES)
        .backoff(
            Backoff::exponential(SEARCH_INITIAL_DELAY)
                .with_max(SEARCH_MAX_DELAY)
                .expect("max exceeds initial delay"),
        )
        .jitter(Jitter::proportional(API_JITTER_FRACTION).expect("valid fraction"))
        .build()
}

/// Booking submission: a single attempt, no retries.
pub fn booking_submit_retry() -> RetryPolicy {
    RetryPolicy::builder().max_retries(0).build()
}

/// Reduction profile for slow connections: no hero images, no long
/// descriptions, arrays trimmed.
pub fn mobile_reduce_options() -> ReduceOptions {
    ReduceOptions {
        remove_images: true,
        remove_descriptions: true,
        limit_arrays: Some(MOBILE_ARRAY_LIMIT),
    }
}
