#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # roamkit
//!
//! Offline-first network resilience for async Rust clients on slow, flaky,
//! or disconnected networks.
//!
//! ## Features
//!
//! - **Retry policies** with exponential backoff, additive jitter, and
//!   explicit cancellation
//! - **Provider fallback** driven by a closed error taxonomy
//! - **Prefetch cache** that de-duplicates concurrent fetches and serves
//!   recent results within a TTL
//! - **Offline caching agent** applying cache-first/network-first policy per
//!   request class over versioned cache generations
//! - **Network-aware payload optimization** and debounce/throttle rate gates
//!
//! ## Quick Start
//!
//! ```rust
//! use roamkit::{ClassifiedError, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let policy = RetryPolicy::builder().max_retries(3).build();
//!
//!     let result = policy.execute(|| async {
//!         // Your network call here, normalized to ClassifiedError.
//!         Ok::<_, ClassifiedError>(())
//!     }).await;
//!     assert!(result.is_ok());
//! }
//! ```

pub mod agent;
pub mod backoff;
pub mod clock;
pub mod error;
pub mod fallback;
pub mod http;
pub mod jitter;
pub mod optimizer;
pub mod prefetch;
pub mod prelude;
pub mod presets;
pub mod rate_gate;
pub mod retry;
pub mod sleeper;
pub mod store;
pub mod transport;

// Re-exports
pub use agent::{spawn, AgentConfig, AgentError, AgentHandle, ControlMessage, OfflineAgent};
pub use backoff::Backoff;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{ClassifiedError, ErrorKind};
pub use fallback::{with_fallback, with_fallback_if};
pub use http::{CacheKey, Method, Request, RequestClass, Response, ResponseKind};
pub use jitter::Jitter;
pub use optimizer::{ConnectionMonitor, ConnectionQuality, EffectiveType, ImageQuality, NetworkOptimizer, ReduceOptions};
pub use prefetch::PrefetchCache;
pub use rate_gate::{Debounce, Throttle};
pub use retry::{CancelToken, RetryError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use store::{CacheStore, MemoryStore, StoreError};
pub use transport::{FetchError, Transport};
