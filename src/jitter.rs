//! Additive jitter for retry delays.
//!
//! Jitter exists to desynchronize retry storms across clients. The
//! proportional strategy is strictly additive: a delay `d` becomes
//! `d * (1 + fraction * r)` with `r` uniform in `[0, 1)`, so the jittered
//! wait never drops below the scheduled backoff delay.
//!
//! RNG: `rand`'s thread-local generator by default; tests inject a seeded RNG
//! via [`Jitter::apply_with_rng`].

use rand::{rng, Rng};
use std::time::Duration;

use crate::backoff::MAX_BACKOFF;

/// Jitter strategy applied to each computed backoff delay.
#[derive(Debug, Clone, PartialEq)]
pub enum Jitter {
    /// Use the exact backoff delay. For tests and controlled workflows.
    None,
    /// Add up to `fraction * delay` of extra wait on top of the delay.
    Proportional(f64),
}

impl Jitter {
    /// Additive jitter bounded by `fraction` of the delay.
    ///
    /// Rejects negative or non-finite fractions. A fraction of `0.1` spreads
    /// retries across an extra 10% window.
    pub fn proportional(fraction: f64) -> Result<Self, JitterError> {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(JitterError::InvalidFraction(fraction));
        }
        Ok(Jitter::Proportional(fraction))
    }

    /// Apply jitter to a delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_with_rng(delay, &mut rng)
    }

    /// Apply jitter with a caller-supplied RNG (deterministic in tests).
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Proportional(fraction) => {
                if delay.is_zero() || *fraction == 0.0 {
                    return delay;
                }
                let extra = delay.as_nanos() as f64 * fraction * rng.random::<f64>();
                let extra = if extra.is_finite() && extra < MAX_BACKOFF.as_nanos() as f64 {
                    Duration::from_nanos(extra as u64)
                } else {
                    MAX_BACKOFF
                };
                delay.saturating_add(extra).min(MAX_BACKOFF)
            }
        }
    }
}

/// Errors returned by jitter configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum JitterError {
    /// The fraction must be finite and non-negative.
    InvalidFraction(f64),
}

impl std::fmt::Display for JitterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JitterError::InvalidFraction(v) => {
                write!(f, "jitter fraction must be finite and >= 0 (got {})", v)
            }
        }
    }
}

impl std::error::Error for JitterError {}
