//! Backoff schedules for retry policies.
//!
//! Attempt semantics: attempt index `0` is the initial call and carries no
//! delay; retries start at `attempt = 1`, where the exponential schedule
//! yields `initial * multiplier^(attempt - 1)`. Delays saturate at
//! [`MAX_BACKOFF`] so arithmetic never overflows.

use std::fmt;
use std::time::Duration;

/// Ceiling applied when a computed delay would overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffError {
    /// Caps and multipliers are only meaningful for the exponential
    /// schedule.
    ConstantDoesNotSupportMax,
    /// The cap must be non-zero.
    MaxMustBePositive,
    /// The cap must be at least the initial delay.
    MaxLessThanInitial { initial: Duration, max: Duration },
    /// Growth below 1.0 would shrink delays between attempts.
    MultiplierBelowOne(f64),
}

impl fmt::Display for BackoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffError::ConstantDoesNotSupportMax => {
                write!(f, "constant backoff supports neither a cap nor a multiplier")
            }
            BackoffError::MaxMustBePositive => write!(f, "max must be greater than zero"),
            BackoffError::MaxLessThanInitial { initial, max } => {
                write!(f, "max ({:?}) must be >= initial delay ({:?})", max, initial)
            }
            BackoffError::MultiplierBelowOne(m) => {
                write!(f, "multiplier must be >= 1.0 (got {})", m)
            }
        }
    }
}

impl std::error::Error for BackoffError {}

#[derive(Debug, Clone, PartialEq)]
enum Schedule {
    Constant { delay: Duration },
    Exponential { initial: Duration, multiplier: f64, max: Option<Duration> },
}

/// Delay schedule used between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    schedule: Schedule,
}

impl Backoff {
    /// Same delay before every retry. Mostly useful in tests.
    pub fn constant(delay: Duration) -> Self {
        Self { schedule: Schedule::Constant { delay } }
    }

    /// Exponential growth from `initial`, doubling by default.
    pub fn exponential(initial: Duration) -> Self {
        Self { schedule: Schedule::Exponential { initial, multiplier: 2.0, max: None } }
    }

    /// Override the growth factor. Must be >= 1.0.
    pub fn with_multiplier(mut self, multiplier: f64) -> Result<Self, BackoffError> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(BackoffError::MultiplierBelowOne(multiplier));
        }
        match &mut self.schedule {
            Schedule::Exponential { multiplier: m, .. } => {
                *m = multiplier;
                Ok(self)
            }
            Schedule::Constant { .. } => Err(BackoffError::ConstantDoesNotSupportMax),
        }
    }

    /// Cap the exponential schedule. Returns an error on the constant
    /// schedule, a zero cap, or a cap below the initial delay.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        match &mut self.schedule {
            Schedule::Exponential { initial, max: existing, .. } => {
                if max < *initial {
                    return Err(BackoffError::MaxLessThanInitial { initial: *initial, max });
                }
                *existing = Some(max);
                Ok(self)
            }
            Schedule::Constant { .. } => Err(BackoffError::ConstantDoesNotSupportMax),
        }
    }

    /// Delay for a 0-based attempt number; `0` is the initial call.
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match &self.schedule {
            Schedule::Constant { delay } => *delay,
            Schedule::Exponential { initial, multiplier, max } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
                let nanos = initial.as_nanos() as f64 * multiplier.powi(exponent);
                let raw = if nanos.is_finite() && nanos < MAX_BACKOFF.as_nanos() as f64 {
                    Duration::from_nanos(nanos as u64)
                } else {
                    MAX_BACKOFF
                };
                let capped = max.map(|m| raw.min(m)).unwrap_or(raw);
                capped.min(MAX_BACKOFF)
            }
        }
    }
}
