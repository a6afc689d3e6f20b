//! Retry policy for fallible async operations.
//!
//! Semantics:
//! - `max_retries` counts retries only; total attempts are `max_retries + 1`.
//! - Success returns immediately, no further attempts.
//! - A failure on the final attempt propagates as [`RetryError::Exhausted`]
//!   carrying the last classified error; no sleep happens first.
//! - A failure the `should_retry` predicate declines propagates as
//!   [`RetryError::Rejected`], also without sleeping.
//! - Otherwise the policy computes `jitter(backoff.delay(attempt + 1))`,
//!   notifies the `on_retry` observer with `(error, attempt + 1, delay)`,
//!   sleeps, and re-attempts.
//! - Jitter is additive, so the minimum wait per attempt equals the capped
//!   backoff delay.
//! - A [`CancelToken`] aborts an in-progress backoff wait; the policy checks
//!   it before every attempt as well.
//!
//! The error type is always [`ClassifiedError`]: raw failures are normalized
//! once at the network boundary, so the predicate and observer never see
//! ad-hoc error shapes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::ClassifiedError;
use crate::{Backoff, Jitter, Sleeper, TokioSleeper};

/// Cancellation handle threaded through [`RetryPolicy::execute_until`].
///
/// Cheap to clone; cancelling any clone cancels them all. Cancellation is
/// one-way and permanent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender: Arc::new(sender), receiver }
    }

    /// Cancel every clone of this token.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // Err means the sender dropped, which cannot happen while self holds
        // an Arc to it.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of a whole retry sequence.
#[derive(Debug, Clone)]
pub enum RetryError {
    /// Every attempt failed; carries the last classified error.
    Exhausted { attempts: usize, last: ClassifiedError },
    /// The first non-retryable failure, propagated without further attempts.
    Rejected(ClassifiedError),
    /// The cancel token fired before the sequence finished.
    Cancelled,
}

impl RetryError {
    /// The classified error behind this failure, if one exists.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Rejected(err) => Some(err),
            RetryError::Cancelled => None,
        }
    }

    /// Consume, returning the classified error if one exists.
    pub fn into_classified(self) -> Option<ClassifiedError> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Rejected(err) => Some(err),
            RetryError::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "retry exhausted after {} attempts; last error: {}", attempts, last)
            }
            RetryError::Rejected(err) => write!(f, "{}", err),
            RetryError::Cancelled => write!(f, "retry cancelled while waiting to re-attempt"),
        }
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.classified().map(|e| e as &dyn std::error::Error)
    }
}

type RetryPredicate = Arc<dyn Fn(&ClassifiedError, usize) -> bool + Send + Sync>;
type RetryObserver = Arc<dyn Fn(&ClassifiedError, usize, Duration) + Send + Sync>;

/// Retry policy combining backoff, jitter, predicate, observer, and sleeper.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: RetryPredicate,
    on_retry: Option<RetryObserver>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("should_retry", &"<predicate>")
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

impl RetryPolicy {
    /// Builder seeded with the default profile: 3 retries, exponential
    /// backoff from 1s capped at 10s, 10% additive jitter, retry on
    /// retryable errors.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Execute with no external cancellation.
    pub async fn execute<T, Fut, Op>(&self, operation: Op) -> Result<T, RetryError>
    where
        T: Send,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        self.execute_until(operation, &CancelToken::new()).await
    }

    /// Execute, aborting any in-progress backoff wait when `token` fires.
    pub async fn execute_until<T, Fut, Op>(
        &self,
        mut operation: Op,
        token: &CancelToken,
    ) -> Result<T, RetryError>
    where
        T: Send,
        Fut: Future<Output = Result<T, ClassifiedError>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        for attempt in 0..=self.max_retries {
            if token.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt == self.max_retries {
                return Err(RetryError::Exhausted { attempts: attempt + 1, last: error });
            }
            if !(self.should_retry)(&error, attempt) {
                return Err(RetryError::Rejected(error));
            }

            let delay = self.jitter.apply(self.backoff.delay(attempt + 1));
            if let Some(observer) = &self.on_retry {
                observer(&error, attempt + 1, delay);
            }
            tracing::debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after backoff"
            );

            tokio::select! {
                _ = self.sleeper.sleep(delay) => {}
                _ = token.cancelled() => return Err(RetryError::Cancelled),
            }
        }

        // The final loop iteration always returns Exhausted for a failure and
        // Ok for a success.
        unreachable!("retry loop must return within max_retries + 1 attempts")
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::new().build()
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder {
    max_retries: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: RetryPredicate,
    on_retry: Option<RetryObserver>,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicyBuilder {
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::exponential(Duration::from_secs(1))
                .with_max(Duration::from_secs(10))
                .expect("default cap exceeds default initial delay"),
            jitter: Jitter::Proportional(0.1),
            should_retry: Arc::new(|error, _attempt| error.is_retryable()),
            on_retry: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Number of retries after the initial attempt. Zero disables retrying.
    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Predicate deciding whether a failure at a given 0-based attempt is
    /// worth retrying.
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ClassifiedError, usize) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Observer invoked before each backoff sleep with
    /// `(error, next_attempt, delay)`.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ClassifiedError, usize, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: self.backoff,
            jitter: self.jitter,
            should_retry: self.should_retry,
            on_retry: self.on_retry,
            sleeper: self.sleeper,
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
