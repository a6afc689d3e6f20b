//! Call-frequency gates for UI-adjacent callers.
//!
//! [`Debounce`] coalesces a burst of calls into one trailing invocation;
//! [`Throttle`] lets the first call in a window through and drops the rest.
//! Both must be used from within a tokio runtime; timing goes through
//! `tokio::time` so paused-clock tests are deterministic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Trailing-edge debouncer: the callback runs once, `wait` after the last
/// call in a burst, with that call's argument.
pub struct Debounce<T>
where
    T: Send + 'static,
{
    wait: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debounce<T>
where
    T: Send + 'static,
{
    pub fn new<F>(wait: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self { wait, callback: Arc::new(callback), pending: Mutex::new(None) }
    }

    /// Arm (or re-arm) the timer with this call's argument. Any previously
    /// pending invocation is discarded.
    pub fn call(&self, arg: T) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let callback = self.callback.clone();
        let wait = self.wait;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            callback(arg);
        }));
    }

    /// Discard the pending invocation, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debounce<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Leading-edge throttle: the first call in a window runs immediately; calls
/// within `wait` of the last executed call are dropped.
pub struct Throttle<T> {
    wait: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    last_fired: Mutex<Option<Instant>>,
}

impl<T> Throttle<T> {
    pub fn new<F>(wait: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self { wait, callback: Arc::new(callback), last_fired: Mutex::new(None) }
    }

    /// Run the callback now, or drop the call if the window is still open.
    pub fn call(&self, arg: T) {
        let now = Instant::now();
        {
            let mut last_fired = self.last_fired.lock().unwrap();
            match *last_fired {
                Some(fired_at) if now.duration_since(fired_at) < self.wait => {
                    tracing::trace!("throttled call dropped");
                    return;
                }
                _ => *last_fired = Some(now),
            }
        }
        (self.callback)(arg);
    }
}
