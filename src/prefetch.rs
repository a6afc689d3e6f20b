//! Prefetch cache with in-flight de-duplication.
//!
//! Avoids duplicate network work for data the UI is likely to need soon. Each
//! key holds either a completed value stamped with its fetch time or a shared
//! in-flight future; a second requester for the same key joins the shared
//! future instead of dispatching its own call.
//!
//! The slot map is guarded by a plain mutex that is never held across an
//! await: registration of the in-flight future happens synchronously with the
//! decision to fetch, which closes the duplicate-dispatch race window.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::clock::{Clock, MonotonicClock};
use crate::error::ClassifiedError;

/// Entries fetched through the cache stay servable for this long by default.
pub const DEFAULT_PREFETCH_TTL: Duration = Duration::from_secs(5 * 60);

type FetchFuture<T> = Shared<BoxFuture<'static, Result<T, ClassifiedError>>>;

enum Slot<T> {
    /// A fetch in progress. The id distinguishes this fetch from any later
    /// one registered under the same key.
    InFlight { id: u64, future: FetchFuture<T> },
    Ready { value: T, fetched_at: u64 },
}

/// Keyed, TTL-bounded, dedup-aware cache of fetch results.
pub struct PrefetchCache<T>
where
    T: Clone + Send + 'static,
{
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
    next_fetch_id: Arc<AtomicU64>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T> Clone for PrefetchCache<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            next_fetch_id: self.next_fetch_id.clone(),
            ttl: self.ttl,
            clock: self.clock.clone(),
        }
    }
}

impl<T> Default for PrefetchCache<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PrefetchCache<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_fetch_id: Arc::new(AtomicU64::new(0)),
            ttl: DEFAULT_PREFETCH_TTL,
            clock: Arc::new(MonotonicClock::default()),
        }
    }

    /// Override the freshness window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Inject a clock (tests use [`crate::clock::ManualClock`]).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch `key`, joining an already in-flight fetch when one exists.
    ///
    /// All concurrent callers for the same key resolve to the same result
    /// from a single `fetch` invocation. On success the value is stored with
    /// the current time; on failure the slot is dropped so the next caller
    /// retries.
    pub async fn prefetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T, ClassifiedError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClassifiedError>> + Send + 'static,
    {
        let (fetch_id, shared) = {
            let mut slots = self.slots.lock().unwrap();
            match slots.get(key) {
                Some(Slot::InFlight { id, future }) => {
                    tracing::trace!(key, "joining in-flight prefetch");
                    (*id, future.clone())
                }
                _ => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let future = fetch().boxed().shared();
                    slots.insert(
                        key.to_string(),
                        Slot::InFlight { id, future: future.clone() },
                    );
                    (id, future)
                }
            }
        };

        let result = shared.await;

        let mut slots = self.slots.lock().unwrap();
        // Only the fetch we awaited may transition the slot; a newer fetch
        // registered under the same key is left alone.
        if matches!(slots.get(key), Some(Slot::InFlight { id, .. }) if *id == fetch_id) {
            match &result {
                Ok(value) => {
                    slots.insert(
                        key.to_string(),
                        Slot::Ready {
                            value: value.clone(),
                            fetched_at: self.clock.now_millis(),
                        },
                    );
                }
                Err(_) => {
                    slots.remove(key);
                }
            }
        }

        result
    }

    /// The stored value, if present and still within the TTL. Expiry is
    /// checked lazily; expired entries linger until [`Self::clear_expired`].
    pub fn get_prefetched(&self, key: &str) -> Option<T> {
        let slots = self.slots.lock().unwrap();
        match slots.get(key) {
            Some(Slot::Ready { value, fetched_at }) => {
                let age = self.clock.now_millis().saturating_sub(*fetched_at);
                if age < self.ttl.as_millis() as u64 {
                    Some(value.clone())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Drop every expired ready entry. In-flight fetches are kept.
    pub fn clear_expired(&self) {
        let now = self.clock.now_millis();
        let ttl_millis = self.ttl.as_millis() as u64;
        let mut slots = self.slots.lock().unwrap();
        slots.retain(|_, slot| match slot {
            Slot::InFlight { .. } => true,
            Slot::Ready { fetched_at, .. } => now.saturating_sub(*fetched_at) < ttl_millis,
        });
    }

    /// Drop everything, including in-flight markers.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }
}
