//! Convenient re-exports for common roamkit types.
pub use crate::{
    agent::{AgentConfig, AgentHandle, ControlMessage, OfflineAgent},
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    error::{ClassifiedError, ErrorKind},
    fallback::{with_fallback, with_fallback_if},
    http::{CacheKey, Method, Request, RequestClass, Response, ResponseKind},
    jitter::Jitter,
    optimizer::{
        compress_request_payload, reduce_response_payload, ConnectionQuality, EffectiveType,
        ImageQuality, NetworkOptimizer, ReduceOptions,
    },
    prefetch::PrefetchCache,
    rate_gate::{Debounce, Throttle},
    retry::{CancelToken, RetryError, RetryPolicy, RetryPolicyBuilder},
    store::{CacheStore, MemoryStore, StoreError},
    transport::{FetchError, Transport},
};
