//! Fallback to a secondary provider.
//!
//! The primary runs first; its failure is classified before arriving here, so
//! the predicate can route on kind or status. The fallback runs at most once,
//! and if it fails too, its error is the one the caller sees.

use std::future::Future;

use crate::error::ClassifiedError;

/// Run `primary`, falling back to `fallback` on any failure.
pub async fn with_fallback<T, PFut, FFut, P, F>(primary: P, fallback: F) -> Result<T, ClassifiedError>
where
    P: FnOnce() -> PFut,
    F: FnOnce() -> FFut,
    PFut: Future<Output = Result<T, ClassifiedError>>,
    FFut: Future<Output = Result<T, ClassifiedError>>,
{
    with_fallback_if(primary, fallback, |_| true).await
}

/// Run `primary`; on failure, consult `should_fallback` before trying the
/// secondary. A false predicate rethrows the primary error untouched.
pub async fn with_fallback_if<T, PFut, FFut, P, F, S>(
    primary: P,
    fallback: F,
    should_fallback: S,
) -> Result<T, ClassifiedError>
where
    P: FnOnce() -> PFut,
    F: FnOnce() -> FFut,
    S: FnOnce(&ClassifiedError) -> bool,
    PFut: Future<Output = Result<T, ClassifiedError>>,
    FFut: Future<Output = Result<T, ClassifiedError>>,
{
    match primary().await {
        Ok(value) => Ok(value),
        Err(error) if should_fallback(&error) => {
            tracing::warn!(error = %error, "primary provider failed, using fallback");
            fallback().await
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let fallback_clone = fallback_calls.clone();

        let result = with_fallback(
            || async { Ok::<_, ClassifiedError>("primary") },
            || {
                let calls = fallback_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fallback")
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "primary");
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_returns_fallback_result() {
        let result = with_fallback(
            || async { Err::<&str, _>(ClassifiedError::network("primary down")) },
            || async { Ok("fallback") },
        )
        .await;

        assert_eq!(result.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn failing_fallback_propagates_its_own_error() {
        let result: Result<(), _> = with_fallback(
            || async { Err(ClassifiedError::network("primary down")) },
            || async { Err(ClassifiedError::from_status(503, "fallback down too")) },
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.detail(), "fallback down too");
    }

    #[tokio::test]
    async fn false_predicate_rethrows_primary_error() {
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let fallback_clone = fallback_calls.clone();

        let result: Result<(), _> = with_fallback_if(
            || async { Err(ClassifiedError::from_status(402, "card declined")) },
            || {
                let calls = fallback_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |error| error.kind() != ErrorKind::PaymentDeclined,
        )
        .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::PaymentDeclined);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0, "fallback must not run");
    }
}
