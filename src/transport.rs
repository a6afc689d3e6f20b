//! The underlying network transport, treated as an opaque fetch primitive.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ClassifiedError;
use crate::http::{Request, Response};

/// Transport-level failure: the request never produced a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<FetchError> for ClassifiedError {
    fn from(error: FetchError) -> Self {
        // No status: transport failures classify as network errors.
        ClassifiedError::network(error.to_string())
    }
}

/// Downstream collaborator performing the actual network call.
///
/// Timeout behavior lives here (or below), never in the retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn fetch_errors_normalize_to_network_kind() {
        let classified: ClassifiedError =
            FetchError::Connection("reset by peer".to_string()).into();
        assert_eq!(classified.kind(), ErrorKind::Network);
        assert!(classified.is_retryable());
        assert!(classified.detail().contains("reset by peer"));
    }
}
