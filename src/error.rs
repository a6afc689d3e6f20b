//! Failure taxonomy for the booking client.
//!
//! Every raw failure crossing the network boundary is normalized into exactly
//! one [`ClassifiedError`] before any other component inspects it. The mapping
//! here is the sole source of truth for retry eligibility and user messaging.

use std::fmt;

/// Closed set of failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport-level failure or a 5xx from the server.
    Network,
    /// The request was malformed or failed validation (400).
    Validation,
    /// The payment was declined (402/403).
    PaymentDeclined,
    /// The requested resource no longer exists (404).
    Unavailable,
    /// The booking conflicts with existing state (409).
    Conflict,
    /// The client is being rate limited (429).
    RateLimit,
    /// Anything that fits no other kind.
    Unknown,
}

impl ErrorKind {
    /// Map an optional HTTP status to a kind.
    ///
    /// A missing status means the failure never produced a response, which is
    /// treated as a network failure.
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => ErrorKind::Network,
            Some(400) => ErrorKind::Validation,
            Some(402) | Some(403) => ErrorKind::PaymentDeclined,
            Some(404) => ErrorKind::Unavailable,
            Some(409) => ErrorKind::Conflict,
            Some(429) => ErrorKind::RateLimit,
            Some(s) if s >= 500 => ErrorKind::Network,
            Some(_) => ErrorKind::Unknown,
        }
    }

    /// Pre-defined human-readable message shown when a failure of this kind
    /// reaches the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Connection problem. Check your network and try again.",
            ErrorKind::Validation => "Some of the provided details are invalid.",
            ErrorKind::PaymentDeclined => "Your payment was declined.",
            ErrorKind::Unavailable => "This option is no longer available.",
            ErrorKind::Conflict => "The booking could not be completed. Please try again.",
            ErrorKind::RateLimit => "Too many requests. Please wait a moment.",
            ErrorKind::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::PaymentDeclined => "payment_declined",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Whether a failure with this status is worth retrying.
///
/// True when no status is present (transport-level failure), or the status is
/// 408, 429, or any 5xx. Client errors are never retried.
pub fn retryable_status(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(408) | Some(429) => true,
        Some(s) => s >= 500,
    }
}

/// A failure normalized at the network boundary.
///
/// Created once per failure and never mutated; `retryable` is derived from the
/// status at construction so downstream components never re-inspect raw
/// shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    kind: ErrorKind,
    status: Option<u16>,
    retryable: bool,
    detail: String,
}

impl ClassifiedError {
    /// Classify a failure from its optional HTTP status and a detail string.
    pub fn classify(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            status,
            retryable: retryable_status(status),
            detail: detail.into(),
        }
    }

    /// A transport-level failure with no response.
    pub fn network(detail: impl Into<String>) -> Self {
        Self::classify(None, detail)
    }

    /// Classify from an HTTP status code.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        Self::classify(Some(status), detail)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Raw detail captured at the failure site (not for end users).
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The per-kind message suitable for display.
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {}): {}", self.kind, status, self.detail),
            None => write!(f, "{}: {}", self.kind, self.detail),
        }
    }
}

impl std::error::Error for ClassifiedError {}
