//! # Error Types
//!
//! Typed error handling for the checkout server.
//!
//! Webhook failures come in two families that the HTTP layer maps differently:
//! `VerificationError` means the request itself is untrusted (reject with 4xx),
//! `HandlerError` means a verified event could not be processed.

use thiserror::Error;

/// Webhook verification failures. All are terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Signature header does not parse into a timestamp and v1 MACs
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No provided v1 MAC matches the computed one
    #[error("No signature matches the expected signature for the payload")]
    SignatureMismatch,

    /// Timestamp is outside the tolerance window
    #[error("Timestamp {timestamp} is outside the tolerance window of {tolerance_secs}s")]
    StaleTimestamp { timestamp: i64, tolerance_secs: u64 },

    /// Body is not a JSON object with a `type` member
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl VerificationError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// Failures raised by an event handler after successful verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Payload lacks a field the handler needs
    #[error("Missing field in event payload: {0}")]
    MissingField(String),

    /// Payload object has an unexpected shape
    #[error("Invalid event object: {0}")]
    InvalidObject(String),

    /// Business logic failed
    #[error("Handler failed: {0}")]
    Failed(String),
}

/// Core error type for server operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Webhook could not be verified
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Verified webhook could not be handled
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl CheckoutError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Network(_) | CheckoutError::Provider { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CheckoutError::Configuration(_) => 500,
            CheckoutError::InvalidRequest(_) => 400,
            CheckoutError::Provider { .. } => 502,
            CheckoutError::Network(_) => 503,
            CheckoutError::Serialization(_) => 500,
            CheckoutError::Verification(e) => e.status_code(),
            CheckoutError::Handler(_) => 500,
        }
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
