//! # Storefront Error Types
//!
//! Typed error handling for the checkout pipeline.
//! All fallible operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for checkout, secrets, and webhook operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing env vars, bad catalog file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Secret store refresh failed and no cached value exists
    #[error("Secret store unavailable: {0}")]
    SecretUnavailable(String),

    /// Secret name absent after a successful refresh
    #[error("Secret not found: {name}")]
    SecretNotFound { name: String },

    /// Price id is not on the configured allow-list
    #[error("Invalid price id: {price_id}")]
    InvalidPriceId { price_id: String },

    /// Token failed to decode (base64/JSON/shape)
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Signature mismatch on a token or webhook.
    /// Carries no detail: callers must not learn which byte differed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token is past its expiry timestamp
    #[error("Token has expired")]
    TokenExpired,

    /// Webhook body did not parse even though the signature was valid
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Network/HTTP error communicating with a provider
    #[error("Network error: {0}")]
    Network(String),

    /// Payment/secret/email provider returned an API error
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Fulfillment email could not be delivered
    #[error("Email delivery failed: {0}")]
    Email(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if this error is retryable by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_)
                | StoreError::Provider { .. }
                | StoreError::SecretUnavailable(_)
                | StoreError::Email(_)
        )
    }

    /// Returns true for client/input-class errors that must never be
    /// translated into a generic internal error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidPriceId { .. }
                | StoreError::MalformedToken(_)
                | StoreError::InvalidSignature
                | StoreError::TokenExpired
                | StoreError::MalformedPayload(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Configuration(_) => 500,
            StoreError::SecretUnavailable(_) => 503,
            StoreError::SecretNotFound { .. } => 500,
            StoreError::InvalidPriceId { .. } => 400,
            StoreError::MalformedToken(_) => 400,
            StoreError::InvalidSignature => 401,
            StoreError::TokenExpired => 401,
            StoreError::MalformedPayload(_) => 400,
            StoreError::Network(_) => 503,
            StoreError::Provider { .. } => 502,
            StoreError::Email(_) => 502,
            StoreError::Internal(_) => 500,
            StoreError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for storefront operations
pub type StoreResult<T> = Result<T, StoreError>;
