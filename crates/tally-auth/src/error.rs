//! Error types for the authority module.

use thiserror::Error;

/// Errors that can occur during authority operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The principal holds no valid grant for the requested right.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Grant not found.
    #[error("grant not found: {0}")]
    GrantNotFound(String),

    /// Invalid grant payload.
    #[error("invalid grant payload: {0}")]
    InvalidGrant(String),

    /// The grant or revocation was not signed by the expected issuer.
    #[error("untrusted issuer: {0}")]
    UntrustedIssuer(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Signature verification failure.
    #[error("signature error: {0}")]
    Signature(#[from] tally_core::CryptoError),
}

/// Result type for authority operations.
pub type Result<T> = std::result::Result<T, AuthError>;
