//! Error types for credential operations.
//!
//! Display strings double as the caller-facing `detail` text, so the HTTP
//! layer can surface them verbatim without re-mapping.

use thiserror::Error;

/// Errors produced while minting or verifying credentials.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The token's signature, structure, or claims are invalid.
    #[error("Invalid token")]
    InvalidToken,

    /// The token is well-formed but past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// The token verified but carries an empty subject claim.
    #[error("Invalid token: missing user ID")]
    MissingSubject,

    /// Signing failed inside the JWT library.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Convenience alias for credential results.
pub type Result<T> = std::result::Result<T, AuthError>;
