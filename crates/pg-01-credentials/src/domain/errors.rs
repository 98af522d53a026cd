//! # Credential Errors
//!
//! Error types for authentication and registration.

use thiserror::Error;

/// Errors that can occur in the credentials subsystem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Identity or secret absent from the request.
    #[error("Authentication data is missing")]
    AuthenticationDataMissing,

    /// Verification failed. Never says which field was wrong.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Registration attempted with an identity already in the store.
    #[error("Identity already registered: {0}")]
    IdentityTaken(String),

    /// The hashing backend failed; no record was written.
    #[error("Secret hashing failed: {0}")]
    Hashing(String),

    /// Hashing cost parameters rejected by Argon2.
    #[error("Invalid hashing cost: {0}")]
    InvalidCost(String),
}

impl From<argon2::Error> for CredentialError {
    fn from(e: argon2::Error) -> Self {
        CredentialError::InvalidCost(e.to_string())
    }
}

impl From<argon2::password_hash::Error> for CredentialError {
    fn from(e: argon2::password_hash::Error) -> Self {
        CredentialError::Hashing(e.to_string())
    }
}
