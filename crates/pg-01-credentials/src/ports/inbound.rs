//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of this subsystem.

use crate::domain::entities::Credentials;
use crate::domain::errors::CredentialError;
use async_trait::async_trait;
use shared_types::UserRecord;

/// Credential verification.
///
/// Implementations must be thread-safe (`Send + Sync`) and must not mutate
/// the credential store.
#[async_trait]
pub trait AuthenticatorApi: Send + Sync {
    /// Check an identity/secret pair against the store.
    ///
    /// Returns `false` both for an unknown identity and for a wrong secret.
    async fn verify(&self, credentials: &Credentials) -> bool;

    /// Verify and return the matching record.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when `verify` would return `false`.
    async fn login(&self, credentials: &Credentials) -> Result<UserRecord, CredentialError>;
}

/// User registration.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Hash the secret, store a new record and publish exactly one
    /// "new-user" event.
    ///
    /// # Errors
    ///
    /// - `IdentityTaken` if the identity is already in the store
    /// - `Hashing` if the secret could not be hashed; nothing is stored
    async fn register(&self, credentials: &Credentials) -> Result<UserRecord, CredentialError>;

    /// Number of records currently stored.
    fn user_count(&self) -> usize;
}
