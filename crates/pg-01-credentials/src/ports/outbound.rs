//! # Outbound Ports (Driven Ports / SPI)
//!
//! Storage dependency of the credentials service.

use crate::domain::errors::CredentialError;
use shared_types::{SecretHash, UserRecord};

/// User record storage.
///
/// Implementations must make `insert` atomic with respect to the identity
/// uniqueness check and must be safe for concurrent readers and writers.
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive lookup by identity.
    fn find_by_identity(&self, identity: &str) -> Option<UserRecord>;

    /// Append a record, assigning the next id.
    ///
    /// # Errors
    ///
    /// `IdentityTaken` if the identity already exists. The store is unchanged.
    fn insert(
        &self,
        identity: &str,
        secret_hash: SecretHash,
        is_privileged: bool,
    ) -> Result<UserRecord, CredentialError>;

    /// Number of stored records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records ordered by id.
    fn list(&self) -> Vec<UserRecord>;
}
