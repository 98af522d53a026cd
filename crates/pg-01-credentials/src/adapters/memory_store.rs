//! # In-Memory Credential Store
//!
//! No durability: contents are lost on restart.

use crate::domain::errors::CredentialError;
use crate::ports::outbound::CredentialStore;
use parking_lot::RwLock;
use shared_types::{SecretHash, UserId, UserRecord};
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
struct StoreInner {
    by_identity: HashMap<String, UserRecord>,
    next_id: u64,
}

/// Credential store backed by a `HashMap` under a `RwLock`.
///
/// Lookups take the read lock; inserts take the write lock for both the
/// uniqueness check and the append.
pub struct InMemoryCredentialStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                by_identity: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_by_identity(&self, identity: &str) -> Option<UserRecord> {
        self.inner.read().by_identity.get(identity).cloned()
    }

    fn insert(
        &self,
        identity: &str,
        secret_hash: SecretHash,
        is_privileged: bool,
    ) -> Result<UserRecord, CredentialError> {
        let mut inner = self.inner.write();
        if inner.by_identity.contains_key(identity) {
            return Err(CredentialError::IdentityTaken(identity.to_string()));
        }

        let record = UserRecord {
            id: UserId(inner.next_id),
            identity: identity.to_string(),
            secret_hash,
            is_privileged,
        };
        inner.next_id += 1;
        inner
            .by_identity
            .insert(record.identity.clone(), record.clone());

        debug!(id = %record.id, identity = %record.identity, "Credential record stored");
        Ok(record)
    }

    fn len(&self) -> usize {
        self.inner.read().by_identity.len()
    }

    fn list(&self) -> Vec<UserRecord> {
        let mut records: Vec<_> = self.inner.read().by_identity.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }
}
