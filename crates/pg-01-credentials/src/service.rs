//! # Credentials Service
//!
//! Application service layer that implements `AuthenticatorApi` and
//! `RegistrationApi`.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound ports
//! - Uses the outbound port (`CredentialStore`) for records
//! - Publishes `NewUser` / `LoginSucceeded` through the shared bus only
//! - Runs every hash computation on the blocking pool

use crate::domain::entities::{Credentials, SeedUser};
use crate::domain::errors::CredentialError;
use crate::domain::hashing::SecretHasher;
use crate::ports::inbound::{AuthenticatorApi, RegistrationApi};
use crate::ports::outbound::CredentialStore;
use async_trait::async_trait;
use shared_bus::{EventPublisher, GatewayEvent};
use shared_types::{LoginSucceeded, SecretHash, UserRecord};
use std::sync::Arc;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

/// Credentials Service.
///
/// Cloning is cheap; all clones share the same store, hasher and bus.
pub struct CredentialService<S: CredentialStore> {
    store: Arc<S>,
    hasher: Arc<SecretHasher>,
    publisher: Arc<dyn EventPublisher>,
}

impl<S: CredentialStore> Clone for CredentialService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hasher: Arc::clone(&self.hasher),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<S: CredentialStore + 'static> CredentialService<S> {
    /// Create a new credentials service.
    ///
    /// # Arguments
    /// * `store` - Where user records live
    /// * `hasher` - Secret hasher with the configured cost
    /// * `publisher` - Event bus for registration and login events
    pub fn new(store: Arc<S>, hasher: SecretHasher, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            publisher,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Insert seed users at process start.
    ///
    /// Seeds are hashed like registrations but publish no event.
    pub async fn seed(&self, seeds: &[SeedUser]) -> Result<Vec<UserRecord>, CredentialError> {
        let mut created = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let credentials = seed.credentials()?;
            let hash = self.hash_off_thread(&credentials).await?;
            let record = self
                .store
                .insert(credentials.identity(), hash, seed.admin)?;
            info!(id = %record.id, identity = %record.identity, admin = record.is_privileged, "Seed user created");
            created.push(record);
        }
        Ok(created)
    }

    async fn hash_off_thread(&self, credentials: &Credentials) -> Result<SecretHash, CredentialError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(credentials.secret().to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
    }

    /// Resolve credentials to a record, or `None` on any mismatch.
    async fn check(&self, credentials: &Credentials) -> Option<UserRecord> {
        let record = self.store.find_by_identity(credentials.identity());
        let stored = record.as_ref().map(|r| r.secret_hash.clone());

        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(credentials.secret().to_string());
        let verified = tokio::task::spawn_blocking(move || match stored {
            Some(hash) => hasher.verify(&secret, &hash),
            None => hasher.verify_unknown(&secret),
        })
        .await;

        match verified {
            Ok(true) => record,
            Ok(false) => None,
            Err(e) => {
                error!(error = %e, "Secret verification task failed");
                None
            }
        }
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> AuthenticatorApi for CredentialService<S> {
    async fn verify(&self, credentials: &Credentials) -> bool {
        self.check(credentials).await.is_some()
    }

    async fn login(&self, credentials: &Credentials) -> Result<UserRecord, CredentialError> {
        let Some(record) = self.check(credentials).await else {
            debug!(identity = %credentials.identity(), "Login rejected");
            return Err(CredentialError::AuthenticationFailed);
        };

        info!(id = %record.id, identity = %record.identity, "Login succeeded");
        self.publisher
            .publish(GatewayEvent::LoginSucceeded(LoginSucceeded::from(&record)))
            .await;
        Ok(record)
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> RegistrationApi for CredentialService<S> {
    async fn register(&self, credentials: &Credentials) -> Result<UserRecord, CredentialError> {
        // Cheap early reject; `insert` re-checks under the write lock.
        if self.store.find_by_identity(credentials.identity()).is_some() {
            return Err(CredentialError::IdentityTaken(
                credentials.identity().to_string(),
            ));
        }

        let hash = self.hash_off_thread(credentials).await?;
        let record = self.store.insert(credentials.identity(), hash, false)?;

        info!(id = %record.id, identity = %record.identity, "User registered");

        let receivers = self
            .publisher
            .publish(GatewayEvent::NewUser(record.clone()))
            .await;
        debug!(receivers, "New-user event published");

        Ok(record)
    }

    fn user_count(&self) -> usize {
        self.store.len()
    }
}
