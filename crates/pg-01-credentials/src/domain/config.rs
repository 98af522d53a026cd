//! Credentials subsystem configuration.

use crate::domain::entities::SeedUser;
use crate::domain::errors::CredentialError;
use crate::domain::hashing::HashingCost;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Argon2 cost for new hashes.
    pub cost: HashingCost,
    /// Users created at startup, before the API accepts requests.
    pub seed_users: Vec<SeedUser>,
}

impl CredentialsConfig {
    /// Reject invalid hashing costs and duplicate or incomplete seed users.
    pub fn validate(&self) -> Result<(), CredentialError> {
        self.cost.validate()?;

        let mut seen = HashSet::new();
        for seed in &self.seed_users {
            seed.credentials()?;
            if !seen.insert(seed.username.as_str()) {
                return Err(CredentialError::IdentityTaken(seed.username.clone()));
            }
        }
        Ok(())
    }
}
