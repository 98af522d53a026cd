//! # Secret Hashing
//!
//! Salted adaptive hashing (Argon2id) of user secrets.
//!
//! Hashes are stored as PHC strings, so each hash carries its own salt and
//! cost. Verification reads the cost from the stored hash; changing the
//! configured cost only affects hashes created afterwards.

use crate::domain::errors::CredentialError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use serde::{Deserialize, Serialize};
use shared_types::SecretHash;

/// Argon2 cost factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl HashingCost {
    /// Smallest cost Argon2 accepts. For tests only.
    pub const MINIMAL: HashingCost = HashingCost {
        memory_kib: Params::MIN_M_COST,
        iterations: Params::MIN_T_COST,
        parallelism: Params::MIN_P_COST,
    };

    /// Check the parameters are accepted by Argon2.
    pub fn validate(&self) -> Result<(), CredentialError> {
        self.params().map(|_| ())
    }

    fn params(&self) -> Result<Params, CredentialError> {
        Ok(Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            None,
        )?)
    }
}

/// Hashes and verifies secrets.
///
/// Cheap to clone; share one instance through an `Arc` for use from
/// `spawn_blocking`.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    cost: HashingCost,
    /// Verified against when the identity is unknown.
    dummy: SecretHash,
}

impl SecretHasher {
    /// Build a hasher with the given cost.
    ///
    /// Computes one hash up front for the unknown-identity path.
    pub fn new(cost: HashingCost) -> Result<Self, CredentialError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, cost.params()?);
        let mut hasher = Self {
            argon2,
            cost,
            dummy: SecretHash::default(),
        };
        hasher.dummy = hasher.hash("pulse-gateway/unknown-identity")?;
        Ok(hasher)
    }

    pub fn cost(&self) -> HashingCost {
        self.cost
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<SecretHash, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self.argon2.hash_password(secret.as_bytes(), &salt)?;
        Ok(SecretHash::from_phc(phc.to_string()))
    }

    /// Check a secret against a stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, secret: &str, hash: &SecretHash) -> bool {
        match PasswordHash::new(hash.as_phc()) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored secret hash is malformed");
                false
            }
        }
    }

    /// Burn one verification against the dummy hash. Always `false`.
    pub fn verify_unknown(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> SecretHasher {
        SecretHasher::new(HashingCost::MINIMAL).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("pw123").unwrap();

        assert!(hash.as_phc().starts_with("$argon2id$"));
        assert!(hasher.verify("pw123", &hash));
        assert!(!hasher.verify("pw124", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn test_fresh_salt_per_hash() {
        let hasher = hasher();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn test_hash_never_contains_secret() {
        let hash = hasher().hash("plaintext-secret").unwrap();
        assert!(!hash.as_phc().contains("plaintext-secret"));
    }

    #[test]
    fn test_verify_reads_cost_from_stored_hash() {
        let cheap = hasher();
        let hash = cheap.hash("pw").unwrap();

        let other = SecretHasher::new(HashingCost {
            memory_kib: 64,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(other.verify("pw", &hash));
    }

    #[test]
    fn test_malformed_hash_fails_closed() {
        let hasher = hasher();
        assert!(!hasher.verify("pw", &SecretHash::from_phc("plaintext")));
        assert!(!hasher.verify("pw", &SecretHash::default()));
    }

    #[test]
    fn test_verify_unknown_is_false() {
        let hasher = hasher();
        assert!(!hasher.verify_unknown("pulse-gateway/unknown-identity"));
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let cost = HashingCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            cost.validate(),
            Err(CredentialError::InvalidCost(_))
        ));
        assert!(SecretHasher::new(cost).is_err());
        assert!(HashingCost::default().validate().is_ok());
    }
}
