//! # Credential Entities
//!
//! Input types accepted by the authenticator and registration handler.

use crate::domain::errors::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// A validated identity/secret pair.
///
/// Both fields are guaranteed non-empty. The secret is wiped from memory on
/// drop and never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: Zeroizing<String>,
}

impl Credentials {
    /// Build credentials from optional request fields.
    ///
    /// # Errors
    ///
    /// `AuthenticationDataMissing` if either field is absent or empty. This is
    /// distinct from a failed verification.
    pub fn new(identity: Option<&str>, secret: Option<&str>) -> Result<Self, CredentialError> {
        match (identity, secret) {
            (Some(identity), Some(secret)) if !identity.is_empty() && !secret.is_empty() => {
                Ok(Self {
                    identity: identity.to_string(),
                    secret: Zeroizing::new(secret.to_string()),
                })
            }
            _ => Err(CredentialError::AuthenticationDataMissing),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        self.secret.as_str()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A user created at process start rather than through registration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

impl SeedUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, admin: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            admin,
        }
    }

    /// Parse `name:secret[:admin]`.
    ///
    /// The third field, when present, must be `admin` or `user`.
    pub fn parse(entry: &str) -> Option<Self> {
        let mut parts = entry.trim().splitn(3, ':');
        let username = parts.next().filter(|s| !s.is_empty())?;
        let password = parts.next().filter(|s| !s.is_empty())?;
        let admin = match parts.next() {
            None | Some("user") => false,
            Some("admin") => true,
            Some(_) => return None,
        };
        Some(Self::new(username, password, admin))
    }

    pub fn credentials(&self) -> Result<Credentials, CredentialError> {
        Credentials::new(Some(&self.username), Some(&self.password))
    }
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}
