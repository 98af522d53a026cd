//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `SecretHash`, `UserRecord`
//! - **Events**: `PingPayload`, `LoginSucceeded`
//! - **API**: `SuccessToken`

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Numeric user identifier assigned by the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A one-way salted hash of a secret in PHC string format.
///
/// Never holds a raw secret. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretHash(String);

impl SecretHash {
    /// Wrap an already-computed PHC hash string.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// The PHC string, for verification.
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(..)")
    }
}

/// A user known to the credential store.
///
/// `identity` is unique across the store and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Store-assigned numeric id.
    pub id: UserId,
    /// Login name. Compared case-sensitively.
    pub identity: String,
    /// Salted hash of the user's secret.
    pub secret_hash: SecretHash,
    /// Administrative privilege flag.
    pub is_privileged: bool,
}

impl UserRecord {
    /// First character of the identity, if any.
    pub fn first_letter_of_username(&self) -> Option<char> {
        self.identity.chars().next()
    }
}

/// Public wire shape: `{ id, username, admin, firstLetterOfUsername }`.
///
/// The secret hash is never serialised.
impl Serialize for UserRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("User", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("username", &self.identity)?;
        state.serialize_field("admin", &self.is_privileged)?;
        state.serialize_field(
            "firstLetterOfUsername",
            &self.first_letter_of_username().map(String::from),
        )?;
        state.end()
    }
}

// =============================================================================
// CLUSTER B: EVENT PAYLOADS
// =============================================================================

/// Liveness payload published on every heartbeat tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub timestamp: String,
}

impl PingPayload {
    pub fn from_millis(millis: i64) -> Self {
        Self {
            timestamp: millis.to_string(),
        }
    }

    /// Parse the timestamp back into milliseconds.
    pub fn millis(&self) -> Option<i64> {
        self.timestamp.parse().ok()
    }
}

/// Published after a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSucceeded {
    pub id: UserId,
    pub username: String,
}

impl From<&UserRecord> for LoginSucceeded {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.identity.clone(),
        }
    }
}

// =============================================================================
// CLUSTER C: API TOKENS
// =============================================================================

/// Opaque success marker returned by login and register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuccessToken {
    LoginSuccess,
    RegistrationSuccess,
}

impl SuccessToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessToken::LoginSuccess => "LOGIN_SUCCESS",
            SuccessToken::RegistrationSuccess => "REGISTRATION_SUCCESS",
        }
    }
}

impl fmt::Display for SuccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
