//! # Credentials Subsystem (PG-01)
//!
//! Holds user records, verifies identity/secret pairs and registers new users.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Credentials, secret hashing, errors. No I/O.
//! - **Ports Layer** (`ports/`): Inbound API traits and the outbound store trait
//! - **Adapters Layer** (`adapters/`): In-memory credential store
//! - **Service Layer** (`service.rs`): Wires domain logic to ports and the event bus
//!
//! ## Security Notes
//!
//! - Secrets are hashed with Argon2id and a fresh salt per record; only the
//!   PHC hash string is retained.
//! - Unknown identity and wrong secret fail identically, including in cost:
//!   an unknown identity is checked against a dummy hash.
//! - Hashing runs on the blocking pool so it never stalls event delivery.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::memory_store::InMemoryCredentialStore;
pub use domain::config::CredentialsConfig;
pub use domain::entities::{Credentials, SeedUser};
pub use domain::errors::CredentialError;
pub use domain::hashing::{HashingCost, SecretHasher};
pub use ports::inbound::{AuthenticatorApi, RegistrationApi};
pub use ports::outbound::CredentialStore;
pub use service::CredentialService;
