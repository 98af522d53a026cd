//! # Node Configuration
//!
//! Aggregates the configuration of every subsystem and applies environment
//! overrides on top of their defaults.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `DOTENV_PATH` | env file to load instead of `./.env` |
//! | `PORT` | HTTP/WebSocket listening port |
//! | `PG_HOST` | bind address |
//! | `PG_PING_INTERVAL` | heartbeat period, e.g. `3s`, `500ms` |
//! | `PG_HEARTBEAT_ENABLED` | `false` disables the heartbeat |
//! | `PG_HASH_MEMORY_KIB`, `PG_HASH_ITERATIONS` | Argon2 cost |
//! | `PG_BUS_CAPACITY` | per-subscriber event queue length |
//! | `PG_SEED_USERS` | `name:secret[:admin]`, comma separated |
//! | `PG_SEED_PERO_SECRET`, `PG_SEED_USER2_SECRET` | secrets of the default seed users |

use pg_01_credentials::{CredentialError, CredentialsConfig, SeedUser};
use pg_02_heartbeat::{HeartbeatConfig, HeartbeatError};
use pg_03_api_gateway::GatewayConfig;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Default per-subscriber queue length of the event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// API Gateway configuration.
    pub gateway: GatewayConfig,
    /// Credential store configuration.
    pub credentials: CredentialsConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
    /// Event bus queue length per subscriber.
    pub bus_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            credentials: CredentialsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    /// The env file exists but could not be read.
    #[error("failed to load env file: {0}")]
    EnvFile(String),

    #[error("gateway: {0}")]
    Gateway(#[from] pg_03_api_gateway::ConfigError),

    #[error("credentials: {0}")]
    Credentials(#[from] CredentialError),

    #[error("heartbeat: {0}")]
    Heartbeat(#[from] HeartbeatError),

    #[error("bus capacity cannot be 0")]
    ZeroBusCapacity,
}

impl NodeConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = NodeConfig::default();

        if let Some(port) = parsed(&lookup, "PORT", |v| v.parse::<u16>())? {
            config.gateway.http.port = port;
        }
        if let Some(host) = parsed(&lookup, "PG_HOST", |v| v.parse())? {
            config.gateway.http.host = host;
        }

        if let Some(interval) = parsed(&lookup, "PG_PING_INTERVAL", humantime::parse_duration)? {
            config.heartbeat.interval = interval;
        }
        if let Some(enabled) = parsed(&lookup, "PG_HEARTBEAT_ENABLED", |v| v.parse::<bool>())? {
            config.heartbeat.enabled = enabled;
        }

        if let Some(memory) = parsed(&lookup, "PG_HASH_MEMORY_KIB", |v| v.parse::<u32>())? {
            config.credentials.cost.memory_kib = memory;
        }
        if let Some(iterations) = parsed(&lookup, "PG_HASH_ITERATIONS", |v| v.parse::<u32>())? {
            config.credentials.cost.iterations = iterations;
        }

        if let Some(capacity) = parsed(&lookup, "PG_BUS_CAPACITY", |v| v.parse::<usize>())? {
            config.bus_capacity = capacity;
        }

        config.credentials.seed_users = seed_users(&lookup)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.credentials.validate()?;
        self.heartbeat.validate()?;
        if self.bus_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        Ok(())
    }
}

fn parsed<T, E: std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => parse(raw.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
            }),
    }
}

/// `PG_SEED_USERS` when set, otherwise the two default users whose secrets
/// are present.
fn seed_users(lookup: &impl Fn(&str) -> Option<String>) -> Result<Vec<SeedUser>, ConfigError> {
    if let Some(list) = lookup("PG_SEED_USERS") {
        return list
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                SeedUser::parse(entry).ok_or_else(|| ConfigError::InvalidValue {
                    var: "PG_SEED_USERS",
                    reason: "expected name:secret[:admin|user]".to_string(),
                })
            })
            .collect();
    }

    let mut seeds = Vec::new();
    for (name, var, admin) in [
        ("Pero", "PG_SEED_PERO_SECRET", true),
        ("user2", "PG_SEED_USER2_SECRET", false),
    ] {
        match lookup(var).filter(|s| !s.is_empty()) {
            Some(secret) => seeds.push(SeedUser::new(name, secret, admin)),
            None => warn!(user = name, var, "Seed user skipped: secret not set"),
        }
    }
    Ok(seeds)
}

/// Load `DOTENV_PATH`, or `./.env` when present, into the process environment.
///
/// Returns the file that was loaded. A missing default file is not an error.
pub fn load_env_file() -> Result<Option<PathBuf>, ConfigError> {
    let cwd = env::current_dir().map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    load_env_file_in(&cwd, env::var("DOTENV_PATH").ok())
}

/// Only `dir` is searched, never its parents. `explicit` is relative to `dir`.
fn load_env_file_in(
    dir: &Path,
    explicit: Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) => {
            let path = dir.join(path);
            dotenvy::from_path(&path).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
            Ok(Some(path))
        }
        None => {
            let path = dir.join(".env");
            match dotenvy::from_path(&path) {
                Ok(()) => Ok(Some(path)),
                Err(e) if e.not_found() => Ok(None),
                Err(e) => Err(ConfigError::EnvFile(e.to_string())),
            }
        }
    }
}
