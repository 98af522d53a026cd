//! # Gateway Events
//!
//! Defines all event types that flow through the shared bus and the fixed
//! topic set they are routed by.

use serde::{Deserialize, Serialize};
use shared_types::{LoginSucceeded, PingPayload, UserRecord};
use std::fmt;
use std::str::FromStr;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize)]
pub enum GatewayEvent {
    // =========================================================================
    // CREDENTIALS
    // =========================================================================
    /// A user was registered and stored.
    /// Source: pg-01 Registration | Topic: new-user
    NewUser(UserRecord),

    /// A credential check succeeded.
    /// Source: pg-01 Authenticator | Topic: login-success
    LoginSucceeded(LoginSucceeded),

    // =========================================================================
    // HEARTBEAT
    // =========================================================================
    /// Periodic liveness ping.
    /// Source: pg-02 Heartbeat | Topic: ping
    Ping(PingPayload),
}

impl GatewayEvent {
    /// The topic this event is routed on.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            GatewayEvent::NewUser(_) => EventTopic::NewUser,
            GatewayEvent::LoginSucceeded(_) => EventTopic::LoginSuccess,
            GatewayEvent::Ping(_) => EventTopic::Ping,
        }
    }

    /// Name of the producing subsystem, for logging.
    #[must_use]
    pub fn source_subsystem(&self) -> &'static str {
        match self {
            GatewayEvent::NewUser(_) | GatewayEvent::LoginSucceeded(_) => "pg-01-credentials",
            GatewayEvent::Ping(_) => "pg-02-heartbeat",
        }
    }

    /// The payload alone, in its public wire shape.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            GatewayEvent::NewUser(user) => serde_json::to_value(user),
            GatewayEvent::LoginSucceeded(login) => serde_json::to_value(login),
            GatewayEvent::Ping(ping) => serde_json::to_value(ping),
        }
    }
}

/// Event topics for subscription routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventTopic {
    /// New user registrations.
    NewUser,
    /// Heartbeat liveness pings.
    Ping,
    /// Successful logins.
    LoginSuccess,
}

impl EventTopic {
    /// Every topic, in a stable order. The bus allocates one channel per entry.
    pub const ALL: [EventTopic; 3] = [EventTopic::NewUser, EventTopic::Ping, EventTopic::LoginSuccess];

    /// Canonical topic name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EventTopic::NewUser => "new-user",
            EventTopic::Ping => "ping",
            EventTopic::LoginSuccess => "login-success",
        }
    }

    /// Parse a topic from its canonical name or its subscription field alias
    /// (`newUser`, `listenForPing`, `loginSuccess`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new-user" | "newUser" => Some(EventTopic::NewUser),
            "ping" | "listenForPing" => Some(EventTopic::Ping),
            "login-success" | "loginSuccess" => Some(EventTopic::LoginSuccess),
            _ => None,
        }
    }
}

impl fmt::Display for EventTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a topic name is not in the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for EventTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownTopic(s.to_string()))
    }
}
