//! RPC method handlers for the JSON-RPC API.

pub mod auth;
pub mod demo;

pub use auth::AuthRpc;
pub use demo::DemoRpc;

use pg_01_credentials::{AuthenticatorApi, RegistrationApi};
use std::sync::Arc;

/// All RPC handlers
pub struct RpcHandlers {
    pub auth: AuthRpc,
    pub demo: DemoRpc,
}

impl RpcHandlers {
    pub fn new(
        authenticator: Arc<dyn AuthenticatorApi>,
        registration: Arc<dyn RegistrationApi>,
    ) -> Self {
        Self {
            auth: AuthRpc::new(authenticator, registration),
            demo: DemoRpc::new(),
        }
    }
}
