//! `login` and `register` JSON-RPC methods.

use crate::domain::error::ApiResult;
use crate::domain::types::UserInfo;
use pg_01_credentials::{AuthenticatorApi, Credentials, RegistrationApi};
use shared_types::SuccessToken;
use std::sync::Arc;
use tracing::debug;

/// Credential RPC methods handler
pub struct AuthRpc {
    authenticator: Arc<dyn AuthenticatorApi>,
    registration: Arc<dyn RegistrationApi>,
}

impl AuthRpc {
    pub fn new(
        authenticator: Arc<dyn AuthenticatorApi>,
        registration: Arc<dyn RegistrationApi>,
    ) -> Self {
        Self {
            authenticator,
            registration,
        }
    }

    /// login - Verify a username/password pair
    ///
    /// Absent fields fail with `AUTHENTICATION_DATA_MISSING`; a wrong password
    /// and an unknown username both fail with the same `AUTHENTICATION_FAILED`.
    pub async fn login(&self, info: UserInfo) -> ApiResult<SuccessToken> {
        let credentials = Credentials::new(info.username.as_deref(), info.password.as_deref())?;
        self.authenticator.login(&credentials).await?;
        Ok(SuccessToken::LoginSuccess)
    }

    /// register - Create a new user and announce it on "new-user"
    pub async fn register(&self, info: UserInfo) -> ApiResult<SuccessToken> {
        let credentials = Credentials::new(info.username.as_deref(), info.password.as_deref())?;
        let record = self.registration.register(&credentials).await?;
        debug!(id = %record.id, "Registration accepted");
        Ok(SuccessToken::RegistrationSuccess)
    }

    pub fn user_count(&self) -> usize {
        self.registration.user_count()
    }
}
