//! Request and response shapes of the JSON-RPC methods.

use serde::{Deserialize, Serialize};

/// `username`/`password` as sent by clients. Either may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Params of `login` and `register`.
///
/// Accepts `{ "userInfo": { .. } }` or the flat `{ "username", "password" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthParams {
    Wrapped {
        #[serde(rename = "userInfo")]
        user_info: UserInfo,
    },
    Flat(UserInfo),
}

impl AuthParams {
    pub fn into_user_info(self) -> UserInfo {
        match self {
            AuthParams::Wrapped { user_info } => user_info,
            AuthParams::Flat(user_info) => user_info,
        }
    }
}

/// Params of `hello`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloParams {
    pub name: String,
}

/// Fixed record returned by `user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoUser {
    pub id: u64,
    pub username: &'static str,
}

/// One entry of `errorLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorLog {
    pub field: &'static str,
    pub message: &'static str,
}
