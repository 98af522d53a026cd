//! Fixed-response demo methods: `hello`, `user`, `errorLogs`.

use crate::domain::error::ApiResult;
use crate::domain::types::{DemoUser, ErrorLog};

/// Demo RPC methods handler
#[derive(Default)]
pub struct DemoRpc;

impl DemoRpc {
    pub fn new() -> Self {
        Self
    }

    /// hello - Greets `name`
    pub async fn hello(&self, name: &str) -> ApiResult<String> {
        Ok(format!("hey {name}"))
    }

    /// user - Always the same placeholder user
    pub async fn user(&self) -> ApiResult<DemoUser> {
        Ok(DemoUser {
            id: 1,
            username: "tom",
        })
    }

    /// errorLogs - Sample field errors
    pub async fn error_logs(&self) -> ApiResult<Vec<ErrorLog>> {
        Ok(vec![
            ErrorLog {
                field: "username",
                message: "bad",
            },
            ErrorLog {
                field: "username2",
                message: "bad2",
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hello() {
        let demo = DemoRpc::new();
        assert_eq!(demo.hello("Pero").await.unwrap(), "hey Pero");
        assert_eq!(demo.hello("").await.unwrap(), "hey ");
    }

    #[tokio::test]
    async fn test_user() {
        let user = DemoRpc::new().user().await.unwrap();
        assert_eq!(
            serde_json::to_value(user).unwrap(),
            serde_json::json!({ "id": 1, "username": "tom" })
        );
    }

    #[tokio::test]
    async fn test_error_logs() {
        let logs = DemoRpc::new().error_logs().await.unwrap();
        assert_eq!(
            serde_json::to_value(logs).unwrap(),
            serde_json::json!([
                { "field": "username", "message": "bad" },
                { "field": "username2", "message": "bad2" }
            ])
        );
    }
}
