//! API Gateway service - main entry point.
//!
//! One HTTP listener carries JSON-RPC (`POST /`), the WebSocket upgrade
//! (`GET /ws`), `GET /health` and `GET /metrics`.

use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError};
use crate::domain::types::{AuthParams, HelloParams, UserInfo};
use crate::middleware::{create_cors_layer, GatewayMetrics, RequestTimer, TracingLayer};
use crate::rpc::RpcHandlers;
use crate::ws::{SubscriptionManager, WebSocketHandler};
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use pg_01_credentials::{AuthenticatorApi, RegistrationApi};
use serde_json::Value;
use shared_bus::EventSubscriber;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

/// Max length of a string request id
const MAX_ID_LENGTH: usize = 256;

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    rpc_handlers: Arc<RpcHandlers>,
    subscription_manager: Arc<SubscriptionManager>,
    metrics: Arc<GatewayMetrics>,
}

impl ApiGatewayService {
    /// Create a new API Gateway service
    pub fn new(
        config: GatewayConfig,
        authenticator: Arc<dyn AuthenticatorApi>,
        registration: Arc<dyn RegistrationApi>,
        bus: Arc<dyn EventSubscriber>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let rpc_handlers = Arc::new(RpcHandlers::new(authenticator, registration));

        let subscription_manager = Arc::new(SubscriptionManager::new(
            bus,
            config.websocket.max_subscriptions_per_connection,
        ));

        let metrics = Arc::new(GatewayMetrics::new());

        Ok(Self {
            config,
            rpc_handlers,
            subscription_manager,
            metrics,
        })
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn subscriptions(&self) -> Arc<SubscriptionManager> {
        Arc::clone(&self.subscription_manager)
    }

    /// Build the HTTP router
    ///
    /// WebSocket connections accepted through it close when `shutdown` flips
    /// to `true`.
    pub fn router(&self, shutdown: watch::Receiver<bool>) -> Router {
        let state = AppState {
            rpc_handlers: Arc::clone(&self.rpc_handlers),
            subscription_manager: Arc::clone(&self.subscription_manager),
            metrics: Arc::clone(&self.metrics),
            config: Arc::new(self.config.clone()),
            shutdown,
        };

        let middleware = ServiceBuilder::new()
            .layer(TracingLayer::new())
            .layer(RequestBodyLimitLayer::new(self.config.limits.max_request_size))
            .layer(create_cors_layer(&self.config.cors));

        Router::new()
            .route("/", post(handle_json_rpc))
            .route("/ws", get(handle_ws_upgrade))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics_snapshot))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` flips to `true`
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<(), GatewayError> {
        if !self.config.http.enabled {
            info!("HTTP server disabled");
            wait_for_shutdown(shutdown).await;
            return Ok(());
        }

        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr).await.map_err(GatewayError::Bind)?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), GatewayError> {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "Starting HTTP server");
        }

        let router = self.router(shutdown.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await
            .map_err(GatewayError::Serve)?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    rpc_handlers: Arc<RpcHandlers>,
    subscription_manager: Arc<SubscriptionManager>,
    metrics: Arc<GatewayMetrics>,
    config: Arc<GatewayConfig>,
    shutdown: watch::Receiver<bool>,
}

/// Handle JSON-RPC request
async fn handle_json_rpc(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let request: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(None, &ApiError::parse_error(e.to_string()))),
            );
        }
    };

    let response = match request {
        Value::Array(requests) => {
            if requests.is_empty() {
                error_response(None, &ApiError::invalid_request("empty batch"))
            } else if requests.len() > state.config.limits.max_batch_size {
                error_response(
                    None,
                    &ApiError::limit_exceeded(format!(
                        "batch too large: {} requests (max: {})",
                        requests.len(),
                        state.config.limits.max_batch_size
                    )),
                )
            } else {
                let mut responses = Vec::with_capacity(requests.len());
                for req in &requests {
                    responses.push(process_single_request(&state, req).await);
                }
                Value::Array(responses)
            }
        }
        single => process_single_request(&state, &single).await,
    };

    (StatusCode::OK, Json(response))
}

/// Process a single JSON-RPC request
async fn process_single_request(state: &AppState, request: &Value) -> Value {
    if !request.is_object() {
        return error_response(None, &ApiError::invalid_request("request must be an object"));
    }

    let id = request.get("id").cloned();
    if let Some(ref id_val) = id {
        if let Err(e) = validate_id(id_val) {
            return error_response(None, &e);
        }
    }

    let Some(method) = request.get("method").and_then(|m| m.as_str()) else {
        return error_response(id, &ApiError::invalid_request("missing method"));
    };
    let params = request.get("params");

    let timer = RequestTimer::new(Arc::clone(&state.metrics));
    let result = route_method(state, method, params).await;
    timer.finish(result.is_ok());

    match result {
        Ok(value) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": value
        }),
        Err(e) => error_response(id, &e),
    }
}

/// Reject ids that are null, empty, oversized, or neither string nor number.
fn validate_id(id: &Value) -> Result<(), ApiError> {
    match id {
        Value::Null => Err(ApiError::invalid_request(
            "null id (notifications not supported)",
        )),
        Value::String(s) if s.is_empty() => Err(ApiError::invalid_request("empty string id")),
        Value::String(s) if s.len() > MAX_ID_LENGTH => Err(ApiError::invalid_request(format!(
            "id string too long (max {MAX_ID_LENGTH} chars)"
        ))),
        Value::String(_) | Value::Number(_) => Ok(()),
        _ => Err(ApiError::invalid_request("id must be string or number")),
    }
}

/// Route JSON-RPC method to the appropriate handler.
async fn route_method(
    state: &AppState,
    method: &str,
    params: Option<&Value>,
) -> Result<Value, ApiError> {
    let rpc = &state.rpc_handlers;

    match method {
        "login" => {
            let info = auth_params(params)?;
            rpc.auth.login(info).await.map(|t| serde_json::json!(t))
        }

        "register" => {
            let info = auth_params(params)?;
            rpc.auth.register(info).await.map(|t| serde_json::json!(t))
        }

        "hello" => {
            let name = match param_at(params, 0) {
                Some(Value::String(name)) => name.clone(),
                _ => parse_param::<HelloParams>(params, 0)?.name,
            };
            rpc.demo.hello(&name).await.map(Value::String)
        }

        "user" => rpc.demo.user().await.map(|u| serde_json::json!(u)),

        "errorLogs" => rpc.demo.error_logs().await.map(|e| serde_json::json!(e)),

        _ => Err(ApiError::method_not_found(method)),
    }
}

/// Credentials for `login`/`register`; absent params count as absent fields.
fn auth_params(params: Option<&Value>) -> Result<UserInfo, ApiError> {
    match param_at(params, 0) {
        None => Ok(UserInfo::default()),
        Some(_) => Ok(parse_param::<AuthParams>(params, 0)?.into_user_info()),
    }
}

fn param_at(params: Option<&Value>, index: usize) -> Option<&Value> {
    params.and_then(|p| {
        if p.is_array() {
            p.get(index)
        } else if index == 0 {
            Some(p)
        } else {
            None
        }
    })
}

/// Parse a required parameter from JSON-RPC params array.
fn parse_param<T: serde::de::DeserializeOwned>(
    params: Option<&Value>,
    index: usize,
) -> Result<T, ApiError> {
    let param = param_at(params, index)
        .ok_or_else(|| ApiError::invalid_params(format!("missing parameter at index {}", index)))?;

    serde_json::from_value(param.clone())
        .map_err(|e| ApiError::invalid_params(format!("invalid parameter at index {}: {}", index, e)))
}

fn error_response(id: Option<Value>, error: &ApiError) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error
    })
}

/// Upgrade to a WebSocket subscription connection
async fn handle_ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_size = state.config.websocket.max_message_size;
    let handler = WebSocketHandler::new(
        state.subscription_manager,
        state.metrics,
        state.config.websocket.clone(),
        state.shutdown,
    );
    ws.max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handler.handle(socket))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "subscribers": state.subscription_manager.total_subscriptions(),
        "users": state.rpc_handlers.auth.user_count(),
    }))
}

async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}
