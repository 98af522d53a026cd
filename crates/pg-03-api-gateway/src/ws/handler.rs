//! WebSocket handler for real-time subscriptions.
//!
//! Security features:
//! - Message size limits (enforced by the upgrade, oversized frames end the connection)
//! - Connection-level subscription limits
//! - Rate limiting per connection

use crate::domain::config::WebSocketConfig;
use crate::domain::correlation::ConnectionId;
use crate::domain::error::ApiError;
use crate::middleware::GatewayMetrics;
use crate::ws::subscriptions::{SubscribeError, SubscriptionManager, SubscriptionNotification};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use shared_bus::EventTopic;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// WebSocket connection handler
pub struct WebSocketHandler {
    subscription_manager: Arc<SubscriptionManager>,
    metrics: Arc<GatewayMetrics>,
    connection_id: ConnectionId,
    config: WebSocketConfig,
    shutdown: watch::Receiver<bool>,
    /// Message counter for rate limiting
    message_count: u32,
    /// Rate limit window start
    rate_limit_window: Instant,
}

impl WebSocketHandler {
    pub fn new(
        subscription_manager: Arc<SubscriptionManager>,
        metrics: Arc<GatewayMetrics>,
        config: WebSocketConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscription_manager,
            metrics,
            connection_id: ConnectionId::new(),
            config,
            shutdown,
            message_count: 0,
            rate_limit_window: Instant::now(),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Check rate limit, returns true if request is allowed
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.rate_limit_window);

        // Reset window every second
        if elapsed >= Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.message_count = 0;
        }

        self.message_count += 1;
        self.message_count <= self.config.messages_per_second
    }

    /// Apply limits to one inbound text frame and produce the reply.
    fn on_text(
        &mut self,
        text: &str,
        sink: &mpsc::Sender<SubscriptionNotification>,
    ) -> String {
        if !self.check_rate_limit() {
            self.metrics.record_rate_limit_rejection();
            return json_rpc_error(None, &ApiError::rate_limited(1000));
        }

        self.handle_message(text, sink)
    }

    /// Handle a WebSocket connection
    ///
    /// Runs until the client disconnects or the server shuts down; every
    /// subscription opened on this connection is closed on the way out.
    pub async fn handle(mut self, socket: WebSocket) {
        info!(
            connection_id = %self.connection_id,
            "New WebSocket connection"
        );
        self.metrics.record_ws_connect();

        let (mut ws_tx, mut ws_rx) = socket.split();

        // Channel for sending notifications to client
        let (notif_tx, mut notif_rx) =
            mpsc::channel::<SubscriptionNotification>(self.config.outbound_buffer);

        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                incoming = ws_rx.next() => {
                    let Some(result) = incoming else {
                        break;
                    };

                    let reply = match result {
                        Ok(Message::Text(text)) => Some(Message::Text(self.on_text(&text, &notif_tx))),
                        Ok(Message::Binary(data)) => {
                            // Try to parse as JSON
                            match String::from_utf8(data) {
                                Ok(text) => Some(Message::Text(self.on_text(&text, &notif_tx))),
                                Err(_) => Some(Message::Text(json_rpc_error(
                                    None,
                                    &ApiError::parse_error("binary frame is not UTF-8"),
                                ))),
                            }
                        }
                        Ok(Message::Ping(data)) => Some(Message::Pong(data)),
                        Ok(Message::Pong(_)) => None,
                        Ok(Message::Close(_)) => {
                            debug!(connection_id = %self.connection_id, "WebSocket close received");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    };

                    if let Some(reply) = reply {
                        if let Err(e) = ws_tx.send(reply).await {
                            error!(error = %e, "Failed to send WebSocket response");
                            break;
                        }
                    }
                }
                Some(notification) = notif_rx.recv() => {
                    let text = match serde_json::to_string(&notification) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(error = %e, "Failed to serialize notification");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(Message::Text(text)).await {
                        debug!(error = %e, "Failed to deliver notification");
                        break;
                    }
                    self.metrics.record_ws_message();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Cleanup subscriptions on disconnect
        let closed = self
            .subscription_manager
            .remove_connection(&self.connection_id);
        self.metrics.record_ws_unsubscribe(closed as u64);
        self.metrics.record_ws_disconnect();

        info!(
            connection_id = %self.connection_id,
            closed_subscriptions = closed,
            "WebSocket connection closed"
        );
    }

    /// Handle a single JSON-RPC message
    fn handle_message(&self, text: &str, sink: &mpsc::Sender<SubscriptionNotification>) -> String {
        // Parse JSON-RPC request
        let request: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                return json_rpc_error(None, &ApiError::parse_error(e.to_string()));
            }
        };

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = request.get("params");

        match method {
            "subscribe" => self.handle_subscribe(id, params, sink),
            "unsubscribe" => self.handle_unsubscribe(id, params),
            // Queries and mutations go through HTTP
            _ => json_rpc_error(id, &ApiError::method_not_found(method)),
        }
    }

    /// Handle subscribe
    fn handle_subscribe(
        &self,
        id: Option<serde_json::Value>,
        params: Option<&serde_json::Value>,
        sink: &mpsc::Sender<SubscriptionNotification>,
    ) -> String {
        let topic_name = match first_string_param(params, "topic") {
            Ok(name) => name,
            Err(e) => return json_rpc_error(id, &e),
        };

        let result = EventTopic::parse(topic_name)
            .ok_or_else(|| SubscribeError::UnknownTopic(topic_name.to_string()))
            .and_then(|topic| {
                self.subscription_manager
                    .open(self.connection_id, topic, sink.clone())
            });

        match result {
            Ok(sub_id) => {
                self.metrics.record_ws_subscribe();
                json_rpc_result(id, serde_json::json!(sub_id))
            }
            Err(e) => json_rpc_error(id, &ApiError::from(e)),
        }
    }

    /// Handle unsubscribe
    fn handle_unsubscribe(
        &self,
        id: Option<serde_json::Value>,
        params: Option<&serde_json::Value>,
    ) -> String {
        let sub_id = match first_string_param(params, "subscription ID") {
            Ok(sub_id) => sub_id,
            Err(e) => return json_rpc_error(id, &e),
        };

        let result = self
            .subscription_manager
            .unsubscribe(&self.connection_id, sub_id);
        if result {
            self.metrics.record_ws_unsubscribe(1);
        }
        json_rpc_result(id, serde_json::json!(result))
    }
}

/// First element of an array of params, as a string.
fn first_string_param<'a>(
    params: Option<&'a serde_json::Value>,
    what: &str,
) -> Result<&'a str, ApiError> {
    let params = match params {
        Some(serde_json::Value::Array(arr)) => arr,
        _ => return Err(ApiError::invalid_params("expected array")),
    };

    params
        .first()
        .ok_or_else(|| ApiError::invalid_params(format!("missing {what}")))?
        .as_str()
        .ok_or_else(|| ApiError::invalid_params(format!("{what} must be string")))
}

impl From<SubscribeError> for ApiError {
    fn from(e: SubscribeError) -> Self {
        match e {
            SubscribeError::TooManySubscriptions => ApiError::limit_exceeded(e.to_string()),
            SubscribeError::UnknownTopic(_) => ApiError::invalid_params(e.to_string()),
            SubscribeError::BusClosed => ApiError::resource_unavailable(e.to_string()),
        }
    }
}

/// Create JSON-RPC success response
pub(crate) fn json_rpc_result(id: Option<serde_json::Value>, result: serde_json::Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
    .to_string()
}

/// Create JSON-RPC error response
pub(crate) fn json_rpc_error(id: Option<serde_json::Value>, error: &ApiError) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error
    })
    .to_string()
}
