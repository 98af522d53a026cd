//! # End-to-End Gateway Tests
//!
//! Runs the full `NodeRuntime` on an ephemeral port and talks to it the way a
//! browser client would: JSON-RPC over HTTP and subscriptions over WebSocket.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use node_runtime::{NodeConfig, NodeRuntime};
    use pg_01_credentials::{HashingCost, SeedUser};
    use pg_02_heartbeat::HeartbeatConfig;
    use pg_03_api_gateway::codes;
    use shared_bus::EventTopic;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn start_runtime(ping_interval: Duration) -> (NodeRuntime, SocketAddr) {
        start_runtime_with(ping_interval, |_| {}).await
    }

    async fn start_runtime_with(
        ping_interval: Duration,
        customize: impl FnOnce(&mut NodeConfig),
    ) -> (NodeRuntime, SocketAddr) {
        let mut config = NodeConfig::default();
        config.credentials.cost = HashingCost::MINIMAL;
        config.credentials.seed_users = vec![
            SeedUser::new("Pero", "pero-correct-horse", true),
            SeedUser::new("user2", "user2-secret", false),
        ];
        config.heartbeat = HeartbeatConfig::with_interval(ping_interval);
        customize(&mut config);

        let mut runtime = NodeRuntime::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = runtime.start_with_listener(listener).await.unwrap();
        (runtime, addr)
    }

    /// Minimal HTTP/1.1 client: one request per connection.
    async fn http(addr: SocketAddr, method: &str, path: &str, body: &str) -> (u16, Value) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
            .await
            .unwrap()
            .unwrap();
        let raw = String::from_utf8(raw).unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, serde_json::from_str(body).unwrap_or(Value::Null))
    }

    async fn rpc(addr: SocketAddr, method: &str, params: Value) -> Value {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        let (status, response) = http(addr, "POST", "/", &body.to_string()).await;
        assert_eq!(status, 200);
        response
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        ws
    }

    async fn send(ws: &mut Client, id: u64, method: &str, params: Value) {
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        ws.send(Message::Text(request.to_string())).await.unwrap();
    }

    /// Next JSON text frame, skipping control frames.
    async fn next_json(ws: &mut Client) -> Value {
        loop {
            let frame = timeout(Duration::from_secs(3), ws.next())
                .await
                .expect("frame timed out")
                .expect("connection ended")
                .unwrap();
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    /// Next reply to request `id`, skipping notifications.
    async fn reply(ws: &mut Client, id: u64) -> Value {
        loop {
            let msg = next_json(ws).await;
            if msg["id"] == json!(id) {
                return msg;
            }
        }
    }

    /// Next notification for `subscription`, skipping everything else.
    async fn notification(ws: &mut Client, subscription: &str) -> Value {
        loop {
            let msg = next_json(ws).await;
            if msg["method"] == "subscription" && msg["params"]["subscription"] == subscription {
                return msg["params"]["result"].clone();
            }
        }
    }

    async fn subscribe(ws: &mut Client, id: u64, topic: &str) -> String {
        send(ws, id, "subscribe", json!([topic])).await;
        let response = reply(ws, id).await;
        response["result"]
            .as_str()
            .unwrap_or_else(|| panic!("subscribe failed: {response}"))
            .to_string()
    }

    async fn wait_for_subscribers(runtime: &NodeRuntime, topic: EventTopic, expected: usize) {
        let bus = runtime.bus();
        timeout(Duration::from_secs(3), async {
            while bus.subscriber_count(topic) != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscriber count did not settle");
    }

    // =============================================================================
    // HTTP
    // =============================================================================

    #[tokio::test]
    async fn test_http_login_and_health() {
        let (runtime, addr) = start_runtime(Duration::from_secs(60)).await;

        let ok = rpc(
            addr,
            "login",
            json!({"userInfo": {"username": "Pero", "password": "pero-correct-horse"}}),
        )
        .await;
        assert_eq!(ok["result"], "LOGIN_SUCCESS");

        let wrong = rpc(
            addr,
            "login",
            json!({"userInfo": {"username": "Pero", "password": "nope"}}),
        )
        .await;
        let ghost = rpc(
            addr,
            "login",
            json!({"userInfo": {"username": "nobody", "password": "nope"}}),
        )
        .await;
        assert_eq!(wrong["error"]["code"], codes::AUTHENTICATION_FAILED);
        assert_eq!(wrong["error"], ghost["error"]);

        let missing = rpc(addr, "login", json!({"userInfo": {"username": "Pero"}})).await;
        assert_eq!(missing["error"]["code"], codes::AUTHENTICATION_DATA_MISSING);

        let (status, health) = http(addr, "GET", "/health", "").await;
        assert_eq!(status, 200);
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["users"], 2);

        runtime.shutdown().await.unwrap();
    }

    // =============================================================================
    // REGISTRATION → WEBSOCKET
    // =============================================================================

    #[tokio::test]
    async fn test_register_notifies_websocket_subscribers() {
        let (runtime, addr) = start_runtime(Duration::from_secs(60)).await;

        let mut first = connect(addr).await;
        let mut second = connect(addr).await;
        let sub_first = subscribe(&mut first, 1, "newUser").await;
        let sub_second = subscribe(&mut second, 1, "new-user").await;

        let registered = rpc(
            addr,
            "register",
            json!({"userInfo": {"username": "newuser", "password": "pw123"}}),
        )
        .await;
        assert_eq!(registered["result"], "REGISTRATION_SUCCESS");

        let expected = json!({
            "id": 3,
            "username": "newuser",
            "admin": false,
            "firstLetterOfUsername": "n",
        });
        assert_eq!(notification(&mut first, &sub_first).await, expected);
        assert_eq!(notification(&mut second, &sub_second).await, expected);

        // A subscriber that joins afterwards gets no replay.
        let mut late = connect(addr).await;
        let sub_late = subscribe(&mut late, 1, "newUser").await;
        send(&mut late, 2, "unsubscribe", json!([sub_late])).await;
        assert_eq!(reply(&mut late, 2).await["result"], true);

        let login = rpc(
            addr,
            "login",
            json!({"userInfo": {"username": "newuser", "password": "pw123"}}),
        )
        .await;
        assert_eq!(login["result"], "LOGIN_SUCCESS");

        let duplicate = rpc(
            addr,
            "register",
            json!({"userInfo": {"username": "newuser", "password": "other"}}),
        )
        .await;
        assert_eq!(duplicate["error"]["code"], codes::IDENTITY_TAKEN);

        runtime.shutdown().await.unwrap();
    }

    // =============================================================================
    // HEARTBEAT → WEBSOCKET
    // =============================================================================

    #[tokio::test]
    async fn test_ping_notifications_increase() {
        let (runtime, addr) = start_runtime(Duration::from_millis(50)).await;

        let mut ws = connect(addr).await;
        let sub = subscribe(&mut ws, 1, "listenForPing").await;

        let mut last = 0i64;
        for _ in 0..3 {
            let ping = notification(&mut ws, &sub).await;
            let timestamp: i64 = ping["timestamp"].as_str().unwrap().parse().unwrap();
            assert!(timestamp > last);
            last = timestamp;
        }

        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_topic_and_method() {
        let (runtime, addr) = start_runtime(Duration::from_secs(60)).await;
        let mut ws = connect(addr).await;

        send(&mut ws, 1, "subscribe", json!(["weather"])).await;
        assert_eq!(reply(&mut ws, 1).await["error"]["code"], codes::INVALID_PARAMS);

        send(&mut ws, 2, "login", json!([])).await;
        assert_eq!(reply(&mut ws, 2).await["error"]["code"], codes::METHOD_NOT_FOUND);

        runtime.shutdown().await.unwrap();
    }

    // =============================================================================
    // DISCONNECT AND SHUTDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_client_disconnect_detaches_subscriptions() {
        let (runtime, addr) = start_runtime(Duration::from_secs(60)).await;

        let mut ws = connect(addr).await;
        subscribe(&mut ws, 1, "listenForPing").await;
        subscribe(&mut ws, 2, "newUser").await;
        wait_for_subscribers(&runtime, EventTopic::Ping, 1).await;
        wait_for_subscribers(&runtime, EventTopic::NewUser, 1).await;

        ws.close(None).await.unwrap();
        drop(ws);

        wait_for_subscribers(&runtime, EventTopic::Ping, 0).await;
        wait_for_subscribers(&runtime, EventTopic::NewUser, 0).await;

        let (_, health) = http(addr, "GET", "/health", "").await;
        assert_eq!(health["subscribers"], 0);

        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_frame_ends_connection() {
        let (runtime, addr) = start_runtime_with(Duration::from_secs(60), |config| {
            config.gateway.websocket.max_message_size = 1024;
        })
        .await;

        let mut ws = connect(addr).await;
        subscribe(&mut ws, 1, "newUser").await;
        wait_for_subscribers(&runtime, EventTopic::NewUser, 1).await;

        let _ = ws.send(Message::Text("x".repeat(4096))).await;

        let end = timeout(Duration::from_secs(3), async {
            loop {
                match ws.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(end.is_ok());
        wait_for_subscribers(&runtime, EventTopic::NewUser, 0).await;

        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_websocket() {
        let (runtime, addr) = start_runtime(Duration::from_secs(60)).await;

        let mut ws = connect(addr).await;
        subscribe(&mut ws, 1, "newUser").await;

        runtime.shutdown().await.unwrap();

        let end = timeout(Duration::from_secs(3), async {
            loop {
                match ws.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(end.is_ok());
    }
}
