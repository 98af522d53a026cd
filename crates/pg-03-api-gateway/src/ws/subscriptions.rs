//! WebSocket subscription manager.
//!
//! Each open subscription owns one bus `EventStream` and one forwarder task
//! that turns bus events into notifications on the connection's outbound
//! channel. Closing a subscription aborts its forwarder, which drops the bus
//! subscription and detaches it from the topic.

use crate::domain::correlation::ConnectionId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use futures::StreamExt;
use shared_bus::{EventStream, EventSubscriber, EventTopic};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Subscription ID (hex string)
pub type SubscriptionId = String;

/// Subscription notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: SubscriptionParams,
}

/// Subscription params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: SubscriptionId,
    pub result: serde_json::Value,
}

impl SubscriptionNotification {
    pub fn new(subscription_id: SubscriptionId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "subscription".to_string(),
            params: SubscriptionParams {
                subscription: subscription_id,
                result,
            },
        }
    }
}

/// An open subscription.
struct ActiveSubscription {
    topic: EventTopic,
    connection_id: ConnectionId,
    forwarder: JoinHandle<()>,
}

/// Subscription manager
pub struct SubscriptionManager {
    bus: Arc<dyn EventSubscriber>,
    /// All active subscriptions by ID
    subscriptions: DashMap<SubscriptionId, ActiveSubscription>,
    /// Subscriptions by connection ID
    by_connection: DashMap<ConnectionId, Vec<SubscriptionId>>,
    /// Counter for generating subscription IDs
    id_counter: AtomicU64,
    /// Max subscriptions per connection
    max_per_connection: u32,
}

impl SubscriptionManager {
    pub fn new(bus: Arc<dyn EventSubscriber>, max_per_connection: u32) -> Self {
        Self {
            bus,
            subscriptions: DashMap::new(),
            by_connection: DashMap::new(),
            id_counter: AtomicU64::new(1),
            max_per_connection,
        }
    }

    /// Open a subscription to `topic` on behalf of `connection_id`.
    ///
    /// The bus subscription is attached before this returns, so every event
    /// published afterwards reaches `sink` in publish order. Events published
    /// earlier are never replayed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        &self,
        connection_id: ConnectionId,
        topic: EventTopic,
        sink: mpsc::Sender<SubscriptionNotification>,
    ) -> Result<SubscriptionId, SubscribeError> {
        // Check connection limit
        let mut conn_subs = self.by_connection.entry(connection_id).or_default();
        if conn_subs.len() as u32 >= self.max_per_connection {
            return Err(SubscribeError::TooManySubscriptions);
        }

        let events = self
            .bus
            .subscribe(topic)
            .map_err(|_| SubscribeError::BusClosed)?
            .into_stream();

        // Generate subscription ID
        let id_num = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let sub_id = format!("0x{:x}", id_num);

        let forwarder = tokio::spawn(forward(events, sub_id.clone(), sink));

        self.subscriptions.insert(
            sub_id.clone(),
            ActiveSubscription {
                topic,
                connection_id,
                forwarder,
            },
        );
        conn_subs.push(sub_id.clone());

        debug!(
            subscription_id = %sub_id,
            connection_id = %connection_id,
            topic = %topic,
            "Created subscription"
        );

        Ok(sub_id)
    }

    /// Close one subscription. Returns `false` if `subscription_id` is not
    /// open on `connection_id`.
    pub fn unsubscribe(&self, connection_id: &ConnectionId, subscription_id: &str) -> bool {
        let removed = self
            .subscriptions
            .remove_if(subscription_id, |_, sub| sub.connection_id == *connection_id);

        let Some((_, sub)) = removed else {
            return false;
        };
        sub.forwarder.abort();

        if let Some(mut conn_subs) = self.by_connection.get_mut(connection_id) {
            conn_subs.retain(|id| id != subscription_id);
        }

        debug!(
            subscription_id = %subscription_id,
            topic = %sub.topic,
            "Removed subscription"
        );
        true
    }

    /// Close every subscription of a connection. Returns how many were open.
    pub fn remove_connection(&self, connection_id: &ConnectionId) -> usize {
        let Some((_, sub_ids)) = self.by_connection.remove(connection_id) else {
            return 0;
        };

        let mut closed = 0;
        for sub_id in sub_ids {
            if let Some((_, sub)) = self.subscriptions.remove(&sub_id) {
                sub.forwarder.abort();
                closed += 1;
            }
        }
        debug!(
            connection_id = %connection_id,
            closed,
            "Removed all subscriptions for connection"
        );
        closed
    }

    /// Topic of an open subscription
    pub fn topic_of(&self, subscription_id: &str) -> Option<EventTopic> {
        self.subscriptions.get(subscription_id).map(|r| r.topic)
    }

    /// Number of open subscriptions for a connection
    pub fn connection_subscription_count(&self, connection_id: &ConnectionId) -> usize {
        self.by_connection
            .get(connection_id)
            .map_or(0, |subs| subs.len())
    }

    /// Get total subscription count
    pub fn total_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Get connection count
    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }
}

/// Forward bus events to a connection until the bus closes or the
/// connection's outbound channel is gone.
async fn forward(
    mut events: EventStream,
    sub_id: SubscriptionId,
    sink: mpsc::Sender<SubscriptionNotification>,
) {
    while let Some(event) = events.next().await {
        let payload = match event.payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(subscription_id = %sub_id, error = %e, "Dropping unserializable event");
                continue;
            }
        };

        let notification = SubscriptionNotification::new(sub_id.clone(), payload);
        if sink.send(notification).await.is_err() {
            break;
        }
    }
    debug!(subscription_id = %sub_id, "Forwarder finished");
}

/// Subscribe error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    #[error("too many subscriptions for this connection")]
    TooManySubscriptions,
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
    #[error("event bus is closed")]
    BusClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventPublisher, GatewayEvent, InMemoryEventBus};
    use shared_types::PingPayload;
    use std::time::Duration;
    use tokio::time::timeout;

    fn manager(max: u32) -> (SubscriptionManager, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (SubscriptionManager::new(bus.clone(), max), bus)
    }

    async fn wait_for_detach(bus: &InMemoryEventBus, topic: EventTopic, expected: usize) {
        timeout(Duration::from_secs(1), async {
            while bus.subscriber_count(topic) != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    fn ping(millis: i64) -> GatewayEvent {
        GatewayEvent::Ping(PingPayload::from_millis(millis))
    }

    #[tokio::test]
    async fn test_open_forwards_in_order() {
        let (manager, bus) = manager(10);
        let conn = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(16);

        let sub_id = manager.open(conn, EventTopic::Ping, tx).unwrap();
        assert_eq!(bus.subscriber_count(EventTopic::Ping), 1);

        bus.publish(ping(1)).await;
        bus.publish(ping(2)).await;

        for expected in ["1", "2"] {
            let n = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            assert_eq!(n.method, "subscription");
            assert_eq!(n.params.subscription, sub_id);
            assert_eq!(n.params.result["timestamp"], expected);
        }
    }

    #[tokio::test]
    async fn test_events_before_open_not_delivered() {
        let (manager, bus) = manager(10);
        bus.publish(ping(1)).await;

        let (tx, mut rx) = mpsc::channel(16);
        manager.open(ConnectionId::new(), EventTopic::Ping, tx).unwrap();
        bus.publish(ping(2)).await;

        let n = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(n.params.result["timestamp"], "2");
    }

    #[tokio::test]
    async fn test_unsubscribe_detaches() {
        let (manager, bus) = manager(10);
        let conn = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(16);

        let sub_id = manager.open(conn, EventTopic::NewUser, tx).unwrap();
        assert_eq!(manager.topic_of(&sub_id), Some(EventTopic::NewUser));

        assert!(manager.unsubscribe(&conn, &sub_id));
        assert!(!manager.unsubscribe(&conn, &sub_id));
        assert_eq!(manager.total_subscriptions(), 0);
        wait_for_detach(&bus, EventTopic::NewUser, 0).await;
    }

    #[tokio::test]
    async fn test_unsubscribe_requires_owner() {
        let (manager, _bus) = manager(10);
        let owner = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(16);
        let sub_id = manager.open(owner, EventTopic::Ping, tx).unwrap();

        assert!(!manager.unsubscribe(&ConnectionId::new(), &sub_id));
        assert_eq!(manager.total_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (manager, _bus) = manager(2);
        let conn = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(16);

        manager.open(conn, EventTopic::Ping, tx.clone()).unwrap();
        manager.open(conn, EventTopic::NewUser, tx.clone()).unwrap();

        // Should fail - at limit
        let result = manager.open(conn, EventTopic::LoginSuccess, tx.clone());
        assert_eq!(result, Err(SubscribeError::TooManySubscriptions));

        // Other connections are unaffected
        assert!(manager.open(ConnectionId::new(), EventTopic::Ping, tx).is_ok());
    }

    #[tokio::test]
    async fn test_remove_connection_detaches_only_that_connection() {
        let (manager, bus) = manager(10);
        let gone = ConnectionId::new();
        let stays = ConnectionId::new();
        let (gone_tx, _gone_rx) = mpsc::channel(16);
        let (stays_tx, mut stays_rx) = mpsc::channel(16);

        manager.open(gone, EventTopic::Ping, gone_tx.clone()).unwrap();
        manager.open(gone, EventTopic::NewUser, gone_tx).unwrap();
        manager.open(stays, EventTopic::Ping, stays_tx).unwrap();
        assert_eq!(manager.connection_subscription_count(&gone), 2);

        assert_eq!(manager.remove_connection(&gone), 2);
        assert_eq!(manager.total_subscriptions(), 1);
        assert_eq!(manager.connection_count(), 1);
        wait_for_detach(&bus, EventTopic::Ping, 1).await;
        wait_for_detach(&bus, EventTopic::NewUser, 0).await;

        bus.publish(ping(9)).await;
        let n = timeout(Duration::from_secs(1), stays_rx.recv()).await.unwrap().unwrap();
        assert_eq!(n.params.result["timestamp"], "9");
    }

    #[tokio::test]
    async fn test_closed_bus_rejects_open() {
        let (manager, bus) = manager(10);
        bus.close();
        let (tx, _rx) = mpsc::channel(16);
        let result = manager.open(ConnectionId::new(), EventTopic::Ping, tx);
        assert_eq!(result, Err(SubscribeError::BusClosed));
        assert_eq!(manager.total_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sink_stops_forwarder() {
        let (manager, bus) = manager(10);
        let (tx, rx) = mpsc::channel(16);
        manager.open(ConnectionId::new(), EventTopic::Ping, tx).unwrap();
        drop(rx);

        bus.publish(ping(1)).await;
        wait_for_detach(&bus, EventTopic::Ping, 0).await;
    }
}
