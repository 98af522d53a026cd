//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the in-memory bus that
//! owns the per-topic subscriber registry.

use crate::events::{EventTopic, GatewayEvent};
use crate::subscriber::{EventSubscriber, Subscription, SubscriptionError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Trait for publishing events to the bus.
///
/// This is the only interface producers use to emit events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of subscriptions attached to the event's topic at the
    /// instant of publication. Zero means the event was discarded.
    async fn publish(&self, event: GatewayEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Holds one `tokio::sync::broadcast` channel per topic. Every subscription
/// owns a receiver, so attaching registers it and dropping it unregisters it.
/// Each receiver has its own ring of `capacity` slots; a slow receiver lags
/// (drops its oldest events) instead of blocking the sender.
pub struct InMemoryEventBus {
    /// Broadcast sender per topic. `None` once the bus has been closed.
    channels: RwLock<Option<HashMap<EventTopic, broadcast::Sender<GatewayEvent>>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Events published while no subscriber was attached.
    events_discarded: AtomicU64,

    /// Per-subscriber queue depth.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified per-subscriber capacity.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let channels = EventTopic::ALL
            .iter()
            .map(|topic| (*topic, broadcast::channel(capacity).0))
            .collect();
        Self {
            channels: RwLock::new(Some(channels)),
            events_published: AtomicU64::new(0),
            events_discarded: AtomicU64::new(0),
            capacity,
        }
    }

    /// Number of subscriptions currently attached to a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: EventTopic) -> usize {
        let Ok(channels) = self.channels.read() else {
            return 0;
        };
        channels
            .as_ref()
            .and_then(|c| c.get(&topic))
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of subscriptions attached across all topics.
    #[must_use]
    pub fn total_subscriber_count(&self) -> usize {
        EventTopic::ALL
            .iter()
            .map(|topic| self.subscriber_count(*topic))
            .sum()
    }

    /// Get the per-subscriber channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events published while nobody was listening.
    #[must_use]
    pub fn events_discarded(&self) -> u64 {
        self.events_discarded.load(Ordering::Relaxed)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.channels.read().map_or(true, |c| c.is_none())
    }

    /// Tear the bus down.
    ///
    /// Drops every topic sender. Attached subscriptions drain what is already
    /// queued and then end; later `subscribe` calls fail with
    /// `SubscriptionError::Closed` and later publishes are discarded.
    ///
    /// Returns the number of subscriptions that were attached.
    pub fn close(&self) -> usize {
        let Ok(mut channels) = self.channels.write() else {
            return 0;
        };
        let Some(senders) = channels.take() else {
            return 0;
        };
        let attached: usize = senders.values().map(broadcast::Sender::receiver_count).sum();
        info!(subscribers = attached, "Event bus closed");
        attached
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, topic: EventTopic) -> Result<Subscription, SubscriptionError> {
        let channels = self.channels.read().map_err(|_| SubscriptionError::Closed)?;
        let sender = channels
            .as_ref()
            .and_then(|c| c.get(&topic))
            .ok_or(SubscriptionError::Closed)?;

        let receiver = sender.subscribe();
        debug!(
            topic = %topic,
            subscribers = sender.receiver_count(),
            "New subscription created"
        );

        Ok(Subscription::new(topic, receiver))
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: GatewayEvent) -> usize {
        let topic = event.topic();
        let source = event.source_subsystem();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        // Clone the sender so no lock is held while sending.
        let sender = match self.channels.read() {
            Ok(channels) => channels.as_ref().and_then(|c| c.get(&topic)).cloned(),
            Err(_) => None,
        };

        let Some(sender) = sender else {
            self.events_discarded.fetch_add(1, Ordering::Relaxed);
            debug!(topic = %topic, source = source, "Event dropped (bus closed)");
            return 0;
        };

        match sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    topic = %topic,
                    source = source,
                    receivers = receiver_count,
                    "Event published"
                );
                receiver_count
            }
            Err(_) => {
                // No receivers - event is discarded, never replayed
                self.events_discarded.fetch_add(1, Ordering::Relaxed);
                trace!(topic = %topic, source = source, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
