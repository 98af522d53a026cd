//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{EventTopic, GatewayEvent};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,
}

/// Trait for subscribing to events from the bus.
pub trait EventSubscriber: Send + Sync {
    /// Attach a fresh subscription to a topic.
    ///
    /// The subscription sees only events published after this call returns.
    fn subscribe(&self, topic: EventTopic) -> Result<Subscription, SubscriptionError>;
}

/// A subscription handle for receiving events.
///
/// Dropping the handle detaches it from the bus.
pub struct Subscription {
    /// Topic this subscription is attached to.
    topic: EventTopic,

    /// The broadcast receiver.
    receiver: broadcast::Receiver<GatewayEvent>,

    /// Events lost to lag so far.
    lagged: u64,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(topic: EventTopic, receiver: broadcast::Receiver<GatewayEvent>) -> Self {
        Self {
            topic,
            receiver,
            lagged: 0,
        }
    }

    /// Receive the next event.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next event on this topic
    /// - `None` - The bus was closed and the queue is drained
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.lagged += count;
                    warn!(
                        topic = %self.topic,
                        lagged = count,
                        "Subscriber lagged, oldest events dropped"
                    );
                }
            }
        }
    }

    /// Try to receive the next event without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The bus was closed and the queue is drained
    pub fn try_recv(&mut self) -> Result<Option<GatewayEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.lagged += count;
                }
            }
        }
    }

    /// Get the topic of this subscription.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.topic
    }

    /// Total events this subscriber has lost to lag.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Convert into a `Stream` of events.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream::new(self)
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators. The
/// stream is infinite until the bus closes; dropping it detaches.
pub struct EventStream {
    topic: EventTopic,
    inner: BroadcastStream<GatewayEvent>,
}

impl EventStream {
    /// Create a new event stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self {
            topic: subscription.topic,
            inner: BroadcastStream::new(subscription.receiver),
        }
    }

    /// Get the topic for this stream.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        self.topic
    }
}

impl Stream for EventStream {
    type Item = GatewayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    warn!(topic = %self.topic, lagged = count, "Stream lagged, oldest events dropped");
                }
                Poll::Ready(None) => {
                    debug!(topic = %self.topic, "Event stream ended");
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
