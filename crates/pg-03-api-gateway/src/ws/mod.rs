//! WebSocket subscriptions to bus topics.

pub mod handler;
pub mod subscriptions;

pub use handler::WebSocketHandler;
pub use subscriptions::{
    SubscribeError, SubscriptionId, SubscriptionManager, SubscriptionNotification,
};
