//! # Ping Emitter
//!
//! One background task; one publish per tick; the only state carried
//! between ticks is the last timestamp, used to keep values increasing.

use crate::config::HeartbeatConfig;
use crate::error::HeartbeatError;
use shared_bus::{EventPublisher, GatewayEvent};
use shared_types::PingPayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, trace};

/// Source of "now" in milliseconds since the Unix epoch.
pub type Clock = fn() -> i64;

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Next timestamp to publish: `now`, unless that would not advance past the
/// previous one.
fn next_timestamp(last: Option<i64>, now: i64) -> i64 {
    match last {
        Some(last) if now <= last => last.saturating_add(1),
        _ => now,
    }
}

/// Publishes `GatewayEvent::Ping` on a fixed period.
pub struct PingEmitter {
    publisher: Arc<dyn EventPublisher>,
    interval: Duration,
    clock: Clock,
}

impl PingEmitter {
    /// Create an emitter publishing through `publisher`.
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        config: &HeartbeatConfig,
    ) -> Result<Self, HeartbeatError> {
        config.validate()?;
        Ok(Self {
            publisher,
            interval: config.interval,
            clock: wall_clock,
        })
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    ///
    /// Returns the number of pings published.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        // A stalled runtime must not cause a burst of catch-up pings.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last = None;
        let mut ticks = 0u64;

        info!(interval = ?self.interval, "Heartbeat started");

        if !*shutdown.borrow() {
            loop {
                tokio::select! {
                    biased;

                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let millis = next_timestamp(last, (self.clock)());
                        last = Some(millis);

                        let receivers = self
                            .publisher
                            .publish(GatewayEvent::Ping(PingPayload::from_millis(millis)))
                            .await;
                        ticks += 1;
                        trace!(timestamp = millis, receivers, "Ping published");
                    }
                }
            }
        }

        info!(ticks, "Heartbeat stopped");
        ticks
    }

    /// Spawn on the current runtime with a private shutdown signal.
    pub fn spawn(self) -> HeartbeatHandle {
        let (shutdown, rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx));
        HeartbeatHandle { shutdown, join }
    }
}

/// Handle to a spawned emitter. Dropping it also stops the task.
pub struct HeartbeatHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl HeartbeatHandle {
    /// Signal the task and wait for it. Returns the number of pings sent.
    pub async fn shutdown(self) -> Result<u64, HeartbeatError> {
        // Err only if the task already exited.
        let _ = self.shutdown.send(true);
        self.join
            .await
            .map_err(|e| HeartbeatError::TaskFailed(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
