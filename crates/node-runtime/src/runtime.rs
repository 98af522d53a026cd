//! # Node Runtime
//!
//! Owns the event bus, credential store, heartbeat task and API server.
//!
//! ## Startup Sequence
//!
//! 1. Create the event bus and credential service
//! 2. Insert seed users (no events are published for them)
//! 3. Start the heartbeat task
//! 4. Bind and start the API server
//!
//! ## Shutdown Sequence
//!
//! 1. Flip the shared `watch` signal: the HTTP server stops accepting,
//!    WebSocket connections send Close
//! 2. Stop the heartbeat through its handle
//! 3. Wait for both tasks (bounded)
//! 4. Close the bus so any remaining subscription stream ends

use crate::container::NodeConfig;
use anyhow::{Context, Result};
use pg_01_credentials::{CredentialService, InMemoryCredentialStore, SecretHasher};
use pg_02_heartbeat::{HeartbeatHandle, PingEmitter};
use pg_03_api_gateway::{ApiGatewayService, GatewayError};
use shared_bus::InMemoryEventBus;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

/// How long shutdown waits for each task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub type Credentials = CredentialService<InMemoryCredentialStore>;

/// The main runtime orchestrating all subsystems.
pub struct NodeRuntime {
    config: NodeConfig,
    bus: Arc<InMemoryEventBus>,
    credentials: Arc<Credentials>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    heartbeat: Option<HeartbeatHandle>,
    gateway: Option<JoinHandle<Result<(), GatewayError>>>,
}

impl NodeRuntime {
    /// Create a runtime. Nothing runs until `start`.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.bus_capacity));
        let hasher =
            SecretHasher::new(config.credentials.cost).context("Failed to build secret hasher")?;
        let credentials = Arc::new(CredentialService::new(
            Arc::new(InMemoryCredentialStore::new()),
            hasher,
            bus.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            bus,
            credentials,
            shutdown_tx,
            shutdown_rx,
            heartbeat: None,
            gateway: None,
        })
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::clone(&self.credentials)
    }

    /// Start everything, binding the configured address.
    ///
    /// Returns the bound address, or `None` when HTTP is disabled.
    pub async fn start(&mut self) -> Result<Option<SocketAddr>> {
        if !self.config.gateway.http.enabled {
            self.start_subsystems().await?;
            info!("HTTP server disabled");
            return Ok(None);
        }

        let addr = self.config.gateway.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        self.start_with_listener(listener).await.map(Some)
    }

    /// Start everything, serving on an already bound listener.
    pub async fn start_with_listener(&mut self, listener: TcpListener) -> Result<SocketAddr> {
        let addr = listener
            .local_addr()
            .context("Listener has no local address")?;

        self.start_subsystems().await?;

        let gateway = ApiGatewayService::new(
            self.config.gateway.clone(),
            self.credentials.clone(),
            self.credentials.clone(),
            self.bus.clone(),
        )
        .context("Failed to create API gateway")?;
        self.gateway = Some(tokio::spawn(
            gateway.serve_on(listener, self.shutdown_rx.clone()),
        ));

        info!(addr = %addr, "Gateway listening");
        Ok(addr)
    }

    async fn start_subsystems(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Pulse Gateway v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let seeded = self
            .credentials
            .seed(&self.config.credentials.seed_users)
            .await
            .context("Failed to insert seed users")?;
        info!(count = seeded.len(), "Seed users created");

        if self.config.heartbeat.enabled {
            let emitter = PingEmitter::new(self.bus.clone(), &self.config.heartbeat)
                .context("Failed to create heartbeat")?;
            self.heartbeat = Some(emitter.spawn());
        } else {
            info!("Heartbeat disabled");
        }

        Ok(())
    }

    /// Resolves when the API server task has exited on its own, with the
    /// reason it exited. Never resolves if no server was started.
    pub async fn stopped(&mut self) -> Result<()> {
        let Some(handle) = self.gateway.as_mut() else {
            return std::future::pending().await;
        };
        let joined = handle.await;
        self.gateway = None;
        gateway_outcome(joined)
    }

    /// Shutdown the runtime gracefully.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        // Signal all tasks to stop
        if self.shutdown_tx.send(true).is_err() {
            warn!("No task was listening for the shutdown signal");
        }

        let mut result = Ok(());

        if let Some(gateway) = self.gateway.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, gateway).await {
                Ok(joined) => {
                    if let Err(e) = gateway_outcome(joined) {
                        error!(error = ?e, "API server failed");
                        result = Err(e);
                    }
                }
                Err(_) => warn!("API server did not stop in time"),
            }
        }

        if let Some(heartbeat) = self.heartbeat.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, heartbeat.shutdown()).await {
                Ok(Ok(ticks)) => info!(ticks, "Heartbeat stopped"),
                Ok(Err(e)) => error!(error = %e, "Heartbeat failed"),
                Err(_) => warn!("Heartbeat did not stop in time"),
            }
        }

        let detached = self.bus.close();
        info!(detached, "Shutdown complete");
        result
    }
}

fn gateway_outcome(joined: Result<Result<(), GatewayError>, JoinError>) -> Result<()> {
    match joined {
        Ok(served) => served.context("API server failed"),
        Err(e) => Err(anyhow::Error::new(e).context("API server task panicked")),
    }
}
