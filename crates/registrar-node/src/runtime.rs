//! # Registrar Node Runtime
//!
//! Hosts one in-memory registry, serves the withdraw relay in front of it
//! and follows the registry's event feed into the logs and metrics.
//!
//! ## Startup Sequence
//!
//! 1. Restore the snapshot, if one is configured and present
//! 2. Bind the relay listener
//! 3. Spawn the feed logger (replaying history first) and the relay
//!
//! ## Shutdown Sequence
//!
//! 1. Signal every task
//! 2. Wait for the tasks, bounded by [`SHUTDOWN_GRACE`]
//! 3. Write the snapshot, if configured

use crate::config::NodeConfig;
use dr_01_registry::prelude::*;
use dr_02_withdraw_relay::prelude::{RelayError, WithdrawRelay};
use registrar_telemetry::{DOMAINS, LAST_EVENT_SEQUENCE, PRICE_CHANGES, REGISTRATIONS};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long shutdown waits for each task.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors raised while running the node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration rejected.
    #[error("configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
    /// Registry could not be created.
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    /// Snapshot could not be read, decoded or written.
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Relay could not be created.
    #[error("relay: {0}")]
    Relay(#[from] RelayError),
    /// Filesystem or socket failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// The running node.
pub struct RegistrarNode {
    config: NodeConfig,
    registry: Arc<InMemoryRegistry>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    relay_addr: Option<SocketAddr>,
}

impl RegistrarNode {
    /// Create the node, restoring state from the configured snapshot.
    ///
    /// # Errors
    ///
    /// `Config` when validation fails, `Snapshot`/`Io` when a present
    /// snapshot cannot be restored.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        info!("Creating registrar node");

        let oracle = Arc::new(FixedRateOracle::new(config.registry.initial_rate));
        let token = Arc::new(InMemoryStablecoin::new(IN_MEMORY_REGISTRY_ACCOUNT));
        let vault = Arc::new(InMemoryNativeVault::new());

        let snapshot = match &config.snapshot_path {
            Some(path) if path.exists() => Some(load_snapshot(path, config.migration_rate)?),
            _ => None,
        };

        let registry = match snapshot {
            Some(snapshot) => {
                if snapshot.administrator != config.registry.administrator {
                    warn!(
                        configured = %config.registry.administrator,
                        restored = %snapshot.administrator,
                        "Snapshot administrator differs from configuration; keeping the snapshot's"
                    );
                }
                if let Some(owed) = snapshot.native_ledger.outstanding() {
                    vault.deposit_custody(owed);
                }
                if let Some(owed) = snapshot.stable_ledger.outstanding() {
                    token.mint(token.registry(), owed);
                }
                DomainRegistryService::from_snapshot(
                    snapshot,
                    config.registry.event_bus_capacity,
                    oracle,
                    token,
                    vault,
                )?
            }
            None => DomainRegistryService::new(&config.registry, oracle, token, vault)?,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            config,
            registry: Arc::new(registry),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
            relay_addr: None,
        })
    }

    /// The hosted registry.
    #[must_use]
    pub fn registry(&self) -> Arc<InMemoryRegistry> {
        Arc::clone(&self.registry)
    }

    /// Address the relay is listening on, once started.
    #[must_use]
    pub fn relay_addr(&self) -> Option<SocketAddr> {
        self.relay_addr
    }

    /// Bind the relay and spawn the background tasks.
    ///
    /// # Errors
    ///
    /// `Relay` or `Io` when the relay cannot be created or bound.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        info!("===========================================");
        info!("  Domain Registrar Node v{}", crate::VERSION);
        info!("===========================================");

        let relay = WithdrawRelay::new(self.config.relay.clone(), self.registry())?;
        let listener = TcpListener::bind(self.config.relay.bind_addr()).await?;
        self.relay_addr = Some(listener.local_addr()?);

        let feed = self.registry.open_feed(EventFilter::all(), 0).await;
        let feed_shutdown = self.shutdown_rx.clone();
        self.tasks.push((
            "feed-logger",
            tokio::spawn(follow_feed(feed, feed_shutdown)),
        ));

        let mut relay_shutdown = self.shutdown_rx.clone();
        self.tasks.push((
            "withdraw-relay",
            tokio::spawn(async move {
                let signal = async move {
                    let _ = relay_shutdown.changed().await;
                };
                if let Err(e) = relay.serve(listener, signal).await {
                    error!(error = %e, "Withdraw relay failed");
                }
            }),
        ));

        info!(
            administrator = %self.registry.administrator().await,
            relay = ?self.relay_addr,
            "Registrar node started"
        );
        Ok(())
    }

    /// Stop the tasks and persist the snapshot.
    ///
    /// # Errors
    ///
    /// `Snapshot` or `Io` when the snapshot cannot be written.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        info!("Initiating graceful shutdown...");

        if self.shutdown_tx.send(true).is_err() {
            warn!("No task was listening for shutdown");
        }
        for (name, handle) in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => info!(task = name, "Task stopped"),
                Ok(Err(e)) => error!(task = name, error = %e, "Task panicked"),
                Err(_) => warn!(task = name, "Task did not stop in time"),
            }
        }

        if let Some(path) = &self.config.snapshot_path {
            let json = self.registry.snapshot().await.to_json()?;
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), "Snapshot written");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

fn load_snapshot(
    path: &Path,
    migration_rate: ConversionRate,
) -> Result<RegistrySnapshot, NodeError> {
    let json = std::fs::read_to_string(path)?;
    let snapshot = decode_snapshot(&json, migration_rate)?;
    info!(
        path = %path.display(),
        domains = snapshot.domains.len(),
        events = snapshot.events.len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}

/// Log every committed event and keep the registry gauges current.
async fn follow_feed(mut feed: RegistryFeed, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            next = feed.next() => match next {
                Ok(record) => observe(&record),
                Err(e) => {
                    warn!(error = %e, "Registry feed ended");
                    break;
                }
            },
            _ = shutdown.changed() => {
                info!("Feed logger stopping");
                break;
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn observe(record: &EventRecord) {
    LAST_EVENT_SEQUENCE.set(record.sequence as f64);
    match &record.event {
        RegistryEvent::DomainRegistered {
            registrant,
            owner,
            domain,
            child_price_stable,
        } => {
            REGISTRATIONS.inc();
            DOMAINS.inc();
            info!(
                sequence = record.sequence,
                committed_at = record.committed_at,
                domain = %domain,
                owner = %owner,
                registrant = %registrant,
                child_price = %child_price_stable,
                "DomainRegistered"
            );
        }
        RegistryEvent::PriceChanged {
            new_price,
            old_price,
        } => {
            PRICE_CHANGES.inc();
            info!(
                sequence = record.sequence,
                committed_at = record.committed_at,
                old_price = %old_price,
                new_price = %new_price,
                "PriceChanged"
            );
        }
    }
}
