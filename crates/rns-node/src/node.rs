//! Node assembly: configuration to running tasks.
//!
//! Three logical roles, as the embedding model prescribes: interface
//! readers feed the event queue, a timer ticks it, and one driver task
//! owns the engines and applies their action batches.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rns_core::destination::Destination;
use rns_core::ratchet::RatchetStore;
use rns_core::types::TruncatedHash;
use rns_transport::{InterfaceId, InterfaceInfo, TransportConfig, TransportEngine};

use crate::clock::MonotonicClock;
use crate::config::NodeConfig;
use crate::driver::{Driver, EVENT_QUEUE, NodeEvent};
use crate::error::NodeError;
use crate::iface_udp::UdpInterface;
use crate::sessions::{LocalDestination, SessionRegistry};
use crate::storage::Storage;

/// Interval between maintenance ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Handle for requesting shutdown from signal handlers.
#[derive(Clone)]
pub struct ShutdownHandle {
    events_tx: mpsc::Sender<NodeEvent>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.events_tx.try_send(NodeEvent::Shutdown);
    }
}

/// A configured node and its running tasks.
pub struct Node {
    config: NodeConfig,
    events_tx: Option<mpsc::Sender<NodeEvent>>,
    driver_task: Option<JoinHandle<Driver>>,
    timer_task: Option<JoinHandle<()>>,
    interfaces: Vec<UdpInterface>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            events_tx: None,
            driver_task: None,
            timer_task: None,
            interfaces: Vec::new(),
        }
    }

    fn storage_dir(&self) -> PathBuf {
        match &self.config.node.storage_path {
            Some(path) => PathBuf::from(path),
            None => dirs_home().join(".rns"),
        }
    }

    /// Bring the node up: identity, engine, interfaces, driver, timer.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        let storage = Storage::new(self.storage_dir());
        storage.ensure_dir().await?;
        let identity = storage.load_or_create_identity().await?;
        let known = storage.load_known_destinations().await?;
        let clock = MonotonicClock::new();
        let now = clock.now();

        let transport_config = if self.config.node.enable_transport {
            info!("transport enabled, this node will route");
            TransportConfig::router(TruncatedHash::new(*identity.hash().as_bytes()))
        } else {
            TransportConfig::endpoint()
        };
        let mut engine = TransportEngine::new(transport_config);

        // Local destinations from config.
        let mut locals = HashMap::new();
        for entry in &self.config.destinations {
            let aspects: Vec<&str> = entry.aspects.iter().map(String::as_str).collect();
            let destination = Destination::single(*identity.hash(), &entry.app_name, &aspects);
            info!(
                dest = %destination.hash(),
                name = %entry.app_name,
                "destination registered"
            );
            engine.register_destination(*destination.hash(), destination.dtype);
            locals.insert(
                *destination.hash(),
                LocalDestination {
                    destination,
                    accept_links: entry.accept_links,
                    app_data: entry.app_data.as_ref().map(|d| d.as_bytes().to_vec()),
                    ratchets: entry.ratchets.then(|| RatchetStore::new(now)),
                },
            );
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

        // Interfaces from config.
        let mut driver = Driver::new(
            engine,
            SessionRegistry::new(rns_core::constants::MTU),
            locals,
            known,
            identity,
            clock,
            self.config.node.announce_interval as f64,
        );

        for (index, entry) in self.config.interfaces.iter().enumerate() {
            if entry.kind != "udp" {
                warn!(kind = %entry.kind, "unsupported interface kind, skipped");
                continue;
            }
            let id = InterfaceId(index as u64 + 1);
            let iface = UdpInterface::spawn(id, entry, events_tx.clone()).await?;

            let info = InterfaceInfo {
                id,
                name: entry.name.clone(),
                bitrate_bps: entry.bitrate,
                mtu: rns_core::constants::MTU,
                mode: entry.interface_mode()?,
                up: true,
            };
            driver.register_interface(info);
            driver.attach_writer(id, iface.writer());
            self.interfaces.push(iface);
        }

        // First announce round before the loop starts.
        driver.announce_all(0.0);

        // Timer role.
        let timer_tx = events_tx.clone();
        self.timer_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                if timer_tx.send(NodeEvent::Tick).await.is_err() {
                    return;
                }
            }
        }));

        self.driver_task = Some(tokio::spawn(driver.run(events_rx)));
        self.events_tx = Some(events_tx);
        Ok(())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            events_tx: self
                .events_tx
                .clone()
                .expect("node must be started before taking a shutdown handle"),
        }
    }

    /// Wait for the driver to stop.
    pub async fn run(&mut self) {
        if let Some(task) = self.driver_task.take() {
            match task.await {
                Ok(_driver) => {}
                Err(e) => warn!(error = %e, "driver task failed"),
            }
        }
    }

    /// Stop timers and interfaces.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.try_send(NodeEvent::Shutdown);
        }
        if let Some(timer) = self.timer_task.take() {
            timer.abort();
        }
        for iface in &self.interfaces {
            iface.shutdown();
        }
        info!("node shut down");
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
