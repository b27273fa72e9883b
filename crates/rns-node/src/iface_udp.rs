//! UDP interface driver.
//!
//! UDP datagrams are atomic, so no framing layer is needed: one datagram is
//! one engine frame. A reader task feeds inbound frames into the driver
//! queue; a writer task drains an outbound channel into the socket.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rns_transport::InterfaceId;

use crate::config::InterfaceEntry;
use crate::driver::NodeEvent;
use crate::error::NodeError;

/// Receive buffer size; anything larger than the MTU is discarded anyway.
const RECV_BUFFER: usize = 2048;

/// Outbound channel depth per interface.
const WRITER_QUEUE: usize = 256;

/// A running UDP interface: its writer handle and background tasks.
pub struct UdpInterface {
    pub id: InterfaceId,
    pub name: String,
    writer_tx: mpsc::Sender<Vec<u8>>,
    tasks: Vec<JoinHandle<()>>,
}

impl UdpInterface {
    /// Bind the socket and spawn the reader and writer tasks.
    pub async fn spawn(
        id: InterfaceId,
        entry: &InterfaceEntry,
        events: mpsc::Sender<NodeEvent>,
    ) -> Result<Self, NodeError> {
        let socket = UdpSocket::bind(entry.bind)
            .await
            .map_err(|e| NodeError::Interface(format!("bind {}: {e}", entry.bind)))?;
        let socket = Arc::new(socket);
        info!(name = %entry.name, bind = %entry.bind, "udp interface up");

        let mut tasks = Vec::with_capacity(2);

        // Reader: datagrams to driver events.
        {
            let socket = Arc::clone(&socket);
            let name = entry.name.clone();
            tasks.push(tokio::spawn(async move {
                let mut buf = [0u8; RECV_BUFFER];
                loop {
                    match socket.recv_from(&mut buf).await {
                        Ok((len, _from)) => {
                            let frame = buf[..len].to_vec();
                            if events
                                .send(NodeEvent::Inbound { iface: id, frame })
                                .await
                                .is_err()
                            {
                                debug!(name = %name, "driver gone, reader exiting");
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(name = %name, error = %e, "udp receive failed");
                        }
                    }
                }
            }));
        }

        // Writer: outbound frames to the peer address.
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(WRITER_QUEUE);
        {
            let socket = Arc::clone(&socket);
            let target = entry.target;
            let name = entry.name.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(frame) = writer_rx.recv().await {
                    let Some(target) = target else {
                        debug!(name = %name, "no target address, frame dropped");
                        continue;
                    };
                    if let Err(e) = socket.send_to(&frame, target).await {
                        warn!(name = %name, error = %e, "udp send failed");
                    }
                }
            }));
        }

        Ok(Self {
            id,
            name: entry.name.clone(),
            writer_tx,
            tasks,
        })
    }

    /// The sending side the driver dispatches `SendOnInterface` actions to.
    pub fn writer(&self) -> mpsc::Sender<Vec<u8>> {
        self.writer_tx.clone()
    }

    /// Stop the background tasks.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
