//! The driver: single owner of all engine state.
//!
//! One task owns the transport engine and the session registry. Everything
//! reaches it through one multi-producer event queue (interface readers,
//! the timer, and local senders) and every action batch the engines
//! return is applied in order before the next event is taken. This is the
//! only place engine tables are mutated.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use rns_core::announce::{Announce, make_random_hash};
use rns_core::identity::Identity;
use rns_core::packet::wire::RawPacket;
use rns_core::types::DestinationHash;
use rns_transport::{InterfaceId, TransportAction, TransportEngine};

use crate::clock::{MonotonicClock, unix_now};
use crate::sessions::{LocalDestination, SessionEvent, SessionOutput, SessionRegistry};
use crate::storage::KnownDestination;

/// Queue depth of the driver event channel.
pub const EVENT_QUEUE: usize = 1024;

/// An event submitted to the driver.
#[derive(Debug)]
pub enum NodeEvent {
    /// A framed datagram arrived on an interface.
    Inbound { iface: InterfaceId, frame: Vec<u8> },
    /// A locally originated packet to route out.
    Outbound {
        raw: Vec<u8>,
        attached: Option<InterfaceId>,
    },
    /// Periodic maintenance.
    Tick,
    /// Stop the driver loop.
    Shutdown,
}

/// The single-threaded engine owner.
pub struct Driver {
    engine: TransportEngine,
    sessions: SessionRegistry,
    locals: HashMap<DestinationHash, LocalDestination>,
    known: HashMap<DestinationHash, KnownDestination>,
    identity: Identity,
    clock: MonotonicClock,
    writers: HashMap<InterfaceId, mpsc::Sender<Vec<u8>>>,
    announce_interval: f64,
    last_announce: f64,
    pending_events: Vec<SessionEvent>,
}

impl Driver {
    pub fn new(
        engine: TransportEngine,
        sessions: SessionRegistry,
        locals: HashMap<DestinationHash, LocalDestination>,
        known: HashMap<DestinationHash, KnownDestination>,
        identity: Identity,
        clock: MonotonicClock,
        announce_interval: f64,
    ) -> Self {
        Self {
            engine,
            sessions,
            locals,
            known,
            identity,
            clock,
            writers: HashMap::new(),
            announce_interval,
            last_announce: f64::NEG_INFINITY,
            pending_events: Vec::new(),
        }
    }

    /// Attach the writer side of an interface.
    pub fn attach_writer(&mut self, iface: InterfaceId, writer: mpsc::Sender<Vec<u8>>) {
        self.writers.insert(iface, writer);
    }

    /// Register an interface's capability record with the engine.
    pub fn register_interface(&mut self, info: rns_transport::InterfaceInfo) {
        let now = self.clock.now();
        self.engine.register_interface(info, now);
    }

    pub fn engine(&self) -> &TransportEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn known_destinations(&self) -> &HashMap<DestinationHash, KnownDestination> {
        &self.known
    }

    /// Drain session events accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Open a link to a destination previously learned from an announce.
    /// Returns `None` when neither keys nor a path are known.
    pub fn initiate_link(&mut self, destination: DestinationHash) -> Option<rns_core::types::LinkId> {
        let now = self.clock.now();
        let known = self.known.get(&destination)?;
        let x25519 = rns_crypto::x25519::X25519PublicKey::from_bytes(
            known.public_key[..32]
                .try_into()
                .expect("slice is exactly 32 bytes"),
        );
        let ratchet = known.ratchet.map(|bytes| {
            let key = rns_crypto::x25519::X25519PublicKey::from_bytes(bytes);
            (rns_core::ratchet::ratchet_id(&key), key)
        });
        let hops = self.engine.hops_to(&destination, now);
        let iface = self.engine.path_table().next_hop_interface(&destination, now);

        let mut out = SessionOutput::default();
        let link_id = self
            .sessions
            .initiate_link(destination, x25519, ratchet, hops, iface, now, &mut out);
        self.apply_session_output(out, now);
        Some(link_id)
    }

    /// Send a datagram over an active link.
    pub fn send_link_data(
        &mut self,
        link_id: &rns_core::types::LinkId,
        data: &[u8],
    ) -> Result<(), rns_protocol::LinkError> {
        let now = self.clock.now();
        let mut out = SessionOutput::default();
        self.sessions.send_data(link_id, data, now, &mut out)?;
        self.apply_session_output(out, now);
        Ok(())
    }

    /// Send a bulk payload over an active link as a resource.
    pub fn send_resource(
        &mut self,
        link_id: &rns_core::types::LinkId,
        data: &[u8],
    ) -> Result<[u8; 16], rns_protocol::ResourceError> {
        let now = self.clock.now();
        let resource_id = rns_crypto::sha::truncated_hash(data);
        let mut out = SessionOutput::default();
        self.sessions
            .send_resource(link_id, resource_id, data, now, &mut out)?;
        self.apply_session_output(out, now);
        Ok(resource_id)
    }

    /// Run until shutdown. Consumes events in arrival order; each event's
    /// action batch is fully applied before the next event.
    pub async fn run(mut self, mut events: mpsc::Receiver<NodeEvent>) -> Self {
        info!("driver running");
        while let Some(event) = events.recv().await {
            match event {
                NodeEvent::Inbound { iface, frame } => self.on_inbound(iface, &frame),
                NodeEvent::Outbound { raw, attached } => self.on_outbound(&raw, attached),
                NodeEvent::Tick => self.on_tick(),
                NodeEvent::Shutdown => break,
            }
        }
        info!("driver stopped");
        self
    }

    pub fn on_inbound(&mut self, iface: InterfaceId, frame: &[u8]) {
        let now = self.clock.now();
        let actions = self.engine.handle_inbound(frame, iface, now);
        self.apply_actions(actions, Some(iface), now);
    }

    pub fn on_outbound(&mut self, raw: &[u8], attached: Option<InterfaceId>) {
        let now = self.clock.now();
        let actions = self.engine.handle_outbound(raw, attached, now);
        self.apply_actions(actions, None, now);
    }

    pub fn on_tick(&mut self) {
        let now = self.clock.now();

        let actions = self.engine.tick(now);
        self.apply_actions(actions, None, now);

        let mut out = SessionOutput::default();
        self.sessions.tick(now, &mut out);
        self.apply_session_output(out, now);

        self.rotate_ratchets(now);

        if self.announce_interval > 0.0 && now - self.last_announce >= self.announce_interval {
            self.last_announce = now;
            self.announce_all(now);
        }
    }

    /// Announce every configured destination.
    pub fn announce_all(&mut self, now: f64) {
        let mut packets = Vec::with_capacity(self.locals.len());
        for local in self.locals.values() {
            let ratchet = local
                .ratchets
                .as_ref()
                .map(|r| r.current_public().to_bytes());
            let announce = match Announce::create(
                &self.identity,
                *local.destination.name_hash(),
                *local.destination.hash(),
                make_random_hash(unix_now()),
                ratchet,
                local.app_data.as_deref(),
            ) {
                Ok(a) => a,
                Err(e) => {
                    warn!(error = %e, "failed to build announce");
                    continue;
                }
            };
            packets.push(announce.to_raw_packet().serialize());
        }
        for raw in packets {
            let actions = self.engine.handle_outbound(&raw, None, now);
            self.apply_actions(actions, None, now);
        }
    }

    fn rotate_ratchets(&mut self, now: f64) {
        for local in self.locals.values_mut() {
            if let Some(ratchets) = local.ratchets.as_mut() {
                if ratchets.should_rotate(now) {
                    ratchets.rotate(now);
                    debug!(dest = %local.destination.hash(), "ratchet rotated");
                }
            }
        }
    }

    fn apply_actions(&mut self, actions: Vec<TransportAction>, iface: Option<InterfaceId>, now: f64) {
        for action in actions {
            match action {
                TransportAction::SendOnInterface { interface, raw } => {
                    self.dispatch(interface, raw);
                }
                TransportAction::DeliverLocal {
                    destination, raw, ..
                } => {
                    trace!(dest = %destination, "local delivery");
                    let Ok(packet) = RawPacket::parse(&raw) else {
                        continue;
                    };
                    let delivery_iface = iface.unwrap_or(InterfaceId(0));
                    let mut out = SessionOutput::default();
                    self.sessions.handle_delivery(
                        &packet,
                        delivery_iface,
                        &self.locals,
                        &self.identity,
                        now,
                        &mut out,
                    );
                    self.apply_session_output(out, now);
                }
                TransportAction::PathUpdated { destination, hops } => {
                    debug!(dest = %destination, hops, "path updated");
                    self.remember_destination(destination);
                }
                TransportAction::Drop { reason } => {
                    trace!(?reason, "packet dropped");
                }
            }
        }
    }

    fn apply_session_output(&mut self, out: SessionOutput, now: f64) {
        for link_id in out.register_destinations {
            self.engine.register_destination(
                DestinationHash::new(*link_id.as_bytes()),
                rns_core::constants::DestinationType::Link,
            );
        }
        for link_id in out.deregister_destinations {
            self.engine
                .deregister_destination(&DestinationHash::new(*link_id.as_bytes()));
        }
        for outbound in out.outbound {
            let actions = self
                .engine
                .handle_outbound(&outbound.raw, outbound.attached, now);
            self.apply_actions(actions, None, now);
        }
        for event in out.events {
            match &event {
                SessionEvent::LinkEstablished(link_id) => info!(%link_id, "link established"),
                SessionEvent::LinkClosed(link_id) => info!(%link_id, "link closed"),
                SessionEvent::Data(link_id, data) => {
                    info!(%link_id, len = data.len(), "in-link data received");
                }
                SessionEvent::ResourceComplete(link_id, data) => {
                    info!(%link_id, len = data.len(), "resource received");
                }
                SessionEvent::ResourceDelivered(link_id, _) => {
                    info!(%link_id, "resource delivered");
                }
                SessionEvent::PeerIdentified(link_id, peer) => {
                    info!(%link_id, %peer, "peer identified");
                }
            }
            self.pending_events.push(event);
        }
    }

    /// Record the announced keys behind a learned path so links can be
    /// opened later without waiting for another announce.
    fn remember_destination(&mut self, destination: DestinationHash) {
        let Some(entry) = self.engine.path_table().get(&destination) else {
            return;
        };
        let Ok(packet) = RawPacket::parse(&entry.announce_raw) else {
            return;
        };
        let Ok(announce) = Announce::from_raw_packet(&packet) else {
            return;
        };
        self.known.insert(
            destination,
            KnownDestination {
                public_key: announce.public_key,
                last_seen: unix_now(),
                app_data: announce.app_data.clone(),
                ratchet: announce.ratchet,
            },
        );
    }

    fn dispatch(&mut self, iface: InterfaceId, raw: Vec<u8>) {
        let Some(writer) = self.writers.get(&iface) else {
            warn!(iface = iface.0, "no writer for interface, frame dropped");
            return;
        };
        if let Err(e) = writer.try_send(raw) {
            warn!(iface = iface.0, error = %e, "interface writer full, frame dropped");
        }
    }
}
