//! The transport engine: a pure routing state machine.
//!
//! The engine performs no I/O and never samples time. Every input (an
//! inbound frame, an outbound packet, a maintenance tick) takes the
//! caller's monotonic clock and returns an ordered batch of
//! [`TransportAction`]s for the host to apply. Multiple engines can coexist
//! in one process; there is no global state.
//!
//! Hosts that initiate links must register the link id as a local
//! destination of type `Link` so the responder's proof is delivered back to
//! them.

use std::collections::HashMap;

use rns_core::announce::Announce;
use rns_core::constants::{DestinationType, HeaderType, MAX_HOPS, PacketType, TransportType};
use rns_core::destination;
use rns_core::error::AnnounceError;
use rns_core::packet::context::ContextType;
use rns_core::packet::wire::RawPacket;
use rns_core::types::{DestinationHash, LinkId, PacketHash, TruncatedHash};
use tracing::{debug, trace, warn};

use crate::action::{DropReason, TransportAction, TransportStats};
use crate::announce_queue::{AnnounceQueue, ByteBudget, QueuedAnnounce};
use crate::decision::{PathDecision, announce_next_hop, decide_path_update};
use crate::dedup::DedupSet;
use crate::iface::{InterfaceId, InterfaceInfo};
use crate::path::{PathEntry, PathTable};
use crate::tables::{PendingLinkEntry, PendingLinkTable, ReverseEntry, ReverseTable};

/// Per-hop allowance for a forwarded link request's proof to come back.
pub const PROOF_TIMEOUT_PER_HOP: f64 = 6.0;

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whether this node forwards traffic and re-floods announces.
    pub transport_enabled: bool,
    /// This node's identity hash; used as the transport id on forwarded
    /// packets. Required for `transport_enabled`.
    pub identity_hash: Option<TruncatedHash>,
}

impl TransportConfig {
    /// A non-routing endpoint configuration.
    pub fn endpoint() -> Self {
        Self {
            transport_enabled: false,
            identity_hash: None,
        }
    }

    /// A routing node configuration.
    pub fn router(identity_hash: TruncatedHash) -> Self {
        Self {
            transport_enabled: true,
            identity_hash: Some(identity_hash),
        }
    }
}

struct IfaceState {
    info: InterfaceInfo,
    announce_budget: ByteBudget,
    forward_budget: ByteBudget,
    announce_queue: AnnounceQueue,
}

/// The pure transport engine. See the module docs for the contract.
pub struct TransportEngine {
    config: TransportConfig,
    interfaces: HashMap<InterfaceId, IfaceState>,
    destinations: HashMap<DestinationHash, DestinationType>,
    path_table: PathTable,
    dedup: DedupSet,
    reverse_table: ReverseTable,
    pending_links: PendingLinkTable,
    stats: TransportStats,
    path_request_dest: DestinationHash,
}

impl TransportEngine {
    pub fn new(config: TransportConfig) -> Self {
        let nh = destination::name_hash("rnstransport", &["path", "request"]);
        Self {
            config,
            interfaces: HashMap::new(),
            destinations: HashMap::new(),
            path_table: PathTable::new(),
            dedup: DedupSet::new(),
            reverse_table: ReverseTable::new(),
            pending_links: PendingLinkTable::new(),
            stats: TransportStats::default(),
            path_request_dest: destination::plain_destination_hash(&nh),
        }
    }

    // ------------------------------------------------------------------ //
    // Registration
    // ------------------------------------------------------------------ //

    pub fn register_interface(&mut self, info: InterfaceInfo, now: f64) {
        debug!(id = info.id.0, name = %info.name, "interface registered");
        let state = IfaceState {
            announce_budget: ByteBudget::announce(info.bitrate_bps, now),
            forward_budget: ByteBudget::forwarding(info.bitrate_bps, now),
            announce_queue: AnnounceQueue::new(),
            info,
        };
        self.interfaces.insert(state.info.id, state);
    }

    /// Remove an interface. Paths, reverse entries and pending links that
    /// reference it are invalidated on the next tick.
    pub fn deregister_interface(&mut self, id: InterfaceId) {
        if self.interfaces.remove(&id).is_some() {
            debug!(id = id.0, "interface deregistered");
        }
    }

    /// Mark an interface up or down without forgetting its state.
    pub fn set_interface_up(&mut self, id: InterfaceId, up: bool) {
        if let Some(state) = self.interfaces.get_mut(&id) {
            state.info.up = up;
        }
    }

    /// Register a local destination. Re-registering the same hash is a no-op.
    pub fn register_destination(&mut self, hash: DestinationHash, dtype: DestinationType) {
        self.destinations.entry(hash).or_insert(dtype);
    }

    pub fn deregister_destination(&mut self, hash: &DestinationHash) {
        self.destinations.remove(hash);
    }

    #[must_use]
    pub fn is_local_destination(&self, hash: &DestinationHash) -> bool {
        self.destinations.contains_key(hash)
    }

    // ------------------------------------------------------------------ //
    // Queries
    // ------------------------------------------------------------------ //

    #[must_use]
    pub fn has_path(&self, dest: &DestinationHash, now: f64) -> bool {
        self.path_table.has_path(dest, now)
    }

    #[must_use]
    pub fn hops_to(&self, dest: &DestinationHash, now: f64) -> u8 {
        self.path_table.hops_to(dest, now)
    }

    #[must_use]
    pub fn next_hop(&self, dest: &DestinationHash, now: f64) -> Option<TruncatedHash> {
        self.path_table.next_hop(dest, now)
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub fn path_table(&self) -> &PathTable {
        &self.path_table
    }

    /// The well-known destination hash path requests are addressed to.
    #[must_use]
    pub fn path_request_destination(&self) -> DestinationHash {
        self.path_request_dest
    }

    // ------------------------------------------------------------------ //
    // Inbound
    // ------------------------------------------------------------------ //

    /// Process one inbound frame from an interface.
    pub fn handle_inbound(&mut self, raw: &[u8], iface: InterfaceId, now: f64) -> Vec<TransportAction> {
        let mut actions = Vec::new();

        if !self.interfaces.contains_key(&iface) {
            warn!(iface = iface.0, "frame from unregistered interface");
            return actions;
        }

        let mut packet = match RawPacket::parse(raw) {
            Ok(p) => p,
            Err(e) => {
                trace!(error = %e, "inbound frame failed to parse");
                actions.push(self.drop(DropReason::MalformedPacket));
                return actions;
            }
        };

        // No access-code layer is configured; flagged frames are malformed.
        if packet.flags.ifac_flag {
            actions.push(self.drop(DropReason::MalformedPacket));
            return actions;
        }

        packet.hops = packet.hops.saturating_add(1);
        if packet.hops > MAX_HOPS {
            actions.push(self.drop(DropReason::HopLimitExceeded));
            return actions;
        }

        let packet_hash = packet.packet_hash();
        // Keepalives and teardowns repeat byte-identically over a link's
        // lifetime; the link layer owns their replay handling.
        let dedup_exempt = matches!(
            packet.context,
            ContextType::Keepalive | ContextType::LinkClose
        );
        if !dedup_exempt {
            if self.dedup.contains(&packet_hash, now) {
                actions.push(self.drop(DropReason::Replay));
                return actions;
            }
            // Proofs for forwarded link requests pass through the
            // pending-link switch twice (request out, proof back);
            // remembering them here would drop the return leg.
            let defer_hash = packet.context == ContextType::Lrproof
                || self
                    .pending_links
                    .contains(&LinkId::new(*packet.destination.as_bytes()));
            if !defer_hash {
                self.dedup.insert(packet_hash, now);
            }
        }

        match packet.flags.packet_type {
            PacketType::Announce => {
                self.process_announce(&packet, iface, now, &mut actions);
            }
            PacketType::Data | PacketType::LinkRequest | PacketType::Proof => {
                self.process_traffic(&packet, packet_hash, iface, now, &mut actions);
            }
        }

        actions
    }

    // ------------------------------------------------------------------ //
    // Outbound
    // ------------------------------------------------------------------ //

    /// Send a locally originated packet.
    ///
    /// With `attached_interface`, the packet goes out on that interface
    /// only (link traffic is pinned to the interface its link lives on).
    /// Otherwise the engine routes by destination: announces and PLAIN
    /// packets broadcast everywhere, addressed traffic follows the path
    /// table. A `Drop { NoPath }` action is the synchronous no-route signal.
    pub fn handle_outbound(
        &mut self,
        raw: &[u8],
        attached_interface: Option<InterfaceId>,
        now: f64,
    ) -> Vec<TransportAction> {
        let mut actions = Vec::new();

        let packet = match RawPacket::parse(raw) {
            Ok(p) => p,
            Err(e) => {
                trace!(error = %e, "outbound packet failed to parse");
                actions.push(self.drop(DropReason::MalformedPacket));
                return actions;
            }
        };

        // Local sends are remembered so our own broadcast does not come
        // back around through another interface.
        self.dedup.insert(packet.packet_hash(), now);

        let is_announce = packet.flags.packet_type == PacketType::Announce;

        if let Some(id) = attached_interface {
            if self.iface_up(id) {
                self.emit(&packet, raw.to_vec(), id, is_announce, now, &mut actions);
            } else {
                actions.push(self.drop(DropReason::NoPath));
            }
            return actions;
        }

        if is_announce || packet.flags.destination_type == DestinationType::Plain {
            let targets: Vec<InterfaceId> = self
                .interfaces
                .values()
                .filter(|s| s.info.up)
                .map(|s| s.info.id)
                .collect();
            for id in targets {
                self.emit(&packet, raw.to_vec(), id, is_announce, now, &mut actions);
            }
            return actions;
        }

        // Addressed traffic: follow the path table.
        let Some(entry) = self
            .path_table
            .get(&packet.destination)
            .filter(|e| !e.is_expired(now))
        else {
            actions.push(self.drop(DropReason::NoPath));
            return actions;
        };
        let (hops, next_hop, out_iface) = (entry.hops, entry.next_hop, entry.receiving_interface);

        if !self.iface_up(out_iface) {
            actions.push(self.drop(DropReason::NoPath));
            return actions;
        }

        let out_raw = if hops > 1 {
            let mut routed = packet.clone();
            routed.flags.header_type = HeaderType::Header2;
            routed.flags.transport_type = TransportType::Transport;
            routed.transport_id = Some(next_hop);
            routed.serialize()
        } else {
            raw.to_vec()
        };

        let routed_packet = RawPacket::parse(&out_raw).expect("engine-built packet parses");
        self.emit(&routed_packet, out_raw, out_iface, false, now, &mut actions);
        actions
    }

    // ------------------------------------------------------------------ //
    // Maintenance
    // ------------------------------------------------------------------ //

    /// Periodic maintenance: expire tables and flush queued announces
    /// within budget.
    pub fn tick(&mut self, now: f64) -> Vec<TransportAction> {
        let mut actions = Vec::new();

        let active: Vec<InterfaceId> = self.interfaces.keys().copied().collect();
        let is_active = |id: InterfaceId| active.contains(&id);

        let removed = self.path_table.cull(now, is_active);
        if removed > 0 {
            debug!(removed, "culled path table entries");
        }
        self.dedup.cull(now);
        self.reverse_table.cull(now, is_active);
        self.pending_links.cull(now, is_active);

        for state in self.interfaces.values_mut() {
            state.announce_queue.cull(now);
            loop {
                let available = state.announce_budget.available(now);
                let Some(queued) = state.announce_queue.pop_within(available) else {
                    break;
                };
                state.announce_budget.try_consume(queued.raw.len(), now);
                trace!(
                    iface = state.info.id.0,
                    dest = %queued.destination,
                    "flushing queued announce"
                );
                actions.push(TransportAction::SendOnInterface {
                    interface: state.info.id,
                    raw: queued.raw,
                });
            }
        }

        actions
    }

    // ------------------------------------------------------------------ //
    // Announce processing
    // ------------------------------------------------------------------ //

    fn process_announce(
        &mut self,
        packet: &RawPacket,
        iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        if packet.flags.destination_type != DestinationType::Single {
            actions.push(self.drop(DropReason::MalformedPacket));
            return;
        }

        let announce = match Announce::from_raw_packet(packet) {
            Ok(a) => a,
            Err(_) => {
                actions.push(self.drop(DropReason::MalformedPacket));
                return;
            }
        };

        if let Err(e) = announce.validate() {
            let reason = match e {
                AnnounceError::HashMismatch => DropReason::HashMismatch,
                _ => DropReason::SignatureInvalid,
            };
            actions.push(self.drop(reason));
            return;
        }

        self.stats.announces_processed += 1;

        // Our own destination flooding back; nothing to learn.
        if self.destinations.contains_key(&packet.destination) {
            return;
        }

        let entry_iface_up = self
            .path_table
            .get(&packet.destination)
            .map(|e| self.iface_up(e.receiving_interface))
            .unwrap_or(false);

        let decision = decide_path_update(
            self.path_table.get(&packet.destination),
            packet.hops,
            &announce.random_hash,
            now,
            entry_iface_up,
        );

        match decision {
            PathDecision::Skip => return,
            PathDecision::TrackBlob => {
                if let Some(entry) = self.path_table.get_mut(&packet.destination) {
                    entry.track_random_blob(announce.random_hash);
                }
            }
            PathDecision::InsertNew | PathDecision::Replace => {
                let mode = match self.interfaces.get(&iface) {
                    Some(s) => s.info.mode,
                    None => return,
                };
                let next_hop = announce_next_hop(packet.transport_id.as_ref(), &packet.destination);

                // Cache a direct-header copy at the current hop count to
                // serve path requests later.
                let direct_raw = direct_copy(packet).serialize();

                let entry = PathEntry::new(
                    now,
                    next_hop,
                    packet.hops,
                    mode,
                    announce.random_hash,
                    iface,
                    packet.packet_hash(),
                    direct_raw,
                );
                self.path_table.insert(packet.destination, entry);
                debug!(
                    dest = %packet.destination,
                    hops = packet.hops,
                    iface = iface.0,
                    "path updated"
                );
                actions.push(TransportAction::PathUpdated {
                    destination: packet.destination,
                    hops: packet.hops,
                });
            }
        }

        if self.config.transport_enabled && packet.hops < MAX_HOPS {
            self.reflood_announce(packet, iface, now, actions);
        }
    }

    /// Re-emit a validated announce on every other eligible interface,
    /// within each interface's announce budget.
    fn reflood_announce(
        &mut self,
        packet: &RawPacket,
        arrival: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        let Some(identity_hash) = self.config.identity_hash else {
            return;
        };

        let mut rebroadcast = packet.clone();
        rebroadcast.flags.header_type = HeaderType::Header2;
        rebroadcast.flags.transport_type = TransportType::Transport;
        rebroadcast.transport_id = Some(identity_hash);
        let raw = rebroadcast.serialize();

        let targets: Vec<InterfaceId> = self
            .interfaces
            .values()
            .filter(|s| s.info.up && s.info.id != arrival)
            .map(|s| s.info.id)
            .collect();

        for id in targets {
            let state = self.interfaces.get_mut(&id).expect("interface exists");
            if state.announce_budget.try_consume(raw.len(), now) {
                self.stats.announces_forwarded += 1;
                actions.push(TransportAction::SendOnInterface {
                    interface: id,
                    raw: raw.clone(),
                });
            } else {
                let accepted = state.announce_queue.push(QueuedAnnounce {
                    destination: packet.destination,
                    raw: raw.clone(),
                    hops: packet.hops,
                    queued_at: now,
                });
                if accepted {
                    self.stats.announces_queued += 1;
                } else {
                    actions.push(self.drop(DropReason::RateLimited));
                }
            }
        }
    }

    // ------------------------------------------------------------------ //
    // Data / link request / proof processing
    // ------------------------------------------------------------------ //

    fn process_traffic(
        &mut self,
        packet: &RawPacket,
        packet_hash: PacketHash,
        iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        if self.destinations.contains_key(&packet.destination) {
            self.stats.delivered += 1;
            actions.push(TransportAction::DeliverLocal {
                destination: packet.destination,
                raw: packet.serialize(),
                packet_hash,
            });
            return;
        }

        if packet.flags.packet_type == PacketType::Data
            && packet.destination == self.path_request_dest
        {
            self.answer_path_request(packet, iface, now, actions);
            return;
        }

        if !self.config.transport_enabled {
            actions.push(self.drop(DropReason::UnknownDestination));
            return;
        }

        // Established or in-progress link switching.
        let link_id = LinkId::new(*packet.destination.as_bytes());
        if self.pending_links.contains(&link_id) {
            self.switch_link_traffic(packet, link_id, iface, now, actions);
            return;
        }

        if packet.flags.packet_type == PacketType::Proof {
            self.route_proof(packet, iface, now, actions);
            return;
        }

        self.forward_packet(packet, packet_hash, iface, now, actions);
    }

    /// Forward a DATA or LINKREQUEST packet toward its destination.
    fn forward_packet(
        &mut self,
        packet: &RawPacket,
        packet_hash: PacketHash,
        iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        // Transported packets name their forwarder; ignore those meant for
        // another node sharing a broadcast medium with us.
        if let Some(tid) = packet.transport_id {
            if Some(tid) != self.config.identity_hash {
                actions.push(self.drop(DropReason::UnknownDestination));
                return;
            }
        }

        let Some(entry) = self
            .path_table
            .get(&packet.destination)
            .filter(|e| !e.is_expired(now))
        else {
            actions.push(self.drop(DropReason::NoPath));
            return;
        };
        let (remaining_hops, next_hop, out_iface) =
            (entry.hops, entry.next_hop, entry.receiving_interface);

        if !self.iface_up(out_iface) {
            actions.push(self.drop(DropReason::NoPath));
            return;
        }

        let mut forwarded = packet.clone();
        if remaining_hops > 1 {
            forwarded.flags.header_type = HeaderType::Header2;
            forwarded.flags.transport_type = TransportType::Transport;
            forwarded.transport_id = Some(next_hop);
        } else {
            // Last hop: the destination itself is listening on this
            // interface, strip the transport header.
            forwarded.flags.header_type = HeaderType::Header1;
            forwarded.flags.transport_type = TransportType::Broadcast;
            forwarded.transport_id = None;
        }
        let raw = forwarded.serialize();

        let state = self.interfaces.get_mut(&out_iface).expect("interface exists");
        if !state.forward_budget.try_consume(raw.len(), now) {
            actions.push(self.drop(DropReason::RateLimited));
            return;
        }

        match packet.flags.packet_type {
            PacketType::LinkRequest => {
                let link_id = LinkId::new(*packet_hash.truncated().as_bytes());
                let deadline = now + PROOF_TIMEOUT_PER_HOP * f64::from(remaining_hops.max(1));
                self.pending_links.insert(
                    link_id,
                    PendingLinkEntry {
                        timestamp: now,
                        next_hop,
                        next_hop_interface: out_iface,
                        received_interface: iface,
                        destination: packet.destination,
                        remaining_hops,
                        validated: false,
                        proof_deadline: deadline,
                    },
                );
                trace!(%link_id, "pending link recorded");
            }
            PacketType::Data => {
                self.reverse_table.insert(
                    packet_hash.truncated(),
                    ReverseEntry {
                        receiving_interface: iface,
                        outbound_interface: out_iface,
                        timestamp: now,
                    },
                );
            }
            _ => {}
        }

        self.stats.forwarded += 1;
        actions.push(TransportAction::SendOnInterface {
            interface: out_iface,
            raw,
        });
    }

    /// Switch traffic belonging to a link this node forwarded the request
    /// for. The proof validates the entry; later traffic flows both ways.
    fn switch_link_traffic(
        &mut self,
        packet: &RawPacket,
        link_id: LinkId,
        iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        let Some(entry) = self.pending_links.get_mut(&link_id) else {
            return;
        };

        let out_iface = if packet.context == ContextType::Lrproof && !entry.validated {
            if iface != entry.next_hop_interface {
                // A proof must come from the responder's side.
                actions.push(self.drop(DropReason::UnknownDestination));
                return;
            }
            entry.validated = true;
            entry.received_interface
        } else if iface == entry.received_interface {
            entry.next_hop_interface
        } else {
            entry.received_interface
        };

        if !self.iface_up(out_iface) {
            actions.push(self.drop(DropReason::NoPath));
            return;
        }

        let raw = packet.serialize();
        let state = self.interfaces.get_mut(&out_iface).expect("interface exists");
        if !state.forward_budget.try_consume(raw.len(), now) {
            actions.push(self.drop(DropReason::RateLimited));
            return;
        }

        self.stats.forwarded += 1;
        actions.push(TransportAction::SendOnInterface {
            interface: out_iface,
            raw,
        });
    }

    /// Route a proof back toward the origin of the packet it proves.
    fn route_proof(
        &mut self,
        packet: &RawPacket,
        _iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        let key = TruncatedHash::new(*packet.destination.as_bytes());
        let Some(entry) = self.reverse_table.take(&key) else {
            actions.push(self.drop(DropReason::NoPath));
            return;
        };

        if !self.iface_up(entry.receiving_interface) {
            actions.push(self.drop(DropReason::NoPath));
            return;
        }

        let raw = packet.serialize();
        let state = self
            .interfaces
            .get_mut(&entry.receiving_interface)
            .expect("interface exists");
        if !state.forward_budget.try_consume(raw.len(), now) {
            actions.push(self.drop(DropReason::RateLimited));
            return;
        }

        self.stats.forwarded += 1;
        actions.push(TransportAction::SendOnInterface {
            interface: entry.receiving_interface,
            raw,
        });
    }

    /// Answer a path request from the cached announce, if we know the path.
    fn answer_path_request(
        &mut self,
        packet: &RawPacket,
        iface: InterfaceId,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        if packet.data.len() < 16 {
            actions.push(self.drop(DropReason::MalformedPacket));
            return;
        }
        let queried = DestinationHash::new(
            packet.data[..16]
                .try_into()
                .expect("slice is exactly 16 bytes"),
        );

        let Some(entry) = self.path_table.get(&queried).filter(|e| !e.is_expired(now)) else {
            // Endpoints stay quiet about unknown paths.
            return;
        };

        let Ok(mut response) = RawPacket::parse(&entry.announce_raw) else {
            return;
        };
        response.context = ContextType::PathResponse;
        let raw = response.serialize();

        if !self.iface_up(iface) {
            return;
        }
        debug!(dest = %queried, iface = iface.0, "answering path request");
        actions.push(TransportAction::SendOnInterface {
            interface: iface,
            raw,
        });
    }

    // ------------------------------------------------------------------ //
    // Helpers
    // ------------------------------------------------------------------ //

    fn drop(&mut self, reason: DropReason) -> TransportAction {
        self.stats.count_drop(reason);
        TransportAction::Drop { reason }
    }

    fn iface_up(&self, id: InterfaceId) -> bool {
        self.interfaces.get(&id).is_some_and(|s| s.info.up)
    }

    /// Emit a packet on an interface, applying the announce budget when the
    /// packet is an announce.
    fn emit(
        &mut self,
        packet: &RawPacket,
        raw: Vec<u8>,
        id: InterfaceId,
        is_announce: bool,
        now: f64,
        actions: &mut Vec<TransportAction>,
    ) {
        let Some(state) = self.interfaces.get_mut(&id) else {
            return;
        };
        if is_announce {
            if state.announce_budget.try_consume(raw.len(), now) {
                actions.push(TransportAction::SendOnInterface { interface: id, raw });
            } else {
                let accepted = state.announce_queue.push(QueuedAnnounce {
                    destination: packet.destination,
                    raw,
                    hops: packet.hops,
                    queued_at: now,
                });
                if accepted {
                    self.stats.announces_queued += 1;
                } else {
                    actions.push(self.drop(DropReason::RateLimited));
                }
            }
        } else {
            actions.push(TransportAction::SendOnInterface { interface: id, raw });
        }
    }
}

/// A direct-header (HEADER_1, broadcast) copy of a packet at its current
/// hop count.
fn direct_copy(packet: &RawPacket) -> RawPacket {
    let mut copy = packet.clone();
    copy.flags.header_type = HeaderType::Header1;
    copy.flags.transport_type = TransportType::Broadcast;
    copy.transport_id = None;
    copy
}
