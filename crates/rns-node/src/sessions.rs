//! Link and resource session registry.
//!
//! The driver owns one registry. It holds every link this node is party to
//! (either role) and the resources transferring over them, resolves the
//! link ↔ resource cycle through stable ids, and turns delivered packets
//! into state transitions plus packets to send back. It performs no I/O
//! and never samples time.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use rns_core::constants::PacketType;
use rns_core::destination::Destination;
use rns_core::identity::Identity;
use rns_core::packet::context::ContextType;
use rns_core::packet::wire::RawPacket;
use rns_core::ratchet::RatchetStore;
use rns_core::types::{DestinationHash, LinkId};
use rns_crypto::x25519::X25519PublicKey;
use rns_protocol::error::{LinkError, ResourceError};
use rns_protocol::link::constants::link_mdu;
use rns_protocol::link::state::link_id_from_request;
use rns_protocol::link::{LinkActive, LinkHandshake, LinkPending, TeardownReason};
use rns_protocol::resource::advertisement::{PartAck, ResourceAdvertisement};
use rns_protocol::resource::transfer::PART_HEADER_LEN;
use rns_protocol::resource::{ResourceReceiver, ResourceSender, ResourceState};

/// A destination this node serves.
pub struct LocalDestination {
    pub destination: Destination,
    pub accept_links: bool,
    pub app_data: Option<Vec<u8>>,
    pub ratchets: Option<RatchetStore>,
}

/// Receiver acks go out every this many newly received parts, matching the
/// sender's initial window so the flow never waits on a timeout.
const ACK_EVERY_PARTS: u32 = 4;

enum LinkPhase {
    Pending(LinkPending),
    Handshake(LinkHandshake),
    Active(LinkActive),
}

struct LinkEntry {
    phase: Option<LinkPhase>,
    /// Interface the link lives on; link traffic is pinned to it.
    iface: Option<rns_transport::InterfaceId>,
    tx_resources: HashMap<[u8; 16], ResourceSender>,
    rx_resources: HashMap<[u8; 16], ResourceReceiver>,
    part_size: usize,
}

impl LinkEntry {
    fn new(phase: LinkPhase, iface: Option<rns_transport::InterfaceId>, mtu: usize) -> Self {
        Self {
            phase: Some(phase),
            iface,
            tx_resources: HashMap::new(),
            rx_resources: HashMap::new(),
            part_size: link_mdu(mtu).saturating_sub(PART_HEADER_LEN).max(1),
        }
    }
}

/// A packet the registry wants sent, with its pinned interface.
pub struct Outbound {
    pub raw: Vec<u8>,
    pub attached: Option<rns_transport::InterfaceId>,
}

/// Something the host should hear about.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LinkEstablished(LinkId),
    LinkClosed(LinkId),
    /// A plain in-link datagram.
    Data(LinkId, Vec<u8>),
    /// A fully received and verified resource payload.
    ResourceComplete(LinkId, Vec<u8>),
    /// A resource this node was sending was confirmed by the peer.
    ResourceDelivered(LinkId, [u8; 16]),
    /// The peer proved a long-term identity over the link.
    PeerIdentified(LinkId, rns_core::types::IdentityHash),
}

/// Everything one registry call produced.
#[derive(Default)]
pub struct SessionOutput {
    pub outbound: Vec<Outbound>,
    pub events: Vec<SessionEvent>,
    /// Link ids the engine must (de)register as local destinations.
    pub register_destinations: Vec<LinkId>,
    pub deregister_destinations: Vec<LinkId>,
}

impl SessionOutput {
    fn push_packet(&mut self, packet: &RawPacket, attached: Option<rns_transport::InterfaceId>) {
        self.outbound.push(Outbound {
            raw: packet.serialize(),
            attached,
        });
    }
}

/// Registry of links and their resources.
pub struct SessionRegistry {
    links: HashMap<LinkId, LinkEntry>,
    mtu: usize,
}

impl SessionRegistry {
    pub fn new(mtu: usize) -> Self {
        Self {
            links: HashMap::new(),
            mtu,
        }
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_link(&self, hash: &DestinationHash) -> bool {
        self.links.contains_key(&LinkId::new(*hash.as_bytes()))
    }

    /// Whether a link has completed its handshake.
    #[must_use]
    pub fn is_active(&self, link_id: &LinkId) -> bool {
        self.links
            .get(link_id)
            .is_some_and(|e| matches!(e.phase, Some(LinkPhase::Active(_))))
    }

    /// Open a link to a remote destination whose keys we know from its
    /// announce. Returns the link id; the request packet lands in `out`.
    pub fn initiate_link(
        &mut self,
        destination: DestinationHash,
        remote_x25519: X25519PublicKey,
        ratchet: Option<(rns_core::types::TruncatedHash, X25519PublicKey)>,
        hops: u8,
        iface: Option<rns_transport::InterfaceId>,
        now: f64,
        out: &mut SessionOutput,
    ) -> LinkId {
        let (pending, request) =
            LinkPending::initiate(destination, remote_x25519, ratchet, hops, now);
        let link_id = pending.link_id;
        self.links.insert(
            link_id,
            LinkEntry::new(LinkPhase::Pending(pending), iface, self.mtu),
        );
        out.register_destinations.push(link_id);
        out.push_packet(&request, iface);
        link_id
    }

    /// Queue a resource for sending over an active link.
    pub fn send_resource(
        &mut self,
        link_id: &LinkId,
        resource_id: [u8; 16],
        data: &[u8],
        now: f64,
        out: &mut SessionOutput,
    ) -> Result<(), ResourceError> {
        let entry = self
            .links
            .get_mut(link_id)
            .ok_or(ResourceError::Link(LinkError::LinkClosed))?;
        let part_size = entry.part_size;
        let Some(LinkPhase::Active(link)) = entry.phase.as_mut() else {
            return Err(ResourceError::Link(LinkError::LinkClosed));
        };

        let (sender, advertisement) =
            ResourceSender::new(data, resource_id, part_size, link.rtt(), now)?;
        let packet = link.data_packet(&advertisement.to_msgpack(), ContextType::ResourceAdv, now);
        entry.tx_resources.insert(resource_id, sender);
        out.push_packet(&packet, entry.iface);
        Ok(())
    }

    /// Queue a small datagram over an active link.
    pub fn send_data(
        &mut self,
        link_id: &LinkId,
        data: &[u8],
        now: f64,
        out: &mut SessionOutput,
    ) -> Result<(), LinkError> {
        let entry = self.links.get_mut(link_id).ok_or(LinkError::LinkClosed)?;
        let Some(LinkPhase::Active(link)) = entry.phase.as_mut() else {
            return Err(LinkError::LinkClosed);
        };
        let packet = link.data_packet(data, ContextType::None, now);
        out.push_packet(&packet, entry.iface);
        Ok(())
    }

    /// Handle a `DeliverLocal` packet from the engine.
    pub fn handle_delivery(
        &mut self,
        packet: &RawPacket,
        iface: rns_transport::InterfaceId,
        locals: &HashMap<DestinationHash, LocalDestination>,
        identity: &Identity,
        now: f64,
        out: &mut SessionOutput,
    ) {
        // New link request for one of our destinations.
        if packet.flags.packet_type == PacketType::LinkRequest {
            self.accept_link_request(packet, iface, locals, identity, now, out);
            return;
        }

        let link_id = LinkId::new(*packet.destination.as_bytes());
        if self.links.contains_key(&link_id) {
            self.handle_link_packet(link_id, packet, iface, identity, now, out);
        }
    }

    fn accept_link_request(
        &mut self,
        packet: &RawPacket,
        iface: rns_transport::InterfaceId,
        locals: &HashMap<DestinationHash, LocalDestination>,
        identity: &Identity,
        now: f64,
        out: &mut SessionOutput,
    ) {
        let Some(local) = locals.get(&packet.destination) else {
            return;
        };
        if !local.accept_links {
            debug!(dest = %packet.destination, "link request refused by policy");
            return;
        }

        match LinkHandshake::respond(packet, identity, local.ratchets.as_ref(), now) {
            Ok((handshake, proof)) => {
                let link_id = handshake.link_id;
                self.links.insert(
                    link_id,
                    LinkEntry::new(LinkPhase::Handshake(handshake), Some(iface), self.mtu),
                );
                out.register_destinations.push(link_id);
                out.push_packet(&proof, Some(iface));
            }
            Err(e) => {
                debug!(dest = %packet.destination, error = %e, "link request rejected");
            }
        }
    }

    fn handle_link_packet(
        &mut self,
        link_id: LinkId,
        packet: &RawPacket,
        iface: rns_transport::InterfaceId,
        identity: &Identity,
        now: f64,
        out: &mut SessionOutput,
    ) {
        let entry = self.links.get_mut(&link_id).expect("caller checked presence");
        entry.iface.get_or_insert(iface);

        match (packet.context, entry.phase.take()) {
            // Responder's proof reaches the initiator.
            (ContextType::Lrproof, Some(LinkPhase::Pending(pending))) => {
                match pending.process_proof(&packet.data, now) {
                    Ok((mut link, own_proof)) => {
                        out.push_packet(&own_proof, entry.iface);
                        // Share the measured RTT so keepalive cadence agrees.
                        let rtt_packet = link.rtt_packet(now);
                        out.push_packet(&rtt_packet, entry.iface);
                        info!(%link_id, rtt = link.rtt(), "link established (initiator)");
                        out.events.push(SessionEvent::LinkEstablished(link_id));
                        entry.phase = Some(LinkPhase::Active(link));
                    }
                    Err(e) => {
                        warn!(%link_id, error = %e, "link proof invalid, closing");
                        self.remove_link(link_id, out);
                    }
                }
            }

            // Initiator's proof reaches the responder.
            (ContextType::LinkProof, Some(LinkPhase::Handshake(handshake))) => {
                match handshake.process_proof(&packet.data, now) {
                    Ok(link) => {
                        info!(%link_id, rtt = link.rtt(), "link established (responder)");
                        out.events.push(SessionEvent::LinkEstablished(link_id));
                        entry.phase = Some(LinkPhase::Active(link));
                    }
                    Err(e) => {
                        warn!(%link_id, error = %e, "initiator proof invalid, closing");
                        self.remove_link(link_id, out);
                    }
                }
            }

            (ContextType::Keepalive, Some(LinkPhase::Active(mut link))) => {
                link.record_inbound(packet.data.len() as u64, now);
                // Echo the initiator's marker back.
                if packet.data.first()
                    == Some(&rns_protocol::link::constants::KEEPALIVE_MARKER)
                    && matches!(link.role, rns_protocol::link::LinkRole::Responder)
                {
                    let echo = link.keepalive_packet(now);
                    out.push_packet(&echo, entry.iface);
                }
                entry.phase = Some(LinkPhase::Active(link));
            }

            (ContextType::LinkClose, Some(LinkPhase::Active(link))) => {
                let closed = link.close(TeardownReason::DestinationClosed, now);
                debug!(%link_id, reason = ?closed.reason, "peer closed link");
                entry.phase = None;
                self.remove_link(link_id, out);
            }

            (_, Some(LinkPhase::Active(link))) => {
                entry.phase = Some(LinkPhase::Active(link));
                self.handle_in_link_data(link_id, packet, identity, now, out);
            }

            (context, phase) => {
                debug!(%link_id, ?context, "packet does not fit link phase, ignored");
                entry.phase = phase;
            }
        }
    }

    /// Sealed traffic on an active link.
    fn handle_in_link_data(
        &mut self,
        link_id: LinkId,
        packet: &RawPacket,
        identity: &Identity,
        now: f64,
        out: &mut SessionOutput,
    ) {
        let entry = self.links.get_mut(&link_id).expect("caller checked presence");
        let Some(LinkPhase::Active(link)) = entry.phase.as_mut() else {
            return;
        };

        let plaintext = match link.open(&packet.data, now) {
            Ok(p) => p,
            Err(LinkError::SequenceReplay) => {
                debug!(%link_id, "in-link replay rejected");
                return;
            }
            Err(e) => {
                debug!(%link_id, error = %e, "in-link packet failed to open");
                return;
            }
        };

        match packet.context {
            ContextType::None => {
                out.events.push(SessionEvent::Data(link_id, plaintext));
            }

            ContextType::Lrrtt => {
                if let Ok(rtt) = link.process_rtt(&plaintext) {
                    debug!(%link_id, rtt, "rtt adopted from peer");
                }
            }

            ContextType::LinkIdentify => match link.process_identify(&plaintext, identity) {
                Ok(peer) => out.events.push(SessionEvent::PeerIdentified(link_id, peer)),
                Err(e) => debug!(%link_id, error = %e, "identify rejected"),
            },

            ContextType::ResourceAdv => match ResourceAdvertisement::from_msgpack(&plaintext) {
                Ok(adv) => match ResourceReceiver::accept(&adv, now) {
                    Ok(receiver) => {
                        // Accept by acking the (empty) receive state.
                        let ack = receiver.ack().to_msgpack();
                        let resource_id = receiver.resource_id;
                        entry.rx_resources.insert(resource_id, receiver);
                        let ack_packet = link.data_packet(&ack, ContextType::ResourceReq, now);
                        out.push_packet(&ack_packet, entry.iface);
                        debug!(%link_id, "resource advertisement accepted");
                    }
                    Err(e) => {
                        // Refuse with a cancel carrying the resource id.
                        let refuse =
                            link.data_packet(&adv.resource_id, ContextType::ResourceIcl, now);
                        out.push_packet(&refuse, entry.iface);
                        debug!(%link_id, error = %e, "resource advertisement refused");
                    }
                },
                Err(e) => debug!(%link_id, error = %e, "bad resource advertisement"),
            },

            ContextType::Resource => {
                let Ok((resource_id, _, _)) =
                    rns_protocol::resource::transfer::decode_part(&plaintext)
                else {
                    return;
                };
                let Some(receiver) = entry.rx_resources.get_mut(&resource_id) else {
                    return;
                };
                match receiver.on_part(&plaintext, now) {
                    Ok(new_part) => {
                        let count = receiver.received_parts();
                        if receiver.is_complete() {
                            match receiver.finalize(link) {
                                Ok((data, proof)) => {
                                    let proof_packet =
                                        link.data_packet(&proof, ContextType::ResourcePrf, now);
                                    out.push_packet(&proof_packet, entry.iface);
                                    info!(%link_id, size = data.len(), "resource received");
                                    out.events
                                        .push(SessionEvent::ResourceComplete(link_id, data));
                                }
                                Err(e) => {
                                    warn!(%link_id, error = %e, "resource failed to assemble");
                                }
                            }
                            entry.rx_resources.remove(&resource_id);
                        } else if !new_part || count % ACK_EVERY_PARTS == 0 {
                            // A duplicate means the sender is missing our
                            // ack state; answer immediately.
                            let ack = receiver.ack().to_msgpack();
                            let ack_packet = link.data_packet(&ack, ContextType::ResourceReq, now);
                            out.push_packet(&ack_packet, entry.iface);
                        }
                    }
                    Err(e) => debug!(%link_id, error = %e, "resource part rejected"),
                }
            }

            ContextType::ResourceReq => match PartAck::from_msgpack(&plaintext) {
                Ok(ack) => {
                    if let Some(sender) = entry.tx_resources.get_mut(&ack.resource_id) {
                        sender.start(now);
                        if let Err(e) = sender.on_ack(&ack, now) {
                            debug!(%link_id, error = %e, "resource ack rejected");
                        }
                        Self::pump_sender(link, entry.iface, sender, now, out);
                    }
                }
                Err(e) => debug!(%link_id, error = %e, "bad resource ack"),
            },

            ContextType::ResourcePrf => {
                if plaintext.len() == 48 {
                    let resource_id: [u8; 16] =
                        plaintext[..16].try_into().expect("slice is 16 bytes");
                    if let Some(sender) = entry.tx_resources.get_mut(&resource_id) {
                        match sender.on_proof(&plaintext, link) {
                            Ok(()) => {
                                info!(%link_id, "resource delivery proven");
                                out.events
                                    .push(SessionEvent::ResourceDelivered(link_id, resource_id));
                                entry.tx_resources.remove(&resource_id);
                            }
                            Err(e) => debug!(%link_id, error = %e, "resource proof rejected"),
                        }
                    }
                }
            }

            ContextType::ResourceIcl | ContextType::ResourceRcl => {
                if plaintext.len() >= 16 {
                    let resource_id: [u8; 16] =
                        plaintext[..16].try_into().expect("slice is 16 bytes");
                    if let Some(mut sender) = entry.tx_resources.remove(&resource_id) {
                        sender.abort();
                        debug!(%link_id, "resource cancelled by peer");
                    }
                    entry.rx_resources.remove(&resource_id);
                }
            }

            other => {
                debug!(%link_id, context = ?other, "unhandled in-link context");
            }
        }
    }

    /// Periodic maintenance: keepalives, staleness, handshake expiry, and
    /// resource retransmission.
    pub fn tick(&mut self, now: f64, out: &mut SessionOutput) {
        let mut to_remove: Vec<LinkId> = Vec::new();

        for (link_id, entry) in &mut self.links {
            match entry.phase.take() {
                Some(LinkPhase::Pending(pending)) => {
                    if pending.is_timed_out(now) {
                        warn!(%link_id, "link establishment timed out");
                        let _ = pending.close(now);
                        to_remove.push(*link_id);
                    } else {
                        entry.phase = Some(LinkPhase::Pending(pending));
                    }
                }
                Some(LinkPhase::Handshake(handshake)) => {
                    if handshake.is_timed_out(now) {
                        warn!(%link_id, "responder handshake timed out");
                        let _ = handshake.close(now);
                        to_remove.push(*link_id);
                    } else {
                        entry.phase = Some(LinkPhase::Handshake(handshake));
                    }
                }
                Some(LinkPhase::Active(mut link)) => {
                    if link.should_teardown(now) {
                        let (closed, teardown) = link.teardown(TeardownReason::Timeout, now);
                        out.push_packet(&teardown, entry.iface);
                        debug!(%link_id, reason = ?closed.reason, "link torn down");
                        to_remove.push(*link_id);
                        continue;
                    }

                    if link.should_go_stale(now) {
                        link.mark_stale();
                    }
                    if link.should_send_keepalive(now) {
                        let keepalive = link.keepalive_packet(now);
                        out.push_packet(&keepalive, entry.iface);
                    }

                    for sender in entry.tx_resources.values_mut() {
                        Self::pump_sender(&mut link, entry.iface, sender, now, out);
                    }
                    entry
                        .tx_resources
                        .retain(|_, s| !matches!(s.state(), ResourceState::Failed(_)));
                    entry.rx_resources.retain(|_, r| !r.is_stalled(now));

                    entry.phase = Some(LinkPhase::Active(link));
                }
                None => to_remove.push(*link_id),
            }
        }

        for link_id in to_remove {
            self.remove_link(link_id, out);
        }
    }

    fn pump_sender(
        link: &mut LinkActive,
        iface: Option<rns_transport::InterfaceId>,
        sender: &mut ResourceSender,
        now: f64,
        out: &mut SessionOutput,
    ) {
        match sender.poll(now) {
            Ok(parts) => {
                for part in parts {
                    let packet = link.data_packet(&part, ContextType::Resource, now);
                    out.outbound.push(Outbound {
                        raw: packet.serialize(),
                        attached: iface,
                    });
                }
            }
            Err(e) => {
                warn!(error = %e, "resource sender failed");
            }
        }
    }

    fn remove_link(&mut self, link_id: LinkId, out: &mut SessionOutput) {
        if let Some(mut entry) = self.links.remove(&link_id) {
            for sender in entry.tx_resources.values_mut() {
                sender.on_link_closed();
            }
            for receiver in entry.rx_resources.values_mut() {
                receiver.on_link_closed();
            }
            out.deregister_destinations.push(link_id);
            out.events.push(SessionEvent::LinkClosed(link_id));
        }
    }

    /// The link id a locally initiated request produced (for tests).
    #[must_use]
    pub fn link_id_of_request(packet: &RawPacket) -> LinkId {
        link_id_from_request(packet)
    }
}
