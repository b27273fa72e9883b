//! Link state machine.
//!
//! Four structs carry the lifecycle: [`LinkPending`] → [`LinkHandshake`] →
//! [`LinkActive`] → [`LinkClosed`], wrapped by [`LinkState`] for runtime
//! dispatch. All timing decisions are pure functions of a host-supplied
//! monotonic clock.
//!
//! # Handshake
//!
//! ```text
//! INITIATOR                                   RESPONDER
//!     |-- LINKREQUEST [E_i.pub(32)              |
//!     |      (+ ratchet_id(16))] -------------->|  PENDING    HANDSHAKE
//!     |                                         |
//!     |<-- PROOF/lrproof [E_r.pub(32) ||        |
//!     |      HMAC(k, link_id || E_r.pub)] ------|
//!     |                                         |
//!     |-- PROOF/linkproof [E_i.pub(32) ||       |
//!     |      HMAC(k, link_id || E_i.pub)] ----->|  ACTIVE     ACTIVE
//! ```
//!
//! Both sides derive `HKDF(64, ecdh(E_i, E_r) || ecdh(E_i, static),
//! salt = link_id)` where `static` is the responder's advertised ratchet
//! key when the request named one, its long-term X25519 key otherwise. The
//! HMAC subkey is the signing half of the derived key, so a verified proof
//! confirms key agreement.

use rns_core::constants::{DestinationType, HeaderType, PacketType, TransportType};
use rns_core::identity::Identity;
use rns_core::packet::context::ContextType;
use rns_core::packet::flags::PacketFlags;
use rns_core::packet::wire::RawPacket;
use rns_core::ratchet::RatchetStore;
use rns_core::types::{DestinationHash, IdentityHash, LinkId, TruncatedHash};
use rns_crypto::ed25519::{Ed25519PublicKey, Ed25519Signature};
use rns_crypto::hkdf::hkdf;
use rns_crypto::hmac::{hmac_sha256, hmac_sha256_verify};
use rns_crypto::sha::truncated_hash;
use rns_crypto::token::Token;
use rns_crypto::x25519::{X25519PrivateKey, X25519PublicKey};

use super::constants::{
    EPHEMERAL_KEYSIZE, ESTABLISHMENT_TIMEOUT_PER_HOP, KEEPALIVE_ECHO_MARKER, KEEPALIVE_MARKER,
    KEEPALIVE_MAX, KEEPALIVE_MAX_RTT, KEEPALIVE_MIN, PROOF_PAYLOAD_SIZE, RATCHET_ID_SIZE, SEQ_LEN,
    STALE_FACTOR, TEARDOWN_FACTOR,
};
use super::types::{DerivedKey, LinkRole, LinkStats, TeardownReason};
use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Pure time decisions
// ---------------------------------------------------------------------------

/// Whether a keepalive is due, given seconds since the last outbound packet.
pub fn should_send_keepalive_at(elapsed_outbound: f64, keepalive: f64) -> bool {
    elapsed_outbound > keepalive
}

/// Whether a link should go stale, given seconds since the last inbound.
pub fn should_go_stale_at(is_stale: bool, elapsed_inbound: f64, stale_time: f64) -> bool {
    !is_stale && elapsed_inbound > stale_time
}

/// Whether the teardown threshold has passed.
pub fn should_teardown_at(elapsed_inbound: f64, keepalive: f64) -> bool {
    elapsed_inbound > keepalive * TEARDOWN_FACTOR
}

/// Whether a handshake has run out of time.
pub fn is_establishment_timed_out_at(elapsed: f64, timeout: f64) -> bool {
    elapsed > timeout
}

/// Keepalive interval for a measured RTT.
#[must_use]
pub fn compute_keepalive(rtt: f64) -> f64 {
    (rtt * (KEEPALIVE_MAX / KEEPALIVE_MAX_RTT)).clamp(KEEPALIVE_MIN, KEEPALIVE_MAX)
}

// ---------------------------------------------------------------------------
// Handshake payloads
// ---------------------------------------------------------------------------

/// Parsed LINKREQUEST payload.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub ephemeral_public: [u8; 32],
    /// Present when the initiator keyed to an advertised ratchet.
    pub ratchet_id: Option<TruncatedHash>,
}

/// Parse a LINKREQUEST payload: `ephemeral_pub(32) [|| ratchet_id(16)]`.
pub fn parse_request_data(data: &[u8]) -> Result<ParsedRequest, LinkError> {
    if data.len() < EPHEMERAL_KEYSIZE {
        return Err(LinkError::RequestDataTooShort);
    }
    let ephemeral_public: [u8; 32] = data[..EPHEMERAL_KEYSIZE]
        .try_into()
        .expect("slice is exactly 32 bytes");

    let rest = &data[EPHEMERAL_KEYSIZE..];
    let ratchet_id = match rest.len() {
        0 => None,
        RATCHET_ID_SIZE => Some(
            TruncatedHash::try_from(rest).expect("slice is exactly 16 bytes"),
        ),
        _ => return Err(LinkError::RequestDataTooShort),
    };

    Ok(ParsedRequest {
        ephemeral_public,
        ratchet_id,
    })
}

/// Parsed PROOF payload.
#[derive(Debug, Clone)]
pub struct ParsedProof {
    pub ephemeral_public: [u8; 32],
    pub hmac: [u8; 32],
}

/// Parse a PROOF payload: `ephemeral_pub(32) || hmac(32)`.
pub fn parse_proof_data(data: &[u8]) -> Result<ParsedProof, LinkError> {
    if data.len() < PROOF_PAYLOAD_SIZE {
        return Err(LinkError::InvalidProof);
    }
    Ok(ParsedProof {
        ephemeral_public: data[..EPHEMERAL_KEYSIZE]
            .try_into()
            .expect("slice is exactly 32 bytes"),
        hmac: data[EPHEMERAL_KEYSIZE..PROOF_PAYLOAD_SIZE]
            .try_into()
            .expect("slice is exactly 32 bytes"),
    })
}

/// The byte string a handshake proof HMAC covers.
fn proof_subject(link_id: &LinkId, ephemeral_public: &[u8; 32]) -> Vec<u8> {
    let mut subject = Vec::with_capacity(16 + 32);
    subject.extend_from_slice(link_id.as_ref());
    subject.extend_from_slice(ephemeral_public);
    subject
}

fn build_proof_data(key: &DerivedKey, link_id: &LinkId, ephemeral_public: &[u8; 32]) -> Vec<u8> {
    let hmac = hmac_sha256(key.signing_key(), &proof_subject(link_id, ephemeral_public));
    let mut data = Vec::with_capacity(PROOF_PAYLOAD_SIZE);
    data.extend_from_slice(ephemeral_public);
    data.extend_from_slice(&hmac);
    data
}

fn verify_proof_data(
    key: &DerivedKey,
    link_id: &LinkId,
    proof: &ParsedProof,
) -> Result<(), LinkError> {
    hmac_sha256_verify(
        key.signing_key(),
        &proof_subject(link_id, &proof.ephemeral_public),
        &proof.hmac,
    )
    .map_err(|_| LinkError::InvalidProof)
}

/// Derive the session key from both ECDH shares, salted by the link id.
fn derive_session_key(shared_eph: &[u8; 32], shared_static: &[u8; 32], link_id: &LinkId) -> DerivedKey {
    let mut ikm = [0u8; 64];
    ikm[..32].copy_from_slice(shared_eph);
    ikm[32..].copy_from_slice(shared_static);
    let derived = hkdf(64, &ikm, Some(link_id.as_ref()), None);
    let bytes: [u8; 64] = derived.try_into().expect("HKDF always returns 64 bytes");
    DerivedKey::new(bytes)
}

/// The link id of a request packet: its truncated packet hash, so both
/// endpoints compute the same value without a round trip.
pub fn link_id_from_request(packet: &RawPacket) -> LinkId {
    LinkId::new(*packet.packet_hash().truncated().as_bytes())
}

/// Build an in-link packet addressed to the link id.
fn link_packet(
    link_id: &LinkId,
    packet_type: PacketType,
    context: ContextType,
    data: Vec<u8>,
) -> RawPacket {
    RawPacket {
        flags: PacketFlags {
            ifac_flag: false,
            header_type: HeaderType::Header1,
            context_flag: false,
            transport_type: TransportType::Broadcast,
            destination_type: DestinationType::Link,
            packet_type,
        },
        hops: 0,
        transport_id: None,
        destination: DestinationHash::new(*link_id.as_bytes()),
        context,
        data,
    }
}

// ---------------------------------------------------------------------------
// PENDING (initiator)
// ---------------------------------------------------------------------------

/// Initiator-side state between sending the LINKREQUEST and verifying the
/// responder's proof.
#[must_use]
pub struct LinkPending {
    pub link_id: LinkId,
    pub destination: DestinationHash,
    ephemeral: X25519PrivateKey,
    static_target: X25519PublicKey,
    created: f64,
    timeout: f64,
}

impl LinkPending {
    /// Open a link to `destination`. `static_target` is the responder's
    /// current ratchet key (with its id) when one is known, or the
    /// long-term X25519 key from its announce.
    ///
    /// Returns the pending state and the LINKREQUEST packet to send.
    pub fn initiate(
        destination: DestinationHash,
        responder_x25519: X25519PublicKey,
        ratchet: Option<(TruncatedHash, X25519PublicKey)>,
        hops: u8,
        now: f64,
    ) -> (Self, RawPacket) {
        let ephemeral = X25519PrivateKey::generate();
        let ephemeral_public = ephemeral.public_key();

        let (static_target, ratchet_id) = match ratchet {
            Some((id, key)) => (key, Some(id)),
            None => (responder_x25519, None),
        };

        let mut data = Vec::with_capacity(EPHEMERAL_KEYSIZE + RATCHET_ID_SIZE);
        data.extend_from_slice(&ephemeral_public.to_bytes());
        if let Some(ref id) = ratchet_id {
            data.extend_from_slice(id.as_ref());
        }

        let request = RawPacket {
            flags: PacketFlags {
                ifac_flag: false,
                header_type: HeaderType::Header1,
                context_flag: ratchet_id.is_some(),
                transport_type: TransportType::Broadcast,
                destination_type: DestinationType::Single,
                packet_type: PacketType::LinkRequest,
            },
            hops: 0,
            transport_id: None,
            destination,
            context: ContextType::None,
            data,
        };
        let link_id = link_id_from_request(&request);
        tracing::debug!(%link_id, dest = %destination, "link request created");

        (
            Self {
                link_id,
                destination,
                ephemeral,
                static_target,
                created: now,
                timeout: ESTABLISHMENT_TIMEOUT_PER_HOP * f64::from(hops.max(1)),
            },
            request,
        )
    }

    /// Whether the establishment window has closed.
    #[must_use]
    pub fn is_timed_out(&self, now: f64) -> bool {
        is_establishment_timed_out_at(now - self.created, self.timeout)
    }

    /// Process the responder's proof. On success the link is ACTIVE and the
    /// returned packet is our own proof, completing the 4-way exchange.
    pub fn process_proof(
        self,
        proof_data: &[u8],
        now: f64,
    ) -> Result<(LinkActive, RawPacket), LinkError> {
        let proof = parse_proof_data(proof_data)?;

        let responder_ephemeral = X25519PublicKey::from_bytes(proof.ephemeral_public);
        let shared_eph = self.ephemeral.diffie_hellman(&responder_ephemeral);
        let shared_static = self.ephemeral.diffie_hellman(&self.static_target);
        let derived = derive_session_key(&shared_eph, &shared_static, &self.link_id);

        verify_proof_data(&derived, &self.link_id, &proof)?;

        let own_public = self.ephemeral.public_key().to_bytes();
        let own_proof = build_proof_data(&derived, &self.link_id, &own_public);
        let packet = link_packet(
            &self.link_id,
            PacketType::Proof,
            ContextType::LinkProof,
            own_proof,
        );

        let rtt = (now - self.created).max(0.0);
        tracing::debug!(link_id = %self.link_id, rtt, "link active (initiator)");

        Ok((
            LinkActive::new(self.link_id, LinkRole::Initiator, derived, rtt, now),
            packet,
        ))
    }

    /// Give up on the handshake.
    pub fn close(self, now: f64) -> LinkClosed {
        LinkClosed {
            link_id: self.link_id,
            reason: TeardownReason::HandshakeTimeout,
            stats: LinkStats::default(),
            closed_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// HANDSHAKE (responder)
// ---------------------------------------------------------------------------

/// Responder-side state between sending its proof and verifying the
/// initiator's.
#[must_use]
pub struct LinkHandshake {
    pub link_id: LinkId,
    derived: DerivedKey,
    initiator_ephemeral: [u8; 32],
    created: f64,
    timeout: f64,
}

impl LinkHandshake {
    /// Accept a LINKREQUEST delivered to one of our destinations.
    ///
    /// Returns the handshake state and the proof packet to send back.
    pub fn respond(
        request: &RawPacket,
        identity: &Identity,
        ratchets: Option<&RatchetStore>,
        now: f64,
    ) -> Result<(Self, RawPacket), LinkError> {
        if request.flags.packet_type != PacketType::LinkRequest {
            return Err(LinkError::RequestDataTooShort);
        }
        let parsed = parse_request_data(&request.data)?;
        let link_id = link_id_from_request(request);

        let initiator_public = X25519PublicKey::from_bytes(parsed.ephemeral_public);

        // The static share comes from the ratchet the initiator named, or
        // from our long-term key. An unknown ratchet id fails the request
        // rather than silently downgrading.
        let shared_static = match parsed.ratchet_id {
            Some(id) => {
                let key = ratchets
                    .and_then(|r| r.private_for_id(&id))
                    .ok_or(LinkError::UnknownRatchet)?;
                key.diffie_hellman(&initiator_public)
            }
            None => identity
                .x25519_private()
                .ok_or(LinkError::NoPrivateKey)?
                .diffie_hellman(&initiator_public),
        };

        let ephemeral = X25519PrivateKey::generate();
        let ephemeral_public = ephemeral.public_key().to_bytes();
        let shared_eph = ephemeral.diffie_hellman(&initiator_public);
        let derived = derive_session_key(&shared_eph, &shared_static, &link_id);

        let proof = build_proof_data(&derived, &link_id, &ephemeral_public);
        let packet = link_packet(&link_id, PacketType::Proof, ContextType::Lrproof, proof);

        tracing::debug!(%link_id, "link request accepted, proof sent");

        Ok((
            Self {
                link_id,
                derived,
                initiator_ephemeral: parsed.ephemeral_public,
                created: now,
                timeout: ESTABLISHMENT_TIMEOUT_PER_HOP * f64::from(request.hops.max(1)),
            },
            packet,
        ))
    }

    #[must_use]
    pub fn is_timed_out(&self, now: f64) -> bool {
        is_establishment_timed_out_at(now - self.created, self.timeout)
    }

    /// Verify the initiator's proof and activate the link.
    pub fn process_proof(self, proof_data: &[u8], now: f64) -> Result<LinkActive, LinkError> {
        let proof = parse_proof_data(proof_data)?;
        if proof.ephemeral_public != self.initiator_ephemeral {
            return Err(LinkError::ProofKeyMismatch);
        }
        verify_proof_data(&self.derived, &self.link_id, &proof)?;

        let rtt = (now - self.created).max(0.0);
        tracing::debug!(link_id = %self.link_id, rtt, "link active (responder)");
        Ok(LinkActive::new(
            self.link_id,
            LinkRole::Responder,
            self.derived,
            rtt,
            now,
        ))
    }

    pub fn close(self, now: f64) -> LinkClosed {
        LinkClosed {
            link_id: self.link_id,
            reason: TeardownReason::HandshakeTimeout,
            stats: LinkStats::default(),
            closed_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// ACTIVE
// ---------------------------------------------------------------------------

/// An established link carrying encrypted, replay-protected traffic.
#[must_use]
pub struct LinkActive {
    pub link_id: LinkId,
    pub role: LinkRole,
    derived: DerivedKey,
    rtt: f64,
    keepalive: f64,
    activated_at: f64,
    last_inbound: f64,
    last_outbound: f64,
    is_stale: bool,
    next_tx_seq: u64,
    highest_rx_seq: Option<u64>,
    peer_identity: Option<IdentityHash>,
    stats: LinkStats,
}

impl LinkActive {
    fn new(link_id: LinkId, role: LinkRole, derived: DerivedKey, rtt: f64, now: f64) -> Self {
        Self {
            link_id,
            role,
            derived,
            rtt,
            keepalive: compute_keepalive(rtt),
            activated_at: now,
            last_inbound: now,
            last_outbound: now,
            is_stale: false,
            next_tx_seq: 0,
            highest_rx_seq: None,
            peer_identity: None,
            stats: LinkStats::default(),
        }
    }

    // -- traffic ---------------------------------------------------------

    /// Encrypt `plaintext` into a token with the next sequence number.
    pub fn seal(&mut self, plaintext: &[u8], now: f64) -> Vec<u8> {
        let seq = self.next_tx_seq;
        self.next_tx_seq += 1;

        let mut full = Vec::with_capacity(SEQ_LEN + plaintext.len());
        full.extend_from_slice(&seq.to_be_bytes());
        full.extend_from_slice(plaintext);

        let token = Token::new(&self.derived.to_bytes());
        let sealed = token.encrypt(&full);
        self.record_outbound(sealed.len() as u64, now);
        sealed
    }

    /// Decrypt a token and enforce the strictly-increasing sequence.
    pub fn open(&mut self, sealed: &[u8], now: f64) -> Result<Vec<u8>, LinkError> {
        let token = Token::new(&self.derived.to_bytes());
        let full = token.decrypt(sealed)?;
        if full.len() < SEQ_LEN {
            return Err(LinkError::InvalidProof);
        }

        let seq = u64::from_be_bytes(full[..SEQ_LEN].try_into().expect("slice is 8 bytes"));
        if let Some(highest) = self.highest_rx_seq {
            if seq <= highest {
                self.stats.replays_rejected += 1;
                return Err(LinkError::SequenceReplay);
            }
        }
        self.highest_rx_seq = Some(seq);
        self.record_inbound(sealed.len() as u64, now);
        Ok(full[SEQ_LEN..].to_vec())
    }

    /// Seal `plaintext` and wrap it in an in-link DATA packet.
    pub fn data_packet(&mut self, plaintext: &[u8], context: ContextType, now: f64) -> RawPacket {
        let sealed = self.seal(plaintext, now);
        link_packet(&self.link_id, PacketType::Data, context, sealed)
    }

    /// HMAC under the link signing key.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        hmac_sha256(self.derived.signing_key(), data)
    }

    /// Verify an HMAC under the link signing key.
    #[must_use]
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match <&[u8; 32]>::try_from(signature) {
            Ok(sig) => hmac_sha256_verify(self.derived.signing_key(), data, sig).is_ok(),
            Err(_) => false,
        }
    }

    // -- rtt / keepalive -------------------------------------------------

    #[must_use]
    pub fn rtt(&self) -> f64 {
        self.rtt
    }

    #[must_use]
    pub fn keepalive(&self) -> f64 {
        self.keepalive
    }

    /// Adopt a refined RTT measurement.
    pub fn set_rtt(&mut self, rtt: f64) {
        self.rtt = rtt;
        self.keepalive = compute_keepalive(rtt);
    }

    /// The initiator shares its measured RTT so both sides schedule the
    /// same keepalive cadence. Sealed msgpack float64.
    pub fn rtt_packet(&mut self, now: f64) -> RawPacket {
        let mut buf = Vec::with_capacity(9);
        rmpv::encode::write_value(&mut buf, &rmpv::Value::F64(self.rtt))
            .expect("msgpack encoding to Vec never fails");
        let sealed = self.seal(&buf, now);
        link_packet(&self.link_id, PacketType::Data, ContextType::Lrrtt, sealed)
    }

    /// Process an opened RTT payload from the peer.
    pub fn process_rtt(&mut self, plaintext: &[u8]) -> Result<f64, LinkError> {
        let mut cursor = std::io::Cursor::new(plaintext);
        let value =
            rmpv::decode::read_value(&mut cursor).map_err(|_| LinkError::InvalidRttFormat)?;
        let rtt = match value {
            rmpv::Value::F64(v) => v,
            rmpv::Value::F32(v) => f64::from(v),
            _ => return Err(LinkError::InvalidRttFormat),
        };
        if !(0.0..=3600.0).contains(&rtt) {
            return Err(LinkError::InvalidRttFormat);
        }
        self.set_rtt(rtt);
        Ok(rtt)
    }

    /// Whether a keepalive is due.
    #[must_use]
    pub fn should_send_keepalive(&self, now: f64) -> bool {
        should_send_keepalive_at(now - self.last_outbound, self.keepalive)
    }

    /// Build a keepalive packet. Keepalives are single unencrypted marker
    /// bytes and do not advance the sequence counter.
    pub fn keepalive_packet(&mut self, now: f64) -> RawPacket {
        let marker = match self.role {
            LinkRole::Initiator => KEEPALIVE_MARKER,
            LinkRole::Responder => KEEPALIVE_ECHO_MARKER,
        };
        self.record_outbound(1, now);
        link_packet(
            &self.link_id,
            PacketType::Data,
            ContextType::Keepalive,
            vec![marker],
        )
    }

    // -- liveness --------------------------------------------------------

    pub fn record_inbound(&mut self, bytes: u64, now: f64) {
        self.last_inbound = now;
        self.stats.rx_packets += 1;
        self.stats.rx_bytes += bytes;
        if self.is_stale {
            self.is_stale = false;
            tracing::debug!(link_id = %self.link_id, "stale link recovered");
        }
    }

    pub fn record_outbound(&mut self, bytes: u64, now: f64) {
        self.last_outbound = now;
        self.stats.tx_packets += 1;
        self.stats.tx_bytes += bytes;
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    #[must_use]
    pub fn should_go_stale(&self, now: f64) -> bool {
        should_go_stale_at(
            self.is_stale,
            now - self.last_inbound,
            self.keepalive * STALE_FACTOR,
        )
    }

    pub fn mark_stale(&mut self) {
        self.is_stale = true;
        tracing::debug!(link_id = %self.link_id, "link stale");
    }

    #[must_use]
    pub fn should_teardown(&self, now: f64) -> bool {
        should_teardown_at(now - self.last_inbound, self.keepalive)
    }

    // -- identify --------------------------------------------------------

    /// The verified peer identity, once an identify exchange completed.
    #[must_use]
    pub fn peer_identity(&self) -> Option<&IdentityHash> {
        self.peer_identity.as_ref()
    }

    /// Build a sealed identify packet binding our long-term identity to
    /// this link: `pubkey(64) || sig(link_id || responder_pubkey(64))`.
    pub fn identify_packet(
        &mut self,
        identity: &Identity,
        responder_public_key: &[u8; 64],
        now: f64,
    ) -> Result<RawPacket, LinkError> {
        let mut signed = Vec::with_capacity(16 + 64);
        signed.extend_from_slice(self.link_id.as_ref());
        signed.extend_from_slice(responder_public_key);
        let signature = identity.sign(&signed)?;

        let mut plaintext = Vec::with_capacity(64 + 64);
        plaintext.extend_from_slice(&identity.public_key_bytes());
        plaintext.extend_from_slice(&signature.to_bytes());

        let sealed = self.seal(&plaintext, now);
        Ok(link_packet(
            &self.link_id,
            PacketType::Data,
            ContextType::LinkIdentify,
            sealed,
        ))
    }

    /// Validate an opened identify payload against our own public key and
    /// record the peer identity.
    pub fn process_identify(
        &mut self,
        plaintext: &[u8],
        own_identity: &Identity,
    ) -> Result<IdentityHash, LinkError> {
        if plaintext.len() != 128 {
            return Err(LinkError::InvalidIdentify);
        }
        let claimed_key: [u8; 64] = plaintext[..64].try_into().expect("slice is 64 bytes");
        let sig_bytes: [u8; 64] = plaintext[64..].try_into().expect("slice is 64 bytes");

        let ed25519 = Ed25519PublicKey::from_bytes(
            claimed_key[32..].try_into().expect("slice is 32 bytes"),
        )
        .map_err(|_| LinkError::InvalidIdentify)?;

        let mut signed = Vec::with_capacity(16 + 64);
        signed.extend_from_slice(self.link_id.as_ref());
        signed.extend_from_slice(&own_identity.public_key_bytes());

        ed25519
            .verify(&signed, &Ed25519Signature::from_bytes(sig_bytes))
            .map_err(|_| LinkError::InvalidIdentify)?;

        let hash = IdentityHash::new(truncated_hash(&claimed_key));
        self.peer_identity = Some(hash);
        tracing::debug!(link_id = %self.link_id, peer = %hash, "peer identified");
        Ok(hash)
    }

    // -- teardown --------------------------------------------------------

    /// Close the link, returning the closed state and a best-effort
    /// teardown packet for the peer.
    pub fn teardown(self, reason: TeardownReason, now: f64) -> (LinkClosed, RawPacket) {
        let packet = link_packet(
            &self.link_id,
            PacketType::Data,
            ContextType::LinkClose,
            self.link_id.as_ref().to_vec(),
        );
        tracing::debug!(link_id = %self.link_id, ?reason, "link closed");
        (
            LinkClosed {
                link_id: self.link_id,
                reason,
                stats: self.stats,
                closed_at: now,
            },
            packet,
        )
    }

    /// Close without notifying the peer (their teardown reached us).
    pub fn close(self, reason: TeardownReason, now: f64) -> LinkClosed {
        LinkClosed {
            link_id: self.link_id,
            reason,
            stats: self.stats,
            closed_at: now,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    #[must_use]
    pub fn activated_at(&self) -> f64 {
        self.activated_at
    }
}

// ---------------------------------------------------------------------------
// CLOSED
// ---------------------------------------------------------------------------

/// Terminal link state.
#[derive(Debug)]
#[must_use]
pub struct LinkClosed {
    pub link_id: LinkId,
    pub reason: TeardownReason,
    pub stats: LinkStats,
    pub closed_at: f64,
}

/// Runtime wrapper over the link lifecycle.
pub enum LinkState {
    Pending(LinkPending),
    Handshake(LinkHandshake),
    Active(LinkActive),
    Closed(LinkClosed),
}

impl LinkState {
    #[must_use]
    pub fn link_id(&self) -> &LinkId {
        match self {
            LinkState::Pending(l) => &l.link_id,
            LinkState::Handshake(l) => &l.link_id,
            LinkState::Active(l) => &l.link_id,
            LinkState::Closed(l) => &l.link_id,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, LinkState::Active(_))
    }
}
