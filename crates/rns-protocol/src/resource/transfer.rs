//! Resource sender and receiver state machines.
//!
//! Both sides are pure: the caller supplies the clock, moves the control
//! payloads (advertisement, acks, parts, proof) through the link, and asks
//! the machines what to send next. Part payloads are
//! `resource_id(16) || index(3, big-endian) || chunk`.

use std::collections::HashMap;
use std::io::Read;

use bzip2::Compression;
use bzip2::read::{BzDecoder, BzEncoder};
use rns_crypto::sha::sha256;
use tracing::{debug, trace};

use super::advertisement::{FLAG_COMPRESSED, PartAck, ResourceAdvertisement};
use super::window::WindowState;
use crate::error::{ResourceError, ResourceFailure};
use crate::link::LinkActive;

/// Hard ceiling on a single resource payload (16 MiB).
pub const MAX_RESOURCE_SIZE: usize = 16 * 1024 * 1024;

/// Retries allowed per part before the whole resource fails.
pub const MAX_RETRIES: u32 = 16;

/// Part deadline as a multiple of link RTT.
pub const PART_TIMEOUT_FACTOR: f64 = 4.0;

/// Floor for the part deadline in seconds.
pub const MIN_PART_TIMEOUT: f64 = 1.0;

/// A transfer with no progress for this long fails outright.
pub const STALL_TIMEOUT: f64 = 120.0;

/// `resource_id(16) || index(3)`.
pub const PART_HEADER_LEN: usize = 19;

/// Lifecycle of a transfer, either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Advertised,
    Transferring,
    Assembling,
    Complete,
    Failed(ResourceFailure),
}

/// Encode one part message.
pub fn encode_part(resource_id: &[u8; 16], index: u32, chunk: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PART_HEADER_LEN + chunk.len());
    out.extend_from_slice(resource_id);
    out.extend_from_slice(&index.to_be_bytes()[1..4]);
    out.extend_from_slice(chunk);
    out
}

/// Decode a part message into `(resource_id, index, chunk)`.
pub fn decode_part(data: &[u8]) -> Result<([u8; 16], u32, &[u8]), ResourceError> {
    if data.len() < PART_HEADER_LEN {
        return Err(ResourceError::InvalidPart("too short".into()));
    }
    let resource_id: [u8; 16] = data[..16].try_into().expect("slice is 16 bytes");
    let index = u32::from_be_bytes([0, data[16], data[17], data[18]]);
    Ok((resource_id, index, &data[PART_HEADER_LEN..]))
}

/// bzip2-compress, returning `Some` only when it actually shrinks.
fn compress(data: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = BzEncoder::new(data, Compression::best());
    let mut compressed = Vec::new();
    if encoder.read_to_end(&mut compressed).is_err() {
        return None;
    }
    (compressed.len() < data.len()).then_some(compressed)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, ResourceError> {
    let mut decoder = BzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ResourceError::DecompressionFailed(e.to_string()))?;
    Ok(out)
}

/// The subject of the completion proof HMAC.
fn proof_subject(resource_id: &[u8; 16], expected_hash: &[u8; 32]) -> Vec<u8> {
    let mut subject = Vec::with_capacity(48);
    subject.extend_from_slice(resource_id);
    subject.extend_from_slice(expected_hash);
    subject
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    sent_at: f64,
    retries: u32,
}

// ------------------------------------------------------------------ //
// Sender
// ------------------------------------------------------------------ //

/// Sender side of a resource transfer.
#[must_use]
pub struct ResourceSender {
    pub resource_id: [u8; 16],
    payload: Vec<u8>,
    part_size: usize,
    num_parts: u32,
    expected_hash: [u8; 32],
    compressed: bool,
    state: ResourceState,
    acked: Vec<bool>,
    acked_count: u32,
    outstanding: HashMap<u32, Outstanding>,
    window: WindowState,
    next_unsent: u32,
    rtt: f64,
    last_progress: f64,
    loss_this_round: bool,
}

impl ResourceSender {
    /// Prepare a resource for sending: compress when worthwhile, hash, and
    /// segment into `part_size` chunks.
    ///
    /// Returns the sender and the advertisement to transmit.
    pub fn new(
        data: &[u8],
        resource_id: [u8; 16],
        part_size: usize,
        rtt: f64,
        now: f64,
    ) -> Result<(Self, ResourceAdvertisement), ResourceError> {
        if data.len() > MAX_RESOURCE_SIZE {
            return Err(ResourceError::TooLarge {
                size: data.len(),
                max: MAX_RESOURCE_SIZE,
            });
        }
        if part_size == 0 {
            return Err(ResourceError::InvalidPart("zero part size".into()));
        }

        let (payload, compressed) = match compress(data) {
            Some(smaller) => (smaller, true),
            None => (data.to_vec(), false),
        };

        let expected_hash = sha256(&payload);
        let num_parts = payload.len().div_ceil(part_size) as u32;

        let advertisement = ResourceAdvertisement {
            resource_id,
            data_size: data.len() as u64,
            transfer_size: payload.len() as u64,
            num_parts,
            expected_hash,
            flags: if compressed { FLAG_COMPRESSED } else { 0 },
        };

        debug!(
            resource_id = %hex_prefix(&resource_id),
            parts = num_parts,
            transfer_size = payload.len(),
            compressed,
            "resource advertised"
        );

        Ok((
            Self {
                resource_id,
                payload,
                part_size,
                num_parts,
                expected_hash,
                compressed,
                state: ResourceState::Advertised,
                acked: vec![false; num_parts as usize],
                acked_count: 0,
                outstanding: HashMap::new(),
                window: WindowState::new(),
                next_unsent: 0,
                rtt,
                last_progress: now,
                loss_this_round: false,
            },
            advertisement,
        ))
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    #[must_use]
    pub fn window_size(&self) -> u16 {
        self.window.size()
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    #[must_use]
    pub fn expected_hash(&self) -> &[u8; 32] {
        &self.expected_hash
    }

    /// The receiver accepted the advertisement; start transferring.
    pub fn start(&mut self, now: f64) {
        if self.state == ResourceState::Advertised {
            self.state = ResourceState::Transferring;
            self.last_progress = now;
        }
    }

    fn part_timeout(&self) -> f64 {
        (self.rtt * PART_TIMEOUT_FACTOR).max(MIN_PART_TIMEOUT)
    }

    fn chunk(&self, index: u32) -> &[u8] {
        let start = index as usize * self.part_size;
        let end = (start + self.part_size).min(self.payload.len());
        &self.payload[start..end]
    }

    /// Drive the transfer: retransmit timed-out parts and fill the window.
    /// Returns the part messages to send now.
    pub fn poll(&mut self, now: f64) -> Result<Vec<Vec<u8>>, ResourceError> {
        if self.state != ResourceState::Transferring {
            return Ok(Vec::new());
        }

        if now - self.last_progress > STALL_TIMEOUT {
            self.fail(ResourceFailure::TimedOut);
            return Err(ResourceError::Failed(ResourceFailure::TimedOut));
        }

        let timeout = self.part_timeout();
        let mut to_send = Vec::new();
        let mut lost = false;

        let mut timed_out: Vec<u32> = self
            .outstanding
            .iter()
            .filter(|(_, o)| now - o.sent_at > timeout)
            .map(|(&i, _)| i)
            .collect();
        timed_out.sort_unstable();

        for index in timed_out {
            let entry = self.outstanding.get_mut(&index).expect("index collected above");
            if entry.retries >= MAX_RETRIES {
                self.fail(ResourceFailure::RetriesExhausted);
                return Err(ResourceError::Failed(ResourceFailure::RetriesExhausted));
            }
            entry.retries += 1;
            entry.sent_at = now;
            lost = true;
            trace!(index, retries = entry.retries, "part retransmitted");
            to_send.push(encode_part(&self.resource_id, index, self.chunk(index)));
        }

        if lost {
            // One halving per loss observation, not per lost part.
            self.window.on_loss();
            self.loss_this_round = true;
        }

        while self.outstanding.len() < usize::from(self.window.size()) {
            while self.next_unsent < self.num_parts && self.acked[self.next_unsent as usize] {
                self.next_unsent += 1;
            }
            if self.next_unsent >= self.num_parts {
                break;
            }
            let index = self.next_unsent;
            self.next_unsent += 1;
            self.outstanding.insert(
                index,
                Outstanding {
                    sent_at: now,
                    retries: 0,
                },
            );
            to_send.push(encode_part(&self.resource_id, index, self.chunk(index)));
        }

        Ok(to_send)
    }

    /// Fold in a receiver acknowledgement.
    pub fn on_ack(&mut self, ack: &PartAck, now: f64) -> Result<(), ResourceError> {
        if ack.resource_id != self.resource_id {
            return Err(ResourceError::InvalidAck("wrong resource".into()));
        }
        let Some(highest) = ack.highest else {
            return Ok(());
        };
        if highest >= self.num_parts {
            return Err(ResourceError::PartOutOfRange {
                index: highest,
                num_parts: self.num_parts,
            });
        }

        let missing: std::collections::HashSet<u32> = ack.missing.iter().copied().collect();
        let mut progressed = false;
        for index in 0..=highest {
            if missing.contains(&index) || self.acked[index as usize] {
                continue;
            }
            self.acked[index as usize] = true;
            self.acked_count += 1;
            self.outstanding.remove(&index);
            progressed = true;
        }

        if progressed {
            self.last_progress = now;
        }
        if progressed && self.outstanding.is_empty() {
            if !self.loss_this_round {
                self.window.on_round_complete();
            }
            self.loss_this_round = false;
        }

        if self.acked_count == self.num_parts && self.state == ResourceState::Transferring {
            self.state = ResourceState::Assembling;
            debug!(resource_id = %hex_prefix(&self.resource_id), "all parts acknowledged");
        }
        Ok(())
    }

    /// Verify the receiver's completion proof:
    /// `resource_id(16) || HMAC(link, resource_id || expected_hash)`.
    pub fn on_proof(&mut self, payload: &[u8], link: &LinkActive) -> Result<(), ResourceError> {
        if payload.len() != 48 || payload[..16] != self.resource_id {
            return Err(ResourceError::InvalidProof);
        }
        let subject = proof_subject(&self.resource_id, &self.expected_hash);
        if !link.verify(&subject, &payload[16..]) {
            return Err(ResourceError::InvalidProof);
        }
        self.state = ResourceState::Complete;
        debug!(resource_id = %hex_prefix(&self.resource_id), "resource complete");
        Ok(())
    }

    /// The link carrying this transfer closed.
    pub fn on_link_closed(&mut self) {
        if !matches!(self.state, ResourceState::Complete | ResourceState::Failed(_)) {
            self.fail(ResourceFailure::LinkClosed);
        }
    }

    /// Abort the transfer locally.
    pub fn abort(&mut self) {
        if !matches!(self.state, ResourceState::Complete | ResourceState::Failed(_)) {
            self.fail(ResourceFailure::Aborted);
        }
    }

    fn fail(&mut self, reason: ResourceFailure) {
        debug!(resource_id = %hex_prefix(&self.resource_id), %reason, "resource failed");
        self.state = ResourceState::Failed(reason);
        self.outstanding.clear();
        self.payload.clear();
    }
}

// ------------------------------------------------------------------ //
// Receiver
// ------------------------------------------------------------------ //

/// Receiver side of a resource transfer.
#[must_use]
pub struct ResourceReceiver {
    pub resource_id: [u8; 16],
    num_parts: u32,
    expected_hash: [u8; 32],
    data_size: u64,
    compressed: bool,
    state: ResourceState,
    parts: Vec<Option<Vec<u8>>>,
    received: u32,
    last_activity: f64,
}

impl ResourceReceiver {
    /// Accept an advertisement, allocating the part table.
    pub fn accept(adv: &ResourceAdvertisement, now: f64) -> Result<Self, ResourceError> {
        if adv.transfer_size as usize > MAX_RESOURCE_SIZE
            || adv.data_size as usize > MAX_RESOURCE_SIZE
        {
            return Err(ResourceError::TooLarge {
                size: adv.transfer_size as usize,
                max: MAX_RESOURCE_SIZE,
            });
        }
        // Every part except an empty resource's carries at least one byte.
        if u64::from(adv.num_parts) > adv.transfer_size {
            return Err(ResourceError::InvalidAdvertisement(
                "more parts than bytes".into(),
            ));
        }

        Ok(Self {
            resource_id: adv.resource_id,
            num_parts: adv.num_parts,
            expected_hash: adv.expected_hash,
            data_size: adv.data_size,
            compressed: adv.is_compressed(),
            state: ResourceState::Transferring,
            parts: vec![None; adv.num_parts as usize],
            received: 0,
            last_activity: now,
        })
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    #[must_use]
    pub fn received_parts(&self) -> u32 {
        self.received
    }

    /// Ingest a part message. Returns whether it was new.
    pub fn on_part(&mut self, payload: &[u8], now: f64) -> Result<bool, ResourceError> {
        let (resource_id, index, chunk) = decode_part(payload)?;
        if resource_id != self.resource_id {
            return Err(ResourceError::InvalidPart("wrong resource".into()));
        }
        if index >= self.num_parts {
            return Err(ResourceError::PartOutOfRange {
                index,
                num_parts: self.num_parts,
            });
        }

        self.last_activity = now;
        let slot = &mut self.parts[index as usize];
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(chunk.to_vec());
        self.received += 1;
        trace!(index, received = self.received, total = self.num_parts, "part received");

        if self.received == self.num_parts {
            self.state = ResourceState::Assembling;
        }
        Ok(true)
    }

    /// Build the current acknowledgement.
    pub fn ack(&self) -> PartAck {
        let highest = self
            .parts
            .iter()
            .rposition(Option::is_some)
            .map(|i| i as u32);
        let missing = match highest {
            Some(h) => (0..=h)
                .filter(|&i| self.parts[i as usize].is_none())
                .collect(),
            None => Vec::new(),
        };
        PartAck {
            resource_id: self.resource_id,
            highest,
            missing,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received == self.num_parts
    }

    /// Whether the transfer has seen no parts for too long.
    #[must_use]
    pub fn is_stalled(&self, now: f64) -> bool {
        self.state == ResourceState::Transferring && now - self.last_activity > STALL_TIMEOUT
    }

    /// Reassemble, verify the hash, decompress, and produce the completion
    /// proof payload to send back over the link.
    pub fn finalize(&mut self, link: &LinkActive) -> Result<(Vec<u8>, Vec<u8>), ResourceError> {
        if !self.is_complete() {
            return Err(ResourceError::Incomplete);
        }

        let mut assembled = Vec::with_capacity(self.data_size as usize);
        for part in &self.parts {
            assembled.extend_from_slice(part.as_ref().expect("all parts received"));
        }

        if sha256(&assembled) != self.expected_hash {
            self.state = ResourceState::Failed(ResourceFailure::HashMismatch);
            return Err(ResourceError::Failed(ResourceFailure::HashMismatch));
        }

        let data = if self.compressed {
            decompress(&assembled)?
        } else {
            assembled
        };

        let mut proof = Vec::with_capacity(48);
        proof.extend_from_slice(&self.resource_id);
        proof.extend_from_slice(&link.sign(&proof_subject(&self.resource_id, &self.expected_hash)));

        self.state = ResourceState::Complete;
        debug!(
            resource_id = %hex_prefix(&self.resource_id),
            size = data.len(),
            "resource assembled"
        );
        Ok((data, proof))
    }

    /// The link carrying this transfer closed: discard partial data.
    pub fn on_link_closed(&mut self) {
        if !matches!(self.state, ResourceState::Complete | ResourceState::Failed(_)) {
            self.state = ResourceState::Failed(ResourceFailure::LinkClosed);
            self.parts.clear();
        }
    }
}

fn hex_prefix(bytes: &[u8; 16]) -> String {
    bytes[..4].iter().map(|b| format!("{b:02x}")).collect()
}
