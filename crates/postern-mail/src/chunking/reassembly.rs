//! Packet reassembly.
//!
//! [`reassemble`] joins a complete packet set in one call. The
//! [`PacketReassembler`] collects packets as they arrive from the
//! transport, in any order, across many messages.
//!
//! # Security
//!
//! The reassembler bounds the memory an untrusted transport can pin:
//! - Maximum concurrent pending sessions (`MAX_PENDING_REASSEMBLIES`)
//! - Maximum buffer size per session (`MAX_REASSEMBLY_BUFFER`)
//! - Session timeout (`REASSEMBLY_TIMEOUT_SECS` by default)

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::config::PipelineConfig;
use crate::error::PacketError;
use crate::limits::{
    MAX_BLOCK_SIZE, MAX_PENDING_REASSEMBLIES, MAX_REASSEMBLY_BUFFER, REASSEMBLY_TIMEOUT_SECS,
};
use crate::message::MessageId;

use super::packet::Packet;

type Result<T> = std::result::Result<T, PacketError>;

/// Join the packets of one message into the encoded bytes.
///
/// Packets may arrive in any order. Exact duplicates are ignored.
///
/// # Errors
///
/// Returns an error if:
/// - No packets were given
/// - Packets carry different message ids or total counts
/// - Two packets share an index but differ in payload
/// - An index is missing
/// - A non-final packet is not full, or the final packet of a
///   multi-packet message is empty
pub fn reassemble(mut packets: Vec<Packet>) -> Result<Vec<u8>> {
    let first = packets.first().ok_or(PacketError::NoPackets)?;
    let message_id = first.message_id();
    let total = first.total_count();

    for packet in &packets {
        packet.validate()?;
        if packet.message_id() != message_id {
            return Err(PacketError::MixedMessageIds);
        }
        if packet.total_count() != total {
            return Err(PacketError::TotalCountMismatch {
                expected: total,
                actual: packet.total_count(),
            });
        }
    }

    packets.sort_by_key(Packet::index);

    let mut unique: Vec<Packet> = Vec::with_capacity(total as usize);
    for packet in packets {
        match unique.last() {
            Some(prev) if prev.index() == packet.index() => {
                if prev.payload() != packet.payload() {
                    return Err(PacketError::ConflictingDuplicate {
                        index: packet.index(),
                    });
                }
            }
            _ => unique.push(packet),
        }
    }

    // indices are distinct and below total, so a full count means no gaps
    if unique.len() != total as usize {
        return Err(PacketError::Incomplete {
            received: unique.len(),
            expected: total as usize,
        });
    }

    let mut data = Vec::with_capacity(unique.iter().map(|p| p.payload().len()).sum());
    for packet in unique {
        check_payload_size(&packet)?;
        data.extend_from_slice(packet.payload());
    }
    Ok(data)
}

fn check_payload_size(packet: &Packet) -> Result<()> {
    let size = packet.payload().len();
    let valid = if packet.is_last() {
        size > 0 || packet.total_count() == 1
    } else {
        size == MAX_BLOCK_SIZE
    };
    if valid {
        Ok(())
    } else {
        Err(PacketError::InvalidPayloadSize {
            index: packet.index(),
            size,
        })
    }
}

/// Internal state for a partially received message.
#[derive(Debug)]
struct PendingMessage {
    /// Total number of packets expected.
    total_count: u32,
    /// Packets received so far, by index.
    packets: BTreeMap<u32, Packet>,
    /// Timestamp of the first received packet (Unix seconds).
    first_received: u64,
    /// Buffered payload bytes.
    buffer_size: usize,
}

impl PendingMessage {
    fn new(packet: Packet, timestamp: u64) -> Self {
        let total_count = packet.total_count();
        let buffer_size = packet.payload().len();
        let mut packets = BTreeMap::new();
        packets.insert(packet.index(), packet);

        Self {
            total_count,
            packets,
            first_received: timestamp,
            buffer_size,
        }
    }

    /// Add a packet. Returns `Ok(true)` once every index is present.
    fn add_packet(&mut self, packet: Packet, max_buffer: usize) -> Result<bool> {
        if packet.total_count() != self.total_count {
            return Err(PacketError::TotalCountMismatch {
                expected: self.total_count,
                actual: packet.total_count(),
            });
        }

        if let Some(existing) = self.packets.get(&packet.index()) {
            if existing.payload() != packet.payload() {
                return Err(PacketError::ConflictingDuplicate {
                    index: packet.index(),
                });
            }
            return Ok(self.is_complete());
        }

        // SECURITY: check buffer limit before storing
        let new_buffer_size = self.buffer_size.saturating_add(packet.payload().len());
        if new_buffer_size > max_buffer {
            return Err(PacketError::ReassemblyBufferExceeded {
                size: new_buffer_size,
                max: max_buffer,
            });
        }

        self.buffer_size = new_buffer_size;
        self.packets.insert(packet.index(), packet);
        Ok(self.is_complete())
    }

    fn is_complete(&self) -> bool {
        self.packets.len() == self.total_count as usize
    }

    fn is_expired(&self, current_time: u64, max_age_secs: u64) -> bool {
        current_time.saturating_sub(self.first_received) > max_age_secs
    }

    fn into_packets(self) -> Vec<Packet> {
        self.packets.into_values().collect()
    }
}

/// Collects packets from the transport and yields complete messages.
///
/// # Example
///
/// ```
/// use postern_mail::{split_into_packets, MessageId, PacketReassembler};
///
/// let data = vec![42u8; 70_000];
/// let packets = split_into_packets(MessageId::generate(), &data).unwrap();
///
/// let mut reassembler = PacketReassembler::new(300);
/// let mut complete = None;
/// for packet in packets.into_iter().rev() {
///     complete = reassembler.add_packet(packet, 1000).unwrap();
/// }
/// assert_eq!(complete, Some(data));
/// ```
#[derive(Debug)]
pub struct PacketReassembler {
    /// Pending messages by id.
    pending: HashMap<MessageId, PendingMessage>,
    /// Maximum age in seconds before a pending message expires.
    max_pending_age_secs: u64,
    /// Maximum number of concurrent pending sessions.
    max_pending_sessions: usize,
    /// Maximum buffered bytes per session.
    max_buffer_per_session: usize,
}

impl PacketReassembler {
    /// Create a reassembler that expires incomplete messages after
    /// `max_pending_age_secs`.
    pub fn new(max_pending_age_secs: u64) -> Self {
        Self {
            pending: HashMap::new(),
            max_pending_age_secs,
            max_pending_sessions: MAX_PENDING_REASSEMBLIES,
            max_buffer_per_session: MAX_REASSEMBLY_BUFFER,
        }
    }

    /// Create a reassembler using the configured timeout.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.reassembly_timeout_secs)
    }

    /// Create a reassembler with custom limits.
    #[cfg(test)]
    pub fn new_with_limits(
        max_pending_age_secs: u64,
        max_pending_sessions: usize,
        max_buffer_per_session: usize,
    ) -> Self {
        Self {
            pending: HashMap::new(),
            max_pending_age_secs,
            max_pending_sessions,
            max_buffer_per_session,
        }
    }

    /// Add a packet.
    ///
    /// Returns `Ok(Some(bytes))` when the packet completes its message,
    /// `Ok(None)` while more packets are needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The packet fails validation
    /// - It disagrees with earlier packets of the same message
    /// - Too many sessions are pending
    /// - The session buffer limit would be exceeded
    /// - The completed packet set fails [`reassemble`]
    pub fn add_packet(&mut self, packet: Packet, current_time: u64) -> Result<Option<Vec<u8>>> {
        packet.validate()?;

        if packet.total_count() == 1 {
            return reassemble(vec![packet]).map(Some);
        }

        let message_id = packet.message_id();

        if let Some(pending) = self.pending.get_mut(&message_id) {
            if pending.add_packet(packet, self.max_buffer_per_session)? {
                if let Some(pending) = self.pending.remove(&message_id) {
                    debug!(%message_id, packets = pending.total_count, "Message complete");
                    return reassemble(pending.into_packets()).map(Some);
                }
            }
            return Ok(None);
        }

        // SECURITY: check session limit before opening a new one
        if self.pending.len() >= self.max_pending_sessions {
            return Err(PacketError::TooManyPendingSessions {
                current: self.pending.len(),
                max: self.max_pending_sessions,
            });
        }

        let size = packet.payload().len();
        if size > self.max_buffer_per_session {
            return Err(PacketError::ReassemblyBufferExceeded {
                size,
                max: self.max_buffer_per_session,
            });
        }

        trace!(%message_id, total = packet.total_count(), "Opening reassembly session");
        self.pending
            .insert(message_id, PendingMessage::new(packet, current_time));
        Ok(None)
    }

    /// Remove expired sessions. Returns how many were removed.
    pub fn cleanup_expired(&mut self, current_time: u64) -> usize {
        let max_age = self.max_pending_age_secs;
        let before_count = self.pending.len();

        self.pending
            .retain(|_, pending| !pending.is_expired(current_time, max_age));

        let removed = before_count - self.pending.len();
        if removed > 0 {
            debug!(removed, "Expired incomplete messages");
        }
        removed
    }

    /// Number of incomplete messages.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether packets of `message_id` are waiting for the rest.
    pub fn is_pending(&self, message_id: &MessageId) -> bool {
        self.pending.contains_key(message_id)
    }

    /// `(received, total)` for a pending message.
    pub fn pending_progress(&self, message_id: &MessageId) -> Option<(usize, u32)> {
        self.pending
            .get(message_id)
            .map(|p| (p.packets.len(), p.total_count))
    }

    /// Session limit.
    pub fn max_pending_sessions(&self) -> usize {
        self.max_pending_sessions
    }

    /// Per-session buffer limit in bytes.
    pub fn max_buffer_per_session(&self) -> usize {
        self.max_buffer_per_session
    }

    /// Buffered bytes across all sessions.
    pub fn total_buffer_size(&self) -> usize {
        self.pending.values().map(|p| p.buffer_size).sum()
    }
}

impl Default for PacketReassembler {
    fn default() -> Self {
        Self::new(REASSEMBLY_TIMEOUT_SECS)
    }
}
