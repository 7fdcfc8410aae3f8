//! Transport packets and splitting.

use serde::{Deserialize, Serialize};

use crate::error::PacketError;
use crate::limits::{MAX_BLOCK_SIZE, MAX_PACKETS_PER_MESSAGE, PACKET_HEADER_SIZE};
use crate::message::MessageId;

/// One bounded-size slice of an encoded message.
///
/// Wire form: `message_id (32) || index (u32 BE) || total_count (u32 BE) || payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Id of the message this packet belongs to.
    message_id: MessageId,
    /// Zero-based position within the message.
    index: u32,
    /// Number of packets in the message.
    total_count: u32,
    /// Up to `MAX_BLOCK_SIZE` bytes of the encoded message.
    payload: Vec<u8>,
}

impl Packet {
    /// Create a packet.
    ///
    /// # Errors
    ///
    /// Returns an error if `total_count` is zero or above
    /// `MAX_PACKETS_PER_MESSAGE`, `index >= total_count`, or the payload is
    /// larger than `MAX_BLOCK_SIZE`.
    pub fn new(
        message_id: MessageId,
        index: u32,
        total_count: u32,
        payload: Vec<u8>,
    ) -> Result<Self, PacketError> {
        let packet = Self {
            message_id,
            index,
            total_count,
            payload,
        };
        packet.validate()?;
        Ok(packet)
    }

    /// Check header fields and payload size.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.total_count == 0 || self.total_count as usize > MAX_PACKETS_PER_MESSAGE {
            return Err(PacketError::TooManyPackets {
                max: MAX_PACKETS_PER_MESSAGE,
                actual: self.total_count as usize,
            });
        }

        if self.index >= self.total_count {
            return Err(PacketError::InvalidIndex {
                index: self.index,
                total: self.total_count,
            });
        }

        if self.payload.len() > MAX_BLOCK_SIZE {
            return Err(PacketError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_BLOCK_SIZE,
            });
        }

        Ok(())
    }

    /// The message id.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// The packet index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The total packet count.
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// The payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Take the payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Whether this is the last packet of its message.
    pub fn is_last(&self) -> bool {
        self.index == self.total_count.saturating_sub(1)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PACKET_HEADER_SIZE + self.payload.len());
        out.extend_from_slice(self.message_id.as_bytes());
        out.extend_from_slice(&self.index.to_be_bytes());
        out.extend_from_slice(&self.total_count.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::Truncated`] for input shorter than the header,
    /// and the errors of [`Packet::new`] for invalid fields.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < PACKET_HEADER_SIZE {
            return Err(PacketError::Truncated { len: bytes.len() });
        }

        let (id, rest) = bytes.split_at(MessageId::SIZE);
        let (index, rest) = rest.split_at(4);
        let (total, payload) = rest.split_at(4);

        let message_id =
            MessageId::from_slice(id).ok_or(PacketError::Truncated { len: bytes.len() })?;
        let index = u32::from_be_bytes([index[0], index[1], index[2], index[3]]);
        let total_count = u32::from_be_bytes([total[0], total[1], total[2], total[3]]);

        Self::new(message_id, index, total_count, payload.to_vec())
    }
}

/// Split encoded bytes into packets of `MAX_BLOCK_SIZE`.
///
/// Every packet but the last is full. Empty input yields a single empty
/// packet with `total_count == 1`.
///
/// # Errors
///
/// Returns [`PacketError::TooManyPackets`] if more than
/// `MAX_PACKETS_PER_MESSAGE` packets would be needed.
pub fn split_into_packets(message_id: MessageId, data: &[u8]) -> Result<Vec<Packet>, PacketError> {
    if data.is_empty() {
        return Ok(vec![Packet::new(message_id, 0, 1, Vec::new())?]);
    }

    let total = data.len().div_ceil(MAX_BLOCK_SIZE);
    if total > MAX_PACKETS_PER_MESSAGE {
        return Err(PacketError::TooManyPackets {
            max: MAX_PACKETS_PER_MESSAGE,
            actual: total,
        });
    }

    data.chunks(MAX_BLOCK_SIZE)
        .enumerate()
        .map(|(i, chunk)| Packet::new(message_id, i as u32, total as u32, chunk.to_vec()))
        .collect()
}
