//! Error types for the mail pipeline.
//!
//! Each pipeline stage has its own error type. The outer operations
//! (`packetize`, `unpack`) wrap them so a caller can always tell which
//! stage rejected a message.

use thiserror::Error;

/// Errors produced by the compression codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input has no algorithm tag byte.
    #[error("Encoded data is empty")]
    Empty,

    /// The leading tag byte names no known algorithm.
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(u8),

    /// Compression failed.
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Decompression failed (corrupt or truncated stream).
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// Decoded data exceeds the size limit.
    #[error("Decoded data too large: {size} bytes exceeds maximum {max} bytes")]
    TooLarge {
        /// Size reached before decoding stopped.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}

/// Errors produced by the signature protocol.
///
/// Verification never returns these; it fails closed to
/// [`VerificationOutcome`](crate::VerificationOutcome) instead.
#[derive(Error, Debug)]
pub enum SignatureError {
    /// The signature header is not `{algorithm_id}_{base64}`.
    #[error("Malformed signature header: {0}")]
    Malformed(String),

    /// The algorithm id names no supported scheme.
    #[error("Unknown signature algorithm: {0}")]
    UnknownAlgorithm(u8),

    /// The sender's public key could not be derived from its address.
    #[error("Cannot derive sender key: {0}")]
    KeyDerivationFailed(String),

    /// The identity failed to produce a signature.
    #[error("Signing failed: {0}")]
    Signing(#[from] postern_crypto::CryptoError),
}

/// Errors produced by address validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The value is neither a destination nor an external address with a domain.
    #[error("Address is neither a destination nor a valid external address: {0}")]
    InvalidAddress(String),
}

/// Errors produced by the MIME parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MimeError {
    /// No blank line separates the header section from the body.
    #[error("Missing blank line after header section")]
    MissingHeaderTerminator,

    /// A header line has no `:` or an empty name.
    #[error("Invalid header line: {0}")]
    InvalidHeaderLine(String),

    /// A multipart content type carries no boundary parameter.
    #[error("Multipart content without boundary")]
    MissingBoundary,

    /// The closing boundary delimiter was not found.
    #[error("Unterminated multipart body (boundary {0})")]
    UnterminatedMultipart(String),

    /// Multipart nesting exceeds the limit.
    #[error("Multipart nesting exceeds maximum depth {max}")]
    NestingTooDeep {
        /// Maximum allowed depth.
        max: usize,
    },

    /// The header section is not valid UTF-8.
    #[error("Header section is not valid UTF-8")]
    InvalidEncoding,

    /// The MIME parser could not make sense of the bytes.
    #[error("Unparseable MIME structure")]
    Unparseable,
}

/// Errors produced while splitting or reassembling packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Packet index is not below the total count.
    #[error("Invalid packet index: {index} >= total {total}")]
    InvalidIndex {
        /// The invalid index.
        index: u32,
        /// Total number of packets.
        total: u32,
    },

    /// Total count is zero or above the per-message limit.
    #[error("Invalid packet count: {actual} (max {max})")]
    TooManyPackets {
        /// Maximum allowed packets.
        max: usize,
        /// Actual packet count.
        actual: usize,
    },

    /// Payload exceeds the block size.
    #[error("Packet payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Maximum payload size.
        max: usize,
    },

    /// A non-final packet is not full, or a final packet is empty.
    #[error("Packet {index} has invalid payload size {size}")]
    InvalidPayloadSize {
        /// Index of the offending packet.
        index: u32,
        /// Its payload size.
        size: usize,
    },

    /// Reassembly was given no packets.
    #[error("No packets to reassemble")]
    NoPackets,

    /// Packets from different messages were mixed.
    #[error("Packets belong to different messages")]
    MixedMessageIds,

    /// Packets of one message disagree on the total count.
    #[error("Total count mismatch: expected {expected}, got {actual}")]
    TotalCountMismatch {
        /// Count carried by the first packet.
        expected: u32,
        /// Disagreeing count.
        actual: u32,
    },

    /// Not all packets were received.
    #[error("Incomplete message: received {received} of {expected} packets")]
    Incomplete {
        /// Number of distinct packets received.
        received: usize,
        /// Total packets expected.
        expected: usize,
    },

    /// Two packets share an index but carry different payloads.
    #[error("Conflicting payloads for packet {index}")]
    ConflictingDuplicate {
        /// The duplicated index.
        index: u32,
    },

    /// Too many pending reassembly sessions.
    #[error("Too many pending reassembly sessions: {current} exceeds maximum {max}")]
    TooManyPendingSessions {
        /// Current number of pending sessions.
        current: usize,
        /// Maximum allowed sessions.
        max: usize,
    },

    /// Reassembly buffer exceeded.
    #[error("Reassembly buffer size exceeded: {size} bytes exceeds maximum {max} bytes")]
    ReassemblyBufferExceeded {
        /// Buffer size after the rejected packet.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Wire bytes are shorter than the packet header.
    #[error("Packet truncated: {len} bytes")]
    Truncated {
        /// Length of the truncated input.
        len: usize,
    },
}

/// Errors produced by [`Packetizer::packetize`](crate::Packetizer::packetize).
///
/// No packets are ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum PacketizeError {
    /// An address header failed validation.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Signing failed.
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Encoding failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Splitting failed.
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// The message names a sender but no identity was supplied to sign it.
    #[error("Message has a sender but no signing identity was provided")]
    MissingIdentity,
}

/// Errors produced by [`Packetizer::unpack`](crate::Packetizer::unpack).
#[derive(Error, Debug)]
pub enum UnpackError {
    /// Reassembly failed.
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// Decoding failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The decoded bytes are not a message.
    #[error("MIME error: {0}")]
    Mime(#[from] MimeError),
}

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}
