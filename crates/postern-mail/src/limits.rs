//! Protocol limits and constants.
//!
//! All protocol limits are defined here for consistent enforcement.

// === Packets ===

/// Maximum payload bytes per transport packet (30 KiB).
pub const MAX_BLOCK_SIZE: usize = 30 * 1024;

/// Maximum packets a single message may be split into.
pub const MAX_PACKETS_PER_MESSAGE: usize = 1024;

/// Size of the fixed packet header on the wire: id, index, total count.
pub const PACKET_HEADER_SIZE: usize = 32 + 4 + 4;

// === Codec ===

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;

/// zstd window log (2^24 = 16 MiB).
pub const COMPRESSION_WINDOW_LOG: u32 = 24;

/// Upper bound on decoded message size (decompression bomb protection).
pub const MAX_DECODED_SIZE: usize = 64 * 1024 * 1024;

// === Reassembly ===

/// Maximum concurrent partially received messages.
pub const MAX_PENDING_REASSEMBLIES: usize = 64;

/// Maximum buffered payload bytes for one partially received message.
pub const MAX_REASSEMBLY_BUFFER: usize = MAX_BLOCK_SIZE * MAX_PACKETS_PER_MESSAGE;

/// Default time to wait for the remaining packets of a message (1 hour).
pub const REASSEMBLY_TIMEOUT_SECS: u64 = 60 * 60;

// === MIME ===

/// Maximum multipart nesting depth accepted by the parser.
pub const MAX_MIME_DEPTH: usize = 16;

/// Line length for base64 transfer-encoded parts.
pub const BASE64_LINE_LENGTH: usize = 76;
