//! Pick-smaller compression codec.
//!
//! Every encoded buffer starts with one tag byte naming how the rest was
//! produced:
//!
//! | Tag | Body |
//! |-----|------|
//! | `0` | raw input |
//! | `1` | zstd frame (window log 24) |
//!
//! [`encode`] tries compression and keeps whichever body is smaller; raw
//! wins ties. zstd frames carry their own end marker, so no length is
//! stored.
//!
//! ## Security
//!
//! - Unknown tags are rejected with [`CodecError::UnknownAlgorithm`]
//! - Decoding stops at [`MAX_DECODED_SIZE`] bytes (decompression bombs)
//!
//! ## Example
//!
//! ```
//! use postern_mail::codec;
//!
//! let data = vec![b'a'; 50_000];
//! let encoded = codec::encode(&data).unwrap();
//! assert_eq!(encoded[0], 1);
//! assert_eq!(codec::decode(&encoded).unwrap(), data);
//! ```

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CodecError;
use crate::limits::{COMPRESSION_WINDOW_LOG, DEFAULT_COMPRESSION_LEVEL, MAX_DECODED_SIZE};

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Algorithm tag written in front of every encoded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    /// Body is the raw input.
    Uncompressed = 0,
    /// Body is a zstd frame.
    Zstd = 1,
}

impl CompressionAlgorithm {
    /// The tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CompressionAlgorithm {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Uncompressed),
            1 => Ok(Self::Zstd),
            other => Err(CodecError::UnknownAlgorithm(other)),
        }
    }
}

/// Counters for codec operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecMetrics {
    /// Total bytes passed to `encode`.
    pub input_bytes: u64,
    /// Total bytes returned by `encode`, tags included.
    pub output_bytes: u64,
    /// Encodes that kept the compressed body.
    pub compressed_chosen: u64,
    /// Encodes that kept the raw body.
    pub raw_chosen: u64,
    /// Successful decodes.
    pub decodes: u64,
    /// Failed decodes.
    pub decode_failures: u64,
}

impl CodecMetrics {
    /// Ratio of output to input bytes (lower is better).
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            1.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }
}

#[derive(Debug, Default)]
struct AtomicMetrics {
    input_bytes: AtomicU64,
    output_bytes: AtomicU64,
    compressed_chosen: AtomicU64,
    raw_chosen: AtomicU64,
    decodes: AtomicU64,
    decode_failures: AtomicU64,
}

/// Codec with a fixed compression level and running metrics.
///
/// Encoding and decoding are pure functions of their input; the metrics
/// are the only state and are updated atomically, so a `Codec` can be
/// shared by reference.
#[derive(Debug)]
pub struct Codec {
    level: i32,
    metrics: AtomicMetrics,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Codec {
    /// Create a codec. The level is clamped to 1-22.
    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
            metrics: AtomicMetrics::default(),
        }
    }

    /// The compression level.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Snapshot of the metrics.
    pub fn metrics(&self) -> CodecMetrics {
        let m = &self.metrics;
        CodecMetrics {
            input_bytes: m.input_bytes.load(Ordering::Relaxed),
            output_bytes: m.output_bytes.load(Ordering::Relaxed),
            compressed_chosen: m.compressed_chosen.load(Ordering::Relaxed),
            raw_chosen: m.raw_chosen.load(Ordering::Relaxed),
            decodes: m.decodes.load(Ordering::Relaxed),
            decode_failures: m.decode_failures.load(Ordering::Relaxed),
        }
    }

    /// Encode `data`, keeping the smaller of raw and compressed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Compression`] if zstd fails.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let compressed = compress(data, self.level)?;

        let (algorithm, body) = if data.len() <= compressed.len() {
            self.metrics.raw_chosen.fetch_add(1, Ordering::Relaxed);
            (CompressionAlgorithm::Uncompressed, data)
        } else {
            self.metrics
                .compressed_chosen
                .fetch_add(1, Ordering::Relaxed);
            (CompressionAlgorithm::Zstd, &compressed[..])
        };

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(algorithm.tag());
        out.extend_from_slice(body);

        self.metrics
            .input_bytes
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        self.metrics
            .output_bytes
            .fetch_add(out.len() as u64, Ordering::Relaxed);

        trace!(
            input = data.len(),
            output = out.len(),
            algorithm = ?algorithm,
            "Encoded buffer"
        );
        Ok(out)
    }

    /// Decode a buffer produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, carries an unknown tag,
    /// holds a corrupt zstd frame, or decodes to more than
    /// [`MAX_DECODED_SIZE`] bytes.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let result = decode_inner(data);
        let counter = match result {
            Ok(_) => &self.metrics.decodes,
            Err(_) => &self.metrics.decode_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }
}

/// Encode with the default compression level.
pub fn encode(data: &[u8]) -> Result<Vec<u8>> {
    Codec::default().encode(data)
}

/// Decode a tagged buffer.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    decode_inner(data)
}

fn compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let to_err = |e: std::io::Error| CodecError::Compression(e.to_string());

    let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), level).map_err(to_err)?;
    encoder.window_log(COMPRESSION_WINDOW_LOG).map_err(to_err)?;
    encoder.write_all(data).map_err(to_err)?;
    encoder.finish().map_err(to_err)
}

fn decode_inner(data: &[u8]) -> Result<Vec<u8>> {
    let (&tag, body) = data.split_first().ok_or(CodecError::Empty)?;

    match CompressionAlgorithm::try_from(tag)? {
        CompressionAlgorithm::Uncompressed => {
            if body.len() > MAX_DECODED_SIZE {
                return Err(CodecError::TooLarge {
                    size: body.len(),
                    max: MAX_DECODED_SIZE,
                });
            }
            Ok(body.to_vec())
        }
        CompressionAlgorithm::Zstd => decompress(body),
    }
}

fn decompress(body: &[u8]) -> Result<Vec<u8>> {
    let to_err = |e: std::io::Error| CodecError::Decompression(e.to_string());

    let mut decoder = zstd::stream::read::Decoder::new(body).map_err(to_err)?;
    decoder
        .window_log_max(COMPRESSION_WINDOW_LOG)
        .map_err(to_err)?;

    // SECURITY: read at most one byte past the limit
    let mut out = Vec::new();
    decoder
        .take(MAX_DECODED_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(to_err)?;

    if out.len() > MAX_DECODED_SIZE {
        return Err(CodecError::TooLarge {
            size: out.len(),
            max: MAX_DECODED_SIZE,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut data = vec![0u8; len];
        rng.fill_bytes(&mut data);
        data
    }

    #[test]
    fn test_redundant_input_is_compressed() {
        let data = vec![b'x'; 50_000];
        let encoded = encode(&data).unwrap();
        assert_eq!(encoded[0], CompressionAlgorithm::Zstd.tag());
        assert!(encoded.len() < data.len() + 1);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_random_input_stays_raw() {
        let data = random_bytes(1000);
        let encoded = encode(&data).unwrap();
        assert_eq!(encoded[0], CompressionAlgorithm::Uncompressed.tag());
        assert_eq!(encoded.len(), data.len() + 1);
        assert_eq!(&encoded[1..], &data[..]);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_empty_input() {
        let encoded = encode(&[]).unwrap();
        assert_eq!(encoded, vec![0]);
        assert_eq!(decode(&encoded).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert!(matches!(decode(&[]), Err(CodecError::Empty)));
    }

    #[test]
    fn test_unknown_tag() {
        for tag in [2u8, 7, 255] {
            assert!(matches!(
                decode(&[tag, 1, 2, 3]),
                Err(CodecError::UnknownAlgorithm(t)) if t == tag
            ));
        }
    }

    #[test]
    fn test_corrupt_frame() {
        assert!(matches!(
            decode(&[1, 0xde, 0xad, 0xbe, 0xef]),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn test_truncated_frame() {
        let encoded = encode(&vec![b'y'; 10_000]).unwrap();
        assert_eq!(encoded[0], 1);
        let truncated = &encoded[..encoded.len() - 3];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn test_decompression_bomb_rejected() {
        let data = vec![0u8; MAX_DECODED_SIZE + 1];
        let compressed = compress(&data, 1).unwrap();
        let mut encoded = vec![CompressionAlgorithm::Zstd.tag()];
        encoded.extend_from_slice(&compressed);

        assert!(matches!(
            decode(&encoded),
            Err(CodecError::TooLarge { max: MAX_DECODED_SIZE, .. })
        ));
    }

    #[test]
    fn test_algorithm_try_from() {
        assert_eq!(
            CompressionAlgorithm::try_from(0).unwrap(),
            CompressionAlgorithm::Uncompressed
        );
        assert_eq!(
            CompressionAlgorithm::try_from(1).unwrap(),
            CompressionAlgorithm::Zstd
        );
        assert!(CompressionAlgorithm::try_from(2).is_err());
    }

    #[test]
    fn test_level_clamping() {
        assert_eq!(Codec::new(-5).level(), 1);
        assert_eq!(Codec::new(100).level(), 22);
    }

    #[test]
    fn test_metrics() {
        let codec = Codec::new(3);
        let redundant = codec.encode(&vec![b'z'; 10_000]).unwrap();
        let _ = codec.encode(&random_bytes(500)).unwrap();
        codec.decode(&redundant).unwrap();
        let _ = codec.decode(&[9]);

        let metrics = codec.metrics();
        assert_eq!(metrics.compressed_chosen, 1);
        assert_eq!(metrics.raw_chosen, 1);
        assert_eq!(metrics.input_bytes, 10_500);
        assert_eq!(metrics.decodes, 1);
        assert_eq!(metrics.decode_failures, 1);
        assert!(metrics.compression_ratio() < 1.0);
    }
}
