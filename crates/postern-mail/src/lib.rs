//! # postern-mail
//!
//! Message transformation core for postern.
//!
//! This crate turns a composed [`Message`] into a set of bounded-size
//! [`Packet`]s ready for an untrusted distributed store, and reverses the
//! transformation on receipt:
//!
//! ```text
//! Message ─► privacy filter ─► sign ─► serialize ─► codec ─► packets
//! packets ─► reassemble ─► codec⁻¹ ─► parse ─► verify ─► Message
//! ```
//!
//! ## Privacy Design
//!
//! - Only whitelisted headers survive (no `X-Mailer`, `Received`, ...)
//! - Display names are stripped from recipient destinations
//! - Each BCC recipient's packets carry only that recipient's BCC entry
//! - The send time is included only when configured
//!
//! ## Example
//!
//! ```
//! use postern_crypto::{SignatureScheme, SigningIdentity};
//! use postern_mail::{Message, PipelineConfig, Packetizer};
//!
//! let alice = SigningIdentity::generate("Alice", SignatureScheme::Ed25519);
//! let bob = SigningIdentity::generate("Bob", SignatureScheme::Ed25519);
//!
//! let mut message = Message::new();
//! message.headers_mut().set("Sender", &alice.sender_address());
//! message.headers_mut().set("To", &bob.destination().to_address());
//! message.headers_mut().set("Subject", "hello");
//! message.set_text("Hi Bob!");
//!
//! let packetizer = Packetizer::new(PipelineConfig::default()).unwrap();
//! let packets = packetizer.packetize(&message, Some(&alice), None).unwrap();
//! let received = packetizer.unpack(packets).unwrap();
//!
//! assert_eq!(received.text().as_deref(), Some("Hi Bob!"));
//! assert!(postern_mail::signing::verify(&received, &alice.destination()).is_valid());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunking;
pub mod codec;
pub mod config;
pub mod error;
pub mod limits;
pub mod message;
pub mod pipeline;
pub mod privacy;
pub mod signing;

#[cfg(test)]
mod proptests;

pub use chunking::{reassemble, split_into_packets, Packet, PacketReassembler};
pub use codec::{Codec, CodecMetrics, CompressionAlgorithm};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{
    AddressError, CodecError, ConfigError, MimeError, PacketError, PacketizeError,
    SignatureError, UnpackError,
};
pub use limits::MAX_BLOCK_SIZE;
pub use message::{Content, HeaderField, Headers, Message, MessageField, MessageId, Part};
pub use pipeline::Packetizer;
pub use privacy::HeaderPrivacyFilter;
pub use signing::{SignatureHeader, VerificationOutcome};
