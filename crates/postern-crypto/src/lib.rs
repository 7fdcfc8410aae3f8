//! # postern-crypto
//!
//! Signing capability consumed by the postern mail pipeline.
//!
//! The pipeline never touches key material directly. It works with two
//! capabilities:
//! - **SigningIdentity**: signs bytes on behalf of a sender and reports the
//!   one-byte algorithm id of its scheme
//! - **Destination**: a public verification key recovered from a
//!   self-describing address string
//!
//! Supported schemes:
//! - **Ed25519** (id 1), 64-byte signatures
//! - **Dilithium3** (id 2), 3,293-byte signatures
//!
//! ## Security
//!
//! All private key material uses `zeroize` for memory cleanup.
//! Signature comparisons use constant-time operations via `subtle`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod destination;
pub mod dilithium;
pub mod ed25519;
pub mod error;
pub mod hash;
pub mod identity;
pub mod scheme;

pub use destination::Destination;
pub use error::{CryptoError, Result};
pub use hash::Hash256;
pub use identity::SigningIdentity;
pub use scheme::SignatureScheme;
