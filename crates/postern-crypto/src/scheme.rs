//! Signature scheme registry.
//!
//! Every signature carried by a message is prefixed with the one-byte id
//! of the scheme that produced it, because schemes differ in key and
//! signature length. Ids are stable wire values and must never be reused.

use serde::{Deserialize, Serialize};

use crate::{dilithium, ed25519, CryptoError, Result};

/// Supported signature schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignatureScheme {
    /// Ed25519 (RFC 8032).
    Ed25519 = 1,

    /// CRYSTALS-Dilithium, parameter set 3.
    Dilithium3 = 2,
}

impl SignatureScheme {
    /// All supported schemes in id order.
    pub const ALL: [SignatureScheme; 2] = [SignatureScheme::Ed25519, SignatureScheme::Dilithium3];

    /// Look up a scheme by its wire id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Ed25519),
            2 => Some(Self::Dilithium3),
            _ => None,
        }
    }

    /// The wire id of this scheme.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Human-readable scheme name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::Dilithium3 => "Dilithium3",
        }
    }

    /// Public key length in bytes.
    pub fn public_key_len(self) -> usize {
        match self {
            Self::Ed25519 => ed25519::PUBLIC_KEY_SIZE,
            Self::Dilithium3 => dilithium::PUBLIC_KEY_SIZE,
        }
    }

    /// Signature length in bytes.
    pub fn signature_len(self) -> usize {
        match self {
            Self::Ed25519 => ed25519::SIGNATURE_SIZE,
            Self::Dilithium3 => dilithium::SIGNATURE_SIZE,
        }
    }

    /// Verify `signature` over `message` with a raw public key of this scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or the signature does not verify.
    pub fn verify(self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::Ed25519 => ed25519::verify(public_key, message, signature),
            Self::Dilithium3 => dilithium::verify(public_key, message, signature),
        }
    }
}

impl TryFrom<u8> for SignatureScheme {
    type Error = CryptoError;

    fn try_from(id: u8) -> Result<Self> {
        Self::from_id(id).ok_or(CryptoError::UnknownAlgorithm(id))
    }
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
