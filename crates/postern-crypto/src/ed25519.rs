//! Ed25519 signature scheme.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::{CryptoError, Result};

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Ed25519 key pair.
///
/// The signing key zeroizes itself on drop.
pub struct Ed25519KeyPair {
    signing: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new key pair from OS randomness.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Derive a key pair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Public key bytes.
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing.verifying_key().to_bytes()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing.sign(message).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let public = self.public_key();
        write!(
            f,
            "Ed25519KeyPair {{ signing: [REDACTED], public: {:02x}{:02x}{:02x}{:02x}.. }}",
            public[0], public[1], public[2], public[3]
        )
    }
}

/// Verify an Ed25519 signature using strict verification.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyLength` if the key is not 32 bytes or
/// not a valid curve point, and `CryptoError::SignatureVerification` if the
/// signature does not match.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let key_bytes: &[u8; PUBLIC_KEY_SIZE] =
        public_key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                actual: public_key.len(),
            })?;
    let verifying_key =
        VerifyingKey::from_bytes(key_bytes).map_err(|_| CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_SIZE,
            actual: public_key.len(),
        })?;
    let signature =
        Signature::from_slice(signature).map_err(|_| CryptoError::SignatureVerification)?;

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| CryptoError::SignatureVerification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = Ed25519KeyPair::generate();
        let signature = keypair.sign(b"message");
        assert_eq!(signature.len(), SIGNATURE_SIZE);
        assert!(verify(&keypair.public_key(), b"message", &signature).is_ok());
    }

    #[test]
    fn test_verify_wrong_message() {
        let keypair = Ed25519KeyPair::generate();
        let signature = keypair.sign(b"message");
        assert!(matches!(
            verify(&keypair.public_key(), b"massage", &signature),
            Err(CryptoError::SignatureVerification)
        ));
    }

    #[test]
    fn test_verify_truncated_signature() {
        let keypair = Ed25519KeyPair::generate();
        let signature = keypair.sign(b"message");
        assert!(verify(&keypair.public_key(), b"message", &signature[..63]).is_err());
    }

    #[test]
    fn test_verify_bad_key_length() {
        assert!(matches!(
            verify(&[1u8; 31], b"message", &[0u8; 64]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = Ed25519KeyPair::from_seed(&[3u8; 32]);
        let b = Ed25519KeyPair::from_seed(&[3u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert!(format!("{:?}", a).contains("REDACTED"));
    }
}
