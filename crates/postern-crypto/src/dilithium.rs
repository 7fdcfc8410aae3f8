//! Dilithium3 (CRYSTALS-Dilithium, NIST level 3) signature scheme.
//!
//! Backed by `pqcrypto-dilithium`. Sizes:
//! - Public key: 1,952 bytes
//! - Signature: 3,293 bytes
//!
//! Key generation has no seeded variant, so Dilithium identities are always
//! created from OS randomness.

use pqcrypto_dilithium::dilithium3;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Size of a Dilithium3 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 1952;

/// Size of a detached Dilithium3 signature in bytes.
pub const SIGNATURE_SIZE: usize = 3293;

/// Dilithium3 key pair.
///
/// The secret key bytes are wiped on drop. Does not implement `Clone`.
pub struct DilithiumKeyPair {
    public: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl DilithiumKeyPair {
    /// Generate a new key pair from OS randomness.
    pub fn generate() -> Self {
        let (public, secret) = dilithium3::keypair();
        Self {
            public: public.as_bytes().to_vec(),
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
        }
    }

    /// Public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public
    }

    /// Sign a message, producing a detached signature.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Signing` if the stored secret key is rejected.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let secret = dilithium3::SecretKey::from_bytes(&self.secret)
            .map_err(|e| CryptoError::Signing(format!("{:?}", e)))?;
        let signature = dilithium3::detached_sign(message, &secret);
        Ok(signature.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for DilithiumKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DilithiumKeyPair {{ secret: [REDACTED], public: {:02x}{:02x}{:02x}{:02x}.. }}",
            self.public[0], self.public[1], self.public[2], self.public[3]
        )
    }
}

/// Verify a detached Dilithium3 signature.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyLength` for a malformed public key and
/// `CryptoError::SignatureVerification` for any signature mismatch.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    if public_key.len() != PUBLIC_KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_SIZE,
            actual: public_key.len(),
        });
    }
    if signature.len() != SIGNATURE_SIZE {
        return Err(CryptoError::SignatureVerification);
    }

    let public =
        dilithium3::PublicKey::from_bytes(public_key).map_err(|_| CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_SIZE,
            actual: public_key.len(),
        })?;
    let signature = dilithium3::DetachedSignature::from_bytes(signature)
        .map_err(|_| CryptoError::SignatureVerification)?;
    dilithium3::verify_detached_signature(&signature, message, &public)
        .map_err(|_| CryptoError::SignatureVerification)
}
