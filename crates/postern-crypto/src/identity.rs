//! Local signing identities.

use crate::ed25519::Ed25519KeyPair;
use crate::dilithium::DilithiumKeyPair;
use crate::{Destination, Result, SignatureScheme};

enum KeyMaterial {
    Ed25519(Ed25519KeyPair),
    Dilithium3(DilithiumKeyPair),
}

/// A capability that signs on behalf of a sender.
///
/// Bound to exactly one signature scheme. The human-readable public name
/// is only used when building `Sender`/`From` header values.
pub struct SigningIdentity {
    public_name: String,
    key: KeyMaterial,
}

impl SigningIdentity {
    /// Generate a fresh identity for `scheme`.
    pub fn generate(public_name: impl Into<String>, scheme: SignatureScheme) -> Self {
        let key = match scheme {
            SignatureScheme::Ed25519 => KeyMaterial::Ed25519(Ed25519KeyPair::generate()),
            SignatureScheme::Dilithium3 => KeyMaterial::Dilithium3(DilithiumKeyPair::generate()),
        };
        Self {
            public_name: public_name.into(),
            key,
        }
    }

    /// Rebuild an Ed25519 identity from its 32-byte secret seed.
    pub fn from_seed(public_name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            public_name: public_name.into(),
            key: KeyMaterial::Ed25519(Ed25519KeyPair::from_seed(&seed)),
        }
    }

    /// The identity's human-readable name.
    pub fn public_name(&self) -> &str {
        &self.public_name
    }

    /// The identity's signature scheme.
    pub fn scheme(&self) -> SignatureScheme {
        match self.key {
            KeyMaterial::Ed25519(_) => SignatureScheme::Ed25519,
            KeyMaterial::Dilithium3(_) => SignatureScheme::Dilithium3,
        }
    }

    /// The wire id of the identity's scheme.
    pub fn algorithm_id(&self) -> u8 {
        self.scheme().id()
    }

    /// Sign `data`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Signing` if the Dilithium backend rejects the
    /// stored secret key.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match &self.key {
            KeyMaterial::Ed25519(keypair) => Ok(keypair.sign(data)),
            KeyMaterial::Dilithium3(keypair) => keypair.sign(data),
        }
    }

    /// The public destination matching this identity.
    pub fn destination(&self) -> Destination {
        let public_key = match &self.key {
            KeyMaterial::Ed25519(keypair) => keypair.public_key().to_vec(),
            KeyMaterial::Dilithium3(keypair) => keypair.public_key().to_vec(),
        };
        Destination::from_key_pair(self.scheme(), public_key)
    }

    /// Address header value of the form `Name <destination>`.
    pub fn sender_address(&self) -> String {
        format!("{} <{}>", self.public_name, self.destination().to_address())
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_name", &self.public_name)
            .field("scheme", &self.scheme())
            .field("key", &"[REDACTED]")
            .finish()
    }
}
