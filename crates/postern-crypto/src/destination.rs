//! Destinations: public verification keys recovered from address strings.
//!
//! A destination address is the URL-safe base64 encoding of
//! `[algorithm id || public key]`, so the address alone tells a verifier
//! which scheme to use. Ed25519 destinations are 44 characters long.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use crate::{CryptoError, Result, SignatureScheme};

/// A recipient's or sender's public, verifiable network address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    scheme: SignatureScheme,
    public_key: Vec<u8>,
}

impl Destination {
    /// Build a destination from a raw public key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` if the key length does not
    /// match the scheme.
    pub fn from_public_key(scheme: SignatureScheme, public_key: &[u8]) -> Result<Self> {
        if public_key.len() != scheme.public_key_len() {
            return Err(CryptoError::InvalidKeyLength {
                expected: scheme.public_key_len(),
                actual: public_key.len(),
            });
        }
        Ok(Self {
            scheme,
            public_key: public_key.to_vec(),
        })
    }

    /// Key lengths of local key pairs are fixed by their type.
    pub(crate) fn from_key_pair(scheme: SignatureScheme, public_key: Vec<u8>) -> Self {
        debug_assert_eq!(public_key.len(), scheme.public_key_len());
        Self { scheme, public_key }
    }

    /// Parse a bare destination address.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidAddress` if the string is not valid
    /// base64, `CryptoError::UnknownAlgorithm` if the leading id byte names no
    /// supported scheme, and `CryptoError::InvalidKeyLength` if the key length
    /// does not match the scheme.
    pub fn parse(address: &str) -> Result<Self> {
        let bytes = URL_SAFE
            .decode(address.trim())
            .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;

        let (&id, key) = bytes
            .split_first()
            .ok_or_else(|| CryptoError::InvalidAddress("empty address".into()))?;

        let scheme = SignatureScheme::try_from(id)?;
        Self::from_public_key(scheme, key)
    }

    /// Find a destination inside an address header value.
    ///
    /// Accepts `Name <dest>`, `<dest>` and a bare `dest`. Returns `None`
    /// when the value holds no recognizable destination, which callers
    /// treat as an external address.
    pub fn extract(value: &str) -> Option<Self> {
        let value = value.trim();
        let candidate = match (value.rfind('<'), value.rfind('>')) {
            (Some(start), Some(end)) if start < end => &value[start + 1..end],
            _ => value,
        };
        Self::parse(candidate).ok()
    }

    /// The self-describing address string.
    pub fn to_address(&self) -> String {
        let mut bytes = Vec::with_capacity(1 + self.public_key.len());
        bytes.push(self.scheme.id());
        bytes.extend_from_slice(&self.public_key);
        URL_SAFE.encode(bytes)
    }

    /// The signature scheme of this destination.
    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// The algorithm id of this destination's scheme.
    pub fn algorithm_id(&self) -> u8 {
        self.scheme.id()
    }

    /// Raw public key bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Verify a signature made by the owner of this destination.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.scheme
            .verify(&self.public_key, message, signature)
            .is_ok()
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let address = self.to_address();
        write!(f, "Destination({}, {}..)", self.scheme, &address[..12])
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl std::str::FromStr for Destination {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
