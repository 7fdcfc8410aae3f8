//! Message identifiers.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Length of the string form of a [`MessageId`].
pub const MESSAGE_ID_STRING_LEN: usize = 44;

/// Globally unique identifier for a message.
///
/// 32 random bytes. The string form is 44 characters of URL-safe base64,
/// which is also safe to use in file names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId([u8; 32]);

impl MessageId {
    /// Size in bytes.
    pub const SIZE: usize = 32;

    /// Generate a new random id using OS randomness.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create an id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create an id from a byte slice. Returns `None` unless it is 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Parse the 44-character string form.
    pub fn from_base64(s: &str) -> Option<Self> {
        if s.len() != MESSAGE_ID_STRING_LEN {
            return None;
        }
        let bytes = URL_SAFE.decode(s).ok()?;
        Self::from_slice(&bytes)
    }

    /// The 44-character string form.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageId({}...)", &self.to_base64()[..8])
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl AsRef<[u8]> for MessageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
