//! The signature header value: `{algorithm_id}_{base64(signature)}`.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use postern_crypto::SignatureScheme;

use crate::error::SignatureError;

/// A parsed signature header value.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    algorithm_id: u8,
    signature: Vec<u8>,
}

impl SignatureHeader {
    /// Create a header from an algorithm id and raw signature bytes.
    pub fn new(algorithm_id: u8, signature: Vec<u8>) -> Self {
        Self {
            algorithm_id,
            signature,
        }
    }

    /// The signing algorithm id.
    pub fn algorithm_id(&self) -> u8 {
        self.algorithm_id
    }

    /// The signing scheme named by the algorithm id.
    pub fn scheme(&self) -> Result<SignatureScheme, SignatureError> {
        SignatureScheme::from_id(self.algorithm_id)
            .ok_or(SignatureError::UnknownAlgorithm(self.algorithm_id))
    }

    /// Raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Header value form.
    pub fn encode(&self) -> String {
        format!("{}_{}", self.algorithm_id, STANDARD.encode(&self.signature))
    }

    /// Parse a header value, splitting on the first `_`.
    ///
    /// The algorithm id is not checked against known schemes here; see
    /// [`scheme`](Self::scheme).
    pub fn parse(value: &str) -> Result<Self, SignatureError> {
        let value = value.trim();
        let (id, encoded) = value
            .split_once('_')
            .ok_or_else(|| SignatureError::Malformed("missing '_' separator".into()))?;

        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignatureError::Malformed(format!(
                "invalid algorithm id: {:?}",
                id
            )));
        }
        let algorithm_id: u8 = id
            .parse()
            .map_err(|_| SignatureError::Malformed(format!("algorithm id out of range: {}", id)))?;

        let signature = STANDARD
            .decode(encoded)
            .map_err(|e| SignatureError::Malformed(format!("invalid base64: {}", e)))?;
        if signature.is_empty() {
            return Err(SignatureError::Malformed("empty signature".into()));
        }

        Ok(Self {
            algorithm_id,
            signature,
        })
    }
}

impl fmt::Debug for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureHeader")
            .field("algorithm_id", &self.algorithm_id)
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_parse() {
        let header = SignatureHeader::new(1, vec![0xab; 64]);
        let encoded = header.encode();
        assert!(encoded.starts_with("1_"));
        assert_eq!(SignatureHeader::parse(&encoded).unwrap(), header);
    }

    #[test]
    fn test_splits_on_first_underscore() {
        let header = SignatureHeader::parse("2_AAAA").unwrap();
        assert_eq!(header.algorithm_id(), 2);
        assert_eq!(header.signature(), &[0, 0, 0]);

        // the base64 alphabet has no '_', so a second one is malformed
        assert!(SignatureHeader::parse("2_AA_AA").is_err());
    }

    #[test]
    fn test_malformed_values() {
        for value in ["", "1", "_AAAA", "x_AAAA", "-1_AAAA", "256_AAAA", "1_!!!!", "1_"] {
            assert!(
                matches!(SignatureHeader::parse(value), Err(SignatureError::Malformed(_))),
                "accepted {:?}",
                value
            );
        }
    }

    #[test]
    fn test_unknown_scheme() {
        let header = SignatureHeader::parse("99_AAAA").unwrap();
        assert!(matches!(
            header.scheme(),
            Err(SignatureError::UnknownAlgorithm(99))
        ));
        assert_eq!(
            SignatureHeader::new(1, vec![1]).scheme().unwrap(),
            SignatureScheme::Ed25519
        );
    }
}
