//! Message signature protocol.
//!
//! A signed message carries [`SIGNATURE_HEADER`] with the value
//! `{algorithm_id}_{base64(signature)}`. The signature covers the canonical
//! bytes of the message with the signature header and the cached validity
//! flag left out, so signing is idempotent and verification never needs
//! to touch the message.
//!
//! Verification fails closed: every problem maps to a
//! [`VerificationOutcome`] rather than an error.
//!
//! The cached flag stores the outcome together with a fingerprint of the
//! signed bytes and the signature header, `{outcome}; {fingerprint}`. A
//! flag whose fingerprint no longer matches the message is ignored, so
//! editing the signature header (or anything it covers) by any route
//! forces a fresh verification.

mod signature_header;

pub use signature_header::SignatureHeader;

use std::fmt;

use postern_crypto::{Destination, Hash256, SignatureScheme, SigningIdentity};
use tracing::{debug, warn};

use crate::error::SignatureError;
use crate::message::Message;

/// Header carrying the message signature.
pub const SIGNATURE_HEADER: &str = "X-Postern-Signature";

/// Local header caching the last verification outcome.
///
/// Never sent: it is not on the privacy whitelist.
pub const SIGNATURE_VALID_HEADER: &str = "X-Postern-Sig-Valid";

const EXCLUDED_FROM_SIGNATURE: [&str; 2] = [SIGNATURE_HEADER, SIGNATURE_VALID_HEADER];

/// Hex digits of the cached flag fingerprint.
const FINGERPRINT_LEN: usize = 32;

/// Result of verifying a message signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationOutcome {
    /// The signature matches the sender's key.
    Valid,
    /// A signature is present but does not verify, or names an unknown algorithm.
    Invalid,
    /// The message is anonymous or carries no signature.
    NoSignature,
    /// The signature header could not be parsed.
    MalformedHeader,
}

impl VerificationOutcome {
    /// Whether the signature verified.
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }

    /// Value stored in the cached flag header.
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::NoSignature => "none",
            Self::MalformedHeader => "malformed",
        }
    }

    /// Parse a cached flag value.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            "none" => Some(Self::NoSignature),
            "malformed" => Some(Self::MalformedHeader),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// The bytes a signature covers.
pub fn signable_bytes(message: &Message) -> Vec<u8> {
    message.root().to_bytes_excluding(&EXCLUDED_FROM_SIGNATURE)
}

/// Sign `message` with `identity`.
///
/// # Errors
///
/// Returns [`SignatureError::Signing`] if the identity fails to sign.
pub fn sign(
    message: &Message,
    identity: &SigningIdentity,
) -> Result<SignatureHeader, SignatureError> {
    let signature = identity.sign(&signable_bytes(message))?;
    Ok(SignatureHeader::new(identity.algorithm_id(), signature))
}

/// Sign `message` and store the result in its signature header.
///
/// Any cached validity flag is removed.
pub fn apply_signature(
    message: &mut Message,
    identity: &SigningIdentity,
) -> Result<(), SignatureError> {
    let header = sign(message, identity)?;
    let headers = message.headers_mut();
    headers.remove(SIGNATURE_VALID_HEADER);
    headers.set(SIGNATURE_HEADER, &header.encode());
    debug!(
        algorithm = header.algorithm_id(),
        signature_len = header.signature().len(),
        "Signed message"
    );
    Ok(())
}

/// Verify the signature of `message` against `destination`.
pub fn verify(message: &Message, destination: &Destination) -> VerificationOutcome {
    if message.is_anonymous() {
        return VerificationOutcome::NoSignature;
    }
    let Some(value) = message.headers().first(SIGNATURE_HEADER) else {
        return VerificationOutcome::NoSignature;
    };

    let header = match SignatureHeader::parse(value) {
        Ok(header) => header,
        Err(e) => {
            debug!(error = %e, "Unparseable signature header");
            return VerificationOutcome::MalformedHeader;
        }
    };

    let scheme: SignatureScheme = match header.scheme() {
        Ok(scheme) => scheme,
        Err(e) => {
            debug!(error = %e, "Signature uses unknown algorithm");
            return VerificationOutcome::Invalid;
        }
    };
    if scheme != destination.scheme() {
        debug!(
            signature = %scheme,
            destination = %destination.scheme(),
            "Signature algorithm does not match sender key"
        );
        return VerificationOutcome::Invalid;
    }

    if destination.verify(&signable_bytes(message), header.signature()) {
        VerificationOutcome::Valid
    } else {
        VerificationOutcome::Invalid
    }
}

/// Verify `message` against the destination in its `Sender` header.
///
/// # Errors
///
/// Returns [`SignatureError::KeyDerivationFailed`] when the sender value
/// holds no usable destination. Callers are expected to log it and treat
/// the message as unverified.
pub fn verify_sender(message: &Message) -> Result<VerificationOutcome, SignatureError> {
    if message.is_anonymous() {
        return Ok(VerificationOutcome::NoSignature);
    }
    let sender = message.sender().unwrap_or_default();
    let destination = Destination::extract(sender).ok_or_else(|| {
        SignatureError::KeyDerivationFailed(format!("no destination in sender {:?}", sender))
    })?;
    Ok(verify(message, &destination))
}

fn flag_fingerprint(message: &Message) -> String {
    let signature = message.headers().first(SIGNATURE_HEADER).unwrap_or_default();
    let signed = signable_bytes(message);
    let digest = Hash256::hash_many(&[signed.as_slice(), signature.as_bytes()]);
    let mut hex = digest.to_hex();
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// The outcome in the cached flag, if the flag still matches the message.
pub fn cached_outcome(message: &Message) -> Option<VerificationOutcome> {
    let flag = message.headers().first(SIGNATURE_VALID_HEADER)?;
    let (outcome, fingerprint) = flag.split_once(';')?;
    if fingerprint.trim() != flag_fingerprint(message) {
        debug!(message_id = %message.id(), "Cached signature flag is stale");
        return None;
    }
    VerificationOutcome::from_flag(outcome)
}

/// The verification outcome, using the cached flag when it is current.
///
/// When the flag is missing, unreadable or stale the signature is
/// verified and the outcome stored in the flag.
pub fn signature_status(message: &mut Message) -> VerificationOutcome {
    match cached_outcome(message) {
        Some(outcome) => outcome,
        None => refresh_signature_flag(message),
    }
}

/// Verify the signature and overwrite the cached flag.
pub fn refresh_signature_flag(message: &mut Message) -> VerificationOutcome {
    let outcome = match verify_sender(message) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(message_id = %message.id(), error = %e, "Cannot verify sender signature");
            VerificationOutcome::Invalid
        }
    };
    let flag = format!("{}; {}", outcome.as_flag(), flag_fingerprint(message));
    message.headers_mut().set(SIGNATURE_VALID_HEADER, &flag);
    outcome
}
