//! The send and receive pipeline.
//!
//! ```text
//! packetize: clone ─► privacy filter ─► check addresses ─► isolate BCC
//!            ─► sign (unless anonymous) ─► serialize ─► encode ─► split
//! unpack:    reassemble ─► decode ─► parse ─► verify and cache flag
//! ```
//!
//! Every stage works on a private copy of the caller's message, so a
//! failure at any point leaves the caller's message (BCC list included)
//! exactly as it was and no packets are produced.

use postern_crypto::{Destination, SigningIdentity};
use tracing::{debug, warn};

use crate::chunking::{reassemble, split_into_packets, Packet};
use crate::codec::{Codec, CodecMetrics};
use crate::config::PipelineConfig;
use crate::error::{ConfigError, PacketError, PacketizeError, UnpackError};
use crate::message::{Message, MessageId};
use crate::privacy::{check_addresses, isolate_bcc, HeaderPrivacyFilter};
use crate::signing::{
    apply_signature, refresh_signature_flag, SIGNATURE_HEADER, SIGNATURE_VALID_HEADER,
};

/// Turns messages into packets and back.
#[derive(Debug)]
pub struct Packetizer {
    config: PipelineConfig,
    filter: HeaderPrivacyFilter,
    codec: Codec,
}

impl Default for Packetizer {
    fn default() -> Self {
        Self::from_valid_config(PipelineConfig::default())
    }
}

impl Packetizer {
    /// Create a packetizer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails validation.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PipelineConfig) -> Self {
        Self {
            filter: HeaderPrivacyFilter::from_config(&config),
            codec: Codec::new(config.compression_level),
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Codec counters accumulated by this packetizer.
    pub fn codec_metrics(&self) -> CodecMetrics {
        self.codec.metrics()
    }

    /// Packetize `message` for one delivery.
    ///
    /// `bcc_to_keep` names the recipient the packets are built for; the
    /// BCC header of the packets holds only that recipient, or nothing
    /// when they are not a BCC recipient. With `None` (delivery to To and
    /// CC recipients) every BCC value is removed.
    ///
    /// The caller's message is never modified.
    ///
    /// # Errors
    ///
    /// Returns an error, and no packets, if:
    /// - An address header fails validation
    /// - The message has a sender but `identity` is `None`
    /// - Signing, encoding or splitting fails
    pub fn packetize(
        &self,
        message: &Message,
        identity: Option<&SigningIdentity>,
        bcc_to_keep: Option<&str>,
    ) -> Result<Vec<Packet>, PacketizeError> {
        let mut outgoing = message.clone();

        self.filter.prepare(outgoing.headers_mut());
        check_addresses(&outgoing)?;
        match bcc_to_keep {
            Some(keep) => isolate_bcc(outgoing.headers_mut(), keep),
            None => {
                outgoing.headers_mut().remove("BCC");
            }
        }

        if outgoing.is_anonymous() {
            outgoing.headers_mut().remove(SIGNATURE_HEADER);
        } else {
            let identity = identity.ok_or(PacketizeError::MissingIdentity)?;
            let sender = outgoing.sender().and_then(Destination::extract);
            if sender.as_ref() != Some(&identity.destination()) {
                warn!(
                    message_id = %outgoing.id(),
                    "Signing identity does not match the Sender header"
                );
            }
            apply_signature(&mut outgoing, identity)?;
        }

        let bytes = outgoing.to_bytes();
        let encoded = self.codec.encode(&bytes)?;
        let packets = split_into_packets(outgoing.id(), &encoded)?;

        debug!(
            message_id = %outgoing.id(),
            serialized = bytes.len(),
            encoded = encoded.len(),
            packets = packets.len(),
            "Packetized message"
        );
        Ok(packets)
    }

    /// Rebuild a message from all of its packets.
    ///
    /// The message gets the packets' id, is marked new, and carries a
    /// freshly computed signature flag.
    ///
    /// # Errors
    ///
    /// Returns an error if reassembly, decoding or parsing fails. A bad
    /// signature is not an error; it is recorded in the flag.
    pub fn unpack(&self, packets: Vec<Packet>) -> Result<Message, UnpackError> {
        let message_id = packets
            .first()
            .map(Packet::message_id)
            .ok_or(PacketError::NoPackets)?;
        let encoded = reassemble(packets)?;
        self.decode_message(message_id, &encoded)
    }

    /// Rebuild a message from reassembled bytes, such as those returned by
    /// a [`PacketReassembler`](crate::PacketReassembler).
    pub fn decode_message(
        &self,
        message_id: MessageId,
        encoded: &[u8],
    ) -> Result<Message, UnpackError> {
        let bytes = self.codec.decode(encoded)?;
        let mut message = Message::from_bytes(&bytes)?;
        message.set_id(message_id);
        message.set_new(true);

        // a flag arriving over the wire is never trusted
        message.headers_mut().remove(SIGNATURE_VALID_HEADER);
        let outcome = refresh_signature_flag(&mut message);

        debug!(%message_id, signature = %outcome, "Unpacked message");
        Ok(message)
    }
}
