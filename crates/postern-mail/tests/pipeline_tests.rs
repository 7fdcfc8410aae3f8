//! Integration tests for the postern-mail send and receive pipeline.
//!
//! These tests drive the public API the way a send scheduler and a
//! receiving client would: one packet set per recipient, packets handed
//! over out of order, and verification on the receiving side.

use postern_crypto::{SignatureScheme, SigningIdentity};
use postern_mail::signing::{self, SIGNATURE_HEADER};
use postern_mail::{
    Message, PacketReassembler, PacketizeError, Packetizer, Part, PipelineConfig,
    VerificationOutcome,
};

fn identity(name: &str, seed: u8) -> SigningIdentity {
    SigningIdentity::from_seed(name, [seed; 32])
}

fn compose(
    sender: &SigningIdentity,
    to: &[&SigningIdentity],
    bcc: &[&SigningIdentity],
) -> Message {
    let mut message = Message::new();
    message.headers_mut().set("Sender", &sender.sender_address());
    message.headers_mut().set("From", &sender.sender_address());
    for recipient in to {
        message.headers_mut().add("To", &recipient.sender_address());
    }
    for recipient in bcc {
        message.headers_mut().add("BCC", &recipient.destination().to_address());
    }
    message.headers_mut().set("Subject", "Quarterly numbers");
    message.headers_mut().set("User-Agent", "leaky/1.0");
    message.set_text("See you on Monday.");
    message
}

// ============================================================================
// Multi-recipient delivery
// ============================================================================

mod delivery {
    use super::*;

    #[test]
    fn test_each_recipient_sees_only_their_bcc() {
        let alice = identity("Alice", 1);
        let bob = identity("Bob", 2);
        let carol = identity("Carol", 3);
        let dave = identity("Dave", 4);
        let message = compose(&alice, &[&bob], &[&carol, &dave]);
        let original_bcc: Vec<String> =
            message.bcc_addresses().iter().map(|s| s.to_string()).collect();

        let packetizer = Packetizer::default();
        for recipient in [&bob, &carol, &dave] {
            let keep = recipient.destination().to_address();
            let packets = packetizer
                .packetize(&message, Some(&alice), Some(&keep))
                .unwrap();
            let received = packetizer.unpack(packets).unwrap();

            let bcc = received.bcc_addresses();
            if recipient.public_name() == "Bob" {
                assert!(bcc.is_empty());
            } else {
                assert_eq!(bcc, vec![keep.as_str()]);
            }
            assert_eq!(
                signing::verify(&received, &alice.destination()),
                VerificationOutcome::Valid
            );
        }

        assert_eq!(message.bcc_addresses(), original_bcc);
    }

    #[test]
    fn test_recipient_names_are_stripped() {
        let alice = identity("Alice", 1);
        let bob = identity("Bob", 2);
        let mut message = compose(&alice, &[&bob], &[]);
        message.headers_mut().add("CC", "Eve Example <eve@example.com>");

        let packetizer = Packetizer::default();
        let received = packetizer
            .unpack(packetizer.packetize(&message, Some(&alice), None).unwrap())
            .unwrap();

        assert_eq!(
            received.to_addresses(),
            vec![bob.destination().to_address().as_str()]
        );
        // external addresses keep their display name
        assert_eq!(received.cc_addresses(), vec!["Eve Example <eve@example.com>"]);
        // the sender keeps theirs
        assert_eq!(received.sender(), Some(alice.sender_address().as_str()));
        assert!(!received.headers().contains("User-Agent"));
    }

    #[test]
    fn test_post_quantum_sender() {
        let alice = SigningIdentity::generate("Alice", SignatureScheme::Dilithium3);
        let bob = identity("Bob", 2);
        let message = compose(&alice, &[&bob], &[]);

        let packetizer = Packetizer::default();
        let received = packetizer
            .unpack(packetizer.packetize(&message, Some(&alice), None).unwrap())
            .unwrap();

        let header = received.headers().first(SIGNATURE_HEADER).unwrap();
        assert!(header.starts_with("2_"));
        assert_eq!(
            signing::cached_outcome(&received),
            Some(VerificationOutcome::Valid)
        );
    }

    #[test]
    fn test_invalid_recipient_blocks_send() {
        let alice = identity("Alice", 1);
        let mut message = compose(&alice, &[], &[]);
        message.headers_mut().add("To", "bob@nowhere");

        let result = Packetizer::default().packetize(&message, Some(&alice), None);
        assert!(matches!(result, Err(PacketizeError::Address(_))));
    }
}

// ============================================================================
// Receiving
// ============================================================================

mod receiving {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    #[test]
    fn test_streamed_packets_through_reassembler() {
        let alice = identity("Alice", 1);
        let bob = identity("Bob", 2);
        let mut message = compose(&alice, &[&bob], &[]);
        let attachment: Vec<u8> = (0..150_000u32).map(|i| (i * 7919 % 251) as u8).collect();
        message.set_multipart(vec![
            Part::text("report attached"),
            Part::attachment("report.bin", "application/octet-stream", &attachment),
        ]);

        let config = PipelineConfig::builder().with_compression_level(3).build();
        let packetizer = Packetizer::new(config.clone()).unwrap();
        let mut packets = packetizer.packetize(&message, Some(&alice), None).unwrap();
        packets.reverse();

        let message_id = packets[0].message_id();
        let mut reassembler = PacketReassembler::from_config(&config);
        let mut encoded = None;
        for packet in packets {
            if let Some(bytes) = reassembler.add_packet(packet, 1_700_000_000).unwrap() {
                encoded = Some(bytes);
            }
        }

        let received = packetizer
            .decode_message(message_id, &encoded.unwrap())
            .unwrap();
        assert_eq!(received.id(), message.id());
        assert_eq!(received.text().as_deref(), Some("report attached"));
        assert_eq!(received.attachments()[0].decoded_content(), Some(attachment));
        assert!(signing::verify(&received, &alice.destination()).is_valid());
    }

    #[test]
    fn test_missing_packet_is_reported() {
        let alice = identity("Alice", 1);
        let mut message = compose(&alice, &[], &[]);
        let mut noise = vec![0u8; 120_000];
        StdRng::seed_from_u64(42).fill_bytes(&mut noise);
        message.set_multipart(vec![Part::attachment(
            "n.bin",
            "application/octet-stream",
            &noise,
        )]);

        let packetizer = Packetizer::default();
        let mut packets = packetizer.packetize(&message, Some(&alice), None).unwrap();
        assert!(packets.len() > 2);
        packets.remove(1);

        assert!(matches!(
            packetizer.unpack(packets),
            Err(postern_mail::UnpackError::Packet(
                postern_mail::PacketError::Incomplete { .. }
            ))
        ));
    }
}
