//! Property-based tests for the mail pipeline.
//!
//! These tests check invariants over arbitrary inputs:
//!
//! - Codec round-trips every byte string and never grows input by more than the tag
//! - Packet sizes follow the block size for every input length
//! - Reassembly is independent of arrival order
//! - Canonical serialization is stable under parse
//! - BCC isolation never leaks another BCC recipient
//! - Any change to signed content invalidates the signature

use proptest::prelude::*;

use postern_crypto::SigningIdentity;

use crate::chunking::{reassemble, split_into_packets, PacketReassembler};
use crate::codec;
use crate::limits::MAX_BLOCK_SIZE;
use crate::message::{Headers, Message, MessageId, Part};
use crate::privacy::{is_whitelisted, isolate_bcc, scrub_headers};
use crate::signing::{apply_signature, verify, VerificationOutcome};

// ==================== Codec ====================

proptest! {
    /// decode(encode(b)) == b, and raw is chosen whenever it is not larger.
    #[test]
    fn codec_roundtrip(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let encoded = codec::encode(&data).unwrap();
        prop_assert!(encoded.len() <= data.len() + 1);
        prop_assert_eq!(codec::decode(&encoded).unwrap(), data);
    }

    /// Arbitrary input never panics the decoder.
    #[test]
    fn codec_decode_arbitrary(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode(&data);
    }
}

// ==================== Packets ====================

proptest! {
    /// Packet count is ceil(L / MAX_BLOCK_SIZE); all but the last are full.
    #[test]
    fn packet_sizes(len in 1usize..(MAX_BLOCK_SIZE * 5)) {
        let data = vec![0xa5u8; len];
        let packets = split_into_packets(MessageId::generate(), &data).unwrap();

        prop_assert_eq!(packets.len(), len.div_ceil(MAX_BLOCK_SIZE));
        let (last, rest) = packets.split_last().unwrap();
        for packet in rest {
            prop_assert_eq!(packet.payload().len(), MAX_BLOCK_SIZE);
        }
        prop_assert_eq!(last.payload().len(), len - rest.len() * MAX_BLOCK_SIZE);
        prop_assert!(!last.payload().is_empty());
    }

    /// Reassembly restores the input for any arrival order.
    #[test]
    fn reassembly_any_order(
        data in prop::collection::vec(any::<u8>(), 0..(MAX_BLOCK_SIZE * 3)),
        rotation in any::<usize>(),
    ) {
        let packets = split_into_packets(MessageId::generate(), &data).unwrap();
        let mut shuffled = packets.clone();
        let n = shuffled.len();
        shuffled.rotate_left(rotation % n);
        shuffled.swap(0, n - 1);

        prop_assert_eq!(reassemble(shuffled.clone()).unwrap(), data.clone());

        let mut reassembler = PacketReassembler::new(300);
        let mut complete = None;
        for packet in shuffled {
            if let Some(bytes) = reassembler.add_packet(packet, 1000).unwrap() {
                complete = Some(bytes);
            }
        }
        prop_assert_eq!(complete, Some(data));
        prop_assert_eq!(reassembler.pending_count(), 0);
    }

    /// Packets survive the wire encoding.
    #[test]
    fn packet_wire_roundtrip(data in prop::collection::vec(any::<u8>(), 0..1024)) {
        for packet in split_into_packets(MessageId::generate(), &data).unwrap() {
            let parsed = crate::chunking::Packet::from_bytes(&packet.to_bytes()).unwrap();
            prop_assert_eq!(parsed, packet);
        }
    }
}

// ==================== Message ====================

fn header_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Subject".to_string()),
        Just("To".to_string()),
        Just("X-Mailer".to_string()),
        Just("Received".to_string()),
        Just("x-priority".to_string()),
        "[A-Za-z][A-Za-z0-9-]{0,15}",
    ]
}

proptest! {
    /// serialize(parse(serialize(m))) == serialize(m).
    #[test]
    fn canonical_form_is_stable(
        headers in prop::collection::vec((header_name(), "[ -~]{0,40}"), 0..8),
        body in "[ -~\r\n]{0,200}",
        attachment in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let mut message = Message::new();
        for (name, value) in &headers {
            message.headers_mut().add(name, value);
        }
        message.set_multipart(vec![
            Part::text(&body),
            Part::attachment("a.bin", "application/octet-stream", &attachment),
        ]);

        let bytes = message.to_bytes();
        let parsed = Message::from_bytes(&bytes).unwrap();
        prop_assert_eq!(parsed.to_bytes(), bytes);
        prop_assert_eq!(parsed.attachments()[0].decoded_content(), Some(attachment));
    }

    /// After scrubbing only whitelisted headers remain.
    #[test]
    fn scrub_leaves_only_whitelisted(
        names in prop::collection::vec(header_name(), 0..12),
    ) {
        let mut headers = Headers::new();
        for name in &names {
            headers.add(name, "v");
        }
        scrub_headers(&mut headers);
        for field in headers.iter() {
            prop_assert!(is_whitelisted(field.name()));
        }
        let kept = names.iter().filter(|n| is_whitelisted(n)).count();
        prop_assert_eq!(headers.len(), kept);
    }

    /// Only the kept BCC address survives; other headers are untouched.
    #[test]
    fn bcc_isolation_keeps_one(
        count in 0usize..6,
        keep in 0usize..8,
    ) {
        let addresses: Vec<String> = (0..count).map(|i| format!("user{}@example.org", i)).collect();
        let mut headers = Headers::new();
        headers.set("To", "visible@example.org");
        for address in &addresses {
            headers.add("BCC", address);
        }

        let target = addresses
            .get(keep)
            .cloned()
            .unwrap_or_else(|| "stranger@example.net".to_string());
        isolate_bcc(&mut headers, &target);

        if keep < count {
            prop_assert_eq!(headers.get("BCC"), vec![target.as_str()]);
        } else {
            prop_assert!(!headers.contains("BCC"));
        }
        prop_assert_eq!(headers.get("To"), vec!["visible@example.org"]);
    }
}

// ==================== Signatures ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Flipping any byte of the signed body invalidates the signature.
    #[test]
    fn body_tampering_detected(
        body in prop::collection::vec(b'a'..=b'z', 1..200),
        position in any::<prop::sample::Index>(),
        seed in any::<[u8; 32]>(),
    ) {
        let alice = SigningIdentity::from_seed("Alice", seed);
        let mut message = Message::new();
        message.headers_mut().set("Sender", &alice.sender_address());
        message.set_text(&String::from_utf8(body.clone()).unwrap());
        apply_signature(&mut message, &alice).unwrap();
        prop_assert_eq!(verify(&message, &alice.destination()), VerificationOutcome::Valid);

        let mut tampered = body;
        let i = position.index(tampered.len());
        tampered[i] = tampered[i].wrapping_add(1);
        let mut tampered_message = message.clone();
        tampered_message.set_text(&String::from_utf8_lossy(&tampered));
        prop_assert_eq!(
            verify(&tampered_message, &alice.destination()),
            VerificationOutcome::Invalid
        );
    }
}
