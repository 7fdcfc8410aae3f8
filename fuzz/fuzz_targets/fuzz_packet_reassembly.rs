//! Fuzz target for packet parsing and reassembly.
//!
//! The input is cut into frames by a leading length byte; each frame is
//! parsed as a wire packet and the valid ones are reassembled.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postern_mail::{reassemble, Packet, PacketReassembler};

fuzz_target!(|data: &[u8]| {
    let mut packets = Vec::new();
    let mut rest = data;
    while let Some((&len, tail)) = rest.split_first() {
        let len = usize::from(len).min(tail.len());
        let (frame, tail) = tail.split_at(len);
        rest = tail;

        if let Ok(packet) = Packet::from_bytes(frame) {
            assert_eq!(packet.to_bytes(), frame);
            packets.push(packet);
        }
    }

    let mut reassembler = PacketReassembler::default();
    for packet in packets.iter().cloned() {
        // Errors are fine; panics are not
        let _ = reassembler.add_packet(packet, 1000);
    }
    reassembler.cleanup_expired(u64::MAX);
    assert_eq!(reassembler.pending_count(), 0);

    let payload_total: usize = packets.iter().map(|p| p.payload().len()).sum();
    if let Ok(bytes) = reassemble(packets) {
        assert!(bytes.len() <= payload_total);
    }
});
