//! Fuzz target for destination address parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postern_crypto::Destination;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(destination) = Destination::parse(value) {
        let roundtrip = Destination::parse(&destination.to_address()).unwrap();
        assert_eq!(destination, roundtrip);
    }

    // Extraction from header values must never panic
    let _ = Destination::extract(value);
});
