//! Fuzz target for the block codec decoder.
//!
//! Arbitrary input must decode or fail cleanly, never exceeding the
//! decoded size limit.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postern_mail::codec;
use postern_mail::limits::MAX_DECODED_SIZE;

fuzz_target!(|data: &[u8]| {
    if let Ok(decoded) = codec::decode(data) {
        assert!(decoded.len() <= MAX_DECODED_SIZE);

        // Re-encoding the output must round trip
        let encoded = codec::encode(&decoded).unwrap();
        assert_eq!(codec::decode(&encoded).unwrap(), decoded);
    }
});
