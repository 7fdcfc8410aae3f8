//! Fuzz target for signature header parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postern_mail::SignatureHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = std::str::from_utf8(data) {
        if let Ok(header) = SignatureHeader::parse(value) {
            assert!(!header.signature().is_empty());

            let reparsed = SignatureHeader::parse(&header.encode()).unwrap();
            assert!(reparsed == header);
        }
    }
});
