//! Fuzz target for MIME message parsing.
//!
//! Tests that arbitrary bytes parse or fail without panicking, and that
//! anything accepted reaches a stable canonical form.

#![no_main]

use libfuzzer_sys::fuzz_target;
use postern_mail::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = Message::from_bytes(data) else {
        return;
    };

    // Accessors walk the whole tree
    let _ = message.text();
    let _ = message.attachments();
    let _ = message.sent_date();

    let first = message.to_bytes();
    let reparsed = Message::from_bytes(&first).unwrap();
    let second = reparsed.to_bytes();
    let third = Message::from_bytes(&second).unwrap().to_bytes();
    assert_eq!(second, third);
});
