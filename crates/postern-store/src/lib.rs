//! # postern-store
//!
//! Local storage for postern messages.
//!
//! Provides:
//! - [`Folder`]: one file per entry, keyed by message id, with the new/old
//!   state encoded in the file name
//! - [`Outbox`]: a message folder with an in-memory delivery status overlay
//!
//! Entries are stored as canonical message bytes, uncompressed and
//! unchunked; packetization only applies to outbound transport.
//!
//! ```no_run
//! use postern_mail::Message;
//! use postern_store::{EntryState, Folder};
//!
//! let inbox: Folder<Message> = Folder::open("/tmp/postern/inbox").unwrap();
//!
//! let mut message = Message::new();
//! message.set_text("hello");
//! inbox.add(&message).unwrap();
//!
//! inbox.set_new(&message.id(), false).unwrap();
//! assert_eq!(inbox.state(&message.id()).unwrap(), EntryState::Old);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod folder;
pub mod outbox;

pub use entry::StoreEntry;
pub use error::{Result, StoreError};
pub use folder::{EntryState, Folder};
pub use outbox::{Outbox, OutboxSort, DEFAULT_STATUS};
