//! Types a [`Folder`](crate::Folder) can hold.

use std::cmp::Ordering;

use postern_mail::{Message, MessageField, MessageId};

use crate::{Result, StoreError};

/// An entry persisted by a [`Folder`](crate::Folder).
///
/// The id and new/old state live in the storage key, not in the stored
/// bytes; the folder re-attaches both on read.
pub trait StoreEntry: Sized {
    /// Field the folder can sort entries by.
    type SortField: Copy;

    /// File extension including the leading dot.
    const EXTENSION: &'static str;

    /// The entry's id.
    fn id(&self) -> MessageId;

    /// Whether the entry is new.
    fn is_new(&self) -> bool;

    /// Set the new flag after reading.
    fn set_new(&mut self, is_new: bool);

    /// Bytes to persist.
    fn to_bytes(&self) -> Vec<u8>;

    /// Rebuild an entry from persisted bytes.
    fn from_bytes(id: MessageId, bytes: &[u8]) -> Result<Self>;

    /// Order two entries by `field`.
    fn compare(&self, other: &Self, field: Self::SortField) -> Ordering;
}

impl StoreEntry for Message {
    type SortField = MessageField;

    const EXTENSION: &'static str = ".mail";

    fn id(&self) -> MessageId {
        Message::id(self)
    }

    fn is_new(&self) -> bool {
        Message::is_new(self)
    }

    fn set_new(&mut self, is_new: bool) {
        Message::set_new(self, is_new);
    }

    fn to_bytes(&self) -> Vec<u8> {
        Message::to_bytes(self)
    }

    fn from_bytes(id: MessageId, bytes: &[u8]) -> Result<Self> {
        let mut message = Message::from_bytes(bytes)
            .map_err(|e| StoreError::Corruption(format!("message {}: {}", id, e)))?;
        message.set_id(id);
        Ok(message)
    }

    fn compare(&self, other: &Self, field: MessageField) -> Ordering {
        self.compare_by(other, field)
    }
}
