//! Outbound message folder with a delivery status overlay.
//!
//! Messages waiting in the outbox are always new; sending removes them
//! from here. Delivery status text is kept in memory only and resets to
//! [`DEFAULT_STATUS`] when the outbox is reopened.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use postern_mail::{Message, MessageField, MessageId};
use tracing::debug;

use crate::folder::Folder;
use crate::Result;

/// Status reported for messages with no recorded status.
pub const DEFAULT_STATUS: &str = "Queued";

/// Sort order for outbox listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutboxSort {
    /// Sort by a message field.
    Field(MessageField),
    /// Sort by delivery status text.
    Status,
}

/// The outbox: a message folder plus per-message delivery status.
#[derive(Debug)]
pub struct Outbox {
    folder: Folder<Message>,
    statuses: RwLock<HashMap<MessageId, String>>,
}

impl Outbox {
    /// Open the outbox directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            folder: Folder::open(dir)?,
            statuses: RwLock::new(HashMap::new()),
        })
    }

    /// The underlying folder.
    pub fn folder(&self) -> &Folder<Message> {
        &self.folder
    }

    /// Queue a message. Returns `false` if it is already queued.
    pub fn add(&self, message: &Message) -> Result<bool> {
        if message.is_new() {
            return self.folder.add(message);
        }
        let mut queued = message.clone();
        queued.set_new(true);
        self.folder.add(&queued)
    }

    /// Read a queued message.
    pub fn get(&self, id: &MessageId) -> Result<Message> {
        let mut message = self.folder.get(id)?;
        message.set_new(true);
        Ok(message)
    }

    /// Whether a message is queued.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.folder.contains(id)
    }

    /// Remove a message and forget its status.
    pub fn delete(&self, id: &MessageId) -> Result<()> {
        self.folder.delete(id)?;
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        Ok(())
    }

    /// Outbox messages are always new; this does nothing.
    pub fn set_new(&self, _id: &MessageId, _is_new: bool) -> Result<()> {
        Ok(())
    }

    /// Record the delivery status of a message.
    pub fn set_status(&self, id: &MessageId, status: impl Into<String>) {
        let status = status.into();
        debug!(%id, %status, "Outbox status");
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*id, status);
    }

    /// The delivery status of a message, or [`DEFAULT_STATUS`].
    pub fn get_status(&self, id: &MessageId) -> String {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_STATUS.to_string())
    }

    /// All queued messages in the given order.
    pub fn list(&self, sort: OutboxSort, descending: bool) -> Result<Vec<Message>> {
        let mut messages = match sort {
            OutboxSort::Field(field) => self.folder.list(field, descending)?,
            OutboxSort::Status => {
                let mut messages = self.folder.list(MessageField::Date, false)?;
                let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);
                messages.sort_by(|a, b| {
                    let ordering =
                        cmp_ignore_case(status_of(&statuses, a), status_of(&statuses, b));
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
                messages
            }
        };
        for message in &mut messages {
            message.set_new(true);
        }
        Ok(messages)
    }

    /// Number of queued messages.
    pub fn len(&self) -> Result<usize> {
        self.folder.len()
    }

    /// Whether the outbox is empty.
    pub fn is_empty(&self) -> Result<bool> {
        self.folder.is_empty()
    }
}

fn status_of<'a>(statuses: &'a HashMap<MessageId, String>, message: &Message) -> &'a str {
    statuses
        .get(&message.id())
        .map(String::as_str)
        .unwrap_or(DEFAULT_STATUS)
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
