//! Message model.
//!
//! A [`Message`] is a root MIME [`Part`] plus local state that never leaves
//! the client: its [`MessageId`] and whether it has been read.

mod headers;
mod id;
mod mime;

pub use headers::{HeaderField, Headers};
pub use id::{MessageId, MESSAGE_ID_STRING_LEN};
pub use mime::{Content, Part};

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::error::MimeError;

/// Value of the `Sender` header on messages sent without an identity.
pub const ANONYMOUS_SENDER: &str = "Anonymous";

/// Fields a message list can be sorted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageField {
    /// The `Subject` header, ignoring case.
    Subject,
    /// The first `From` (or `Sender`) address.
    From,
    /// The first recipient.
    To,
    /// The `Date` header.
    Date,
    /// The new/old flag.
    New,
}

/// An email message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    is_new: bool,
    root: Part,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Create an empty message with a fresh id, marked new.
    pub fn new() -> Self {
        Self {
            id: MessageId::generate(),
            is_new: true,
            root: Part::new(Headers::new(), Content::Single(Vec::new())),
        }
    }

    /// Wrap an existing root part.
    pub fn from_part(root: Part) -> Self {
        Self {
            id: MessageId::generate(),
            is_new: true,
            root,
        }
    }

    /// The message id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Replace the message id.
    pub fn set_id(&mut self, id: MessageId) {
        self.id = id;
    }

    /// Whether the message is unread.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Set the unread flag.
    pub fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// The top-level headers.
    pub fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Mutable access to the top-level headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.root.headers
    }

    /// The top-level content.
    pub fn content(&self) -> &Content {
        &self.root.content
    }

    /// The root part.
    pub fn root(&self) -> &Part {
        &self.root
    }

    /// Replace the body with a single `text/plain` part.
    pub fn set_text(&mut self, text: &str) {
        self.replace_body(Part::text(text));
    }

    /// Replace the body with a `multipart/mixed` container.
    pub fn set_multipart(&mut self, parts: Vec<Part>) {
        self.replace_body(Part::multipart("mixed", parts));
    }

    fn replace_body(&mut self, body: Part) {
        let headers = &mut self.root.headers;
        headers.set("MIME-Version", "1.0");
        headers.remove("Content-Transfer-Encoding");
        headers.remove("Content-Disposition");
        for field in body.headers.iter() {
            headers.set(field.name(), field.value());
        }
        self.root.content = body.content;
    }

    /// The subject line.
    pub fn subject(&self) -> Option<&str> {
        self.headers().first("Subject")
    }

    /// The `Sender` header.
    pub fn sender(&self) -> Option<&str> {
        self.headers().first("Sender")
    }

    /// Whether the message was sent without a signing identity.
    pub fn is_anonymous(&self) -> bool {
        match self.sender() {
            None => true,
            Some(sender) => sender.trim().eq_ignore_ascii_case(ANONYMOUS_SENDER),
        }
    }

    /// First `From` address, falling back to `Sender`.
    pub fn one_from_address(&self) -> Option<&str> {
        self.headers()
            .first("From")
            .or_else(|| self.headers().first("Sender"))
    }

    /// First recipient across `To`, `CC` and `BCC`.
    pub fn one_recipient(&self) -> Option<&str> {
        ["To", "CC", "BCC"]
            .iter()
            .find_map(|name| self.headers().first(name))
    }

    /// `To` addresses. Each header field holds one address.
    pub fn to_addresses(&self) -> Vec<&str> {
        self.headers().get("To")
    }

    /// `CC` addresses.
    pub fn cc_addresses(&self) -> Vec<&str> {
        self.headers().get("CC")
    }

    /// `BCC` addresses.
    pub fn bcc_addresses(&self) -> Vec<&str> {
        self.headers().get("BCC")
    }

    /// `Reply-To` addresses.
    pub fn reply_to_addresses(&self) -> Vec<&str> {
        self.headers().get("Reply-To")
    }

    /// The `Date` header, if present and valid RFC 2822.
    pub fn sent_date(&self) -> Option<DateTime<Utc>> {
        let date = self.headers().first("Date")?;
        DateTime::parse_from_rfc2822(date.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    /// Leaf parts, depth first.
    ///
    /// `message/rfc822` parts are leaves and are not expanded.
    pub fn parts(&self) -> Vec<&Part> {
        self.root.leaves()
    }

    /// The main text of the message.
    ///
    /// This is the first non-attachment `text/plain` part, otherwise the
    /// last `text/html` part, otherwise the root when it is a leaf.
    pub fn text(&self) -> Option<String> {
        let leaves = self.parts();
        let body = leaves
            .iter()
            .find(|p| !p.is_attachment() && p.is_mime_type("text/plain"))
            .or_else(|| {
                leaves
                    .iter()
                    .rev()
                    .find(|p| !p.is_attachment() && p.is_mime_type("text/html"))
            })
            .copied()
            .or(match self.root.content {
                Content::Single(_) => Some(&self.root),
                Content::Multipart { .. } => None,
            })?;

        body.decoded_content()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Non-inline parts marked as attachments.
    pub fn attachments(&self) -> Vec<&Part> {
        self.parts().into_iter().filter(|p| p.is_attachment()).collect()
    }

    /// Canonical serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.root.to_bytes()
    }

    /// Parse a serialized message. The result gets a fresh id and is marked new.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MimeError> {
        Ok(Self::from_part(Part::from_bytes(bytes)?))
    }

    /// Compare two messages by `field`.
    pub fn compare_by(&self, other: &Self, field: MessageField) -> Ordering {
        match field {
            MessageField::Subject => cmp_ignore_case(self.subject(), other.subject()),
            MessageField::From => {
                cmp_ignore_case(self.one_from_address(), other.one_from_address())
            }
            MessageField::To => cmp_ignore_case(self.one_recipient(), other.one_recipient()),
            MessageField::Date => self.sent_date().cmp(&other.sent_date()),
            MessageField::New => self.is_new.cmp(&other.is_new),
        }
    }
}

fn cmp_ignore_case(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.map(str::to_lowercase);
    let b = b.map(str::to_lowercase);
    a.cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message() {
        let message = Message::new();
        assert!(message.is_new());
        assert!(message.is_anonymous());
        assert!(message.headers().is_empty());
        assert_ne!(message.id(), Message::new().id());
    }

    #[test]
    fn test_anonymous_detection() {
        let mut message = Message::new();
        message.headers_mut().set("Sender", "anonymous");
        assert!(message.is_anonymous());
        message.headers_mut().set("Sender", "Alice <abc>");
        assert!(!message.is_anonymous());
    }

    #[test]
    fn test_set_text() {
        let mut message = Message::new();
        message.headers_mut().set("Subject", "s");
        message.set_text("body");

        assert_eq!(message.text().as_deref(), Some("body"));
        assert_eq!(message.headers().first("MIME-Version"), Some("1.0"));
        assert!(message.root().is_mime_type("text/plain"));
        assert_eq!(message.subject(), Some("s"));
    }

    #[test]
    fn test_text_prefers_plain() {
        let mut message = Message::new();
        message.set_multipart(vec![
            Part::html("<p>html</p>"),
            Part::attachment("notes.txt", "text/plain", b"attached"),
            Part::text("plain"),
        ]);
        assert_eq!(message.text().as_deref(), Some("plain"));
        assert_eq!(message.attachments().len(), 1);
        assert_eq!(message.parts().len(), 3);

        message.set_multipart(vec![Part::html("first"), Part::html("last")]);
        assert_eq!(message.text().as_deref(), Some("last"));

        message.set_multipart(vec![]);
        assert_eq!(message.text(), None);
    }

    #[test]
    fn test_switching_body_type_drops_stale_headers() {
        let mut message = Message::new();
        message.set_multipart(vec![Part::text("a")]);
        message.set_text("b");
        assert!(matches!(message.content(), Content::Single(_)));
        assert!(message.root().is_mime_type("text/plain"));
        assert_eq!(message.headers().get("Content-Type").len(), 1);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let mut message = Message::new();
        message.headers_mut().add("To", "a@example.com");
        message.headers_mut().add("To", "b@example.com");
        message.set_multipart(vec![Part::text("hi"), Part::html("<i>hi</i>")]);

        let bytes = message.to_bytes();
        let parsed = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.to_bytes(), bytes);
        assert_eq!(parsed.to_addresses(), vec!["a@example.com", "b@example.com"]);
        assert_ne!(parsed.id(), message.id());
    }

    #[test]
    fn test_address_accessors() {
        let mut message = Message::new();
        assert_eq!(message.one_recipient(), None);
        message.headers_mut().add("BCC", "hidden@example.com");
        assert_eq!(message.one_recipient(), Some("hidden@example.com"));
        message.headers_mut().add("CC", "cc@example.com");
        assert_eq!(message.one_recipient(), Some("cc@example.com"));

        message.headers_mut().set("Sender", "s@example.com");
        assert_eq!(message.one_from_address(), Some("s@example.com"));
        message.headers_mut().set("From", "f@example.com");
        assert_eq!(message.one_from_address(), Some("f@example.com"));
    }

    #[test]
    fn test_sent_date() {
        let mut message = Message::new();
        assert_eq!(message.sent_date(), None);
        message.headers_mut().set("Date", "Tue, 1 Jul 2003 10:52:37 +0200");
        let date = message.sent_date().unwrap();
        assert_eq!(date.to_rfc3339(), "2003-07-01T08:52:37+00:00");

        message.headers_mut().set("Date", "yesterday");
        assert_eq!(message.sent_date(), None);
    }

    #[test]
    fn test_compare_by() {
        let mut a = Message::new();
        let mut b = Message::new();
        a.headers_mut().set("Subject", "apple");
        b.headers_mut().set("Subject", "Banana");
        assert_eq!(a.compare_by(&b, MessageField::Subject), Ordering::Less);

        a.headers_mut().set("Date", "Wed, 2 Jul 2003 10:00:00 +0000");
        b.headers_mut().set("Date", "Tue, 1 Jul 2003 10:00:00 +0000");
        assert_eq!(a.compare_by(&b, MessageField::Date), Ordering::Greater);

        b.set_new(false);
        assert_eq!(a.compare_by(&b, MessageField::New), Ordering::Greater);
        assert_eq!(a.compare_by(&a, MessageField::To), Ordering::Equal);
    }
}
