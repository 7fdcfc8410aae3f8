//! Header privacy filter.
//!
//! Outgoing messages pass through three transforms, in this order:
//!
//! 1. [`scrub_headers`] drops every header not on [`HEADER_WHITELIST`]
//! 2. [`strip_recipient_names`] reduces destination recipients to the bare
//!    destination, so local contact names never leave the client
//! 3. [`apply_sent_time`] sets or removes the `Date` header
//!
//! [`isolate_bcc`] and [`check_addresses`] run afterwards, once per
//! delivery. All functions work on an owned message or header set; the
//! pipeline gives them a private copy.

use chrono::{DateTime, Utc};
use postern_crypto::Destination;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::AddressError;
use crate::message::{Headers, Message};
use crate::signing::SIGNATURE_HEADER;

/// Headers allowed on an outgoing message. Everything else is removed.
pub const HEADER_WHITELIST: &[&str] = &[
    "From",
    "Sender",
    "To",
    "CC",
    "BCC",
    "Reply-To",
    "Subject",
    "Date",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "In-Reply-To",
    "X-HashCash",
    "X-Priority",
    SIGNATURE_HEADER,
];

/// Headers whose values are addresses.
pub const ADDRESS_HEADERS: &[&str] = &["From", "Sender", "To", "CC", "BCC", "Reply-To"];

/// Headers naming recipients.
pub const RECIPIENT_HEADERS: &[&str] = &["To", "CC", "BCC"];

/// `Date` format for outgoing mail. Always UTC.
const SENT_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Whether `name` is on the whitelist (ASCII case-insensitive).
pub fn is_whitelisted(name: &str) -> bool {
    HEADER_WHITELIST
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(name))
}

/// Remove all instances of every non-whitelisted header.
///
/// Returns the number of fields removed.
pub fn scrub_headers(headers: &mut Headers) -> usize {
    let before = headers.len();
    headers.retain(|field| {
        let keep = is_whitelisted(field.name());
        if !keep {
            debug!(header = field.name(), "Removing non-whitelisted header");
        }
        keep
    });
    before - headers.len()
}

/// Replace each `To`/`CC`/`BCC` value that holds a destination with the
/// bare destination. Other values are left as they are.
pub fn strip_recipient_names(headers: &mut Headers) {
    for name in RECIPIENT_HEADERS {
        let values: Vec<String> = headers
            .get(name)
            .into_iter()
            .map(|value| match Destination::extract(value) {
                Some(destination) => destination.to_address(),
                None => value.to_string(),
            })
            .collect();
        if !values.is_empty() {
            headers.replace_all(name, &values);
        }
    }
}

fn same_address(a: &str, b: &str) -> bool {
    match (Destination::extract(a), Destination::extract(b)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

/// Restrict the `BCC` header to the recipient a packet set is built for.
///
/// When `keep` is one of the BCC recipients the header becomes exactly
/// `[keep]`; otherwise every BCC value is removed.
pub fn isolate_bcc(headers: &mut Headers, keep: &str) {
    let kept: Vec<String> = headers
        .get("BCC")
        .into_iter()
        .find(|value| same_address(value, keep))
        .map(|value| vec![value.to_string()])
        .unwrap_or_default();

    if kept.is_empty() {
        headers.remove("BCC");
    } else {
        headers.replace_all("BCC", &kept);
    }
}

/// Format a send time for the `Date` header.
pub fn format_sent_time(time: DateTime<Utc>) -> String {
    time.format(SENT_TIME_FORMAT).to_string()
}

/// Set `Date` to `sent_time`, or remove it when `None`.
pub fn apply_sent_time(headers: &mut Headers, sent_time: Option<DateTime<Utc>>) {
    match sent_time {
        Some(time) => headers.set("Date", &format_sent_time(time)),
        None => {
            headers.remove("Date");
        }
    }
}

/// Whether `value` is a syntactically valid external address with a
/// domain, optionally wrapped as `Name <local@domain.tld>`.
pub fn is_external_address(value: &str) -> bool {
    let value = value.trim();
    let addr_spec = match (value.rfind('<'), value.rfind('>')) {
        (Some(start), Some(end)) if start < end && end == value.len() - 1 => {
            &value[start + 1..end]
        }
        (None, None) => value,
        _ => return false,
    };

    if addr_spec.is_empty()
        || addr_spec
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>,;\"".contains(c))
    {
        return false;
    }

    let Some((local, domain)) = addr_spec.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Check every address-bearing header.
///
/// Each value must hold a destination or an external address with a
/// domain. `Sender` is not checked on anonymous messages.
///
/// # Errors
///
/// Returns [`AddressError::InvalidAddress`] with the first offending value.
pub fn check_addresses(message: &Message) -> Result<(), AddressError> {
    let anonymous = message.is_anonymous();

    for field in message.headers().iter() {
        let name = field.name();
        if !ADDRESS_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            continue;
        }
        if anonymous && name.eq_ignore_ascii_case("Sender") {
            continue;
        }

        let value = field.value();
        if Destination::extract(value).is_none() && !is_external_address(value) {
            debug!(header = name, "Address contains no destination or external address");
            return Err(AddressError::InvalidAddress(value.to_string()));
        }
    }
    Ok(())
}

/// The fixed pre-signing transforms, configured once per pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeaderPrivacyFilter {
    include_sent_time: bool,
}

impl HeaderPrivacyFilter {
    /// Create a filter.
    pub fn new(include_sent_time: bool) -> Self {
        Self { include_sent_time }
    }

    /// Create a filter from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.include_sent_time)
    }

    /// Scrub, strip recipient names, then set or remove the send time.
    pub fn prepare(&self, headers: &mut Headers) {
        self.prepare_at(headers, Utc::now());
    }

    /// [`prepare`](Self::prepare) with an explicit current time.
    pub fn prepare_at(&self, headers: &mut Headers, now: DateTime<Utc>) {
        scrub_headers(headers);
        strip_recipient_names(headers);
        apply_sent_time(headers, self.include_sent_time.then_some(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use postern_crypto::SigningIdentity;

    fn destination(seed: u8) -> String {
        SigningIdentity::from_seed("x", [seed; 32])
            .destination()
            .to_address()
    }

    #[test]
    fn test_scrub_removes_all_instances() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("Subject", "s");
        headers.add("received", "from b");
        headers.add("X-Mailer", "client 1.0");
        headers.add("x-priority", "1");
        headers.add(SIGNATURE_HEADER, "1_AAAA");

        assert_eq!(scrub_headers(&mut headers), 3);
        let names: Vec<&str> = headers.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["Subject", "x-priority", SIGNATURE_HEADER]);
    }

    #[test]
    fn test_strip_recipient_names() {
        let dest = destination(1);
        let mut headers = Headers::new();
        headers.add("To", &format!("Bob <{}>", dest));
        headers.add("To", "Carol <carol@example.com>");
        headers.add("From", &format!("Alice <{}>", dest));

        strip_recipient_names(&mut headers);

        assert_eq!(
            headers.get("To"),
            vec![dest.as_str(), "Carol <carol@example.com>"]
        );
        // only recipient headers are touched
        assert_eq!(headers.first("From"), Some(format!("Alice <{}>", dest).as_str()));
    }

    #[test]
    fn test_isolate_bcc_keeps_only_target() {
        let (a, b, c) = (destination(1), destination(2), destination(3));
        let mut headers = Headers::new();
        headers.add("To", &a);
        headers.add("BCC", &b);
        headers.add("BCC", &c);

        let mut for_b = headers.clone();
        isolate_bcc(&mut for_b, &format!("Bob <{}>", b));
        assert_eq!(for_b.get("BCC"), vec![b.as_str()]);

        let mut for_a = headers.clone();
        isolate_bcc(&mut for_a, &a);
        assert!(for_a.get("BCC").is_empty());
        assert_eq!(for_a.get("To"), vec![a.as_str()]);
    }

    #[test]
    fn test_sent_time() {
        let mut headers = Headers::new();
        headers.add("Date", "local time");

        let time = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        apply_sent_time(&mut headers, Some(time));
        assert_eq!(headers.first("Date"), Some("Tue, 05 Mar 2024 07:08:09 +0000"));

        apply_sent_time(&mut headers, None);
        assert!(!headers.contains("Date"));
    }

    #[test]
    fn test_external_addresses() {
        assert!(is_external_address("a@example.com"));
        assert!(is_external_address("john.doe@mail.example.org"));
        assert!(is_external_address("John <john@example.com>"));

        assert!(!is_external_address("a@localhost"));
        assert!(!is_external_address("example.com"));
        assert!(!is_external_address("@example.com"));
        assert!(!is_external_address("a@example."));
        assert!(!is_external_address("a b@example.com"));
        assert!(!is_external_address("a@example.com, b@example.com"));
        assert!(!is_external_address("John <john@example.com"));
    }

    #[test]
    fn test_check_addresses() {
        let mut message = Message::new();
        message.headers_mut().add("To", &destination(1));
        message.headers_mut().add("CC", "friend@example.com");
        assert!(check_addresses(&message).is_ok());

        message.headers_mut().add("BCC", "not-an-address");
        assert_eq!(
            check_addresses(&message),
            Err(AddressError::InvalidAddress("not-an-address".into()))
        );
    }

    #[test]
    fn test_anonymous_sender_is_exempt() {
        let mut message = Message::new();
        message.headers_mut().set("Sender", "Anonymous");
        message.headers_mut().add("To", &destination(1));
        assert!(check_addresses(&message).is_ok());

        message.headers_mut().set("Sender", "Alice");
        assert!(check_addresses(&message).is_err());
    }

    #[test]
    fn test_prepare_order() {
        let dest = destination(4);
        let mut headers = Headers::new();
        headers.add("X-Mailer", "client");
        headers.add("To", &format!("Bob <{}>", dest));
        headers.add("Date", "whenever");

        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut without_time = headers.clone();
        HeaderPrivacyFilter::new(false).prepare_at(&mut without_time, now);
        assert!(!without_time.contains("X-Mailer"));
        assert!(!without_time.contains("Date"));
        assert_eq!(without_time.get("To"), vec![dest.as_str()]);

        let mut with_time = headers.clone();
        HeaderPrivacyFilter::from_config(&PipelineConfig::builder().include_sent_time(true).build())
            .prepare_at(&mut with_time, now);
        assert_eq!(with_time.first("Date"), Some("Wed, 01 Jan 2020 00:00:00 +0000"));
    }
}
