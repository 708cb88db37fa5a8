//! Conversation classification
//!
//! Derives archived state, label membership, and ordering timestamps from
//! the partially-missing metadata carried on thread rows. The
//! archived-through marker is untyped at the source (it may hold a
//! millisecond timestamp, an ordering sequence number, or a bare presence
//! flag), so it is resolved into a tagged [`ArchiveMarker`] once at
//! ingestion instead of being re-parsed at every comparison.

use crate::types::{Thread, ThreadLabel};

/// Values above this are treated as millisecond timestamps rather than
/// ordering sequence numbers (13-digit magnitude, ~2001 onwards).
const MILLIS_TIMESTAMP_THRESHOLD: i64 = 1_000_000_000_000;

const FAVOURITE_TAG: &str = "favourite";

/// The archived-through marker, resolved from its raw textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMarker {
    /// Millisecond timestamp: archived up to this point in time.
    Timestamp(i64),
    /// Ordering sequence number: archived up to this sequence value.
    Order(i64),
    /// Non-blank but unparsable marker; presence alone means archived.
    Present,
}

impl ArchiveMarker {
    /// Resolve a raw marker field. Blank or absent input yields `None`.
    pub fn from_raw(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        match parse_marker_value(raw) {
            Some(value) if value > MILLIS_TIMESTAMP_THRESHOLD => Some(Self::Timestamp(value)),
            Some(value) => Some(Self::Order(value)),
            None => Some(Self::Present),
        }
    }
}

/// Archive-related metadata of a single thread, ingested once per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveState {
    /// The archived-through marker (timestamp, order, or bare presence).
    pub up_to: Option<ArchiveMarker>,
    /// The separate archived-through ordering sequence marker.
    pub up_to_order: Option<i64>,
}

impl ArchiveState {
    pub fn from_raw(up_to: Option<&str>, up_to_order: Option<&str>) -> Self {
        Self {
            up_to: ArchiveMarker::from_raw(up_to),
            up_to_order: up_to_order.and_then(|raw| parse_marker_value(raw.trim())),
        }
    }

    /// Archived determination, first applicable rule wins.
    pub fn is_archived(&self, latest_order: Option<i64>, last_message_ms: Option<i64>) -> bool {
        if let (Some(marker), Some(latest)) = (self.up_to_order, latest_order) {
            return latest <= marker;
        }

        match self.up_to {
            Some(ArchiveMarker::Timestamp(ts)) => {
                // Unknown last-message time: the conservative answer is archived.
                last_message_ms.map_or(true, |last| last <= ts)
            }
            Some(ArchiveMarker::Order(value)) => {
                latest_order.map_or(true, |latest| latest <= value)
            }
            Some(ArchiveMarker::Present) => true,
            None => false,
        }
    }
}

/// Strip the optional `ts` prefix, then parse as integer or float text.
fn parse_marker_value(raw: &str) -> Option<i64> {
    let mut raw = raw;
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0].eq_ignore_ascii_case(&b't') && bytes[1].eq_ignore_ascii_case(&b's') {
        raw = &raw[2..];
    }
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = raw.parse::<i64>() {
        return Some(parsed);
    }
    raw.parse::<f64>().ok().map(|parsed| parsed as i64)
}

/// Whether a thread belongs to the requested label.
///
/// Low-priority threads are excluded from every label unless explicitly
/// requested. A favourite tag always wins over archived state in the inbox.
pub fn label_matches(label: ThreadLabel, thread: &Thread, include_low_priority: bool) -> bool {
    if !include_low_priority && thread.is_low_priority {
        return false;
    }

    match label {
        ThreadLabel::Inbox => has_tag(&thread.tags, FAVOURITE_TAG) || !thread.is_archived,
        ThreadLabel::Archive => thread.is_archived && !has_tag(&thread.tags, FAVOURITE_TAG),
        ThreadLabel::Favourite => has_tag(&thread.tags, FAVOURITE_TAG),
        ThreadLabel::Unread => thread.is_unread || thread.is_marked_unread,
        ThreadLabel::All => true,
    }
}

fn has_tag(tags: &[String], target: &str) -> bool {
    tags.iter().any(|tag| tag.eq_ignore_ascii_case(target))
}

/// Parse the raw tags metadata field: a JSON string array, with a lenient
/// fallback for legacy rows that carry the favourite tag in free-form text.
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return Vec::new(),
    };
    if raw.is_empty() {
        return Vec::new();
    }
    if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
        return tags;
    }
    if raw.to_lowercase().contains(FAVOURITE_TAG) {
        return vec![FAVOURITE_TAG.to_string()];
    }
    Vec::new()
}

/// Latest of the available activity timestamps; zero or absent never wins.
pub fn last_activity_ms(
    last_message: Option<i64>,
    last_open: Option<i64>,
    metadata_ts: i64,
) -> Option<i64> {
    [last_message, last_open, Some(metadata_ts)]
        .into_iter()
        .flatten()
        .filter(|ms| *ms > 0)
        .max()
}
