pub mod error;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use error::BeelineError;

/// Default row limit applied when an option struct leaves `limit` at 0.
pub const DEFAULT_LIMIT: usize = 50;

/// Default symmetric time window around a search match.
pub const DEFAULT_CONTEXT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Controls how message text is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Raw/plain text only.
    Plain,
    /// Attachments and non-text messages rendered with placeholders.
    Rich,
}

impl Default for MessageFormat {
    fn default() -> Self {
        MessageFormat::Rich
    }
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Rich => "rich",
        }
    }
}

impl std::str::FromStr for MessageFormat {
    type Err = BeelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "rich" => Ok(Self::Rich),
            "plain" => Ok(Self::Plain),
            other => Err(BeelineError::InvalidArgument(format!(
                "invalid format {other:?}: use plain or rich"
            ))),
        }
    }
}

impl std::fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters conversation lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadLabel {
    All,
    Inbox,
    Archive,
    Favourite,
    Unread,
}

impl Default for ThreadLabel {
    fn default() -> Self {
        ThreadLabel::All
    }
}

impl ThreadLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Inbox => "inbox",
            Self::Archive => "archive",
            Self::Favourite => "favourite",
            Self::Unread => "unread",
        }
    }
}

impl std::str::FromStr for ThreadLabel {
    type Err = BeelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "inbox" => Ok(Self::Inbox),
            "archive" => Ok(Self::Archive),
            "favourite" => Ok(Self::Favourite),
            "unread" => Ok(Self::Unread),
            other => Err(BeelineError::InvalidArgument(format!(
                "invalid label {other:?}: use inbox|archive|favourite|unread|all"
            ))),
        }
    }
}

impl std::fmt::Display for ThreadLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user in a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub is_self: bool,
}

/// A conversation (chat room or DM) from the index database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub thread_type: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(rename = "lastMessageTime", skip_serializing_if = "Option::is_none")]
    pub last_message: Option<DateTime<Utc>>,
    #[serde(rename = "lastOpenTime", skip_serializing_if = "Option::is_none")]
    pub last_open: Option<DateTime<Utc>>,
    pub is_unread: bool,
    pub is_marked_unread: bool,
    pub is_low_priority: bool,
    pub is_archived: bool,
    pub unread_count: i64,
    pub unread_mentions: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_messages: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub participants: Vec<Participant>,
}

/// A message row, enriched for display after retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub event_id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub is_sent_by_me: bool,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub text: String,
    /// Native FTS relevance rank (lower is more relevant). Absent when the
    /// match came from the LIKE fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A search match plus optional surrounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "match")]
    pub matched: Message,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub context: Vec<Message>,
}

/// Configures store behavior at open time.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Resolve DM names through discovered bridge databases.
    pub bridge_lookup: bool,
    /// Override the bridge discovery root (defaults to the index.db parent).
    pub bridge_root: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            bridge_lookup: true,
            bridge_root: None,
        }
    }
}

/// Controls thread list filtering.
#[derive(Debug, Clone, Default)]
pub struct ThreadListOptions {
    pub days: u32,
    pub limit: usize,
    pub account_id: Option<String>,
    pub label: ThreadLabel,
    pub include_low_priority: bool,
    pub with_participants: bool,
    pub with_stats: bool,
}

/// Controls message list filtering.
#[derive(Debug, Clone, Default)]
pub struct MessageListOptions {
    pub thread_id: String,
    pub limit: usize,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub format: MessageFormat,
}

/// Controls full-text search behavior.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: String,
    pub thread_id: Option<String>,
    pub account_id: Option<String>,
    pub days: u32,
    pub limit: usize,
    /// Trim context to N messages before and after the match.
    pub context: usize,
    /// Symmetric time window around the match; `None` uses the default hour.
    pub window: Option<Duration>,
    pub format: MessageFormat,
}
