//! Read-only access to the Beeper index database
//!
//! The [`Store`] owns one pooled connection to `index.db` (capped at a
//! single connection, so every read is serialized through it) plus the
//! optional bridge resolver for DM names. Query logic is split per
//! concern: `threads`, `messages`, and `search`.

pub mod messages;
pub mod search;
pub mod threads;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use crate::adapters::bridge::BridgeLookup;
use crate::types::error::{BeelineError, Result};
use crate::types::StoreOptions;

pub type DbPool = Pool<SqliteConnectionManager>;

pub(crate) const FTS_TABLE: &str = "mx_room_messages_fts";

/// Read-only handle on a Beeper SQLite database.
pub struct Store {
    pool: DbPool,
    bridge: Option<BridgeLookup>,
}

impl Store {
    /// Open a read-only store with bridge lookups enabled.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, StoreOptions::default())
    }

    /// Open a read-only store with the provided options.
    ///
    /// The connection is pinged at open time; an unreachable database is a
    /// session-fatal [`BeelineError::StorageUnavailable`]. Bridge discovery
    /// failures only disable DM-name lookups.
    pub fn open_with_options(path: &Path, opts: StoreOptions) -> Result<Self> {
        if !path.is_file() {
            return Err(BeelineError::StorageUnavailable(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(|conn| conn.busy_timeout(Duration::from_millis(5000)));

        // All reads share one serialized connection.
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .map_err(|err| BeelineError::StorageUnavailable(err.to_string()))?;

        {
            let conn = pool
                .get()
                .map_err(|err| BeelineError::StorageUnavailable(err.to_string()))?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|err| BeelineError::StorageUnavailable(err.to_string()))?;
        }

        debug!(path = %path.display(), "opened index database");

        let bridge = if opts.bridge_lookup {
            let root = match opts.bridge_root {
                Some(root) => root,
                None => path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
            };
            match BridgeLookup::discover(&root) {
                Ok(bridge) => Some(bridge),
                Err(err) => {
                    warn!(root = %root.display(), %err, "bridge discovery failed, DM name lookups disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { pool, bridge })
    }

    /// Discovered platform bridge database paths.
    pub fn bridge_dbs(&self) -> Vec<PathBuf> {
        self.bridge
            .as_ref()
            .map(BridgeLookup::paths)
            .unwrap_or_default()
    }

    /// Whether the full-text index table exists.
    pub fn has_fts(&self) -> Result<bool> {
        let conn = self.conn()?;
        has_fts(&conn)
    }

    pub(crate) fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(Into::into)
    }

    pub(crate) fn bridge(&self) -> Option<&BridgeLookup> {
        self.bridge.as_ref()
    }
}

pub(crate) fn has_fts(conn: &Connection) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
            [FTS_TABLE],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Millisecond timestamp to `DateTime`; zero means unknown.
pub(crate) fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    if ms == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}

pub(crate) fn cutoff_ms(days: u32) -> i64 {
    Utc::now().timestamp_millis() - i64::from(days) * 86_400_000
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

pub(crate) fn unique_non_empty(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|value| !value.is_empty() && seen.insert(value.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{
        MessageFormat, MessageListOptions, SearchOptions, ThreadLabel, ThreadListOptions,
    };

    pub(crate) fn create_test_db(dir: &Path, with_fts: bool) -> PathBuf {
        let path = dir.join("index.db");
        let conn = Connection::open(&path).unwrap();

        conn.execute_batch(
            "CREATE TABLE threads (threadID TEXT PRIMARY KEY, accountID TEXT, thread JSON NOT NULL, timestamp INTEGER DEFAULT 0);
             CREATE TABLE breadcrumbs (id TEXT PRIMARY KEY, lastOpenTime INTEGER);
             CREATE TABLE participants (account_id TEXT NOT NULL, room_id TEXT NOT NULL, id TEXT NOT NULL, full_name TEXT, nickname TEXT, is_self INTEGER);
             CREATE TABLE mx_room_messages (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 roomID TEXT NOT NULL,
                 eventID TEXT NOT NULL,
                 senderContactID TEXT NOT NULL,
                 timestamp INTEGER NOT NULL,
                 isDeleted INTEGER NOT NULL DEFAULT 0,
                 type TEXT NOT NULL,
                 hsOrder INTEGER NOT NULL,
                 isSentByMe INTEGER NOT NULL,
                 message JSON,
                 text_content TEXT
             );",
        )
        .unwrap();

        if with_fts {
            conn.execute_batch(&format!(
                "CREATE VIRTUAL TABLE {FTS_TABLE} USING fts5(text_content);"
            ))
            .unwrap();
        }

        let threads: &[(&str, &str, &str, i64)] = &[
            (
                "!room1:beeper.local",
                "whatsapp",
                r#"{"title":"Team Chat","type":"group","isUnread":1,"isMarkedUnread":0,"isLowPriority":0,"unreadCount":2,"unreadMentionsCount":1}"#,
                1_700_000_000_000,
            ),
            (
                "!room2:beeper.local",
                "telegram",
                r#"{"title":"Archived","type":"group","isUnread":0,"isMarkedUnread":0,"isLowPriority":0,"extra":{"isArchivedUpto":5}}"#,
                1_700_000_001_000,
            ),
            (
                "!room3:beeper.local",
                "signal",
                r#"{"title":"Fav","type":"group","isUnread":0,"isMarkedUnread":0,"isLowPriority":1,"extra":{"isArchivedUpto":5,"tags":["favourite"]}}"#,
                1_700_000_002_000,
            ),
            ("!room4:beeper.local", "whatsapp", r#"{"type":"single"}"#, 1_700_000_003_000),
        ];

        for (id, account, thread, ts) in threads {
            conn.execute(
                "INSERT INTO threads (threadID, accountID, thread, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, account, thread, ts],
            )
            .unwrap();
        }

        conn.execute(
            "INSERT INTO breadcrumbs (id, lastOpenTime) VALUES (?1, ?2)",
            rusqlite::params!["!room1:beeper.local", 1_700_000_000_500i64],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO participants (account_id, room_id, id, full_name, nickname, is_self) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params!["whatsapp", "!room1:beeper.local", "@alice:beeper.local", "Alice", "", 0],
        )
        .unwrap();

        let messages: &[(i64, &str, &str, &str, i64, &str, i64, i64, &str, &str)] = &[
            (1, "!room1:beeper.local", "$evt1", "@alice:beeper.local", 1_700_000_000_100, "TEXT", 6, 0, r#"{"text":"hello"}"#, "hello"),
            (2, "!room1:beeper.local", "$evt2", "@alice:beeper.local", 1_700_000_000_200, "TEXT", 7, 0, r#"{"text":"christmas party"}"#, "christmas party"),
            (3, "!room1:beeper.local", "$evt3", "@alice:beeper.local", 1_700_000_000_300, "TEXT", 8, 0, r#"{"text":"see you"}"#, "see you"),
            (4, "!room2:beeper.local", "$evt4", "@bob:beeper.local", 1_700_000_000_400, "TEXT", 5, 0, r#"{"text":"archived"}"#, "archived"),
            (5, "!room3:beeper.local", "$evt5", "@eve:beeper.local", 1_700_000_000_500, "TEXT", 5, 0, r#"{"text":"fav"}"#, "fav"),
            (6, "!room4:beeper.local", "$evt6", "@bridge:beeper.local", 1_700_000_000_600, "TEXT", 1, 0, r#"{"text":"dm"}"#, "dm"),
            (7, "!room1:beeper.local", "$evt7", "@alice:beeper.local", 1_700_000_000_700, "TEXT", 9, 0, r#"{"text":"invoice due"}"#, "invoice due"),
        ];

        for (id, room, event, sender, ts, msg_type, hs_order, is_me, message, text) in messages {
            conn.execute(
                "INSERT INTO mx_room_messages (id, roomID, eventID, senderContactID, timestamp, isDeleted, type, hsOrder, isSentByMe, message, text_content)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![id, room, event, sender, ts, msg_type, hs_order, is_me, message, text],
            )
            .unwrap();
            if with_fts {
                conn.execute(
                    &format!("INSERT INTO {FTS_TABLE} (rowid, text_content) VALUES (?1, ?2)"),
                    rusqlite::params![id, text],
                )
                .unwrap();
            }
        }

        path
    }

    pub(crate) fn create_bridge_root(dir: &Path) -> PathBuf {
        let root = dir.join("bridges");
        let bridge_dir = root.join("local-whatsapp");
        std::fs::create_dir_all(&bridge_dir).unwrap();
        let conn = Connection::open(bridge_dir.join("megabridge.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE portal (mxid TEXT, other_user_id TEXT);
             CREATE TABLE ghost (id TEXT, name TEXT);",
        )
        .unwrap();
        conn.execute(
            "INSERT INTO portal (mxid, other_user_id) VALUES (?1, ?2)",
            ["!room4:beeper.local", "user-1"],
        )
        .unwrap();
        conn.execute("INSERT INTO ghost (id, name) VALUES (?1, ?2)", ["user-1", "Bridge Name"])
            .unwrap();
        root
    }

    pub(crate) fn open_plain(path: &Path) -> Store {
        Store::open_with_options(
            path,
            StoreOptions {
                bridge_lookup: false,
                bridge_root: None,
            },
        )
        .unwrap()
    }

    fn ids(threads: &[crate::types::Thread]) -> Vec<&str> {
        threads.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_open_missing_db_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Store::open_with_options(
            &tmp.path().join("absent.db"),
            StoreOptions {
                bridge_lookup: false,
                bridge_root: None,
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, BeelineError::StorageUnavailable(_)));
    }

    #[test]
    fn test_list_threads_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let inbox = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Inbox,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&inbox), vec!["!room1:beeper.local", "!room4:beeper.local"]);

        let archive = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Archive,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&archive), vec!["!room2:beeper.local"]);

        let favourite = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Favourite,
                include_low_priority: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&favourite), vec!["!room3:beeper.local"]);

        let unread = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Unread,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&unread), vec!["!room1:beeper.local"]);
    }

    #[test]
    fn test_archived_favourite_stays_out_of_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        // room3 carries both an archived marker and the favourite tag.
        let inbox = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Inbox,
                include_low_priority: true,
                ..Default::default()
            })
            .unwrap();
        assert!(ids(&inbox).contains(&"!room3:beeper.local"));

        let archive = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::Archive,
                include_low_priority: true,
                ..Default::default()
            })
            .unwrap();
        assert!(!ids(&archive).contains(&"!room3:beeper.local"));
    }

    #[test]
    fn test_thread_enrichment() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let threads = store
            .list_threads(&ThreadListOptions {
                label: ThreadLabel::All,
                with_participants: true,
                with_stats: true,
                account_id: Some("whatsapp".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids(&threads), vec!["!room1:beeper.local", "!room4:beeper.local"]);

        let room1 = &threads[0];
        assert_eq!(room1.display_name, "Team Chat");
        assert_eq!(room1.unread_count, 2);
        assert_eq!(room1.unread_mentions, 1);
        assert_eq!(room1.total_messages, Some(4));
        assert_eq!(room1.participants.len(), 1);
        assert_eq!(room1.participants[0].name, "Alice");

        // No title, no participants, no bridge: the sentinel name.
        assert_eq!(threads[1].display_name, "(unknown)");
    }

    #[test]
    fn test_get_thread() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let thread = store.get_thread("!room1:beeper.local", true).unwrap();
        assert_eq!(thread.display_name, "Team Chat");
        assert_eq!(thread.total_messages, Some(4));
        assert!(thread.last_message.is_some());

        let plain = store.get_thread("!room1:beeper.local", false).unwrap();
        assert_eq!(plain.total_messages, None);
        assert!(plain.last_message.is_none());
        assert!(plain.last_activity.is_some());

        let err = store.get_thread("!nope:beeper.local", false).err().unwrap();
        assert!(matches!(err, BeelineError::ThreadNotFound(_)));
    }

    #[test]
    fn test_list_messages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let err = store
            .list_messages(&MessageListOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, BeelineError::InvalidArgument(_)));

        let messages = store
            .list_messages(&MessageListOptions {
                thread_id: "!room1:beeper.local".to_string(),
                format: MessageFormat::Plain,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(messages.len(), 4);
        // Newest first.
        assert_eq!(messages[0].text, "invoice due");
        assert_eq!(messages[0].sender_name.as_deref(), Some("Alice"));
        assert_eq!(messages[3].text, "hello");
    }

    #[test]
    fn test_search_with_context() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), true));

        let results = store
            .search_messages(&SearchOptions {
                query: "christmas".to_string(),
                limit: 5,
                context: 1,
                window: Some(Duration::from_secs(3600)),
                format: MessageFormat::Plain,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.matched.text, "christmas party");
        assert!(result.matched.score.is_some());
        assert_eq!(result.matched.thread_name.as_deref(), Some("Team Chat"));

        // Exactly the neighbors, oldest first, match excluded.
        let context: Vec<&str> = result.context.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(context, vec!["hello", "see you"]);
    }

    #[test]
    fn test_search_fallback_like() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let results = store
            .search_messages(&SearchOptions {
                query: "invoice".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched.id, 7);
        assert!(results[0].matched.score.is_none());
    }

    #[test]
    fn test_fallback_matches_fts_result() {
        let tmp = tempfile::tempdir().unwrap();
        let path = create_test_db(tmp.path(), true);
        let store = open_plain(&path);

        let opts = SearchOptions {
            query: "invoice".to_string(),
            ..Default::default()
        };

        let with_index = store.search_messages(&opts).unwrap();
        assert_eq!(with_index.len(), 1);

        // Remove the index out from under the store; the LIKE fallback must
        // find the same row.
        Connection::open(&path)
            .unwrap()
            .execute_batch(&format!("DROP TABLE {FTS_TABLE};"))
            .unwrap();
        assert!(!store.has_fts().unwrap());

        let without_index = store.search_messages(&opts).unwrap();
        assert_eq!(without_index.len(), 1);
        assert_eq!(without_index[0].matched.id, with_index[0].matched.id);
    }

    #[test]
    fn test_search_requires_query() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_plain(&create_test_db(tmp.path(), false));

        let err = store
            .search_messages(&SearchOptions {
                query: "   ".to_string(),
                ..Default::default()
            })
            .err()
            .unwrap();
        assert!(matches!(err, BeelineError::InvalidArgument(_)));
    }

    #[test]
    fn test_bridge_resolves_dm_display_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = create_test_db(tmp.path(), false);
        let bridge_root = create_bridge_root(tmp.path());

        let store = Store::open_with_options(
            &path,
            StoreOptions {
                bridge_lookup: true,
                bridge_root: Some(bridge_root),
            },
        )
        .unwrap();
        assert_eq!(store.bridge_dbs().len(), 1);

        let thread = store.get_thread("!room4:beeper.local", false).unwrap();
        assert_eq!(thread.display_name, "Bridge Name");
    }
}
