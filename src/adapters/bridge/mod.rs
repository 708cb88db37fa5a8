//! Bridge database name resolution
//!
//! Beeper keeps one auxiliary SQLite store per bridged platform
//! (`local-<platform>/megabridge.db`) mapping rooms to remote contacts and
//! contacts to display names. This resolver discovers those stores once,
//! then answers DM-name lookups with a per-room cache so each room touches
//! a bridge database at most once per session. Negative results are cached
//! too.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::types::error::Result;

const BRIDGE_DIR_PREFIX: &str = "local-";
const BRIDGE_DB_NAME: &str = "megabridge.db";

/// Resolves DM names via platform bridge databases.
pub struct BridgeLookup {
    /// Normalized platform id -> bridge database path. Sorted so that the
    /// first-match-wins scan over unknown platforms is deterministic.
    platform_dbs: BTreeMap<String, PathBuf>,
    /// Room id -> resolved name; `None` records a lookup that found nothing.
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl BridgeLookup {
    /// Scan `root` for platform directories holding a bridge database.
    ///
    /// Only an unreadable root is an error; directories without a bridge
    /// database are skipped.
    pub fn discover(root: &Path) -> Result<Self> {
        let mut platform_dbs = BTreeMap::new();

        for entry in std::fs::read_dir(root)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(BRIDGE_DIR_PREFIX) {
                continue;
            }
            let path = entry.path().join(BRIDGE_DB_NAME);
            if !path.is_file() {
                continue;
            }
            platform_dbs.insert(normalize_platform(&name), path);
        }

        debug!(count = platform_dbs.len(), root = %root.display(), "discovered bridge databases");

        Ok(Self {
            platform_dbs,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Discovered bridge database paths, in platform order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.platform_dbs.values().cloned().collect()
    }

    /// Attempt to resolve a DM name for the given room.
    ///
    /// A cached entry (including a recorded miss) is returned without any
    /// storage access. When the account's platform maps to a known store,
    /// only that store is queried; otherwise every store is probed in
    /// platform order until one matches. `Ok(None)` means "not found";
    /// errors are reserved for store I/O failures and are never cached.
    pub fn lookup_dm_name(&self, room_id: &str, account_id: &str) -> Result<Option<String>> {
        if self.platform_dbs.is_empty() {
            return Ok(None);
        }

        if let Ok(cache) = self.cache.lock() {
            if let Some(cached) = cache.get(room_id) {
                return Ok(cached.clone());
            }
        }

        if !account_id.is_empty() {
            if let Some(path) = self.platform_dbs.get(&normalize_platform(account_id)) {
                let name = query_bridge_name(path, room_id)?;
                self.cache_put(room_id, name.clone());
                return Ok(name);
            }
        }

        for path in self.platform_dbs.values() {
            if let Some(name) = query_bridge_name(path, room_id)? {
                self.cache_put(room_id, Some(name.clone()));
                return Ok(Some(name));
            }
        }

        self.cache_put(room_id, None);
        Ok(None)
    }

    fn cache_put(&self, room_id: &str, name: Option<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(room_id.to_string(), name);
        }
    }
}

/// Two-step join: room -> remote contact (`portal`), contact -> name
/// (`ghost`). Opens a short-lived read-only connection that is closed on
/// drop before the lookup returns.
fn query_bridge_name(db_path: &Path, room_id: &str) -> Result<Option<String>> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::from_millis(5000))?;

    let other_user: Option<String> = conn
        .query_row(
            "SELECT other_user_id FROM portal WHERE mxid = ?1 AND other_user_id IS NOT NULL LIMIT 1",
            [room_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(other_user) = other_user else {
        return Ok(None);
    };

    let name: Option<String> = conn
        .query_row(
            "SELECT name FROM ghost WHERE id = ?1 AND name != '' LIMIT 1",
            [&other_user],
            |row| row.get(0),
        )
        .optional()?;

    Ok(name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

fn normalize_platform(platform: &str) -> String {
    let normalized = platform.trim().to_lowercase();
    normalized
        .strip_prefix(BRIDGE_DIR_PREFIX)
        .unwrap_or(&normalized)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_bridge_db(root: &Path, platform: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
        let dir = root.join(format!("local-{platform}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(BRIDGE_DB_NAME);
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE portal (mxid TEXT, other_user_id TEXT);
             CREATE TABLE ghost (id TEXT, name TEXT);",
        )
        .unwrap();
        for (mxid, user, name) in rows {
            conn.execute(
                "INSERT INTO portal (mxid, other_user_id) VALUES (?1, ?2)",
                [mxid, user],
            )
            .unwrap();
            conn.execute("INSERT INTO ghost (id, name) VALUES (?1, ?2)", [user, name])
                .unwrap();
        }
        path
    }

    #[test]
    fn test_discover_skips_unrelated_entries() {
        let tmp = tempfile::tempdir().unwrap();
        create_bridge_db(tmp.path(), "whatsapp", &[]);
        // Platform dir without a bridge database.
        std::fs::create_dir_all(tmp.path().join("local-telegram")).unwrap();
        // Non-platform dir.
        std::fs::create_dir_all(tmp.path().join("cache")).unwrap();

        let lookup = BridgeLookup::discover(tmp.path()).unwrap();
        assert_eq!(lookup.paths().len(), 1);
        assert!(lookup.platform_dbs.contains_key("whatsapp"));
    }

    #[test]
    fn test_lookup_targets_known_platform() {
        let tmp = tempfile::tempdir().unwrap();
        create_bridge_db(tmp.path(), "whatsapp", &[("!dm:x", "user-1", "Alice")]);
        create_bridge_db(tmp.path(), "signal", &[("!dm:x", "user-2", "Wrong")]);

        let lookup = BridgeLookup::discover(tmp.path()).unwrap();
        let name = lookup.lookup_dm_name("!dm:x", "whatsapp").unwrap();
        assert_eq!(name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_unknown_platform_scans_in_sorted_order() {
        let tmp = tempfile::tempdir().unwrap();
        create_bridge_db(tmp.path(), "whatsapp", &[("!dm:x", "user-1", "FromWhatsapp")]);
        create_bridge_db(tmp.path(), "signal", &[("!dm:x", "user-2", "FromSignal")]);

        let lookup = BridgeLookup::discover(tmp.path()).unwrap();
        // "signal" sorts before "whatsapp"; first match wins.
        let name = lookup.lookup_dm_name("!dm:x", "").unwrap();
        assert_eq!(name.as_deref(), Some("FromSignal"));
    }

    #[test]
    fn test_cache_skips_storage_on_second_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let db = create_bridge_db(tmp.path(), "whatsapp", &[("!dm:x", "user-1", "Alice")]);

        let lookup = BridgeLookup::discover(tmp.path()).unwrap();
        assert_eq!(
            lookup.lookup_dm_name("!dm:x", "whatsapp").unwrap().as_deref(),
            Some("Alice")
        );
        assert!(lookup.lookup_dm_name("!miss:x", "whatsapp").unwrap().is_none());

        // With the store gone, only cached answers can succeed.
        std::fs::remove_file(&db).unwrap();
        assert_eq!(
            lookup.lookup_dm_name("!dm:x", "whatsapp").unwrap().as_deref(),
            Some("Alice")
        );
        // The recorded miss is cached as well.
        assert!(lookup.lookup_dm_name("!miss:x", "whatsapp").unwrap().is_none());
        // An uncached room now fails, proving the earlier hits never reopened.
        assert!(lookup.lookup_dm_name("!new:x", "whatsapp").is_err());
    }
}
