//! Thread listing and lookup
//!
//! Thread metadata lives in a JSON document on the row; the interesting
//! fields are projected out with `json_extract`. Label filtering happens
//! in memory after row materialization — the archived marker is a union
//! type that cannot be expressed as a single SQL predicate.

use std::collections::HashMap;

use rusqlite::{params_from_iter, types::Value, Connection};

use super::{cutoff_ms, ms_to_datetime, placeholders, unique_non_empty, Store};
use crate::services::classify::{self, ArchiveState};
use crate::types::error::{BeelineError, Result};
use crate::types::{Participant, Thread, ThreadListOptions, DEFAULT_LIMIT};

const UNKNOWN_NAME: &str = "(unknown)";

/// Shared projection for thread rows. The archived markers are cast to
/// text because the JSON side stores them as numbers or strings
/// interchangeably.
const THREAD_SELECT: &str = "SELECT t.threadID, t.accountID, t.timestamp,
    json_extract(t.thread,'$.title') AS title,
    json_extract(t.thread,'$.name') AS name,
    json_extract(t.thread,'$.type') AS type,
    json_extract(t.thread,'$.isUnread') AS isUnread,
    json_extract(t.thread,'$.isMarkedUnread') AS isMarkedUnread,
    json_extract(t.thread,'$.isLowPriority') AS isLowPriority,
    json_extract(t.thread,'$.unreadCount') AS unreadCount,
    json_extract(t.thread,'$.unreadMentionsCount') AS unreadMentionsCount,
    CAST(json_extract(t.thread,'$.extra.isArchivedUpto') AS TEXT) AS isArchivedUpto,
    CAST(json_extract(t.thread,'$.extra.isArchivedUpToOrder') AS TEXT) AS isArchivedUpToOrder,
    json_extract(t.thread,'$.extra.tags') AS tags,
    b.lastOpenTime AS lastOpenTime,
    (SELECT MAX(timestamp) FROM mx_room_messages WHERE roomID = t.threadID AND type NOT IN ('HIDDEN','REACTION')) AS lastMessageTime,
    (SELECT MAX(hsOrder) FROM mx_room_messages WHERE roomID = t.threadID AND type != 'HIDDEN') AS latestHsOrder,
    (SELECT COUNT(*) FROM mx_room_messages WHERE roomID = t.threadID AND type NOT IN ('HIDDEN','REACTION')) AS totalMessages
    FROM threads t
    LEFT JOIN breadcrumbs b ON t.threadID = b.id";

struct ThreadRow {
    id: String,
    account_id: Option<String>,
    metadata_ts: Option<i64>,
    title: Option<String>,
    name: Option<String>,
    thread_type: Option<String>,
    is_unread: Option<i64>,
    is_marked_unread: Option<i64>,
    is_low_priority: Option<i64>,
    unread_count: Option<i64>,
    unread_mentions: Option<i64>,
    archived_up_to: Option<String>,
    archived_up_to_order: Option<String>,
    tags: Option<String>,
    last_open: Option<i64>,
    last_message: Option<i64>,
    latest_order: Option<i64>,
    total_messages: Option<i64>,
}

fn scan_thread_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        metadata_ts: row.get(2)?,
        title: row.get(3)?,
        name: row.get(4)?,
        thread_type: row.get(5)?,
        is_unread: row.get(6)?,
        is_marked_unread: row.get(7)?,
        is_low_priority: row.get(8)?,
        unread_count: row.get(9)?,
        unread_mentions: row.get(10)?,
        archived_up_to: row.get(11)?,
        archived_up_to_order: row.get(12)?,
        tags: row.get(13)?,
        last_open: row.get(14)?,
        last_message: row.get(15)?,
        latest_order: row.get(16)?,
        total_messages: row.get(17)?,
    })
}

fn build_thread(raw: ThreadRow, with_stats: bool) -> Thread {
    let archive = ArchiveState::from_raw(
        raw.archived_up_to.as_deref(),
        raw.archived_up_to_order.as_deref(),
    );
    let archived = archive.is_archived(raw.latest_order, raw.last_message);

    let metadata_ts = raw.metadata_ts.unwrap_or(0);
    let last_activity = classify::last_activity_ms(raw.last_message, raw.last_open, metadata_ts);

    Thread {
        id: raw.id,
        account_id: raw.account_id.unwrap_or_default(),
        title: clean(raw.title),
        name: clean(raw.name),
        thread_type: clean(raw.thread_type),
        display_name: String::new(),
        last_activity: last_activity.and_then(ms_to_datetime),
        last_message: with_stats
            .then(|| raw.last_message.and_then(ms_to_datetime))
            .flatten(),
        last_open: with_stats
            .then(|| raw.last_open.and_then(ms_to_datetime))
            .flatten(),
        is_unread: raw.is_unread.unwrap_or(0) != 0,
        is_marked_unread: raw.is_marked_unread.unwrap_or(0) != 0,
        is_low_priority: raw.is_low_priority.unwrap_or(0) != 0,
        is_archived: archived,
        unread_count: raw.unread_count.unwrap_or(0),
        unread_mentions: raw.unread_mentions.unwrap_or(0),
        total_messages: with_stats.then_some(raw.total_messages).flatten(),
        tags: classify::parse_tags(raw.tags.as_deref()),
        participants: Vec::new(),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_direct(thread_type: Option<&str>) -> bool {
    matches!(thread_type, Some("single") | Some("dm"))
}

/// Thread metadata used to enrich search results.
pub(crate) struct ThreadInfo {
    pub account_id: String,
    pub title: Option<String>,
    pub name: Option<String>,
    pub thread_type: Option<String>,
}

impl Store {
    /// List threads filtered by the provided options, ordered by last
    /// activity descending.
    ///
    /// Account and time-range filters (and the limit) apply at the storage
    /// layer; label filtering runs in memory afterwards, so a filtered
    /// list may return fewer rows than the limit.
    pub fn list_threads(&self, opts: &ThreadListOptions) -> Result<Vec<Thread>> {
        let limit = if opts.limit == 0 { DEFAULT_LIMIT } else { opts.limit };

        let mut sql = String::from(THREAD_SELECT);
        let mut conds: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(account_id) = opts.account_id.as_deref().filter(|a| !a.is_empty()) {
            conds.push("t.accountID = ?");
            args.push(Value::from(account_id.to_string()));
        }
        if opts.days > 0 {
            conds.push("t.timestamp >= ?");
            args.push(Value::from(cutoff_ms(opts.days)));
        }
        if !conds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conds.join(" AND "));
        }
        sql.push_str(" ORDER BY COALESCE(lastMessageTime, lastOpenTime, t.timestamp) DESC LIMIT ?");
        args.push(Value::from(limit as i64));

        let conn = self.conn()?;
        let mut threads = Vec::new();
        {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args), scan_thread_row)?;
            for row in rows {
                let thread = build_thread(row?, opts.with_stats);
                if !classify::label_matches(opts.label, &thread, opts.include_low_priority) {
                    continue;
                }
                threads.push(thread);
            }
        }

        let ids: Vec<String> = threads.iter().map(|thread| thread.id.clone()).collect();
        let mut participants_by_room = self.participants_by_room(&conn, &ids)?;

        for thread in &mut threads {
            let participants = participants_by_room.remove(&thread.id).unwrap_or_default();
            let display_name = self.display_name(thread, &participants)?;
            thread.display_name = display_name;
            if opts.with_participants {
                thread.participants = participants;
            }
        }

        Ok(threads)
    }

    /// Return a single thread by ID, with participants attached.
    pub fn get_thread(&self, thread_id: &str, with_stats: bool) -> Result<Thread> {
        let sql = format!("{THREAD_SELECT} WHERE t.threadID = ?1 LIMIT 1");

        let conn = self.conn()?;
        let raw = conn
            .query_row(&sql, [thread_id], scan_thread_row)
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    BeelineError::ThreadNotFound(thread_id.to_string())
                }
                other => other.into(),
            })?;

        let mut thread = build_thread(raw, with_stats);

        let mut participants_by_room =
            self.participants_by_room(&conn, std::slice::from_ref(&thread.id))?;
        let participants = participants_by_room.remove(&thread.id).unwrap_or_default();
        thread.display_name = self.display_name(&thread, &participants)?;
        thread.participants = participants;

        Ok(thread)
    }

    /// Resolve the name shown for a thread: title, then the raw name, then
    /// a bridge DM lookup for direct chats, then the joined non-self
    /// participant names.
    pub(crate) fn display_name(
        &self,
        thread: &Thread,
        participants: &[Participant],
    ) -> Result<String> {
        if let Some(title) = &thread.title {
            return Ok(title.clone());
        }
        if let Some(name) = &thread.name {
            return Ok(name.clone());
        }

        let direct = is_direct(thread.thread_type.as_deref());
        if direct {
            if let Some(bridge) = self.bridge() {
                if let Some(name) = bridge.lookup_dm_name(&thread.id, &thread.account_id)? {
                    return Ok(name);
                }
            }
        }

        let non_self: Vec<&str> = participants
            .iter()
            .filter(|p| !p.is_self)
            .map(|p| p.name.as_str())
            .collect();

        if non_self.is_empty() {
            return Ok(UNKNOWN_NAME.to_string());
        }
        if direct {
            return Ok(non_self[0].to_string());
        }
        if non_self.len() <= 3 {
            return Ok(non_self.join(", "));
        }
        Ok(format!("{} +{}", non_self[..3].join(", "), non_self.len() - 3))
    }

    /// Participants grouped by room, with the display name already picked
    /// (full name, else nickname, else the raw ID).
    pub(crate) fn participants_by_room(
        &self,
        conn: &Connection,
        room_ids: &[String],
    ) -> Result<HashMap<String, Vec<Participant>>> {
        let room_ids = unique_non_empty(room_ids);
        let mut by_room: HashMap<String, Vec<Participant>> = HashMap::new();
        if room_ids.is_empty() {
            return Ok(by_room);
        }

        let sql = format!(
            "SELECT room_id, id, full_name, nickname, is_self
             FROM participants WHERE room_id IN ({})",
            placeholders(room_ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(room_ids), |row| {
            let room_id: String = row.get(0)?;
            let id: String = row.get(1)?;
            let full_name: Option<String> = row.get(2)?;
            let nickname: Option<String> = row.get(3)?;
            let is_self: Option<i64> = row.get(4)?;
            Ok((room_id, id, full_name, nickname, is_self))
        })?;

        for row in rows {
            let (room_id, id, full_name, nickname, is_self) = row?;
            let name = clean(full_name)
                .or_else(|| clean(nickname))
                .unwrap_or_else(|| id.clone());
            by_room.entry(room_id).or_default().push(Participant {
                id,
                name,
                is_self: is_self.unwrap_or(0) != 0,
            });
        }

        Ok(by_room)
    }

    pub(crate) fn thread_info_by_id(
        &self,
        conn: &Connection,
        ids: &[String],
    ) -> Result<HashMap<String, ThreadInfo>> {
        let ids = unique_non_empty(ids);
        let mut info = HashMap::new();
        if ids.is_empty() {
            return Ok(info);
        }

        let sql = format!(
            "SELECT threadID, accountID,
                json_extract(thread,'$.title') AS title,
                json_extract(thread,'$.name') AS name,
                json_extract(thread,'$.type') AS type
             FROM threads WHERE threadID IN ({})",
            placeholders(ids.len())
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids), |row| {
            let id: String = row.get(0)?;
            let account_id: Option<String> = row.get(1)?;
            let title: Option<String> = row.get(2)?;
            let name: Option<String> = row.get(3)?;
            let thread_type: Option<String> = row.get(4)?;
            Ok((id, account_id, title, name, thread_type))
        })?;

        for row in rows {
            let (id, account_id, title, name, thread_type) = row?;
            info.insert(
                id,
                ThreadInfo {
                    account_id: account_id.unwrap_or_default(),
                    title: clean(title),
                    name: clean(name),
                    thread_type: clean(thread_type),
                },
            );
        }

        Ok(info)
    }
}
