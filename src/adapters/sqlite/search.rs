//! Message search
//!
//! Uses the FTS index when it exists, ranked by the index's own bm25
//! score. When the index (or the FTS5 module itself) is missing — at probe
//! time or mid-query — the search transparently degrades to a substring
//! scan over the message body with no relevance score, preserving every
//! other filter.

use std::collections::HashMap;

use rusqlite::{params_from_iter, types::Value, Connection};
use tracing::warn;

use super::messages::{
    into_message, participant_names, scan_message_row, MESSAGE_COLUMNS, VISIBLE_PREDICATE,
};
use super::threads::ThreadInfo;
use super::{cutoff_ms, has_fts, unique_non_empty, Store, FTS_TABLE};
use crate::types::error::{BeelineError, Result};
use crate::types::{
    Message, MessageFormat, SearchOptions, SearchResult, Thread, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_LIMIT,
};

const SEARCH_COLUMNS: &str = "m.id, m.eventID, m.roomID, m.senderContactID, m.timestamp, m.isSentByMe, m.type,
    COALESCE(m.text_content, '') AS text_content,
    COALESCE(m.message, '') AS message";

const SEARCH_VISIBLE: &str = "m.isDeleted = 0 AND m.type NOT IN ('HIDDEN','REACTION')";

impl Store {
    /// Search messages, optionally attaching surrounding context to each
    /// match.
    pub fn search_messages(&self, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let query = opts.query.trim();
        if query.is_empty() {
            return Err(BeelineError::InvalidArgument(
                "search query is required".to_string(),
            ));
        }

        let limit = if opts.limit == 0 { DEFAULT_LIMIT } else { opts.limit };

        let conn = self.conn()?;
        let use_fts = has_fts(&conn)?;

        let (sql, args) = build_search_query(use_fts, query, opts, limit);
        let mut matches = match run_search(&conn, &sql, &args, opts.format) {
            Ok(matches) => matches,
            Err(err) if use_fts && is_fts_error(&err) => {
                warn!(%err, "full-text index unavailable, falling back to substring scan");
                let (sql, args) = build_search_query(false, query, opts, limit);
                run_search(&conn, &sql, &args, opts.format)?
            }
            Err(err) => return Err(err.into()),
        };

        let room_ids: Vec<String> = matches.iter().map(|m| m.thread_id.clone()).collect();
        let room_ids = unique_non_empty(&room_ids);

        let thread_info = self.thread_info_by_id(&conn, &room_ids)?;
        let participants_by_room = self.participants_by_room(&conn, &room_ids)?;

        let mut display_names: HashMap<String, String> = HashMap::new();
        let mut names_by_room: HashMap<String, HashMap<String, String>> = HashMap::new();
        for room_id in &room_ids {
            let participants = participants_by_room
                .get(room_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let stub = stub_thread(room_id, thread_info.get(room_id));
            display_names.insert(room_id.clone(), self.display_name(&stub, participants)?);
            names_by_room.insert(room_id.clone(), participant_names(participants));
        }

        for matched in &mut matches {
            enrich(matched, &thread_info, &display_names, &names_by_room);
        }

        let want_context = opts.context > 0 || opts.window.is_some();
        let mut results = Vec::with_capacity(matches.len());
        for matched in matches {
            let context = if want_context {
                self.fetch_context(
                    &conn,
                    &matched,
                    opts,
                    &thread_info,
                    &display_names,
                    &names_by_room,
                )?
            } else {
                Vec::new()
            };
            results.push(SearchResult { matched, context });
        }

        Ok(results)
    }

    /// All visible messages of the match's thread inside the symmetric time
    /// window, oldest first, trimmed to a positional count when requested.
    fn fetch_context(
        &self,
        conn: &Connection,
        matched: &Message,
        opts: &SearchOptions,
        thread_info: &HashMap<String, ThreadInfo>,
        display_names: &HashMap<String, String>,
        names_by_room: &HashMap<String, HashMap<String, String>>,
    ) -> Result<Vec<Message>> {
        let window_ms = opts.window.unwrap_or(DEFAULT_CONTEXT_WINDOW).as_millis() as i64;
        let center = matched.timestamp.timestamp_millis();

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM mx_room_messages
             WHERE roomID = ?1 AND timestamp BETWEEN ?2 AND ?3 AND {VISIBLE_PREDICATE}
             ORDER BY timestamp ASC"
        );

        let mut messages = Vec::new();
        {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                rusqlite::params![matched.thread_id, center - window_ms, center + window_ms],
                scan_message_row,
            )?;
            for row in rows {
                let mut message = into_message(row?, opts.format);
                enrich(&mut message, thread_info, display_names, names_by_room);
                messages.push(message);
            }
        }

        if opts.context > 0 {
            return Ok(trim_context(messages, matched.id, opts.context));
        }
        Ok(messages)
    }
}

fn build_search_query(
    use_fts: bool,
    query: &str,
    opts: &SearchOptions,
    limit: usize,
) -> (String, Vec<Value>) {
    let mut args: Vec<Value> = Vec::new();

    let mut sql = if use_fts {
        args.push(Value::from(query.to_string()));
        format!(
            "SELECT {SEARCH_COLUMNS}, bm25({FTS_TABLE}) AS rank
             FROM {FTS_TABLE} f
             JOIN mx_room_messages m ON m.id = f.rowid
             WHERE f.text_content MATCH ? AND {SEARCH_VISIBLE}"
        )
    } else {
        args.push(Value::from(format!("%{query}%")));
        format!(
            "SELECT {SEARCH_COLUMNS}, NULL AS rank
             FROM mx_room_messages m
             WHERE json_extract(m.message,'$.text') LIKE ? AND {SEARCH_VISIBLE}"
        )
    };

    if let Some(thread_id) = opts.thread_id.as_deref().filter(|t| !t.is_empty()) {
        sql.push_str(" AND m.roomID = ?");
        args.push(Value::from(thread_id.to_string()));
    }
    if let Some(account_id) = opts.account_id.as_deref().filter(|a| !a.is_empty()) {
        sql.push_str(" AND m.roomID IN (SELECT threadID FROM threads WHERE accountID = ?)");
        args.push(Value::from(account_id.to_string()));
    }
    if opts.days > 0 {
        sql.push_str(" AND m.timestamp >= ?");
        args.push(Value::from(cutoff_ms(opts.days)));
    }

    sql.push_str(" ORDER BY rank ASC, m.timestamp DESC LIMIT ?");
    args.push(Value::from(limit as i64));

    (sql, args)
}

fn run_search(
    conn: &Connection,
    sql: &str,
    args: &[Value],
    format: MessageFormat,
) -> std::result::Result<Vec<Message>, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(args.iter().cloned()), |row| {
        let raw = scan_message_row(row)?;
        let rank: Option<f64> = row.get(9)?;
        Ok((raw, rank))
    })?;

    let mut matches = Vec::new();
    for row in rows {
        let (raw, rank) = row?;
        let mut message = into_message(raw, format);
        message.score = rank;
        matches.push(message);
    }
    Ok(matches)
}

/// Errors meaning the FTS index cannot be used at all, as opposed to a
/// malformed query.
fn is_fts_error(err: &rusqlite::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("no such module: fts5") || msg.contains(&format!("no such table: {FTS_TABLE}"))
}

fn enrich(
    message: &mut Message,
    thread_info: &HashMap<String, ThreadInfo>,
    display_names: &HashMap<String, String>,
    names_by_room: &HashMap<String, HashMap<String, String>>,
) {
    if let Some(info) = thread_info.get(&message.thread_id) {
        if !info.account_id.is_empty() {
            message.account_id = Some(info.account_id.clone());
        }
    }
    if let Some(name) = display_names.get(&message.thread_id) {
        message.thread_name = Some(name.clone());
    }
    if let Some(name) = names_by_room
        .get(&message.thread_id)
        .and_then(|names| names.get(&message.sender_id))
    {
        message.sender_name = Some(name.clone());
    }
}

fn stub_thread(room_id: &str, info: Option<&ThreadInfo>) -> Thread {
    let mut thread = Thread {
        id: room_id.to_string(),
        ..Default::default()
    };
    if let Some(info) = info {
        thread.account_id = info.account_id.clone();
        thread.title = info.title.clone();
        thread.name = info.name.clone();
        thread.thread_type = info.thread_type.clone();
    }
    thread
}

/// Keep the `context` messages on each side of the match by position,
/// dropping the match itself. A match missing from the window leaves the
/// window untouched.
fn trim_context(messages: Vec<Message>, match_id: i64, context: usize) -> Vec<Message> {
    let Some(idx) = messages.iter().position(|m| m.id == match_id) else {
        return messages;
    };
    let start = idx.saturating_sub(context);
    let end = (idx + context + 1).min(messages.len());

    messages
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i >= start && *i < end && *i != idx)
        .map(|(_, message)| message)
        .collect()
}
