//! Message listing
//!
//! Hidden rows, reactions, and deleted messages never surface here; the
//! same row shape is reused by search.

use std::collections::HashMap;

use chrono::DateTime;
use rusqlite::{params_from_iter, types::Value};

use super::{ms_to_datetime, Store};
use crate::services::render;
use crate::types::error::{BeelineError, Result};
use crate::types::{Message, MessageFormat, MessageListOptions, Participant, DEFAULT_LIMIT};

/// Projection shared by message listing, search, and context fetches.
pub(crate) const MESSAGE_COLUMNS: &str = "id, eventID, roomID, senderContactID, timestamp, isSentByMe, type,
    COALESCE(text_content, '') AS text_content,
    COALESCE(message, '') AS message";

/// Rows that never surface: deleted messages, hidden events, reactions.
pub(crate) const VISIBLE_PREDICATE: &str =
    "isDeleted = 0 AND type NOT IN ('HIDDEN','REACTION')";

pub(crate) struct MessageRow {
    pub id: i64,
    pub event_id: String,
    pub room_id: String,
    pub sender_id: String,
    pub ts: i64,
    pub is_sent_by_me: i64,
    pub msg_type: Option<String>,
    pub text_content: String,
    pub raw_message: String,
}

pub(crate) fn scan_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        room_id: row.get(2)?,
        sender_id: row.get(3)?,
        ts: row.get(4)?,
        is_sent_by_me: row.get(5)?,
        msg_type: row.get(6)?,
        text_content: row.get(7)?,
        raw_message: row.get(8)?,
    })
}

pub(crate) fn into_message(raw: MessageRow, format: MessageFormat) -> Message {
    let msg_type = raw.msg_type.unwrap_or_default().trim().to_string();
    let text = render::resolve_message_text(&raw.raw_message, &msg_type, &raw.text_content, format);
    Message {
        id: raw.id,
        event_id: raw.event_id,
        thread_id: raw.room_id,
        thread_name: None,
        account_id: None,
        sender_id: raw.sender_id,
        sender_name: None,
        timestamp: ms_to_datetime(raw.ts).unwrap_or(DateTime::UNIX_EPOCH),
        is_sent_by_me: raw.is_sent_by_me != 0,
        msg_type,
        text,
        score: None,
    }
}

pub(crate) fn participant_names(participants: &[Participant]) -> HashMap<String, String> {
    participants
        .iter()
        .map(|p| (p.id.clone(), p.name.clone()))
        .collect()
}

impl Store {
    /// List messages for a thread, newest first.
    pub fn list_messages(&self, opts: &MessageListOptions) -> Result<Vec<Message>> {
        if opts.thread_id.trim().is_empty() {
            return Err(BeelineError::InvalidArgument(
                "thread ID is required".to_string(),
            ));
        }

        let limit = if opts.limit == 0 { DEFAULT_LIMIT } else { opts.limit };

        let mut sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM mx_room_messages
             WHERE roomID = ? AND {VISIBLE_PREDICATE}"
        );
        let mut args: Vec<Value> = vec![Value::from(opts.thread_id.clone())];

        if let Some(after) = opts.after {
            sql.push_str(" AND timestamp >= ?");
            args.push(Value::from(after.timestamp_millis()));
        }
        if let Some(before) = opts.before {
            sql.push_str(" AND timestamp <= ?");
            args.push(Value::from(before.timestamp_millis()));
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");
        args.push(Value::from(limit as i64));

        let conn = self.conn()?;
        let mut messages = Vec::new();
        {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args), scan_message_row)?;
            for row in rows {
                messages.push(into_message(row?, opts.format));
            }
        }

        let participants = self
            .participants_by_room(&conn, std::slice::from_ref(&opts.thread_id))?
            .remove(&opts.thread_id)
            .unwrap_or_default();
        let names = participant_names(&participants);

        for message in &mut messages {
            if let Some(name) = names.get(&message.sender_id) {
                message.sender_name = Some(name.clone());
            }
        }

        Ok(messages)
    }
}
