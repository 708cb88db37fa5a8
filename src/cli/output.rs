//! Output helpers: pretty JSON and tab-separated tables.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::types::error::Result;

const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

pub fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

pub fn format_time(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&Local).format(TIME_LAYOUT).to_string(),
        None => "-".to_string(),
    }
}

/// Blank table cells render as a dash.
pub fn safe(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

pub fn safe_opt(value: Option<&str>) -> &str {
    safe(value.unwrap_or(""))
}
