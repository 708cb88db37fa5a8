//! Message text rendering
//!
//! Turns a message row's JSON payload into display text. Plain mode only
//! ever yields real text; rich mode substitutes bracketed placeholders for
//! attachments and other non-text payloads. Pure functions, no I/O.

use serde_json::Value;

use crate::types::MessageFormat;

/// Produce the display string for a message based on the chosen format.
pub fn resolve_message_text(
    raw_message: &str,
    msg_type: &str,
    text_content: &str,
    format: MessageFormat,
) -> String {
    if format == MessageFormat::Plain {
        if !text_content.trim().is_empty() {
            return text_content.to_string();
        }
        return extract_message_text(raw_message, msg_type, false);
    }

    let rich = extract_message_text(raw_message, msg_type, true);
    if !rich.trim().is_empty() {
        return rich;
    }
    text_content.to_string()
}

fn extract_message_text(raw_message: &str, msg_type: &str, rich: bool) -> String {
    if raw_message.trim().is_empty() {
        return String::new();
    }

    let mut upper_type = msg_type.trim().to_uppercase();
    if upper_type.is_empty() {
        upper_type = "TEXT".to_string();
    }

    match serde_json::from_str::<Value>(raw_message) {
        Ok(Value::Object(payload)) => render_payload(&payload, &upper_type, rich),
        Ok(Value::String(value)) => {
            if upper_type == "TEXT" {
                value
            } else {
                fallback_message_text(&value, &upper_type, rich)
            }
        }
        // Numbers, arrays, parse failures: the raw payload is the text body.
        _ => fallback_message_text(raw_message, &upper_type, rich),
    }
}

fn render_payload(
    payload: &serde_json::Map<String, Value>,
    msg_type: &str,
    rich: bool,
) -> String {
    let text = first_string(payload, &["body", "text"]);
    if !rich || msg_type == "TEXT" {
        return text;
    }

    match msg_type {
        "IMAGE" => format_with_optional_text("[Image]", &text),
        "VIDEO" => format_with_optional_text("[Video]", &text),
        "AUDIO" => {
            let url = first_string(payload, &["url"]);
            if url.is_empty() {
                "[Audio message]".to_string()
            } else {
                format!("[Audio: {url}]")
            }
        }
        "FILE" => {
            let filename = first_string(payload, &["filename", "name"]);
            let url = first_string(payload, &["url"]);
            match (filename.is_empty(), url.is_empty()) {
                (false, false) => format!("[File: {filename} - {url}]"),
                (false, true) => format!("[File: {filename}]"),
                (true, false) => format!("[File: {url}]"),
                (true, true) => "[File]".to_string(),
            }
        }
        "LOCATION" => {
            let geo = first_string(payload, &["geo_uri", "geoUri"]);
            if geo.is_empty() {
                "[Location]".to_string()
            } else {
                format!("[Location: {geo}]")
            }
        }
        "CONTACT" => {
            let name = first_string(payload, &["display_name", "displayName", "name"]);
            if name.is_empty() {
                "[Contact]".to_string()
            } else {
                format!("[Contact: {name}]")
            }
        }
        "STICKER" => {
            let url = first_string(payload, &["url"]);
            if url.is_empty() {
                "[Sticker]".to_string()
            } else {
                format!("[Sticker: {url}]")
            }
        }
        _ => fallback_message_text(&text, msg_type, rich),
    }
}

fn fallback_message_text(value: &str, msg_type: &str, rich: bool) -> String {
    if msg_type == "TEXT" || !rich {
        return value.to_string();
    }
    if !value.trim().is_empty() && !msg_type.is_empty() {
        return format_with_optional_text(&format!("[{msg_type}]"), value);
    }
    if msg_type.is_empty() {
        return "[MESSAGE]".to_string();
    }
    format!("[{msg_type}]")
}

fn format_with_optional_text(prefix: &str, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix} {text}")
    }
}

/// First key present as a string wins, even when blank.
fn first_string(payload: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        if let Some(Value::String(value)) = payload.get(*key) {
            return value.trim().to_string();
        }
    }
    String::new()
}
