// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `balbes import` command: loads a Telegram Desktop JSON export into the
//! chat history of the target chat.

use std::path::Path;

use balbes_config::BalbesConfig;
use balbes_core::{BalbesError, ChatEvent, ChatId, MessageId, StorageAdapter, UserId};
use balbes_storage::SqliteStorage;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

const EXPORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Deserialize)]
struct Export {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_id: Option<String>,
    #[serde(default)]
    text: Value,
}

/// Runs the import and returns how many new messages were stored.
pub async fn run_import(config: &BalbesConfig, export: &Path) -> Result<usize, BalbesError> {
    let chat = config
        .telegram
        .target_chat_id
        .map(ChatId)
        .ok_or_else(|| BalbesError::Config("telegram.target_chat_id is required".into()))?;

    let raw = tokio::fs::read(export)
        .await
        .map_err(|e| BalbesError::Internal(format!("failed to read {}: {e}", export.display())))?;
    let events = parse_export(&raw, chat, &config.memory.default_author_name)?;
    info!(path = %export.display(), parsed = events.len(), "parsed Telegram export");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let inserted = storage.import_history(events).await?;
    storage.close().await?;

    info!(inserted, "import finished");
    Ok(inserted)
}

/// Converts export JSON into chat events for `chat`.
///
/// Service entries, blank texts and undated messages are skipped. Senders
/// without a `user<id>` form get id 0.
fn parse_export(
    raw: &[u8],
    chat: ChatId,
    default_author: &str,
) -> Result<Vec<ChatEvent>, BalbesError> {
    let export: Export = serde_json::from_slice(raw)
        .map_err(|e| BalbesError::Internal(format!("invalid Telegram export: {e}")))?;
    debug!(chat_title = ?export.name, total = export.messages.len(), "reading export");

    let events = export
        .messages
        .into_iter()
        .filter(|m| m.kind == "message")
        .filter_map(|m| {
            let text = flatten_text(&m.text);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let timestamp = NaiveDateTime::parse_from_str(m.date.as_deref()?, EXPORT_DATE_FORMAT)
                .ok()?
                .and_utc();
            let author_id = m.from_id.as_deref().and_then(parse_user_id).unwrap_or(UserId(0));
            let author_name = m
                .from
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| default_author.to_string());

            Some(ChatEvent::new(
                chat,
                MessageId(m.id),
                author_id,
                author_name,
                text,
                timestamp,
            ))
        })
        .collect();
    Ok(events)
}

/// Text is either a plain string or a list of strings and `{ "text": .. }` fragments.
fn flatten_text(text: &Value) -> String {
    match text {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(s) => Some(s.as_str()),
                Value::Object(fragment) => fragment.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => String::new(),
    }
}

fn parse_user_id(from_id: &str) -> Option<UserId> {
    from_id.strip_prefix("user")?.parse().ok().map(UserId)
}
