// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat history reads and writes.
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision,
//! so lexical order in SQL equals chronological order.

use balbes_core::{BalbesError, ChatEvent, ChatId, HistoryLine, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const INSERT_SQL: &str = "INSERT OR IGNORE INTO chat_history
     (chat_id, message_id, author_id, author_name, text, sent_at, reply_to_author, media_kind)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Encode a timestamp for storage.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_ts(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Rendered size of a history line (`author: text` plus a newline).
pub fn line_cost(author: &str, text: &str) -> usize {
    author.chars().count() + 2 + text.chars().count() + 1
}

/// Keep the newest lines whose combined cost fits `max_chars`.
///
/// Input is newest-first; output is oldest-first. Stops at the first line
/// that does not fit so the window never has gaps.
pub fn fit_to_budget(newest_first: Vec<HistoryLine>, max_chars: usize) -> Vec<HistoryLine> {
    let mut used = 0;
    let mut kept: Vec<HistoryLine> = newest_first
        .into_iter()
        .take_while(|line| {
            used += line_cost(&line.author, &line.text);
            used <= max_chars
        })
        .collect();
    kept.reverse();
    kept
}

struct Row {
    chat_id: i64,
    message_id: i64,
    author_id: i64,
    author_name: String,
    text: String,
    sent_at: String,
    reply_to_author: Option<i64>,
    media_kind: Option<String>,
}

impl From<&ChatEvent> for Row {
    fn from(event: &ChatEvent) -> Self {
        Self {
            chat_id: event.chat_id.0,
            message_id: event.message_id.0,
            author_id: event.author_id.0,
            author_name: event.author_name.clone(),
            text: event.text.clone(),
            sent_at: encode_ts(event.timestamp),
            reply_to_author: event.reply_to_author.map(|u| u.0),
            media_kind: event.media.as_ref().map(|m| m.kind.to_string()),
        }
    }
}

fn insert_row(stmt: &mut rusqlite::CachedStatement<'_>, row: &Row) -> rusqlite::Result<usize> {
    stmt.execute(params![
        row.chat_id,
        row.message_id,
        row.author_id,
        row.author_name,
        row.text,
        row.sent_at,
        row.reply_to_author,
        row.media_kind,
    ])
}

/// Insert one event; returns whether a new row was written.
pub async fn append_event(db: &Database, event: &ChatEvent) -> Result<bool, BalbesError> {
    let row = Row::from(event);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(INSERT_SQL)?;
            let written = insert_row(&mut stmt, &row)?;
            Ok(written > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert many events in one transaction; returns the number of new rows.
pub async fn import_events(db: &Database, events: Vec<ChatEvent>) -> Result<usize, BalbesError> {
    let rows: Vec<Row> = events.iter().map(Row::from).collect();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut written = 0;
            {
                let mut stmt = tx.prepare_cached(INSERT_SQL)?;
                for row in &rows {
                    written += insert_row(&mut stmt, row)?;
                }
            }
            tx.commit()?;
            Ok(written)
        })
        .await
        .map_err(map_tr_err)
}

/// Newest `limit` lines of a chat since `since`, newest-first.
async fn newest_lines(
    db: &Database,
    chat: ChatId,
    author: Option<UserId>,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<HistoryLine>, BalbesError> {
    let since = encode_ts(since);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let author = author.map(|u| u.0);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT author_name, text, sent_at FROM chat_history
                 WHERE chat_id = ?1 AND sent_at >= ?2 AND (?3 IS NULL OR author_id = ?3)
                 ORDER BY sent_at DESC, message_id DESC
                 LIMIT ?4",
            )?;
            let rows = stmt.query_map(params![chat.0, since, author, limit], |row| {
                let sent_at: String = row.get(2)?;
                Ok(HistoryLine {
                    author: row.get(0)?,
                    text: row.get(1)?,
                    sent_at: decode_ts(2, &sent_at)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Conversation window: newest `limit` lines since `since`, trimmed to
/// `max_chars`, oldest-first.
pub async fn recent(
    db: &Database,
    chat: ChatId,
    since: DateTime<Utc>,
    limit: usize,
    max_chars: usize,
) -> Result<Vec<HistoryLine>, BalbesError> {
    let lines = newest_lines(db, chat, None, since, limit).await?;
    Ok(fit_to_budget(lines, max_chars))
}

/// Newest `limit` lines written by `user`, oldest-first.
pub async fn recent_by_user(
    db: &Database,
    chat: ChatId,
    user: UserId,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<HistoryLine>, BalbesError> {
    let mut lines = newest_lines(db, chat, Some(user), since, limit).await?;
    lines.reverse();
    Ok(lines)
}

/// Timestamp of the newest message in a chat.
pub async fn last_activity(
    db: &Database,
    chat: ChatId,
) -> Result<Option<DateTime<Utc>>, BalbesError> {
    db.connection()
        .call(move |conn| {
            let latest: Option<String> = conn.query_row(
                "SELECT MAX(sent_at) FROM chat_history WHERE chat_id = ?1",
                params![chat.0],
                |row| row.get(0),
            )?;
            latest.map(|raw| decode_ts(0, &raw)).transpose()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use balbes_core::MessageId;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn event(id: i64, author: i64, name: &str, text: &str, minutes: i64) -> ChatEvent {
        ChatEvent::new(
            ChatId(-100),
            MessageId(id),
            UserId(author),
            name,
            text,
            base_time() + Duration::minutes(minutes),
        )
    }

    fn line(author: &str, text: &str) -> HistoryLine {
        HistoryLine {
            author: author.into(),
            text: text.into(),
            sent_at: base_time(),
        }
    }

    #[test]
    fn budget_keeps_newest_and_returns_oldest_first() {
        // each line costs 1 + 2 + 3 + 1 = 7
        let newest_first = vec![line("c", "333"), line("b", "222"), line("a", "111")];
        let kept = fit_to_budget(newest_first, 15);
        let texts: Vec<&str> = kept.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["222", "333"]);
    }

    #[test]
    fn budget_counts_chars_not_bytes() {
        let kept = fit_to_budget(vec![line("вася", "привет")], 13);
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn append_is_idempotent_on_chat_and_message_id() {
        let (db, _dir) = setup_db().await;
        let e = event(1, 10, "vasya", "hello", 0);

        assert!(append_event(&db, &e).await.unwrap());
        assert!(!append_event(&db, &e).await.unwrap());

        let lines = recent(&db, ChatId(-100), base_time(), 10, 10_000).await.unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn recent_respects_since_limit_and_order() {
        let (db, _dir) = setup_db().await;
        append_event(&db, &event(1, 10, "a", "too old", -60 * 25)).await.unwrap();
        for i in 2..=6 {
            append_event(&db, &event(i, 10, "a", &format!("m{i}"), i))
                .await
                .unwrap();
        }

        let since = base_time() - Duration::hours(24);
        let lines = recent(&db, ChatId(-100), since, 3, 10_000).await.unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["m4", "m5", "m6"]);
    }

    #[tokio::test]
    async fn recent_is_scoped_to_chat() {
        let (db, _dir) = setup_db().await;
        append_event(&db, &event(1, 10, "a", "here", 0)).await.unwrap();
        let mut other = event(1, 10, "a", "elsewhere", 0);
        other.chat_id = ChatId(-200);
        append_event(&db, &other).await.unwrap();

        let lines = recent(&db, ChatId(-100), base_time(), 10, 10_000).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "here");
    }

    #[tokio::test]
    async fn recent_by_user_filters_author() {
        let (db, _dir) = setup_db().await;
        append_event(&db, &event(1, 10, "a", "one", 0)).await.unwrap();
        append_event(&db, &event(2, 20, "b", "two", 1)).await.unwrap();
        append_event(&db, &event(3, 10, "a", "three", 2)).await.unwrap();

        let lines = recent_by_user(&db, ChatId(-100), UserId(10), base_time(), 10)
            .await
            .unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);
    }

    #[tokio::test]
    async fn last_activity_returns_newest_timestamp() {
        let (db, _dir) = setup_db().await;
        assert_eq!(last_activity(&db, ChatId(-100)).await.unwrap(), None);

        append_event(&db, &event(1, 10, "a", "x", 5)).await.unwrap();
        append_event(&db, &event(2, 10, "a", "y", 1)).await.unwrap();

        let latest = last_activity(&db, ChatId(-100)).await.unwrap();
        assert_eq!(latest, Some(base_time() + Duration::minutes(5)));
    }

    #[tokio::test]
    async fn import_counts_only_new_rows() {
        let (db, _dir) = setup_db().await;
        append_event(&db, &event(1, 10, "a", "x", 0)).await.unwrap();

        let batch = vec![event(1, 10, "a", "x", 0), event(2, 10, "a", "y", 1)];
        assert_eq!(import_events(&db, batch).await.unwrap(), 1);
    }
}
