// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat filtering and conversion of Telegram messages into [`ChatEvent`]s.
//!
//! Only the configured group is forwarded (plus private chats when allowed).
//! Messages without text are kept with a placeholder so the conversation
//! window still shows that something was posted.

use balbes_core::{ChatEvent, ChatId, FileRef, MediaKind, MessageId, UserId};
use teloxide::types::{Message, MessageEntityKind};

/// Whether a message should reach the agent.
pub fn should_forward(msg: &Message, target_chat_id: i64, allow_private: bool) -> bool {
    if msg.chat.is_private() {
        return allow_private;
    }
    (msg.chat.is_group() || msg.chat.is_supergroup()) && msg.chat.id.0 == target_chat_id
}

/// Converts a message into a [`ChatEvent`].
///
/// Returns `None` for messages without a sender and for service messages
/// that carry neither text nor supported media.
pub fn to_chat_event(msg: &Message) -> Option<ChatEvent> {
    let author = msg.from.as_ref()?;
    let media = media_of(msg);

    let text = match (msg.text().or(msg.caption()), &media) {
        (Some(text), _) => text.to_string(),
        (None, Some((kind, _))) => placeholder(msg, *kind),
        (None, None) => return None,
    };

    let author_name = match author.full_name() {
        name if !name.trim().is_empty() => name,
        _ => author.username.clone().unwrap_or_default(),
    };

    let mut event = ChatEvent::new(
        ChatId(msg.chat.id.0),
        MessageId(i64::from(msg.id.0)),
        UserId(author.id.0 as i64),
        author_name,
        text,
        msg.date,
    )
    .with_mentions(mentions(msg));

    if let Some(replied_author) = msg.reply_to_message().and_then(|r| r.from.as_ref()) {
        event = event.replying_to(UserId(replied_author.id.0 as i64));
    }
    if let Some((kind, file)) = media {
        event = event.with_media(kind, file);
    }
    Some(event)
}

/// The attached media kind and file, if any.
///
/// Animations also carry a document field, so they are checked first.
fn media_of(msg: &Message) -> Option<(MediaKind, FileRef)> {
    let file = |id: &teloxide::types::FileId| FileRef(id.0.clone());

    if let Some(photos) = msg.photo() {
        // The last size is the largest.
        return photos.last().map(|p| (MediaKind::Photo, file(&p.file.id)));
    }
    if let Some(animation) = msg.animation() {
        return Some((MediaKind::Animation, file(&animation.file.id)));
    }
    if let Some(voice) = msg.voice() {
        return Some((MediaKind::Voice, file(&voice.file.id)));
    }
    if let Some(audio) = msg.audio() {
        return Some((MediaKind::Audio, file(&audio.file.id)));
    }
    if let Some(sticker) = msg.sticker() {
        return Some((MediaKind::Sticker, file(&sticker.file.id)));
    }
    if let Some(video) = msg.video() {
        return Some((MediaKind::Video, file(&video.file.id)));
    }
    if let Some(note) = msg.video_note() {
        return Some((MediaKind::VideoNote, file(&note.file.id)));
    }
    if let Some(document) = msg.document() {
        return Some((MediaKind::Document, file(&document.file.id)));
    }
    None
}

fn placeholder(msg: &Message, kind: MediaKind) -> String {
    match msg.sticker().and_then(|s| s.emoji.as_deref()) {
        Some(emoji) if kind == MediaKind::Sticker => format!("[sticker {emoji}]"),
        _ => kind.placeholder(),
    }
}

/// Handles mentioned through `mention` and `text_mention` entities, without `@`.
fn mentions(msg: &Message) -> Vec<String> {
    let entities = msg
        .parse_entities()
        .or_else(|| msg.parse_caption_entities())
        .unwrap_or_default();

    entities
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::Mention => {
                Some(entity.text().trim_start_matches('@').to_string())
            }
            MessageEntityKind::TextMention { user } => user.username.clone(),
            _ => None,
        })
        .collect()
}
