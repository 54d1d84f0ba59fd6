// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File downloads and outbound media for Telegram.

use balbes_core::{BalbesError, FileRef, MediaKind, MediaSource, MessageId, OutboundMedia};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId, InputFile, ReplyParameters};
use tracing::debug;

use crate::{request_error, telegram_message_id};

/// Downloads a file from Telegram servers by its file id.
///
/// Uses the Bot API's `getFile` to resolve the file path, then downloads
/// the file content as bytes.
pub async fn download_file(bot: &Bot, file: &FileRef) -> Result<Vec<u8>, BalbesError> {
    let info = bot
        .get_file(FileId(file.0.clone()))
        .await
        .map_err(|e| request_error("failed to get file info", e))?;

    let mut buf = Vec::new();
    bot.download_file(&info.path, &mut buf)
        .await
        .map_err(|e| BalbesError::Channel {
            message: format!("failed to download file: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(file_id = %file.0, size = buf.len(), "downloaded file from Telegram");
    Ok(buf)
}

/// Reply target for a message id, tolerating a deleted original.
pub fn reply_parameters(id: MessageId) -> Result<ReplyParameters, BalbesError> {
    Ok(ReplyParameters::new(telegram_message_id(id)?).allow_sending_without_reply())
}

fn input_file(source: MediaSource) -> Result<InputFile, BalbesError> {
    match source {
        MediaSource::Bytes { data, file_name } => Ok(InputFile::memory(data).file_name(file_name)),
        MediaSource::Url(url) => url
            .parse()
            .map(InputFile::url)
            .map_err(|e| BalbesError::channel(format!("invalid media url {url}: {e}"))),
    }
}

macro_rules! dispatch {
    ($request:expr, $reply:expr) => {{
        let mut request = $request;
        if let Some(reply) = $reply {
            request = request.reply_parameters(reply);
        }
        request.await
    }};
    ($request:expr, $reply:expr, $caption:expr) => {{
        let mut request = $request;
        if let Some(caption) = $caption {
            request = request.caption(caption);
        }
        dispatch!(request, $reply)
    }};
}

/// Sends one media message and returns the id Telegram assigned to it.
pub async fn send_media(
    bot: &Bot,
    chat: ChatId,
    media: OutboundMedia,
) -> Result<MessageId, BalbesError> {
    let file = input_file(media.source)?;
    let reply = media.reply_to.map(reply_parameters).transpose()?;
    let caption = media.caption.filter(|c| !c.trim().is_empty());

    let sent = match media.kind {
        MediaKind::Photo => dispatch!(bot.send_photo(chat, file), reply, caption),
        MediaKind::Animation => dispatch!(bot.send_animation(chat, file), reply, caption),
        MediaKind::Voice => dispatch!(bot.send_voice(chat, file), reply, caption),
        MediaKind::Audio => dispatch!(bot.send_audio(chat, file), reply, caption),
        MediaKind::Video => dispatch!(bot.send_video(chat, file), reply, caption),
        MediaKind::Document => dispatch!(bot.send_document(chat, file), reply, caption),
        MediaKind::VideoNote => dispatch!(bot.send_video_note(chat, file), reply),
        MediaKind::Sticker => dispatch!(bot.send_sticker(chat, file), reply),
    }
    .map_err(|e| request_error(&format!("failed to send {}", media.kind), e))?;

    Ok(MessageId(i64::from(sent.id.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_parameters_reject_out_of_range_ids() {
        assert!(reply_parameters(MessageId(42)).is_ok());
        assert!(reply_parameters(MessageId(i64::MAX)).is_err());
    }

    #[test]
    fn invalid_url_is_a_channel_error() {
        let err = input_file(MediaSource::Url("not a url".into())).unwrap_err();
        assert!(err.to_string().contains("invalid media url"));
    }

    #[test]
    fn bytes_and_urls_become_input_files() {
        assert!(
            input_file(MediaSource::Bytes {
                data: vec![1, 2, 3],
                file_name: "voice.ogg".into(),
            })
            .is_ok()
        );
        assert!(input_file(MediaSource::Url("https://media.giphy.com/a.gif".into())).is_ok());
    }
}
