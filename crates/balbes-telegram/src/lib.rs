// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for Balbes.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling into an inbound queue, plain-text replies, emoji reactions,
//! media uploads and file downloads.

pub mod handler;
pub mod media;

use async_trait::async_trait;
use balbes_config::model::TelegramConfig;
use balbes_core::{
    AdapterType, BalbesError, ChannelAdapter, ChatEvent, ChatId, FileRef, HealthStatus,
    MessageId, OutboundMedia, PluginAdapter, SelfIdentity, UserId,
};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::ReactionType;
use tokio::sync::{OnceCell, mpsc};
use tracing::{debug, info, warn};

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<ChatEvent>>,
    inbound_tx: mpsc::Sender<ChatEvent>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
    identity: OnceCell<SelfIdentity>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, BalbesError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            BalbesError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.trim().is_empty() {
            return Err(BalbesError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
            identity: OnceCell::new(),
        })
    }
}

pub(crate) fn request_error(context: &str, e: RequestError) -> BalbesError {
    BalbesError::Channel {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

pub(crate) fn telegram_message_id(
    id: MessageId,
) -> Result<teloxide::types::MessageId, BalbesError> {
    i32::try_from(id.0)
        .map(teloxide::types::MessageId)
        .map_err(|_| BalbesError::channel(format!("message id out of range: {id}")))
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), BalbesError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let target = self.config.target_chat_id.ok_or_else(|| {
            BalbesError::Config("telegram.target_chat_id is required".into())
        })?;
        let allow_private = self.config.allow_private;
        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!(target_chat_id = target, allow_private, "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    if !handler::should_forward(&msg, target, allow_private) {
                        debug!(chat_id = msg.chat.id.0, "ignoring message from other chat");
                        return respond(());
                    }

                    match handler::to_chat_event(&msg) {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring unsupported message type");
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn receive(&self) -> Result<ChatEvent, BalbesError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| BalbesError::channel("Telegram inbound channel closed"))
    }

    async fn self_identity(&self) -> Result<SelfIdentity, BalbesError> {
        self.identity
            .get_or_try_init(|| async {
                let me = self
                    .bot
                    .get_me()
                    .await
                    .map_err(|e| request_error("failed to fetch bot identity", e))?;
                Ok(SelfIdentity {
                    id: UserId(me.id.0 as i64),
                    handle: me.username.clone().unwrap_or_default(),
                })
            })
            .await
            .cloned()
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, BalbesError> {
        let mut request = self.bot.send_message(teloxide::types::ChatId(chat.0), text);
        if let Some(id) = reply_to {
            request = request.reply_parameters(media::reply_parameters(id)?);
        }
        let sent = request
            .await
            .map_err(|e| request_error("failed to send message", e))?;
        Ok(MessageId(i64::from(sent.id.0)))
    }

    async fn send_reaction(
        &self,
        chat: ChatId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), BalbesError> {
        self.bot
            .set_message_reaction(teloxide::types::ChatId(chat.0), telegram_message_id(message)?)
            .reaction(vec![ReactionType::Emoji {
                emoji: emoji.to_string(),
            }])
            .await
            .map_err(|e| request_error("failed to set reaction", e))?;
        Ok(())
    }

    async fn send_media(
        &self,
        chat: ChatId,
        media: OutboundMedia,
    ) -> Result<MessageId, BalbesError> {
        crate::media::send_media(&self.bot, teloxide::types::ChatId(chat.0), media).await
    }

    async fn download(&self, file: &FileRef) -> Result<Vec<u8>, BalbesError> {
        media::download_file(&self.bot, file).await
    }
}
