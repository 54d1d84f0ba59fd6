// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event loop and reply policy for the Balbes chat agent.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - receives events for the target chat from a channel adapter
//! - records activity and persists every event
//! - asks the [`GatingEngine`] whether to reply, react or stay silent
//! - generates and sends replies, falling back to text when media fails
//!
//! The [`SpontaneousScheduler`] shares the same [`ChatContext`] and posts
//! unprompted remarks into a quiet chat.

pub mod chat;
pub mod context;
pub mod dialog;
pub mod gating;
pub mod generation;
pub mod media;
pub mod prompt;
pub mod reaction;
pub mod sanitize;
pub mod shutdown;
pub mod spontaneous;
pub mod state;

use std::sync::Arc;

use balbes_config::model::{BalbesConfig, SpontaneousConfig};
use balbes_core::{
    BalbesError, ChannelAdapter, ChatEvent, ChatId, Clock, GifSource, MediaKind, MessageId,
    OutboundMedia, ProviderAdapter, StorageAdapter,
};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use chat::ChatContext;
pub use context::ConversationWindow;
pub use gating::{GateAction, GateDecision, GatingEngine, Mode};
pub use generation::{GenerationClient, GenerationOutcome};
pub use media::{MediaPlanner, ReplyPlan};
pub use prompt::PromptBuilder;
pub use reaction::ReactionPicker;
pub use sanitize::Sanitizer;
pub use spontaneous::{SpontaneousOutcome, SpontaneousScheduler};
pub use state::{ConversationState, SharedState};

/// What the loop did with one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event belongs to another chat and was dropped.
    ForeignChat,
    /// Stored but not gated (empty text or not the owner in owner-only mode).
    Skipped,
    Silent,
    Reacted,
    Replied(MessageId),
    /// A reply was due but nothing could be generated or sent.
    ReplyFailed,
}

/// The main loop coordinating channel, generation and storage.
pub struct AgentLoop {
    ctx: ChatContext,
    gif_source: Option<Arc<dyn GifSource + Send + Sync>>,
    gating: GatingEngine,
    planner: MediaPlanner,
    vision_enabled: bool,
    owner_only: bool,
    allow_private: bool,
    spontaneous: SpontaneousConfig,
}

impl AgentLoop {
    /// Builds the loop for `telegram.target_chat_id`.
    ///
    /// The channel must already be connected: the bot identity is fetched
    /// here and used for address detection and self-filtering.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        config: &BalbesConfig,
        channel: Arc<dyn ChannelAdapter + Send + Sync>,
        provider: Arc<dyn ProviderAdapter + Send + Sync>,
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        gif_source: Option<Arc<dyn GifSource + Send + Sync>>,
        clock: Arc<dyn Clock>,
        state: SharedState,
    ) -> Result<Self, BalbesError> {
        let chat = config
            .telegram
            .target_chat_id
            .map(ChatId)
            .ok_or_else(|| BalbesError::Config("telegram.target_chat_id is not set".into()))?;
        let identity = channel.self_identity().await?;

        let sanitizer = Sanitizer::new(&config.agent.name, &config.sanitizer);
        let generation = GenerationClient::new(provider, &config.openai, sanitizer);
        let prompts = PromptBuilder::from_config(&config.agent, &config.owner).await;

        info!(
            agent_name = config.agent.name.as_str(),
            chat_id = %chat,
            bot_handle = identity.handle.as_str(),
            gif_enabled = gif_source.is_some(),
            "agent loop initialized"
        );

        Ok(Self {
            ctx: ChatContext {
                channel,
                storage,
                generation: Arc::new(generation),
                prompts: Arc::new(prompts),
                window: ConversationWindow::new(&config.memory),
                clock,
                state,
                identity,
                chat,
                bot_name: config.agent.name.clone(),
            },
            gif_source,
            gating: GatingEngine::new(&config.gating, &config.dialog, &config.owner),
            planner: MediaPlanner::new(&config.media),
            vision_enabled: config.media.vision_enabled,
            owner_only: config.owner.owner_only_mode,
            allow_private: config.telegram.allow_private,
            spontaneous: config.spontaneous.clone(),
        })
    }

    pub fn context(&self) -> &ChatContext {
        &self.ctx
    }

    /// Scheduler sharing this loop's chat context, if enabled.
    pub fn spontaneous_scheduler(&self) -> Option<SpontaneousScheduler> {
        self.spontaneous
            .enabled
            .then(|| SpontaneousScheduler::new(self.ctx.clone(), &self.spontaneous))
    }

    /// Runs until the cancellation token is triggered or the channel closes.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), BalbesError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                event = self.ctx.channel.receive() => {
                    match event {
                        Ok(event) => {
                            let outcome = self.handle_event(event).await;
                            debug!(outcome = ?outcome, "event handled");
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }

        self.ctx.storage.close().await?;
        info!("agent loop stopped");
        Ok(())
    }

    /// The target chat, plus private chats (positive ids) when allowed.
    fn accepts(&self, chat: ChatId) -> bool {
        chat == self.ctx.chat || (self.allow_private && chat.0 > 0)
    }

    /// Handles one inbound event end to end. Never fails: every error is
    /// logged and degrades to silence.
    pub async fn handle_event(&self, event: ChatEvent) -> EventOutcome {
        if !self.accepts(event.chat_id) {
            debug!(chat_id = %event.chat_id, "dropping event from foreign chat");
            return EventOutcome::ForeignChat;
        }

        self.ctx
            .state
            .lock()
            .await
            .record_activity(event.chat_id, event.timestamp);

        if let Err(e) = self.ctx.storage.append_event(&event).await {
            warn!(
                chat_id = %event.chat_id,
                message_id = %event.message_id,
                error = %e,
                "failed to persist event"
            );
        }

        if event.text.trim().is_empty() {
            return EventOutcome::Skipped;
        }
        if self.owner_only && !self.gating.is_owner(event.author_id) {
            return EventOutcome::Skipped;
        }

        let now = self.ctx.clock.now();
        let decision = {
            let mut state = self.ctx.state.lock().await;
            self.gating.decide(&event, &self.ctx.identity, &mut state, now)
        };

        debug!(
            message_id = %event.message_id,
            action = %decision.action,
            mode = ?decision.mode,
            addressed = decision.addressed,
            "gate decision"
        );

        match decision.action {
            GateAction::Silent => EventOutcome::Silent,
            GateAction::ReactOnly => {
                self.react(&event, decision.reaction).await;
                EventOutcome::Reacted
            }
            GateAction::MustReply | GateAction::ProbabilisticReply => {
                self.respond(&event, &decision).await
            }
        }
    }

    async fn respond(&self, event: &ChatEvent, decision: &GateDecision) -> EventOutcome {
        let now = self.ctx.clock.now();
        let context = self.ctx.conversation(event.chat_id, now).await;
        let system_prompt = self.ctx.prompts.system_prompt(decision.mode).await;

        let (react_alongside, plan) = {
            let mut state = self.ctx.state.lock().await;
            let react = state.rng.r#gen::<f64>()
                < self
                    .gating
                    .reaction_with_reply_probability(decision.addressed, decision.mode);
            let plan = self
                .planner
                .choose(decision.mode, self.gif_source.is_some(), &mut state.rng);
            (react, plan)
        };
        if react_alongside {
            self.react(event, decision.reaction).await;
        }

        debug!(plan = %plan, "reply plan chosen");

        if plan == ReplyPlan::Gif {
            if let Some(id) = self.send_gif(event).await {
                return self
                    .commit(event, id, &MediaKind::Animation.placeholder())
                    .await;
            }
            debug!("gif unavailable, falling back to text");
        }

        let Some(text) = self.generate(event, &system_prompt, &context).await else {
            return EventOutcome::ReplyFailed;
        };

        let media_id = match plan {
            ReplyPlan::Voice => self.send_voice(event, &text).await,
            ReplyPlan::Image => self.send_image(event, &text).await,
            ReplyPlan::Text | ReplyPlan::Gif => None,
        };

        let id = match media_id {
            Some(id) => id,
            None => match self
                .ctx
                .channel
                .send_text(event.chat_id, &text, Some(event.message_id))
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    error!(chat_id = %event.chat_id, error = %e, "failed to send reply");
                    return EventOutcome::ReplyFailed;
                }
            },
        };

        self.commit(event, id, &text).await
    }

    /// Text for the reply. Photos go through the vision model when enabled.
    async fn generate(
        &self,
        event: &ChatEvent,
        system_prompt: &str,
        context: &str,
    ) -> Option<String> {
        if self.vision_enabled
            && let Some(file) = event.photo()
        {
            match self.ctx.channel.download(file).await {
                Ok(image) => {
                    let caption = if event.text == MediaKind::Photo.placeholder() {
                        ""
                    } else {
                        event.text.as_str()
                    };
                    let outcome = self
                        .ctx
                        .generation
                        .vision_reply(system_prompt, context, image, caption)
                        .await;
                    return self.usable(outcome);
                }
                Err(e) => warn!(error = %e, "failed to download photo, answering text only"),
            }
        }

        let outcome = self
            .ctx
            .generation
            .reply(system_prompt, context, &event.text)
            .await;
        self.usable(outcome)
    }

    fn usable(&self, outcome: GenerationOutcome) -> Option<String> {
        match outcome {
            GenerationOutcome::Text(text) => Some(text),
            GenerationOutcome::Failed(reason) => {
                warn!(reason = %reason, "reply generation failed");
                None
            }
            other => {
                info!(outcome = ?other, "reply generation produced nothing usable");
                None
            }
        }
    }

    async fn send_gif(&self, event: &ChatEvent) -> Option<MessageId> {
        let source = self.gif_source.as_ref()?;
        let url = match source.search(&event.text).await {
            Ok(Some(url)) => url,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "gif search failed");
                return None;
            }
        };
        self.send_media(event, media::gif_message(url, event.message_id))
            .await
    }

    async fn send_voice(&self, event: &ChatEvent, text: &str) -> Option<MessageId> {
        let audio = self.ctx.generation.speak(text).await?;
        self.send_media(event, media::voice_message(audio, event.message_id))
            .await
    }

    async fn send_image(&self, event: &ChatEvent, text: &str) -> Option<MessageId> {
        let image = self.ctx.generation.draw(&event.text).await?;
        let media = media::image_message(image, text.to_string(), event.message_id);
        self.send_media(event, media).await
    }

    async fn send_media(&self, event: &ChatEvent, media: OutboundMedia) -> Option<MessageId> {
        let kind = media.kind;
        match self.ctx.channel.send_media(event.chat_id, media).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(kind = %kind, error = %e, "failed to send media, falling back");
                None
            }
        }
    }

    async fn react(&self, event: &ChatEvent, emoji: &str) {
        if !ReactionPicker::is_valid(emoji) {
            warn!(emoji, "not a Telegram reaction, skipping");
            return;
        }
        if let Err(e) = self
            .ctx
            .channel
            .send_reaction(event.chat_id, event.message_id, emoji)
            .await
        {
            warn!(emoji, error = %e, "failed to send reaction");
        }
    }

    /// Commits the throttle and session after a confirmed send and stores
    /// the bot's message.
    async fn commit(&self, event: &ChatEvent, id: MessageId, stored_text: &str) -> EventOutcome {
        let sent_at = self.ctx.clock.now();
        {
            let mut state = self.ctx.state.lock().await;
            state.throttle.record(event.chat_id, sent_at);
            state.dialogs.touch(event.chat_id, event.author_id, sent_at);
            state.record_activity(event.chat_id, sent_at);
        }
        self.ctx
            .remember_own(event.chat_id, id, stored_text, sent_at)
            .await;

        info!(chat_id = %event.chat_id, reply_id = %id, to = %event.message_id, "reply sent");
        EventOutcome::Replied(id)
    }
}
