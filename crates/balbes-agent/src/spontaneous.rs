// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unprompted remarks posted into a quiet chat.
//!
//! The scheduler sleeps a random interval, then runs one [`tick`]. A tick
//! posts only when chance allows, the previous remark is old enough and the
//! chat has been silent for a while.
//!
//! [`tick`]: SpontaneousScheduler::tick

use std::time::Duration as StdDuration;

use balbes_config::model::SpontaneousConfig;
use balbes_core::MessageId;
use chrono::Duration;
use rand::Rng;
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::ChatContext;
use crate::gating::Mode;
use crate::generation::GenerationOutcome;
use crate::state::seconds;

/// Result of one scheduler cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SpontaneousOutcome {
    SkippedByChance,
    CoolingDown,
    ChatActive,
    NothingToSay,
    SendFailed,
    Posted(MessageId),
}

pub struct SpontaneousScheduler {
    ctx: ChatContext,
    probability: f64,
    cooldown: Duration,
    quiet_period: Duration,
    min_sleep_secs: u64,
    max_sleep_secs: u64,
}

impl SpontaneousScheduler {
    pub fn new(ctx: ChatContext, config: &SpontaneousConfig) -> Self {
        Self {
            ctx,
            probability: config.probability,
            cooldown: seconds(config.cooldown_secs),
            quiet_period: seconds(config.only_if_silent_secs),
            min_sleep_secs: config.min_sleep_secs.min(config.max_sleep_secs),
            max_sleep_secs: config.max_sleep_secs.max(config.min_sleep_secs),
        }
    }

    /// Runs cycles until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(chat_id = %self.ctx.chat, "spontaneous scheduler running");

        loop {
            let delay = self.next_delay().await;
            debug!(delay_secs = delay.as_secs(), "spontaneous scheduler sleeping");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping spontaneous scheduler");
                    break;
                }
            }

            let outcome = self.tick().await;
            debug!(outcome = %outcome, "spontaneous cycle finished");
        }
    }

    async fn next_delay(&self) -> StdDuration {
        let mut state = self.ctx.state.lock().await;
        let secs = state.rng.gen_range(self.min_sleep_secs..=self.max_sleep_secs);
        StdDuration::from_secs(secs)
    }

    /// One cycle without the sleep.
    pub async fn tick(&self) -> SpontaneousOutcome {
        let now = self.ctx.clock.now();

        let known_activity = {
            let mut state = self.ctx.state.lock().await;
            if state.rng.r#gen::<f64>() > self.probability {
                return SpontaneousOutcome::SkippedByChance;
            }
            if state
                .last_spontaneous_at
                .is_some_and(|last| now - last < self.cooldown)
            {
                return SpontaneousOutcome::CoolingDown;
            }
            state.last_activity(self.ctx.chat)
        };

        let last_activity = match known_activity {
            Some(at) => Some(at),
            None => match self.ctx.storage.last_activity(self.ctx.chat).await {
                Ok(at) => at,
                Err(e) => {
                    warn!(chat_id = %self.ctx.chat, error = %e, "failed to read last activity");
                    None
                }
            },
        };
        if last_activity.is_some_and(|at| now - at < self.quiet_period) {
            return SpontaneousOutcome::ChatActive;
        }

        let context = self.ctx.conversation(self.ctx.chat, now).await;
        let system_prompt = self.ctx.prompts.system_prompt(Mode::Normal).await;
        let text = match self.ctx.generation.reply(&system_prompt, &context, "").await {
            GenerationOutcome::Text(text) => text,
            GenerationOutcome::Failed(reason) => {
                warn!(reason = %reason, "spontaneous generation failed");
                return SpontaneousOutcome::NothingToSay;
            }
            other => {
                debug!(outcome = ?other, "spontaneous generation produced nothing usable");
                return SpontaneousOutcome::NothingToSay;
            }
        };

        let message_id = match self.ctx.channel.send_text(self.ctx.chat, &text, None).await {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id = %self.ctx.chat, error = %e, "failed to send spontaneous remark");
                return SpontaneousOutcome::SendFailed;
            }
        };

        let sent_at = self.ctx.clock.now();
        {
            let mut state = self.ctx.state.lock().await;
            state.last_spontaneous_at = Some(sent_at);
            state.record_activity(self.ctx.chat, sent_at);
        }
        self.ctx
            .remember_own(self.ctx.chat, message_id, &text, sent_at)
            .await;

        info!(chat_id = %self.ctx.chat, message_id = %message_id, "posted spontaneous remark");
        SpontaneousOutcome::Posted(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use balbes_config::model::{
        AgentConfig, DialogConfig, MemoryConfig, OpenAiConfig, OwnerConfig, SanitizerConfig,
    };
    use balbes_core::{
        ChatEvent, ChatId, Clock, ProviderErrorKind, SelfIdentity, StorageAdapter, UserId,
    };
    use balbes_test_utils::{ManualClock, MemoryStorage, MockChannel, MockProvider};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::context::ConversationWindow;
    use crate::generation::GenerationClient;
    use crate::prompt::PromptBuilder;
    use crate::sanitize::Sanitizer;
    use crate::state::ConversationState;

    const CHAT: ChatId = ChatId(-100);

    struct Fixture {
        channel: Arc<MockChannel>,
        provider: Arc<MockProvider>,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        scheduler: SpontaneousScheduler,
    }

    fn fixture(config: SpontaneousConfig) -> Fixture {
        let channel = Arc::new(MockChannel::new());
        let provider = Arc::new(MockProvider::new());
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::default());
        let state = ConversationState::new(&DialogConfig::default(), StdRng::seed_from_u64(3));

        let ctx = ChatContext {
            channel: channel.clone(),
            storage: storage.clone(),
            generation: Arc::new(GenerationClient::new(
                provider.clone(),
                &OpenAiConfig::default(),
                Sanitizer::new("balbes", &SanitizerConfig::default()),
            )),
            prompts: Arc::new(PromptBuilder::new(
                "persona".into(),
                &AgentConfig {
                    style_profile_path: "/nonexistent/style.txt".into(),
                    ..AgentConfig::default()
                },
                &OwnerConfig::default(),
            )),
            window: ConversationWindow::new(&MemoryConfig::default()),
            clock: clock.clone(),
            state: state.shared(),
            identity: SelfIdentity {
                id: UserId(1000),
                handle: "balbes_bot".into(),
            },
            chat: CHAT,
            bot_name: "balbes".into(),
        };

        Fixture {
            channel,
            provider,
            storage,
            clock,
            scheduler: SpontaneousScheduler::new(ctx, &config),
        }
    }

    fn always() -> SpontaneousConfig {
        SpontaneousConfig {
            probability: 1.0,
            ..SpontaneousConfig::default()
        }
    }

    #[tokio::test]
    async fn zero_probability_never_posts() {
        let f = fixture(SpontaneousConfig {
            probability: 0.0,
            ..SpontaneousConfig::default()
        });
        for _ in 0..20 {
            assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::SkippedByChance);
        }
        assert!(f.channel.sent_texts().await.is_empty());
    }

    #[tokio::test]
    async fn posts_into_silent_chat_and_records_it() {
        let f = fixture(always());
        f.provider.push_text("что-то тихо у вас").await;

        let outcome = f.scheduler.tick().await;
        let SpontaneousOutcome::Posted(id) = outcome else {
            panic!("expected a post, got {outcome}");
        };

        let sent = f.channel.sent_texts().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "что-то тихо у вас");
        assert_eq!(sent[0].reply_to, None);

        let state = f.scheduler.ctx.state.lock().await;
        assert_eq!(state.last_spontaneous_at, Some(f.clock.now()));
        assert_eq!(state.last_activity(CHAT), Some(f.clock.now()));
        drop(state);

        let stored = f.storage.events().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message_id, id);
    }

    #[tokio::test]
    async fn never_posts_while_chat_active() {
        let f = fixture(always());
        f.scheduler
            .ctx
            .state
            .lock()
            .await
            .record_activity(CHAT, f.clock.now() - Duration::seconds(60));

        for _ in 0..10 {
            assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::ChatActive);
        }
        assert_eq!(f.provider.request_count().await, 0);
    }

    #[tokio::test]
    async fn falls_back_to_stored_activity() {
        let f = fixture(always());
        let recent = ChatEvent::new(
            CHAT,
            balbes_core::MessageId(5),
            UserId(7),
            "вася",
            "я тут",
            f.clock.now() - Duration::seconds(30),
        );
        f.storage.append_event(&recent).await.unwrap();

        assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::ChatActive);
    }

    #[tokio::test]
    async fn cooldown_blocks_second_post() {
        let f = fixture(always());
        f.provider.push_text("первый вброс").await;
        assert!(matches!(f.scheduler.tick().await, SpontaneousOutcome::Posted(_)));

        f.clock.advance(Duration::seconds(900));
        assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::CoolingDown);

        f.clock.advance(Duration::seconds(1000));
        f.provider.push_text("второй вброс").await;
        assert!(matches!(f.scheduler.tick().await, SpontaneousOutcome::Posted(_)));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn send_failure_is_logged_and_not_recorded() {
        let f = fixture(always());
        f.provider.push_text("вброс").await;
        f.channel.fail_sends(true).await;

        assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::SendFailed);
        assert!(logs_contain("failed to send spontaneous remark"));
        assert_eq!(f.scheduler.ctx.state.lock().await.last_spontaneous_at, None);
    }

    #[tokio::test]
    async fn provider_failure_means_nothing_to_say() {
        let f = fixture(always());
        f.provider.push_error(ProviderErrorKind::Auth).await;
        assert_eq!(f.scheduler.tick().await, SpontaneousOutcome::NothingToSay);
        assert!(f.channel.sent_texts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel() {
        let f = fixture(SpontaneousConfig {
            probability: 0.0,
            min_sleep_secs: 1,
            max_sleep_secs: 2,
            ..SpontaneousConfig::default()
        });
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(f.scheduler.run(cancel.clone()));
        tokio::time::sleep(StdDuration::from_secs(10)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
