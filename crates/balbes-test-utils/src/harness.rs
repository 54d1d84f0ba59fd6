// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end agent tests.
//!
//! `TestHarness` assembles a complete [`AgentLoop`] over mock channel and
//! provider adapters, a temp SQLite database and a manual clock, so a test
//! can drive events through the full gating and reply pipeline.

use std::sync::Arc;

use balbes_agent::{AgentLoop, ConversationState, EventOutcome, SharedState};
use balbes_config::model::{BalbesConfig, StorageConfig};
use balbes_core::{
    BalbesError, ChatEvent, ChatId, Clock, GifSource, MessageId, StorageAdapter, UserId,
};
use balbes_storage::SqliteStorage;
use chrono::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::clock::ManualClock;
use crate::mock_channel::MockChannel;
use crate::mock_gif::MockGifSource;
use crate::mock_provider::MockProvider;

/// Chat the harness agent listens to.
pub const TEST_CHAT: ChatId = ChatId(-1_001_234_567);

/// Id of the harness bot.
pub const TEST_BOT: UserId = UserId(1000);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: BalbesConfig,
    responses: Vec<String>,
    seed: u64,
    gif_url: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = BalbesConfig::default();
        config.telegram.target_chat_id = Some(TEST_CHAT.0);
        config.agent.style_profile_path = "/nonexistent/style.txt".to_string();
        config.openai.retry_backoff_ms = 1;
        Self {
            config,
            responses: Vec::new(),
            seed: 7,
            gif_url: None,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Adjust the configuration before the agent is built.
    pub fn with_config(mut self, adjust: impl FnOnce(&mut BalbesConfig)) -> Self {
        adjust(&mut self.config);
        self
    }

    /// Seed for the shared RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable GIF replies backed by a mock source returning `url`.
    pub fn with_gif(mut self, url: &str) -> Self {
        self.gif_url = Some(url.to_string());
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(mut self) -> Result<TestHarness, BalbesError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| BalbesError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(self.config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

        let mock_provider = Arc::new(MockProvider::with_responses(self.responses));
        let mock_channel = Arc::new(MockChannel::with_identity(TEST_BOT, "balbes_bot"));
        let clock = Arc::new(ManualClock::default());
        let gif = self
            .gif_url
            .as_deref()
            .map(|url| Arc::new(MockGifSource::new(Some(url))));
        let state =
            ConversationState::new(&self.config.dialog, StdRng::seed_from_u64(self.seed)).shared();

        let agent = AgentLoop::new(
            &self.config,
            mock_channel.clone(),
            mock_provider.clone(),
            storage.clone(),
            gif.clone().map(|g| g as Arc<dyn GifSource + Send + Sync>),
            clock.clone(),
            state.clone(),
        )
        .await?;

        Ok(TestHarness {
            agent,
            mock_provider,
            mock_channel,
            mock_gif: gif,
            storage,
            clock,
            state,
            config: self.config,
            next_message_id: std::sync::atomic::AtomicI64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub agent: AgentLoop,
    pub mock_provider: Arc<MockProvider>,
    pub mock_channel: Arc<MockChannel>,
    pub mock_gif: Option<Arc<MockGifSource>>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub clock: Arc<ManualClock>,
    pub state: SharedState,
    pub config: BalbesConfig,
    next_message_id: std::sync::atomic::AtomicI64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A message in the test chat at the current clock time.
    pub fn message(&self, author: i64, text: &str) -> ChatEvent {
        let id = self
            .next_message_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        ChatEvent::new(
            TEST_CHAT,
            MessageId(id),
            UserId(author),
            format!("user{author}"),
            text,
            self.clock.now(),
        )
    }

    /// Drive one event through the agent.
    pub async fn send(&self, event: ChatEvent) -> EventOutcome {
        self.agent.handle_event(event).await
    }

    /// Send `text` from `author` and return the outcome.
    pub async fn say(&self, author: i64, text: &str) -> EventOutcome {
        let event = self.message(author, text);
        self.send(event).await
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}
