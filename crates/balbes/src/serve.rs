// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `balbes serve` command implementation.
//!
//! Wires SQLite storage, the OpenAI-compatible provider, the Telegram
//! channel and the optional Giphy source into an [`AgentLoop`], starts the
//! spontaneous scheduler beside it and runs until a shutdown signal.

use std::sync::Arc;

use balbes_agent::{AgentLoop, ConversationState, shutdown};
use balbes_config::BalbesConfig;
use balbes_core::{
    BalbesError, ChannelAdapter, Clock, GifSource, PluginAdapter, ProviderAdapter,
    StorageAdapter, SystemClock,
};
use balbes_giphy::GiphyClient;
use balbes_openai::OpenAiProvider;
use balbes_storage::SqliteStorage;
use balbes_telegram::TelegramChannel;
use tracing::{info, warn};

/// Runs the `balbes serve` command.
pub async fn run_serve(config: BalbesConfig) -> Result<(), BalbesError> {
    info!(name = %config.agent.name, "starting balbes serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);

    let provider: Arc<dyn ProviderAdapter + Send + Sync> =
        Arc::new(OpenAiProvider::new(&config.openai)?);

    let mut telegram = TelegramChannel::new(config.telegram.clone())?;
    telegram.connect().await?;
    let channel: Arc<dyn ChannelAdapter + Send + Sync> = Arc::new(telegram);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = ConversationState::from_entropy(&config.dialog).shared();

    let agent = AgentLoop::new(
        &config,
        channel.clone(),
        provider,
        storage,
        gif_source(&config),
        clock,
        state,
    )
    .await?;

    let cancel = shutdown::install_signal_handler();
    let scheduler = agent
        .spontaneous_scheduler()
        .map(|scheduler| tokio::spawn(scheduler.run(cancel.clone())));

    let result = agent.run(cancel.clone()).await;
    cancel.cancel();

    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            warn!(error = %e, "spontaneous scheduler task failed");
        }
    }
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }

    info!("balbes stopped");
    result
}

/// Giphy source when an API key is available; GIF replies are off otherwise.
fn gif_source(config: &BalbesConfig) -> Option<Arc<dyn GifSource + Send + Sync>> {
    if config.media.gif_probability <= 0.0 {
        return None;
    }
    match GiphyClient::new(&config.media) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "GIF replies disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gifs_off_without_probability() {
        let mut config = BalbesConfig::default();
        config.media.gif_probability = 0.0;
        config.media.giphy_api_key = Some("key".into());
        assert!(gif_source(&config).is_none());
    }

    #[test]
    fn gifs_on_with_key() {
        let mut config = BalbesConfig::default();
        config.media.giphy_api_key = Some("key".into());
        assert!(gif_source(&config).is_some());
    }

    #[tokio::test]
    async fn serve_requires_bot_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BalbesConfig::default();
        config.storage.database_path = dir.path().join("b.db").to_string_lossy().to_string();
        config.openai.api_key = Some("sk-test".into());
        config.telegram.bot_token = None;

        let err = run_serve(config).await.unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }
}
