// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock GIF search.

use async_trait::async_trait;
use tokio::sync::Mutex;

use balbes_core::{AdapterType, BalbesError, GifSource, HealthStatus, PluginAdapter};

/// Returns the same URL (or nothing) for every query and records queries.
pub struct MockGifSource {
    url: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MockGifSource {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockGifSource {
    fn name(&self) -> &str {
        "mock-gif"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::GifSource
    }

    async fn health_check(&self) -> Result<HealthStatus, BalbesError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BalbesError> {
        Ok(())
    }
}

#[async_trait]
impl GifSource for MockGifSource {
    async fn search(&self, query: &str) -> Result<Option<String>, BalbesError> {
        self.queries.lock().await.push(query.to_string());
        Ok(self.url.clone())
    }
}
