// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GIF search adapter trait.

use async_trait::async_trait;

use crate::error::BalbesError;
use crate::traits::adapter::PluginAdapter;

/// Looks up a reaction GIF for a free-text query.
#[async_trait]
pub trait GifSource: PluginAdapter {
    /// Returns a URL of a matching animation, or `None` when nothing fits.
    async fn search(&self, query: &str) -> Result<Option<String>, BalbesError>;
}
