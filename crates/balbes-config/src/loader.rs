// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./balbes.toml` > `~/.config/balbes/balbes.toml` > `/etc/balbes/balbes.toml`
//! with environment variable overrides via `BALBES_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BalbesConfig;

/// Config sections that environment variables may address.
const ENV_SECTIONS: &[&str] = &[
    "agent",
    "telegram",
    "openai",
    "storage",
    "gating",
    "dialog",
    "owner",
    "spontaneous",
    "memory",
    "sanitizer",
    "media",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/balbes/balbes.toml` (system-wide)
/// 3. `~/.config/balbes/balbes.toml` (user XDG config)
/// 4. `./balbes.toml` (local directory)
/// 5. `BALBES_*` environment variables
pub fn load_config() -> Result<BalbesConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BalbesConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BalbesConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BalbesConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BalbesConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BalbesConfig::default()))
        .merge(Toml::file("/etc/balbes/balbes.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("balbes/balbes.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("balbes.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `BALBES_GATING_REPLY_PROBABILITY`
/// must map to `gating.reply_probability`, not `gating.reply.probability`.
fn env_provider() -> Env {
    Env::prefixed("BALBES_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
