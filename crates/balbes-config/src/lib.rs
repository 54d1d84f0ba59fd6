// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Balbes chat agent.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use balbes_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("reply probability: {}", config.gating.reply_probability);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::BalbesConfig;

use std::path::Path;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `BalbesConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<BalbesConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => validated(config),
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<BalbesConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<BalbesConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => validated(config),
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn validated(config: BalbesConfig) -> Result<BalbesConfig, Vec<ConfigError>> {
    validation::validate_config(&config)?;
    Ok(config)
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("balbes.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("balbes.toml").display().to_string())
            .unwrap_or_else(|_| "balbes.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("balbes/balbes.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = Path::new("/etc/balbes/balbes.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}
