// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as probability ranges and ordered sleep bounds.

use crate::diagnostic::ConfigError;
use crate::model::BalbesConfig;

/// Longest accepted conversation window, ten years.
const MAX_WINDOW_HOURS: u32 = 10 * 365 * 24;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BalbesConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let probabilities = [
        ("gating.reply_probability", config.gating.reply_probability),
        (
            "gating.react_probability_when_silent",
            config.gating.react_probability_when_silent,
        ),
        (
            "gating.reaction_with_reply_probability",
            config.gating.reaction_with_reply_probability,
        ),
        (
            "gating.reaction_with_reply_probability_when_addressed",
            config.gating.reaction_with_reply_probability_when_addressed,
        ),
        (
            "gating.reaction_with_reply_probability_when_defending",
            config.gating.reaction_with_reply_probability_when_defending,
        ),
        (
            "dialog.filler_suppression_probability",
            config.dialog.filler_suppression_probability,
        ),
        ("spontaneous.probability", config.spontaneous.probability),
        ("sanitizer.max_latin_ratio", config.sanitizer.max_latin_ratio),
        ("media.gif_probability", config.media.gif_probability),
        ("media.gif_max_probability", config.media.gif_max_probability),
        ("media.voice_probability", config.media.voice_probability),
        ("media.image_probability", config.media.image_probability),
    ];
    for (key, value) in probabilities {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be between 0.0 and 1.0, got {value}"),
            });
        }
    }

    if config.media.gif_defend_multiplier < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "media.gif_defend_multiplier must be at least 1.0, got {}",
                config.media.gif_defend_multiplier
            ),
        });
    }

    if config.spontaneous.max_sleep_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "spontaneous.max_sleep_secs must be greater than 0".to_string(),
        });
    }

    if config.spontaneous.min_sleep_secs > config.spontaneous.max_sleep_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "spontaneous.min_sleep_secs ({}) must not exceed spontaneous.max_sleep_secs ({})",
                config.spontaneous.min_sleep_secs, config.spontaneous.max_sleep_secs
            ),
        });
    }

    if config.dialog.max_turns == 0 {
        errors.push(ConfigError::Validation {
            message: "dialog.max_turns must be at least 1".to_string(),
        });
    }

    if config.memory.window_hours == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.window_hours must be greater than 0".to_string(),
        });
    } else if config.memory.window_hours > MAX_WINDOW_HOURS {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.window_hours must not exceed {MAX_WINDOW_HOURS}, got {}",
                config.memory.window_hours
            ),
        });
    }

    if config.memory.max_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.max_chars must be greater than 0".to_string(),
        });
    }

    if config.memory.max_messages == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.max_messages must be greater than 0".to_string(),
        });
    }

    if config.sanitizer.max_run_len == 0 {
        errors.push(ConfigError::Validation {
            message: "sanitizer.max_run_len must be greater than 0".to_string(),
        });
    }

    if config.openai.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "openai.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.openai.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "openai.model must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.owner.handles.iter().any(|h| h.trim().is_empty()) {
        errors.push(ConfigError::Validation {
            message: "owner.handles must not contain empty entries".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
