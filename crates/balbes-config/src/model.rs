// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Balbes chat agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Balbes configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BalbesConfig {
    /// Agent identity and prompt settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// OpenAI-compatible provider settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reply gating probabilities and cooldown.
    #[serde(default)]
    pub gating: GatingConfig,

    /// Per-user dialog continuity.
    #[serde(default)]
    pub dialog: DialogConfig,

    /// Owner identity and protection.
    #[serde(default)]
    pub owner: OwnerConfig,

    /// Unprompted posting.
    #[serde(default)]
    pub spontaneous: SpontaneousConfig,

    /// Conversation window limits.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Output sanitizer thresholds.
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// Media reply settings (GIFs, voice notes, images, vision).
    #[serde(default)]
    pub media: MediaConfig,
}

/// Agent identity and prompt configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline persona prompt. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file containing the persona prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Path to the chat style profile, re-read for every generation.
    #[serde(default = "default_style_profile_path")]
    pub style_profile_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
            style_profile_path: default_style_profile_path(),
        }
    }
}

fn default_agent_name() -> String {
    "balbes".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_style_profile_path() -> String {
    "artifacts/system_style.txt".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// The single group chat the agent participates in. Required by `serve`.
    #[serde(default)]
    pub target_chat_id: Option<i64>,

    /// Also accept private chats (debugging aid).
    #[serde(default)]
    pub allow_private: bool,
}

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the API, without a trailing slash.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Primary chat model.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Models tried in order when the previous one fails with a retryable error.
    #[serde(default = "default_fallback_models")]
    pub fallback_models: Vec<String>,

    /// Model used for replies to photos.
    #[serde(default = "default_openai_model")]
    pub vision_model: String,

    /// Text-to-speech model.
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Text-to-speech voice preset.
    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    /// Image generation model.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Image size passed to the images endpoint.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on a single provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Linear backoff step between fallback attempts, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            fallback_models: default_fallback_models(),
            vision_model: default_openai_model(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_fallback_models() -> Vec<String> {
    vec!["gpt-4.1-mini".to_string(), "gpt-4o".to_string()]
}

fn default_tts_model() -> String {
    "gpt-4o-mini-tts".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_image_model() -> String {
    "gpt-image-1".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    400
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_backoff_ms() -> u64 {
    400
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("balbes").join("balbes.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("balbes.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Reply gating configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatingConfig {
    /// Chance of replying to an ordinary message once the cooldown has passed.
    #[serde(default = "default_reply_probability")]
    pub reply_probability: f64,

    /// Minimum time between two replies in the same chat, in seconds.
    #[serde(default = "default_reply_cooldown_secs")]
    pub reply_cooldown_secs: u64,

    /// Chance of reacting with an emoji when a reply is suppressed.
    #[serde(default = "default_react_probability_when_silent")]
    pub react_probability_when_silent: f64,

    /// Chance of also reacting to a message the agent replies to.
    #[serde(default = "default_reaction_with_reply_probability")]
    pub reaction_with_reply_probability: f64,

    /// Same as above when the agent was addressed directly.
    #[serde(default = "default_reaction_with_reply_probability_when_addressed")]
    pub reaction_with_reply_probability_when_addressed: f64,

    /// Same as above when the agent is defending its owner.
    #[serde(default = "default_reaction_with_reply_probability_when_defending")]
    pub reaction_with_reply_probability_when_defending: f64,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            reply_probability: default_reply_probability(),
            reply_cooldown_secs: default_reply_cooldown_secs(),
            react_probability_when_silent: default_react_probability_when_silent(),
            reaction_with_reply_probability: default_reaction_with_reply_probability(),
            reaction_with_reply_probability_when_addressed:
                default_reaction_with_reply_probability_when_addressed(),
            reaction_with_reply_probability_when_defending:
                default_reaction_with_reply_probability_when_defending(),
        }
    }
}

fn default_reply_probability() -> f64 {
    0.92
}

fn default_reply_cooldown_secs() -> u64 {
    8
}

fn default_react_probability_when_silent() -> f64 {
    0.35
}

fn default_reaction_with_reply_probability() -> f64 {
    0.18
}

fn default_reaction_with_reply_probability_when_addressed() -> f64 {
    0.45
}

fn default_reaction_with_reply_probability_when_defending() -> f64 {
    0.35
}

/// Dialog session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogConfig {
    /// How long a reply keeps the dialog with that user open, in seconds.
    #[serde(default = "default_extension_secs")]
    pub extension_secs: u64,

    /// Cap on the per-session turn counter.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Chance of not continuing a dialog on a filler message ("ok", "ага").
    #[serde(default = "default_filler_suppression_probability")]
    pub filler_suppression_probability: f64,

    /// Acknowledgement words treated as filler regardless of length.
    #[serde(default = "default_filler_words")]
    pub filler_words: Vec<String>,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            extension_secs: default_extension_secs(),
            max_turns: default_max_turns(),
            filler_suppression_probability: default_filler_suppression_probability(),
            filler_words: default_filler_words(),
        }
    }
}

fn default_extension_secs() -> u64 {
    90
}

fn default_max_turns() -> u32 {
    6
}

fn default_filler_suppression_probability() -> f64 {
    0.6
}

fn default_filler_words() -> Vec<String> {
    [
        "ок", "окей", "ага", "угу", "ясно", "понял", "пон", "норм", "лол", "ладно", "спс",
        "ok", "okay", "lol", "yes", "yep", "nope", "thx",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Owner identity and protection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerConfig {
    /// Platform user id of the owner.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// How the owner is referred to in prompts.
    #[serde(default = "default_owner_alias")]
    pub alias: String,

    /// Names that refer to the owner in chat text (case-insensitive).
    #[serde(default = "default_owner_handles")]
    pub handles: Vec<String>,

    /// Take the owner's side when they are mentioned or replied to.
    #[serde(default = "default_true")]
    pub defense_enabled: bool,

    /// Reply to the owner's own messages without being addressed.
    #[serde(default)]
    pub reply_to_owner: bool,

    /// Only gate messages written by the owner; everything else is stored only.
    #[serde(default)]
    pub owner_only_mode: bool,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            alias: default_owner_alias(),
            handles: default_owner_handles(),
            defense_enabled: true,
            reply_to_owner: false,
            owner_only_mode: false,
        }
    }
}

fn default_owner_alias() -> String {
    "the owner".to_string()
}

fn default_owner_handles() -> Vec<String> {
    ["балбес", "balbes", "владелец", "автор"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

/// Unprompted posting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpontaneousConfig {
    /// Run the spontaneous scheduler at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower bound of the sleep between cycles, in seconds.
    #[serde(default = "default_min_sleep_secs")]
    pub min_sleep_secs: u64,

    /// Upper bound of the sleep between cycles, in seconds.
    #[serde(default = "default_max_sleep_secs")]
    pub max_sleep_secs: u64,

    /// Chance that a cycle attempts a post.
    #[serde(default = "default_spontaneous_probability")]
    pub probability: f64,

    /// Minimum time between two spontaneous posts, in seconds.
    #[serde(default = "default_spontaneous_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Only post when the chat has been quiet for at least this long, in seconds.
    #[serde(default = "default_only_if_silent_secs")]
    pub only_if_silent_secs: u64,
}

impl Default for SpontaneousConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_sleep_secs: default_min_sleep_secs(),
            max_sleep_secs: default_max_sleep_secs(),
            probability: default_spontaneous_probability(),
            cooldown_secs: default_spontaneous_cooldown_secs(),
            only_if_silent_secs: default_only_if_silent_secs(),
        }
    }
}

fn default_min_sleep_secs() -> u64 {
    180
}

fn default_max_sleep_secs() -> u64 {
    540
}

fn default_spontaneous_probability() -> f64 {
    0.12
}

fn default_spontaneous_cooldown_secs() -> u64 {
    1800
}

fn default_only_if_silent_secs() -> u64 {
    600
}

/// Conversation window configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Trailing time bound of the conversation window, in hours.
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    /// Character budget of the rendered window.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Maximum number of messages in the window.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Name used for authors without a display name.
    #[serde(default = "default_author_name")]
    pub default_author_name: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            max_chars: default_max_chars(),
            max_messages: default_max_messages(),
            default_author_name: default_author_name(),
        }
    }
}

fn default_window_hours() -> u32 {
    24
}

fn default_max_chars() -> usize {
    6500
}

fn default_max_messages() -> usize {
    70
}

fn default_author_name() -> String {
    "кто-то".to_string()
}

/// Output sanitizer thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizerConfig {
    /// Maximum share of Latin letters in text that also contains Cyrillic.
    #[serde(default = "default_max_latin_ratio")]
    pub max_latin_ratio: f64,

    /// Longest allowed run of non-whitespace characters (URLs excepted).
    #[serde(default = "default_max_run_len")]
    pub max_run_len: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_latin_ratio: default_max_latin_ratio(),
            max_run_len: default_max_run_len(),
        }
    }
}

fn default_max_latin_ratio() -> f64 {
    0.35
}

fn default_max_run_len() -> usize {
    40
}

/// Media reply configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Answer photos through the vision model.
    #[serde(default = "default_true")]
    pub vision_enabled: bool,

    /// Chance of answering with a GIF instead of text.
    #[serde(default = "default_gif_probability")]
    pub gif_probability: f64,

    /// Multiplier applied to `gif_probability` in owner-defense mode.
    #[serde(default = "default_gif_defend_multiplier")]
    pub gif_defend_multiplier: f64,

    /// Ceiling for the boosted GIF probability.
    #[serde(default = "default_gif_max_probability")]
    pub gif_max_probability: f64,

    /// Chance of answering with a synthesized voice note.
    #[serde(default)]
    pub voice_probability: f64,

    /// Chance of answering with a generated image.
    #[serde(default)]
    pub image_probability: f64,

    /// Giphy API key. `None` disables GIF replies.
    #[serde(default)]
    pub giphy_api_key: Option<String>,

    /// Giphy API base URL.
    #[serde(default = "default_giphy_base_url")]
    pub giphy_base_url: String,

    /// Giphy content rating filter.
    #[serde(default = "default_giphy_rating")]
    pub giphy_rating: String,

    /// Giphy search language.
    #[serde(default = "default_giphy_lang")]
    pub giphy_lang: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            vision_enabled: true,
            gif_probability: default_gif_probability(),
            gif_defend_multiplier: default_gif_defend_multiplier(),
            gif_max_probability: default_gif_max_probability(),
            voice_probability: 0.0,
            image_probability: 0.0,
            giphy_api_key: None,
            giphy_base_url: default_giphy_base_url(),
            giphy_rating: default_giphy_rating(),
            giphy_lang: default_giphy_lang(),
        }
    }
}

fn default_gif_probability() -> f64 {
    0.22
}

fn default_gif_defend_multiplier() -> f64 {
    1.8
}

fn default_gif_max_probability() -> f64 {
    0.55
}

fn default_giphy_base_url() -> String {
    "https://api.giphy.com/v1/gifs".to_string()
}

fn default_giphy_rating() -> String {
    "r".to_string()
}

fn default_giphy_lang() -> String {
    "ru".to_string()
}

impl BalbesConfig {
    /// Copy of the configuration with secrets replaced, safe to print.
    pub fn redacted(&self) -> Self {
        const MASK: &str = "[redacted]";
        let mut copy = self.clone();
        if copy.telegram.bot_token.is_some() {
            copy.telegram.bot_token = Some(MASK.to_string());
        }
        if copy.openai.api_key.is_some() {
            copy.openai.api_key = Some(MASK.to_string());
        }
        if copy.media.giphy_api_key.is_some() {
            copy.media.giphy_api_key = Some(MASK.to_string());
        }
        copy
    }
}
