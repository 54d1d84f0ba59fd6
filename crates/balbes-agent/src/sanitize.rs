// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cleanup and garbage detection for model output.

use std::sync::LazyLock;

use balbes_config::model::SanitizerConfig;
use regex::Regex;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

static CONTROL_TOKENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[^|>]*\|>|\[/?INST\]|<</?SYS>>|</?s>|</?think>").unwrap());

static ROLE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(assistant|ассистент|бот|bot)\s*:\s*").unwrap());

/// Substrings that betray prompt or template leakage.
const LEAK_MARKERS: &[&str] = &[
    "<|",
    "|>",
    "[inst]",
    "<<sys>>",
    "</",
    "```",
    "{{",
    "as an ai",
    "as a language model",
    "system prompt",
];

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('«', '»'),
    ('“', '”'),
    ('„', '“'),
];

pub struct Sanitizer {
    name_prefix: Option<Regex>,
    max_latin_ratio: f64,
    max_run_len: usize,
}

impl Sanitizer {
    pub fn new(bot_name: &str, config: &SanitizerConfig) -> Self {
        let name = bot_name.trim().trim_start_matches('@');
        let name_prefix = (!name.is_empty())
            .then(|| Regex::new(&format!(r"(?i)^@?{}\s*[:,]\s*", regex::escape(name))).ok())
            .flatten();
        Self {
            name_prefix,
            max_latin_ratio: config.max_latin_ratio,
            max_run_len: config.max_run_len,
        }
    }

    /// Strips control tokens, role labels, the bot's own name prefix and
    /// surrounding quotes until nothing changes.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let text = THINK_BLOCK.replace_all(text, "");
        let text = CONTROL_TOKENS.replace_all(&text, "");
        let text = ROLE_LABEL.replace(text.trim(), "");
        let text = match &self.name_prefix {
            Some(prefix) => prefix.replace(text.trim(), "").into_owned(),
            None => text.trim().to_string(),
        };
        strip_quotes(text.trim()).trim().to_string()
    }

    /// Whether the text looks like broken output that should not be sent.
    pub fn is_garbage(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        if LEAK_MARKERS.iter().any(|m| lowered.contains(m)) {
            return true;
        }

        let mut latin = 0usize;
        let mut cyrillic = 0usize;
        for token in text.split_whitespace().filter(|t| !is_url(t)) {
            if token.chars().count() > self.max_run_len {
                return true;
            }
            let token_latin = token.chars().filter(char::is_ascii_alphabetic).count();
            let token_cyrillic = token.chars().filter(|c| is_cyrillic(*c)).count();
            if token_latin > 0 && token_cyrillic > 0 {
                return true;
            }
            latin += token_latin;
            cyrillic += token_cyrillic;
        }

        cyrillic > 0 && latin as f64 / (latin + cyrillic) as f64 > self.max_latin_ratio
    }
}

fn strip_quotes(text: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = text.strip_prefix(*open).and_then(|t| t.strip_suffix(*close)) {
            return inner;
        }
    }
    text
}

fn is_url(token: &str) -> bool {
    let t = token.trim_start_matches(['(', '<', '[']);
    t.starts_with("http://") || t.starts_with("https://") || t.starts_with("www.")
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new("Balbes", &SanitizerConfig::default())
    }

    #[test]
    fn strips_control_tokens_and_labels() {
        let s = sanitizer();
        assert_eq!(s.sanitize("<|im_start|>assistant: привет<|im_end|>"), "привет");
        assert_eq!(s.sanitize("[INST] ну да [/INST]"), "ну да");
        assert_eq!(s.sanitize("<s>ок</s>"), "ок");
        assert_eq!(s.sanitize("<think>план ответа</think>\nну и ну"), "ну и ну");
    }

    #[test]
    fn strips_own_name_and_quotes() {
        let s = sanitizer();
        assert_eq!(s.sanitize("Balbes: «кто бы говорил»"), "кто бы говорил");
        assert_eq!(s.sanitize("\"balbes, \"это да\"\""), "это да");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let s = sanitizer();
        let samples = [
            "  assistant: \"Balbes: <|x|>'ага'\"  ",
            "«„привет“»",
            "<<SYS>>system<</SYS>> бот: ну",
            "",
            "обычный текст",
            "<think>a</think><think>b</think>",
        ];
        for sample in samples {
            let once = s.sanitize(sample);
            assert_eq!(s.sanitize(&once), once, "input {sample:?}");
        }
    }

    #[test]
    fn mixed_alphabet_token_is_garbage() {
        let s = sanitizer();
        assert!(s.is_garbage("привetik"));
        assert!(!s.is_garbage("Привет, как дела у всех сегодня?"));
    }

    #[test]
    fn latin_share_threshold() {
        let s = sanitizer();
        assert!(s.is_garbage("ну this is totally english text"));
        // pure latin without cyrillic is allowed
        assert!(!s.is_garbage("lol ok"));
    }

    #[test]
    fn long_runs_except_urls() {
        let s = sanitizer();
        assert!(s.is_garbage(&format!("смотри {}", "ы".repeat(60))));
        assert!(!s.is_garbage(
            "смотри https://example.com/a/very/long/path/that/goes/on/and/on/forever"
        ));
    }

    #[test]
    fn leak_markers() {
        let s = sanitizer();
        assert!(s.is_garbage("As an AI я не могу"));
        assert!(s.is_garbage("вот ```код```"));
        assert!(s.is_garbage("{{user}} привет"));
    }
}
