// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emoji reaction picker.
//!
//! Keyword categories are checked in order and the first hit wins; the emoji
//! is then drawn uniformly from that category's pool.

use rand::Rng;
use rand::seq::SliceRandom;

/// Every emoji the picker can return.
pub const PALETTE: &[&str] = &[
    "🤣", "😁", "🤯", "🤡", "😈", "😐", "🤨", "👍", "👀", "🤝", "🔥", "💩", "👌", "🫡",
];

/// Emoji the Bot API accepts in `ReactionTypeEmoji`. Anything else is
/// rejected with `REACTION_INVALID`.
pub const TELEGRAM_REACTIONS: &[&str] = &[
    "👍", "👎", "❤", "🔥", "🥰", "👏", "😁", "🤔", "🤯", "😱", "🤬", "😢", "🎉", "🤩", "🤮",
    "💩", "🙏", "👌", "🕊", "🤡", "🥱", "🥴", "😍", "🐳", "❤\u{200d}🔥", "🌚", "🌭", "💯",
    "🤣", "⚡", "🍌", "🏆", "💔", "🤨", "😐", "🍓", "🍾", "💋", "🖕", "😈", "😴", "😭", "🤓",
    "👻", "👨\u{200d}💻", "👀", "🎃", "🙈", "😇", "😨", "🤝", "✍", "🤗", "🫡", "🎅", "🎄",
    "☃", "💅", "🤪", "🗿", "🆒", "💘", "🙉", "🦄", "😘", "💊", "🙊", "😎", "👾",
    "🤷\u{200d}♂", "🤷", "🤷\u{200d}♀", "😡",
];

const FALLBACK_POOL: &[&str] = &[
    "🤣", "😁", "🤯", "🤡", "😈", "😐", "🤨", "👍", "👀", "🤝", "🔥", "💩",
];

/// Messages longer than this read as a wall of text.
const LONG_TEXT_CHARS: usize = 140;

struct Category {
    keywords: &'static [&'static str],
    pool: &'static [&'static str],
}

const CATEGORIES: &[Category] = &[
    // laughter
    Category {
        keywords: &["ахаха", "хаха", "лол", "ору", "смеш", "😂", "🤣", "lol", "lmao"],
        pool: &["🤣", "😁", "🤯"],
    },
    // cringe
    Category {
        keywords: &["бред", "чушь", "ерунда", "кринж", "стыд", "🤡", "cringe"],
        pool: &["🤡", "🤯", "🤨"],
    },
    // agreement
    Category {
        keywords: &["ок", "пон", "ладно", "ясно", "норм", "база", "ok"],
        pool: &["👍", "🤝", "👌", "🫡", "🔥"],
    },
    // confusion
    Category {
        keywords: &["что", "чего", "серьёзно", "реально", "почему", "wtf", "?!"],
        pool: &["😐", "👀", "🤨"],
    },
];

const MENTION_POOL: &[&str] = &["👀", "😈", "🤡"];
const LONG_TEXT_POOL: &[&str] = &["👀", "🫡", "🤝"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReactionPicker;

impl ReactionPicker {
    /// Picks one emoji from [`PALETTE`] for the given message text.
    pub fn pick<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> &'static str {
        let lowered = text.to_lowercase();
        let pool = CATEGORIES
            .iter()
            .find(|c| c.keywords.iter().any(|k| lowered.contains(k)))
            .map(|c| c.pool)
            .unwrap_or_else(|| {
                if lowered.contains('@') {
                    MENTION_POOL
                } else if lowered.chars().count() > LONG_TEXT_CHARS {
                    LONG_TEXT_POOL
                } else {
                    FALLBACK_POOL
                }
            });

        pool.choose(rng).copied().unwrap_or(PALETTE[0])
    }

    /// Whether Telegram accepts `emoji` as a reaction.
    pub fn is_valid(emoji: &str) -> bool {
        TELEGRAM_REACTIONS.contains(&emoji)
    }
}
