// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply gating engine.
//!
//! Turns an inbound event plus the shared conversation state into a
//! [`GateDecision`]. Rules are evaluated in a fixed order and the first
//! match wins:
//!
//! 1. messages from the bot itself are ignored;
//! 2. the owner is left alone unless replies to the owner are enabled or the
//!    bot is addressed;
//! 3. an active dialog session forces a reply (filler may be skipped);
//! 4. being addressed, or the owner being attacked, forces a reply;
//! 5. the per-chat cooldown suppresses the reply;
//! 6. the base reply probability suppresses the reply;
//! 7. otherwise reply.
//!
//! The engine never mutates the throttle or sessions; the caller commits
//! them after the reply is actually sent.

use balbes_config::model::{DialogConfig, GatingConfig, OwnerConfig};
use balbes_core::{ChatEvent, SelfIdentity, UserId};
use chrono::{DateTime, Utc};
use rand::Rng;
use strum::Display;

use crate::reaction::ReactionPicker;
use crate::state::{ConversationState, seconds};

/// Texts this short count as filler regardless of content.
const FILLER_MAX_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    Normal,
    DefendOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateAction {
    MustReply,
    ProbabilisticReply,
    ReactOnly,
    Silent,
}

impl GateAction {
    pub fn is_reply(self) -> bool {
        matches!(self, Self::MustReply | Self::ProbabilisticReply)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub action: GateAction,
    /// Emoji chosen for this message, used by `ReactOnly` and optional
    /// reply reactions.
    pub reaction: &'static str,
    pub mode: Mode,
    pub addressed: bool,
}

pub struct GatingEngine {
    gating: GatingConfig,
    filler_words: Vec<String>,
    filler_suppression_probability: f64,
    owner_id: Option<UserId>,
    owner_handles: Vec<String>,
    defense_enabled: bool,
    reply_to_owner: bool,
    picker: ReactionPicker,
}

impl GatingEngine {
    pub fn new(gating: &GatingConfig, dialog: &DialogConfig, owner: &OwnerConfig) -> Self {
        Self {
            gating: gating.clone(),
            filler_words: dialog.filler_words.iter().map(|w| w.to_lowercase()).collect(),
            filler_suppression_probability: dialog.filler_suppression_probability,
            owner_id: owner.user_id.map(UserId),
            owner_handles: owner
                .handles
                .iter()
                .map(|h| h.trim_start_matches('@').to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            defense_enabled: owner.defense_enabled,
            reply_to_owner: owner.reply_to_owner,
            picker: ReactionPicker,
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_id == Some(user)
    }

    /// Decides what to do with `event`.
    ///
    /// Reads the throttle and dialog table from `state` and draws from its
    /// RNG. The only mutation is lazy eviction of an expired dialog session.
    pub fn decide(
        &self,
        event: &ChatEvent,
        identity: &SelfIdentity,
        state: &mut ConversationState,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let reaction = self.picker.pick(&event.text, &mut state.rng);
        let addressed = is_addressed(event, identity);
        let mode = self.mode_for(event);
        let decision = |action| GateDecision {
            action,
            reaction,
            mode,
            addressed,
        };

        if event.author_id == identity.id {
            return decision(GateAction::Silent);
        }

        if self.is_owner(event.author_id) && !self.reply_to_owner && !addressed {
            return decision(GateAction::Silent);
        }

        if state.dialogs.is_active(event.chat_id, event.author_id, now) {
            if self.is_filler(&event.text)
                && state.rng.r#gen::<f64>() < self.filler_suppression_probability
            {
                let action = if state.rng.gen_bool(0.5) {
                    GateAction::ReactOnly
                } else {
                    GateAction::Silent
                };
                return decision(action);
            }
            return decision(GateAction::MustReply);
        }

        if addressed || mode == Mode::DefendOwner {
            return decision(GateAction::MustReply);
        }

        let cooldown = seconds(self.gating.reply_cooldown_secs);
        if state.throttle.in_cooldown(event.chat_id, now, cooldown) {
            return decision(self.suppressed(state));
        }

        if state.rng.r#gen::<f64>() > self.gating.reply_probability {
            return decision(self.suppressed(state));
        }

        decision(GateAction::ProbabilisticReply)
    }

    /// React-or-silent draw used whenever a reply is suppressed.
    fn suppressed(&self, state: &mut ConversationState) -> GateAction {
        if state.rng.r#gen::<f64>() < self.gating.react_probability_when_silent {
            GateAction::ReactOnly
        } else {
            GateAction::Silent
        }
    }

    fn mode_for(&self, event: &ChatEvent) -> Mode {
        if !self.defense_enabled {
            return Mode::Normal;
        }
        let lowered = event.text.to_lowercase();
        let handle_hit = self.owner_handles.iter().any(|h| lowered.contains(h.as_str()));
        let reply_to_owner = self.owner_id.is_some() && event.reply_to_author == self.owner_id;
        if handle_hit || reply_to_owner {
            Mode::DefendOwner
        } else {
            Mode::Normal
        }
    }

    fn is_filler(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() <= FILLER_MAX_CHARS {
            return true;
        }
        let word = trimmed
            .trim_matches(|c: char| c.is_ascii_punctuation() || c == '…')
            .to_lowercase();
        self.filler_words.iter().any(|w| *w == word)
    }

    /// Chance of reacting alongside a reply. Being addressed outranks
    /// defend mode.
    pub fn reaction_with_reply_probability(&self, addressed: bool, mode: Mode) -> f64 {
        if addressed {
            self.gating.reaction_with_reply_probability_when_addressed
        } else if mode == Mode::DefendOwner {
            self.gating.reaction_with_reply_probability_when_defending
        } else {
            self.gating.reaction_with_reply_probability
        }
    }
}

/// The bot is addressed by handle (with or without `@`, any case), by an
/// entity mention, or by a reply to one of its messages.
pub fn is_addressed(event: &ChatEvent, identity: &SelfIdentity) -> bool {
    if event.reply_to_author == Some(identity.id) {
        return true;
    }
    let handle = identity.handle.trim_start_matches('@').to_lowercase();
    if handle.is_empty() {
        return false;
    }
    event.text.to_lowercase().contains(&handle)
        || event
            .mentions
            .iter()
            .any(|m| m.trim_start_matches('@').to_lowercase() == handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use balbes_core::{ChatId, MessageId};
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BOT: UserId = UserId(1000);
    const OWNER: UserId = UserId(42);
    const CHAT: ChatId = ChatId(-100);

    fn identity() -> SelfIdentity {
        SelfIdentity {
            id: BOT,
            handle: "balbes_bot".into(),
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn owner_config() -> OwnerConfig {
        OwnerConfig {
            user_id: Some(OWNER.0),
            handles: vec!["шеф".into()],
            ..OwnerConfig::default()
        }
    }

    fn engine_with(gating: GatingConfig) -> GatingEngine {
        GatingEngine::new(&gating, &DialogConfig::default(), &owner_config())
    }

    fn engine() -> GatingEngine {
        engine_with(GatingConfig::default())
    }

    fn state(seed: u64) -> ConversationState {
        ConversationState::new(&DialogConfig::default(), StdRng::seed_from_u64(seed))
    }

    fn event(author: UserId, text: &str) -> ChatEvent {
        ChatEvent::new(CHAT, MessageId(1), author, "someone", text, t0())
    }

    #[test]
    fn own_messages_are_silent() {
        let mut st = state(1);
        let d = engine().decide(&event(BOT, "@balbes_bot hi"), &identity(), &mut st, t0());
        assert_eq!(d.action, GateAction::Silent);
        assert!(ReactionPicker::is_valid(d.reaction));
    }

    #[test]
    fn owner_is_left_alone_regardless_of_gates() {
        let always = GatingConfig {
            reply_probability: 1.0,
            reply_cooldown_secs: 0,
            ..GatingConfig::default()
        };
        for seed in 0..20 {
            let mut st = state(seed);
            let d = engine_with(always.clone()).decide(
                &event(OWNER, "кто-нибудь тут?"),
                &identity(),
                &mut st,
                t0(),
            );
            assert_eq!(d.action, GateAction::Silent);
        }
    }

    #[test]
    fn owner_addressing_bot_gets_reply() {
        let mut st = state(1);
        let d = engine().decide(&event(OWNER, "Balbes_Bot, скажи"), &identity(), &mut st, t0());
        assert_eq!(d.action, GateAction::MustReply);
        assert!(d.addressed);
    }

    #[test]
    fn reply_to_owner_flag_lets_owner_through() {
        let owner = OwnerConfig {
            reply_to_owner: true,
            ..owner_config()
        };
        let gating = GatingConfig {
            reply_probability: 1.0,
            ..GatingConfig::default()
        };
        let engine = GatingEngine::new(&gating, &DialogConfig::default(), &owner);
        let mut st = state(3);
        let d = engine.decide(&event(OWNER, "ну что"), &identity(), &mut st, t0());
        assert_eq!(d.action, GateAction::ProbabilisticReply);
    }

    #[test]
    fn addressed_by_handle_mention_or_reply() {
        let id = identity();
        assert!(is_addressed(&event(UserId(5), "эй @BALBES_BOT"), &id));
        assert!(is_addressed(&event(UserId(5), "balbes_bot ты где"), &id));
        assert!(is_addressed(
            &event(UserId(5), "ну").with_mentions(vec!["balbes_bot".into()]),
            &id
        ));
        assert!(is_addressed(&event(UserId(5), "ну").replying_to(BOT), &id));
        assert!(!is_addressed(&event(UserId(5), "просто текст"), &id));
    }

    #[test]
    fn addressed_overrides_cooldown_and_probability() {
        let never = GatingConfig {
            reply_probability: 0.0,
            ..GatingConfig::default()
        };
        let mut st = state(9);
        st.throttle.record(CHAT, t0());
        let d = engine_with(never).decide(
            &event(UserId(5), "@balbes_bot прив"),
            &identity(),
            &mut st,
            t0(),
        );
        assert_eq!(d.action, GateAction::MustReply);
        assert_eq!(d.mode, Mode::Normal);
    }

    #[test]
    fn defend_mode_by_handle_or_reply_to_owner() {
        let never = GatingConfig {
            reply_probability: 0.0,
            ..GatingConfig::default()
        };
        let engine = engine_with(never);

        let mut st = state(2);
        let d = engine.decide(&event(UserId(5), "ваш ШЕФ опять"), &identity(), &mut st, t0());
        assert_eq!(d.mode, Mode::DefendOwner);
        assert_eq!(d.action, GateAction::MustReply);

        let d = engine.decide(
            &event(UserId(5), "не согласен").replying_to(OWNER),
            &identity(),
            &mut st,
            t0(),
        );
        assert_eq!(d.mode, Mode::DefendOwner);
    }

    #[test]
    fn defense_can_be_disabled() {
        let owner = OwnerConfig {
            defense_enabled: false,
            ..owner_config()
        };
        let gating = GatingConfig {
            reply_probability: 0.0,
            react_probability_when_silent: 0.0,
            ..GatingConfig::default()
        };
        let engine = GatingEngine::new(&gating, &DialogConfig::default(), &owner);
        let mut st = state(2);
        let d = engine.decide(&event(UserId(5), "шеф"), &identity(), &mut st, t0());
        assert_eq!(d.mode, Mode::Normal);
        assert_eq!(d.action, GateAction::Silent);
    }

    #[test]
    fn active_session_forces_reply() {
        let never = GatingConfig {
            reply_probability: 0.0,
            ..GatingConfig::default()
        };
        let mut st = state(4);
        st.dialogs.touch(CHAT, UserId(5), t0());
        st.throttle.record(CHAT, t0());
        let d = engine_with(never).decide(
            &event(UserId(5), "а почему так получилось"),
            &identity(),
            &mut st,
            t0() + Duration::seconds(2),
        );
        assert_eq!(d.action, GateAction::MustReply);
    }

    #[test]
    fn filler_in_session_is_sometimes_skipped() {
        let mut replies = 0;
        let mut skipped = 0;
        for seed in 0..400 {
            let mut st = state(seed);
            st.dialogs.touch(CHAT, UserId(5), t0());
            let d = engine().decide(&event(UserId(5), "Ага!"), &identity(), &mut st, t0());
            match d.action {
                GateAction::MustReply => replies += 1,
                GateAction::ReactOnly | GateAction::Silent => skipped += 1,
                GateAction::ProbabilisticReply => panic!("session path never draws base gate"),
            }
        }
        // suppression probability 0.6
        assert!((200..280).contains(&skipped), "skipped {skipped}");
        assert_eq!(replies + skipped, 400);
    }

    #[test]
    fn expired_session_falls_through() {
        let never = GatingConfig {
            reply_probability: 0.0,
            react_probability_when_silent: 0.0,
            ..GatingConfig::default()
        };
        let mut st = state(4);
        st.dialogs.touch(CHAT, UserId(5), t0());
        let d = engine_with(never).decide(
            &event(UserId(5), "а почему так получилось"),
            &identity(),
            &mut st,
            t0() + Duration::seconds(600),
        );
        assert_eq!(d.action, GateAction::Silent);
        assert!(st.dialogs.is_empty());
    }

    #[test]
    fn cooldown_ignores_base_probability() {
        let text = "обычное сообщение без обращений";
        for seed in 0..50 {
            let mut outcomes = Vec::new();
            for p in [0.0, 1.0] {
                let gating = GatingConfig {
                    reply_probability: p,
                    ..GatingConfig::default()
                };
                let mut st = state(seed);
                st.throttle.record(CHAT, t0());
                let d = engine_with(gating).decide(
                    &event(UserId(5), text),
                    &identity(),
                    &mut st,
                    t0() + Duration::seconds(3),
                );
                assert!(!d.action.is_reply());
                outcomes.push(d.action);
            }
            assert_eq!(outcomes[0], outcomes[1], "seed {seed}");
        }
    }

    #[test]
    fn base_probability_gate() {
        let always = GatingConfig {
            reply_probability: 1.0,
            ..GatingConfig::default()
        };
        let mut st = state(5);
        let d = engine_with(always).decide(
            &event(UserId(5), "ну и погода"),
            &identity(),
            &mut st,
            t0(),
        );
        assert_eq!(d.action, GateAction::ProbabilisticReply);

        let never = GatingConfig {
            reply_probability: 0.0,
            react_probability_when_silent: 1.0,
            ..GatingConfig::default()
        };
        let mut st = state(5);
        let d = engine_with(never).decide(
            &event(UserId(5), "ну и погода"),
            &identity(),
            &mut st,
            t0(),
        );
        assert_eq!(d.action, GateAction::ReactOnly);
    }

    #[test]
    fn react_share_under_cooldown_matches_config() {
        let engine = engine();
        let mut st = state(77);
        st.throttle.record(CHAT, t0());
        let trials = 2000;
        let reacts = (0..trials)
            .filter(|_| {
                engine
                    .decide(&event(UserId(5), "текст"), &identity(), &mut st, t0())
                    .action
                    == GateAction::ReactOnly
            })
            .count();
        let share = reacts as f64 / trials as f64;
        assert!((share - 0.35).abs() < 0.05, "share {share}");
    }

    #[test]
    fn reaction_with_reply_probability_depends_on_address_and_mode() {
        let e = engine();
        assert_eq!(e.reaction_with_reply_probability(true, Mode::Normal), 0.45);
        assert_eq!(e.reaction_with_reply_probability(true, Mode::DefendOwner), 0.45);
        assert_eq!(e.reaction_with_reply_probability(false, Mode::DefendOwner), 0.35);
        assert_eq!(e.reaction_with_reply_probability(false, Mode::Normal), 0.18);
    }
}
