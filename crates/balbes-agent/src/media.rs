// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Choice of reply form: plain text or one of the media variants.

use balbes_config::model::MediaConfig;
use balbes_core::{MediaKind, MediaSource, MessageId, OutboundMedia};
use rand::Rng;
use strum::Display;

use crate::gating::Mode;

/// Form of the next reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReplyPlan {
    Text,
    Gif,
    Voice,
    Image,
}

#[derive(Debug, Clone)]
pub struct MediaPlanner {
    gif_probability: f64,
    gif_defend_multiplier: f64,
    gif_max_probability: f64,
    voice_probability: f64,
    image_probability: f64,
}

impl MediaPlanner {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            gif_probability: config.gif_probability,
            gif_defend_multiplier: config.gif_defend_multiplier,
            gif_max_probability: config.gif_max_probability,
            voice_probability: config.voice_probability,
            image_probability: config.image_probability,
        }
    }

    /// GIF chance for `mode`; defend mode boosts it up to the ceiling.
    pub fn gif_probability(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Normal => self.gif_probability,
            Mode::DefendOwner => self
                .gif_max_probability
                .min(self.gif_probability * self.gif_defend_multiplier),
        }
    }

    /// Draws a plan. GIFs are only considered when a GIF source exists.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        mode: Mode,
        gif_available: bool,
        rng: &mut R,
    ) -> ReplyPlan {
        if gif_available && rng.r#gen::<f64>() < self.gif_probability(mode) {
            return ReplyPlan::Gif;
        }
        if rng.r#gen::<f64>() < self.voice_probability {
            return ReplyPlan::Voice;
        }
        if rng.r#gen::<f64>() < self.image_probability {
            return ReplyPlan::Image;
        }
        ReplyPlan::Text
    }
}

pub fn gif_message(url: String, reply_to: MessageId) -> OutboundMedia {
    OutboundMedia {
        kind: MediaKind::Animation,
        source: MediaSource::Url(url),
        reply_to: Some(reply_to),
        caption: None,
    }
}

pub fn voice_message(audio: Vec<u8>, reply_to: MessageId) -> OutboundMedia {
    OutboundMedia {
        kind: MediaKind::Voice,
        source: MediaSource::Bytes {
            data: audio,
            file_name: "voice.ogg".to_string(),
        },
        reply_to: Some(reply_to),
        caption: None,
    }
}

pub fn image_message(image: Vec<u8>, caption: String, reply_to: MessageId) -> OutboundMedia {
    OutboundMedia {
        kind: MediaKind::Photo,
        source: MediaSource::Bytes {
            data: image,
            file_name: "image.png".to_string(),
        },
        reply_to: Some(reply_to),
        caption: (!caption.is_empty()).then_some(caption),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn share(planner: &MediaPlanner, mode: Mode, gif: bool, plan: ReplyPlan) -> f64 {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let hits = (0..n)
            .filter(|_| planner.choose(mode, gif, &mut rng) == plan)
            .count();
        hits as f64 / n as f64
    }

    #[test]
    fn defend_mode_boosts_gif_up_to_ceiling() {
        let planner = MediaPlanner::new(&MediaConfig::default());
        assert!((planner.gif_probability(Mode::Normal) - 0.22).abs() < 1e-9);
        assert!((planner.gif_probability(Mode::DefendOwner) - 0.396).abs() < 1e-9);

        let capped = MediaPlanner::new(&MediaConfig {
            gif_probability: 0.5,
            ..MediaConfig::default()
        });
        assert!((capped.gif_probability(Mode::DefendOwner) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn no_gif_without_source() {
        let planner = MediaPlanner::new(&MediaConfig {
            gif_probability: 1.0,
            ..MediaConfig::default()
        });
        assert_eq!(share(&planner, Mode::Normal, false, ReplyPlan::Gif), 0.0);
        assert_eq!(share(&planner, Mode::Normal, true, ReplyPlan::Gif), 1.0);
    }

    #[test]
    fn defaults_are_mostly_text() {
        let planner = MediaPlanner::new(&MediaConfig::default());
        let gif = share(&planner, Mode::Normal, true, ReplyPlan::Gif);
        assert!((gif - 0.22).abs() < 0.02, "gif share {gif}");
        assert_eq!(share(&planner, Mode::Normal, true, ReplyPlan::Voice), 0.0);
        assert_eq!(share(&planner, Mode::Normal, false, ReplyPlan::Text), 1.0);
    }

    #[test]
    fn empty_caption_is_dropped() {
        let media = image_message(vec![1], String::new(), MessageId(3));
        assert_eq!(media.caption, None);
        assert_eq!(media.reply_to, Some(MessageId(3)));
    }
}
