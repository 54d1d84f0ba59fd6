// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt and message assembly.
//!
//! The system prompt is the persona, then mode rules, then the chat style
//! profile. The style profile is re-read from disk for every generation so
//! it can be regenerated while the bot runs.

use balbes_config::model::{AgentConfig, OwnerConfig};
use balbes_core::{ContentPart, PromptMessage, PromptRole};
use tracing::{debug, info, warn};

use crate::gating::Mode;

/// Header placed in front of the conversation window.
pub const CONTEXT_HEADER: &str = "Контекст из истории чата (может быть полезен):";

/// User turn for unprompted remarks.
pub const SPONTANEOUS_INSTRUCTION: &str =
    "Сгенерируй короткий вброс в чат (1-2 предложения), в стиле чата.";

/// Added to the system prompt when the first answer came back garbled.
pub const PLAIN_LANGUAGE_NOTE: &str = "Пиши обычным разговорным языком чата. \
Не смешивай латиницу и кириллицу в одном слове, без служебных вставок и разметки.";

/// User turn accompanying a photo without a caption.
const DEFAULT_IMAGE_PROMPT: &str = "Прокомментируй картинку.";

fn default_persona(name: &str) -> String {
    format!(
        "Ты {name}, участник телеграм-чата. Пиши естественно и коротко, с иронией. \
Не изображай помощника, не пиши канцеляритом, не объясняй, что ты бот."
    )
}

/// Image attached to a prompt.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub mime_type: String,
}

pub struct PromptBuilder {
    persona: String,
    owner_alias: String,
    style_profile_path: String,
}

impl PromptBuilder {
    pub fn new(persona: String, agent: &AgentConfig, owner: &OwnerConfig) -> Self {
        Self {
            persona,
            owner_alias: owner.alias.clone(),
            style_profile_path: agent.style_profile_path.clone(),
        }
    }

    /// Resolves the persona and builds the prompt builder.
    pub async fn from_config(agent: &AgentConfig, owner: &OwnerConfig) -> Self {
        let persona = load_persona(
            &agent.name,
            &agent.system_prompt,
            &agent.system_prompt_file,
        )
        .await;
        Self::new(persona, agent, owner)
    }

    /// Full system prompt for `mode`, including the current style profile.
    pub async fn system_prompt(&self, mode: Mode) -> String {
        let mut prompt = self.persona.clone();

        if let Some(rules) = self.mode_rules(mode) {
            prompt.push_str("\n\n");
            prompt.push_str(&rules);
        }

        if let Some(style) = self.style_profile().await {
            prompt.push_str("\n\n");
            prompt.push_str(&style);
        }

        prompt
    }

    fn mode_rules(&self, mode: Mode) -> Option<String> {
        match mode {
            Mode::Normal => None,
            Mode::DefendOwner => Some(format!(
                "РЕЖИМ: ЗАЩИТА. В разговоре задели {alias}. Встань на сторону {alias}, \
ответь коротко и остроумно. Без угроз и без оскорблений по признакам личности.",
                alias = self.owner_alias
            )),
        }
    }

    async fn style_profile(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.style_profile_path).await {
            Ok(content) => {
                let trimmed = content.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(e) => {
                debug!(path = %self.style_profile_path, error = %e, "style profile not loaded");
                None
            }
        }
    }
}

/// Messages for one generation call: system, the window (if any), then the
/// user turn. An empty `user_text` asks for an unprompted remark.
pub fn build_messages(
    system_prompt: &str,
    context: &str,
    user_text: &str,
    image: Option<ImageInput>,
) -> Vec<PromptMessage> {
    let mut messages = vec![PromptMessage::text(PromptRole::System, system_prompt)];

    if !context.trim().is_empty() {
        messages.push(PromptMessage::text(
            PromptRole::User,
            format!("{CONTEXT_HEADER}\n{context}"),
        ));
    }

    let user_text = user_text.trim();
    match image {
        Some(image) => {
            let caption = if user_text.is_empty() {
                DEFAULT_IMAGE_PROMPT
            } else {
                user_text
            };
            messages.push(PromptMessage {
                role: PromptRole::User,
                content: vec![
                    ContentPart::Text(caption.to_string()),
                    ContentPart::Image {
                        data: image.data,
                        mime_type: image.mime_type,
                    },
                ],
            });
        }
        None if user_text.is_empty() => {
            messages.push(PromptMessage::text(PromptRole::User, SPONTANEOUS_INSTRUCTION));
        }
        None => messages.push(PromptMessage::text(PromptRole::User, user_text)),
    }

    messages
}

/// Loads the persona following priority: file > inline > default.
pub async fn load_persona(
    agent_name: &str,
    inline_prompt: &Option<String>,
    prompt_file: &Option<String>,
) -> String {
    if let Some(file_path) = prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = file_path, "loaded persona from file");
                    return trimmed;
                }
            }
            Err(e) => {
                warn!(path = file_path, error = %e, "failed to read persona file, falling back");
            }
        }
    }

    if let Some(prompt) = inline_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    default_persona(agent_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(style_path: &str) -> PromptBuilder {
        let agent = AgentConfig {
            style_profile_path: style_path.to_string(),
            ..AgentConfig::default()
        };
        let owner = OwnerConfig {
            alias: "Шеф".into(),
            ..OwnerConfig::default()
        };
        PromptBuilder::new("persona".into(), &agent, &owner)
    }

    #[tokio::test]
    async fn missing_style_profile_is_ignored() {
        let prompt = builder("/nonexistent/style.txt").system_prompt(Mode::Normal).await;
        assert_eq!(prompt, "persona");
    }

    #[tokio::test]
    async fn style_profile_is_read_each_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.txt");
        let b = builder(path.to_str().unwrap());

        std::fs::write(&path, "стиль v1\n").unwrap();
        assert!(b.system_prompt(Mode::Normal).await.ends_with("стиль v1"));

        std::fs::write(&path, "стиль v2").unwrap();
        assert!(b.system_prompt(Mode::Normal).await.ends_with("стиль v2"));
    }

    #[tokio::test]
    async fn defend_mode_adds_owner_rules() {
        let prompt = builder("/nonexistent").system_prompt(Mode::DefendOwner).await;
        assert!(prompt.starts_with("persona\n\n"));
        assert!(prompt.contains("Шеф"));
    }

    #[test]
    fn messages_include_context_header() {
        let msgs = build_messages("sys", "вася: привет", "как дела", None);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].role, PromptRole::System);
        assert_eq!(
            msgs[1].content,
            vec![ContentPart::Text(format!("{CONTEXT_HEADER}\nвася: привет"))]
        );
        assert_eq!(msgs[2].content, vec![ContentPart::Text("как дела".into())]);
    }

    #[test]
    fn empty_user_text_asks_for_remark() {
        let msgs = build_messages("sys", "", "  ", None);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[1].content,
            vec![ContentPart::Text(SPONTANEOUS_INSTRUCTION.into())]
        );
    }

    #[test]
    fn image_turn_carries_bytes() {
        let msgs = build_messages(
            "sys",
            "",
            "",
            Some(ImageInput {
                data: vec![1, 2],
                mime_type: "image/jpeg".into(),
            }),
        );
        let last = msgs.last().unwrap();
        assert!(matches!(last.content[1], ContentPart::Image { .. }));
    }

    #[tokio::test]
    async fn persona_priority() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("persona.txt");
        std::fs::write(&file, "из файла").unwrap();
        let file = Some(file.to_string_lossy().into_owned());

        assert_eq!(load_persona("b", &Some("inline".into()), &file).await, "из файла");
        assert_eq!(load_persona("b", &Some("inline".into()), &None).await, "inline");
        assert!(load_persona("b", &None, &Some("/missing".into())).await.starts_with("Ты b"));
    }
}
