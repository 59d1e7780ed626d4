use super::draft::SummaryDraft;
use crate::error::{EntityKind, StructuralValidationError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMethod {
    None,
    LastMessage,
    Reflection,
}

impl SummaryMethod {
    /// The runtime's name for the method; `None` has no name.
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            SummaryMethod::None => None,
            SummaryMethod::LastMessage => Some("last_msg"),
            SummaryMethod::Reflection => Some("reflection_with_llm"),
        }
    }
}

/// How a finished chat is summarized for the chats that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub method: SummaryMethod,
    pub prompt: Option<String>,
    pub args: BTreeMap<String, String>,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            method: SummaryMethod::LastMessage,
            prompt: None,
            args: BTreeMap::new(),
        }
    }
}

impl Summary {
    pub fn build(draft: SummaryDraft, chat_id: &str) -> Result<Self, StructuralValidationError> {
        let method = match draft.method.as_deref() {
            None | Some("none") => SummaryMethod::None,
            Some("last_msg") | Some("lastMsg") => SummaryMethod::LastMessage,
            Some("reflection_with_llm") | Some("reflectionWithLlm") => SummaryMethod::Reflection,
            Some(other) => {
                return Err(StructuralValidationError::InvalidField {
                    kind: EntityKind::Chat,
                    id: chat_id.to_string(),
                    field: "summary.method".to_string(),
                    value: other.to_string(),
                });
            }
        };
        Ok(Self {
            method,
            prompt: draft.prompt.filter(|p| !p.is_empty()),
            args: draft.args,
        })
    }

    /// The `summary_args` entries: the prompt first, then the argument mapping.
    /// Empty unless the summary reflects with the LLM.
    pub fn summary_args(&self) -> Vec<(&str, &str)> {
        if self.method != SummaryMethod::Reflection {
            return Vec::new();
        }
        self.prompt
            .iter()
            .map(|p| ("summary_prompt", p.as_str()))
            .chain(
                self.args
                    .iter()
                    .filter(|(k, _)| k.as_str() != "summary_prompt")
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )
            .collect()
    }
}
