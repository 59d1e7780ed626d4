use super::draft::MessageDraft;
use super::methods::{MethodSlot, ValidatedMethod};
use crate::error::{EntityKind, SignatureError, StructuralValidationError, ValidationError};
use serde_json::{Map, Value};

/// Where a method message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Written by the flow author.
    Snippet,
    /// Generated from a text message that uses the carryover.
    Carryover { text: String },
    /// Generated from a RAG message generator that uses the carryover.
    RagCarryover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    Method {
        method: ValidatedMethod,
        origin: MessageOrigin,
    },
    /// The sender's RAG `message_generator`.
    Generator,
    None,
}

/// A chat payload plus the extra context passed along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub context: Map<String, Value>,
}

impl Message {
    pub fn none() -> Self {
        Self {
            kind: MessageKind::None,
            context: Map::new(),
        }
    }

    /// Builds a message for `slot`, rewriting carryover variants into methods.
    pub fn build(
        draft: MessageDraft,
        slot: MethodSlot,
        chat_id: &str,
    ) -> Result<Self, ValidationError> {
        let content = draft.content.unwrap_or_default();
        let kind = match draft.kind.as_str() {
            "string" if draft.use_carryover => carryover::rewrite_text(&content)?,
            "string" => MessageKind::Text(content),
            "rag_message_generator" if draft.use_carryover => carryover::rewrite_rag()?,
            "rag_message_generator" => MessageKind::Generator,
            "method" => {
                if content.trim().is_empty() {
                    return Err(SignatureError::EmptyBody {
                        function: slot.function_name().to_string(),
                    }
                    .into());
                }
                MessageKind::Method {
                    method: ValidatedMethod::parse(slot, &content)?,
                    origin: MessageOrigin::Snippet,
                }
            }
            "none" => MessageKind::None,
            other => {
                return Err(StructuralValidationError::InvalidField {
                    kind: EntityKind::Chat,
                    id: chat_id.to_string(),
                    field: "message.type".to_string(),
                    value: other.to_string(),
                }
                .into());
            }
        };
        Ok(Self {
            kind,
            context: draft.context,
        })
    }
}

/// The explicit rewrite of carryover messages into `callable_message` methods.
pub mod carryover {
    use super::{MessageKind, MessageOrigin};
    use crate::error::ValidationError;
    use crate::model::methods::{MethodSlot, ValidatedMethod};
    use crate::snippet::literal::string_literal;

    const LAST_CARRYOVER: &str = r#"    carryover = context.get("carryover", "")
    if isinstance(carryover, list):
        carryover = carryover[-1]
    if not isinstance(carryover, str):
        carryover = """#;

    /// A text message that appends the last carryover to `text`, or sends the
    /// carryover alone when `text` is empty.
    pub fn rewrite_text(text: &str) -> Result<MessageKind, ValidationError> {
        let tail = if text.is_empty() {
            "    return carryover\n".to_string()
        } else {
            format!(
                "    final_message = {} + carryover\n    return final_message\n",
                string_literal(text)
            )
        };
        let code = format!(
            "def callable_message(sender, recipient, context):\n    \"\"\"Get the message to send using the last carryover.\"\"\"\n{}\n{}",
            LAST_CARRYOVER, tail
        );
        Ok(MessageKind::Method {
            method: ValidatedMethod::parse(MethodSlot::CallableMessage, &code)?,
            origin: MessageOrigin::Carryover {
                text: text.to_string(),
            },
        })
    }

    /// The sender's RAG message generator output followed by the last carryover.
    pub fn rewrite_rag() -> Result<MessageKind, ValidationError> {
        let code = format!(
            "def callable_message(sender, recipient, context):\n    \"\"\"Get the message using the RAG message generator method.\"\"\"\n{}\n    message = sender.message_generator(sender, recipient, context)\n    if carryover:\n        message += carryover\n    return message\n",
            LAST_CARRYOVER
        );
        Ok(MessageKind::Method {
            method: ValidatedMethod::parse(MethodSlot::CallableMessage, &code)?,
            origin: MessageOrigin::RagCarryover,
        })
    }
}
