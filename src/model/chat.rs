use super::agent::AfterWork;
use super::draft::ChatDraft;
use super::message::Message;
use super::methods::MethodSlot;
use super::summary::Summary;
use crate::error::{EntityKind, ValidationError};
use serde_json::{Map, Value};

/// Messages sent when a chat runs as a nested chat.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedChatTexts {
    pub message: Option<Message>,
    pub reply: Option<Message>,
}

/// A directed conversation between two agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source: String,
    pub target: String,
    pub real_source: Option<String>,
    pub real_target: Option<String>,
    pub order: i32,
    pub position: i32,
    pub clear_history: Option<bool>,
    pub max_turns: Option<u32>,
    pub silent: Option<bool>,
    pub message: Message,
    pub summary: Summary,
    pub nested_chat: NestedChatTexts,
    pub prerequisites: Vec<String>,
    pub after_work: Option<AfterWork>,
    pub context_variables: Map<String, Value>,
    pub max_rounds: u32,
}

impl Chat {
    pub fn build(draft: ChatDraft) -> Result<Self, ValidationError> {
        let id = draft.id;
        let data = draft.data;
        let message = Message::build(data.message.into_draft(), MethodSlot::CallableMessage, &id)?;
        let summary = Summary::build(data.summary, &id)?;
        let nested_chat = NestedChatTexts {
            message: data
                .nested_chat
                .message
                .map(|m| Message::build(m.into_draft(), MethodSlot::NestedChatMessage, &id))
                .transpose()?,
            reply: data
                .nested_chat
                .reply
                .map(|m| Message::build(m.into_draft(), MethodSlot::NestedChatReply, &id))
                .transpose()?,
        };
        let after_work = data
            .after_work
            .map(|a| AfterWork::build(a, EntityKind::Chat, &id))
            .transpose()?;
        Ok(Self {
            name: data.name,
            description: data.description,
            source: data.source,
            target: data.target,
            real_source: data.real_source.filter(|s| !s.is_empty()),
            real_target: data.real_target.filter(|t| !t.is_empty()),
            order: data.order,
            position: data.position,
            clear_history: data.clear_history,
            max_turns: data.max_turns,
            silent: data.silent,
            message,
            summary,
            nested_chat,
            prerequisites: data.prerequisites,
            after_work,
            context_variables: data.context_variables,
            max_rounds: data.max_rounds,
            id,
        })
    }

    /// The agent shown as the sender in the generated program.
    pub fn sender_id(&self) -> &str {
        self.real_source.as_deref().unwrap_or(&self.source)
    }

    /// The agent shown as the recipient in the generated program.
    pub fn recipient_id(&self) -> &str {
        self.real_target.as_deref().unwrap_or(&self.target)
    }

    pub fn connects(&self, agent_id: &str) -> bool {
        self.source == agent_id || self.target == agent_id
    }
}
