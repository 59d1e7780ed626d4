//! Contracts for the functions a flow may embed, and their validated form.

use crate::error::ValidationError;
use crate::snippet::{ImportStmt, Signature, extract_function, render_function};

/// Every place in a flow that accepts an embedded function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSlot {
    CallableMessage,
    NestedChatMessage,
    NestedChatReply,
    IsTerminationMessage,
    CustomSpeakerSelection,
    UpdateSystemMessage,
    OnConditionAvailable,
    AfterWork,
}

const MESSAGE_ARGS: &[&str] = &["sender", "recipient", "context"];
const MESSAGE_TYPES: &[&str] = &["ConversableAgent", "ConversableAgent", "Dict[str, Any]"];
const NESTED_ARGS: &[&str] = &["recipient", "messages", "sender", "config"];
const NESTED_TYPES: &[&str] = &[
    "ConversableAgent",
    "List[Dict[str, Any]]",
    "ConversableAgent",
    "Dict[str, Any]",
];
const AGENT_MESSAGES_ARGS: &[&str] = &["agent", "messages"];
const AGENT_MESSAGES_TYPES: &[&str] = &["ConversableAgent", "List[Dict[str, Any]]"];

impl MethodSlot {
    /// The function name the snippet must define.
    pub fn function_name(self) -> &'static str {
        match self {
            MethodSlot::CallableMessage => "callable_message",
            MethodSlot::NestedChatMessage => "nested_chat_message",
            MethodSlot::NestedChatReply => "nested_chat_reply",
            MethodSlot::IsTerminationMessage => "is_termination_message",
            MethodSlot::CustomSpeakerSelection => "custom_speaker_selection",
            MethodSlot::UpdateSystemMessage => "custom_update_system_message",
            MethodSlot::OnConditionAvailable => "custom_on_condition_available",
            MethodSlot::AfterWork => "custom_after_work",
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            MethodSlot::CallableMessage => MESSAGE_ARGS,
            MethodSlot::NestedChatMessage | MethodSlot::NestedChatReply => NESTED_ARGS,
            MethodSlot::IsTerminationMessage => &["message"],
            MethodSlot::CustomSpeakerSelection => &["last_speaker", "groupchat"],
            MethodSlot::UpdateSystemMessage | MethodSlot::OnConditionAvailable => {
                AGENT_MESSAGES_ARGS
            }
            MethodSlot::AfterWork => &["last_speaker", "messages", "groupchat"],
        }
    }

    pub fn arg_types(self) -> &'static [&'static str] {
        match self {
            MethodSlot::CallableMessage => MESSAGE_TYPES,
            MethodSlot::NestedChatMessage | MethodSlot::NestedChatReply => NESTED_TYPES,
            MethodSlot::IsTerminationMessage => &["Dict[str, Any]"],
            MethodSlot::CustomSpeakerSelection => &["ConversableAgent", "GroupChat"],
            MethodSlot::UpdateSystemMessage | MethodSlot::OnConditionAvailable => {
                AGENT_MESSAGES_TYPES
            }
            MethodSlot::AfterWork => &["ConversableAgent", "List[Dict[str, Any]]", "GroupChat"],
        }
    }

    pub fn return_type(self) -> &'static str {
        match self {
            MethodSlot::CallableMessage
            | MethodSlot::NestedChatMessage
            | MethodSlot::NestedChatReply => "Union[Dict[str, Any], str]",
            MethodSlot::IsTerminationMessage | MethodSlot::OnConditionAvailable => "bool",
            MethodSlot::CustomSpeakerSelection => "Optional[Union[Agent, str]]",
            MethodSlot::UpdateSystemMessage => "str",
            MethodSlot::AfterWork => "Union[AfterWorkOption, ConversableAgent, str]",
        }
    }
}

/// An embedded function that passed its contract, reduced to its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMethod {
    slot: MethodSlot,
    body: String,
    imports: Vec<ImportStmt>,
}

impl ValidatedMethod {
    /// Validates `code` against the slot's contract and keeps the extracted body.
    pub fn parse(slot: MethodSlot, code: &str) -> Result<Self, ValidationError> {
        let extracted = extract_function(code, slot.function_name(), slot.args())?;
        Ok(Self {
            slot,
            body: extracted.body,
            imports: extracted.imports,
        })
    }

    pub fn slot(&self) -> MethodSlot {
        self.slot
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Module-level imports of the original snippet.
    pub fn imports(&self) -> &[ImportStmt] {
        &self.imports
    }

    /// Renders the method under `function_name` with the slot's signature.
    pub fn render(&self, function_name: &str, types_as_comments: bool) -> String {
        let signature = Signature {
            name: function_name,
            args: self.slot.args(),
            arg_types: self.slot.arg_types(),
            return_type: self.slot.return_type(),
        };
        render_function(signature, &self.body, types_as_comments)
    }
}
