//! The validated graph model: agents, chats, models, skills and the flow
//! that owns them.

pub mod agent;
pub mod chat;
pub mod draft;
pub mod flow;
pub mod llm;
pub mod message;
pub mod methods;
pub mod skill;
pub mod summary;

pub use agent::{
    AfterWork, AfterWorkOption, Agent, AgentCommon, AgentKind, AgentVariant, AllowRepeat,
    CodeExecution, HandOff, HumanInputMode, KeywordCriterion, OnConditionAvailable,
    SpeakerSelection, TerminationPolicy, UpdateSystemMessage,
};
pub use chat::{Chat, NestedChatTexts};
pub use draft::FlowDraft;
pub use flow::Flow;
pub use llm::{ApiType, LlmModel};
pub use message::{Message, MessageKind, MessageOrigin};
pub use methods::{MethodSlot, ValidatedMethod};
pub use skill::{Skill, SkillKind};
pub use summary::{Summary, SummaryMethod};
