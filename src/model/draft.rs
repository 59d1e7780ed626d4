//! Raw input records, deserialized straight from the flow description.
//!
//! Drafts carry no invariants. Every multi-word field accepts both its
//! `snake_case` and `camelCase` spelling; unknown fields are ignored.
//! `Flow::build` turns a [`FlowDraft`] into a validated `Flow`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FlowDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(alias = "updatedAt")]
    pub updated_at: String,
    pub data: FlowDataDraft,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlowDataDraft {
    pub agents: Vec<AgentDraft>,
    pub models: Vec<ModelDraft>,
    pub skills: Vec<SkillDraft>,
    pub chats: Vec<ChatDraft>,
    #[serde(alias = "isAsync")]
    pub is_async: bool,
    #[serde(alias = "cacheSeed")]
    pub cache_seed: Option<u32>,
}

impl Default for FlowDataDraft {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            models: Vec::new(),
            skills: Vec::new(),
            chats: Vec::new(),
            is_async: false,
            cache_seed: Some(42),
        }
    }
}

// --- Agents ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    #[serde(alias = "agentType")]
    pub agent_type: String,
    pub data: AgentDataDraft,
}

/// The union of every agent variant's fields; each variant reads its own.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentDataDraft {
    #[serde(alias = "systemMessage")]
    pub system_message: Option<String>,
    #[serde(alias = "humanInputMode")]
    pub human_input_mode: Option<String>,
    #[serde(alias = "codeExecutionConfig")]
    pub code_execution_config: CodeExecutionDraft,
    #[serde(alias = "agentDefaultAutoReply")]
    pub agent_default_auto_reply: Option<String>,
    #[serde(alias = "maxConsecutiveAutoReply")]
    pub max_consecutive_auto_reply: Option<u32>,
    pub termination: TerminationDraft,
    #[serde(alias = "modelIds")]
    pub model_ids: Vec<String>,
    pub skills: Vec<LinkedSkillDraft>,
    #[serde(alias = "nestedChats")]
    pub nested_chats: Vec<NestedChatDraft>,

    // assistant
    #[serde(alias = "isMultimodal")]
    pub is_multimodal: bool,

    // rag user
    #[serde(alias = "retrieveConfig")]
    pub retrieve_config: Option<RetrieveConfigDraft>,

    // group manager
    #[serde(alias = "maxRound")]
    pub max_round: Option<u32>,
    #[serde(alias = "adminName")]
    pub admin_name: Option<String>,
    pub speakers: Option<SpeakersDraft>,
    #[serde(alias = "enableClearHistory")]
    pub enable_clear_history: Option<bool>,
    #[serde(alias = "sendIntroductions")]
    pub send_introductions: bool,

    // swarm
    pub functions: Vec<String>,
    #[serde(alias = "updateAgentStateBeforeReply")]
    pub update_agent_state_before_reply: Vec<UpdateSystemMessageDraft>,
    #[serde(alias = "handOffs")]
    pub hand_offs: Vec<HandOffDraft>,

    // reasoning
    pub verbose: bool,
    #[serde(alias = "reasonConfig")]
    pub reason_config: Option<ReasonConfigDraft>,
}

/// `false` or a configuration record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CodeExecutionDraft {
    Flag(bool),
    Config(CodeExecutionConfigDraft),
}

impl Default for CodeExecutionDraft {
    fn default() -> Self {
        CodeExecutionDraft::Flag(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeExecutionConfigDraft {
    #[serde(alias = "workDir")]
    pub work_dir: Option<String>,
    #[serde(alias = "useDocker")]
    pub use_docker: Option<bool>,
    #[serde(alias = "lastNMessages")]
    pub last_n_messages: Option<u32>,
    pub timeout: Option<u32>,
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminationDraft {
    #[serde(rename = "type")]
    pub kind: String,
    pub keywords: Vec<String>,
    pub criterion: Option<String>,
    #[serde(alias = "methodContent")]
    pub method_content: Option<String>,
}

impl Default for TerminationDraft {
    fn default() -> Self {
        Self {
            kind: "none".to_string(),
            keywords: Vec::new(),
            criterion: None,
            method_content: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkedSkillDraft {
    pub id: String,
    #[serde(alias = "executorId")]
    pub executor_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NestedChatDraft {
    #[serde(alias = "triggeredBy")]
    pub triggered_by: Vec<String>,
    pub messages: Vec<NestedChatMessageDraft>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NestedChatMessageDraft {
    pub id: String,
    #[serde(alias = "isReply")]
    pub is_reply: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrieveConfigDraft {
    pub task: Option<String>,
    #[serde(alias = "docsPath")]
    pub docs_path: Vec<String>,
    #[serde(alias = "collectionName")]
    pub collection_name: Option<String>,
    #[serde(alias = "nResults")]
    pub n_results: Option<u32>,
    #[serde(alias = "distanceThreshold")]
    pub distance_threshold: Option<f64>,
    #[serde(alias = "chunkTokenSize")]
    pub chunk_token_size: Option<u32>,
    #[serde(alias = "getOrCreate")]
    pub get_or_create: Option<bool>,
    pub model: Option<String>,
    #[serde(alias = "customizedPrompt")]
    pub customized_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpeakersDraft {
    #[serde(alias = "selectionMethod")]
    pub selection_method: Option<String>,
    #[serde(alias = "selectionCustomMethod")]
    pub selection_custom_method: Option<String>,
    #[serde(alias = "selectionMode")]
    pub selection_mode: Option<String>,
    #[serde(alias = "allowRepeat")]
    pub allow_repeat: Option<AllowRepeatDraft>,
    #[serde(alias = "maxRetriesForSelecting")]
    pub max_retries_for_selecting: Option<u32>,
    #[serde(alias = "allowedOrDisallowedTransitions")]
    pub allowed_or_disallowed_transitions: BTreeMap<String, Vec<String>>,
    #[serde(alias = "transitionsType")]
    pub transitions_type: Option<String>,
}

/// `true`/`false` or the ids of the agents allowed to speak twice in a row.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AllowRepeatDraft {
    Flag(bool),
    Agents(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateSystemMessageDraft {
    #[serde(alias = "updateFunctionType")]
    pub update_function_type: String,
    #[serde(alias = "updateFunction")]
    pub update_function: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HandOffDraft {
    OnCondition(OnConditionDraft),
    AfterWork(AfterWorkDraft),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnConditionDraft {
    pub target: String,
    pub condition: String,
    #[serde(default)]
    pub available: Option<String>,
    #[serde(default, alias = "availableCheckType")]
    pub available_check_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfterWorkDraft {
    #[serde(alias = "recipientType")]
    pub recipient_type: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReasonConfigDraft {
    pub method: Option<String>,
    #[serde(alias = "maxDepth")]
    pub max_depth: Option<u32>,
    #[serde(alias = "forestSize")]
    pub forest_size: Option<u32>,
    #[serde(alias = "ratingScale")]
    pub rating_scale: Option<u32>,
    #[serde(alias = "beamSize")]
    pub beam_size: Option<u32>,
    #[serde(alias = "answerApproach")]
    pub answer_approach: Option<String>,
    pub nsim: Option<u32>,
    #[serde(alias = "explorationConstant")]
    pub exploration_constant: Option<f64>,
}

// --- Models and skills ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub data: ModelDataDraft,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelDataDraft {
    #[serde(alias = "apiType")]
    pub api_type: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(alias = "apiKeyEnv")]
    pub api_key_env: Option<String>,
    #[serde(alias = "apiVersion")]
    pub api_version: Option<String>,
    pub temperature: Option<f64>,
    #[serde(alias = "topP")]
    pub top_p: Option<f64>,
    #[serde(alias = "maxTokens")]
    pub max_tokens: Option<u32>,
    pub price: Option<PriceDraft>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceDraft {
    #[serde(alias = "promptPricePer1k")]
    pub prompt_price_per_1k: Option<f64>,
    #[serde(alias = "completionTokenPricePer1k")]
    pub completion_token_price_per_1k: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkillDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub data: SkillDataDraft,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SkillDataDraft {
    pub content: String,
    pub secrets: BTreeMap<String, String>,
    #[serde(alias = "skillType")]
    pub skill_type: Option<String>,
}

// --- Chats ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatDraft {
    pub id: String,
    pub data: ChatDataDraft,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatDataDraft {
    pub name: String,
    pub description: String,
    pub source: String,
    pub target: String,
    #[serde(alias = "realSource")]
    pub real_source: Option<String>,
    #[serde(alias = "realTarget")]
    pub real_target: Option<String>,
    pub order: i32,
    pub position: i32,
    #[serde(alias = "clearHistory")]
    pub clear_history: Option<bool>,
    #[serde(alias = "maxTurns")]
    pub max_turns: Option<u32>,
    pub silent: Option<bool>,
    pub message: MessageInput,
    pub summary: SummaryDraft,
    #[serde(alias = "nestedChat")]
    pub nested_chat: NestedChatTextsDraft,
    pub prerequisites: Vec<String>,
    #[serde(alias = "afterWork")]
    pub after_work: Option<AfterWorkDraft>,
    #[serde(alias = "contextVariables")]
    pub context_variables: Map<String, Value>,
    #[serde(alias = "maxRounds")]
    pub max_rounds: u32,
}

impl Default for ChatDataDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            source: String::new(),
            target: String::new(),
            real_source: None,
            real_target: None,
            order: -1,
            position: -1,
            clear_history: None,
            max_turns: None,
            silent: None,
            message: MessageInput::default(),
            summary: SummaryDraft::default(),
            nested_chat: NestedChatTextsDraft::default(),
            prerequisites: Vec::new(),
            after_work: None,
            context_variables: Map::new(),
            max_rounds: 20,
        }
    }
}

/// A message is either a bare string or a full record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageInput {
    Text(String),
    Full(MessageDraft),
}

impl Default for MessageInput {
    fn default() -> Self {
        MessageInput::Full(MessageDraft::default())
    }
}

impl MessageInput {
    pub fn into_draft(self) -> MessageDraft {
        match self {
            MessageInput::Text(content) => MessageDraft {
                kind: "string".to_string(),
                content: Some(content),
                ..MessageDraft::default()
            },
            MessageInput::Full(draft) => draft,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageDraft {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "useCarryover")]
    pub use_carryover: bool,
    pub content: Option<String>,
    pub context: Map<String, Value>,
}

impl Default for MessageDraft {
    fn default() -> Self {
        Self {
            kind: "none".to_string(),
            use_carryover: false,
            content: None,
            context: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryDraft {
    pub method: Option<String>,
    pub prompt: Option<String>,
    pub args: BTreeMap<String, String>,
}

impl Default for SummaryDraft {
    fn default() -> Self {
        Self {
            method: Some("last_msg".to_string()),
            prompt: None,
            args: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NestedChatTextsDraft {
    pub message: Option<MessageInput>,
    pub reply: Option<MessageInput>,
}
