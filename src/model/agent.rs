//! Agents and their variant records.

use super::draft::{
    AfterWorkDraft, AgentDataDraft, AgentDraft, AllowRepeatDraft, CodeExecutionDraft, HandOffDraft,
    RetrieveConfigDraft, ReasonConfigDraft, SpeakersDraft, TerminationDraft,
};
use super::methods::{MethodSlot, ValidatedMethod};
use crate::error::{EntityKind, StructuralValidationError, ValidationError};
use std::collections::BTreeMap;

/// The agent variant, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentVariant {
    User,
    Assistant,
    RagUser,
    GroupManager,
    Swarm,
    Reasoning,
}

impl AgentVariant {
    pub fn parse(tag: &str) -> Option<Self> {
        let variant = match tag {
            "user" | "user_proxy" => AgentVariant::User,
            "assistant" => AgentVariant::Assistant,
            "rag_user" | "ragUser" => AgentVariant::RagUser,
            "manager" | "group_manager" | "groupManager" => AgentVariant::GroupManager,
            "swarm" => AgentVariant::Swarm,
            "reasoning" => AgentVariant::Reasoning,
            _ => return None,
        };
        Some(variant)
    }

    /// User-facing agents: plain users and RAG users.
    pub fn is_user(self) -> bool {
        matches!(self, AgentVariant::User | AgentVariant::RagUser)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanInputMode {
    Always,
    Never,
    Terminate,
}

impl HumanInputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HumanInputMode::Always => "ALWAYS",
            HumanInputMode::Never => "NEVER",
            HumanInputMode::Terminate => "TERMINATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExecution {
    pub work_dir: Option<String>,
    pub use_docker: bool,
    pub last_n_messages: Option<u32>,
    pub timeout: Option<u32>,
    /// Skill ids exposed to the executor.
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCriterion {
    Found,
    Ending,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationPolicy {
    None,
    Keyword {
        keywords: Vec<String>,
        criterion: KeywordCriterion,
    },
    Method(ValidatedMethod),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedSkill {
    pub id: String,
    pub executor_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedChatMessageRef {
    pub id: String,
    pub is_reply: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedChatDecl {
    pub triggered_by: Vec<String>,
    pub messages: Vec<NestedChatMessageRef>,
}

/// Attributes shared by every agent variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommon {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub system_message: Option<String>,
    pub human_input_mode: HumanInputMode,
    pub max_consecutive_auto_reply: Option<u32>,
    pub default_auto_reply: Option<String>,
    pub code_execution: Option<CodeExecution>,
    pub termination: TerminationPolicy,
    pub model_ids: Vec<String>,
    pub skills: Vec<LinkedSkill>,
    pub nested_chats: Vec<NestedChatDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveConfig {
    pub task: Option<String>,
    pub docs_path: Vec<String>,
    pub collection_name: Option<String>,
    pub n_results: Option<u32>,
    pub distance_threshold: Option<f64>,
    pub chunk_token_size: Option<u32>,
    pub get_or_create: Option<bool>,
    pub model: Option<String>,
    pub customized_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerSelection {
    Auto,
    Manual,
    Random,
    RoundRobin,
    Custom(ValidatedMethod),
}

impl SpeakerSelection {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            SpeakerSelection::Auto => Some("auto"),
            SpeakerSelection::Manual => Some("manual"),
            SpeakerSelection::Random => Some("random"),
            SpeakerSelection::RoundRobin => Some("round_robin"),
            SpeakerSelection::Custom(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowRepeat {
    All(bool),
    /// Only these agent ids may speak twice in a row.
    Only(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionsKind {
    Allowed,
    Disallowed,
}

impl TransitionsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionsKind::Allowed => "allowed",
            TransitionsKind::Disallowed => "disallowed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTransitions {
    pub kind: TransitionsKind,
    /// Agent id to the agent ids it may (or may not) hand the floor to.
    pub map: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerConfig {
    pub selection: SpeakerSelection,
    pub allow_repeat: AllowRepeat,
    pub max_retries_for_selecting: Option<u32>,
    pub transitions: Option<SpeakerTransitions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSystemMessage {
    Text(String),
    Callable(ValidatedMethod),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnConditionAvailable {
    None,
    /// Name of a context variable that must be truthy.
    Variable(String),
    Callable(ValidatedMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterWorkOption {
    Terminate,
    RevertToUser,
    Stay,
    SwarmManager,
}

impl AfterWorkOption {
    pub fn as_str(self) -> &'static str {
        match self {
            AfterWorkOption::Terminate => "TERMINATE",
            AfterWorkOption::RevertToUser => "REVERT_TO_USER",
            AfterWorkOption::Stay => "STAY",
            AfterWorkOption::SwarmManager => "SWARM_MANAGER",
        }
    }
}

/// Where a swarm conversation goes when an agent has nothing more to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterWork {
    Option(AfterWorkOption),
    Agent(String),
    Callable(ValidatedMethod),
}

impl AfterWork {
    pub fn build(
        draft: AfterWorkDraft,
        kind: EntityKind,
        owner_id: &str,
    ) -> Result<Self, ValidationError> {
        let invalid = |field: &str, value: &str| StructuralValidationError::InvalidField {
            kind,
            id: owner_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        };
        match draft.recipient_type.as_str() {
            "option" => {
                let option = match draft.recipient.as_str() {
                    "TERMINATE" => AfterWorkOption::Terminate,
                    "REVERT_TO_USER" => AfterWorkOption::RevertToUser,
                    "STAY" => AfterWorkOption::Stay,
                    "SWARM_MANAGER" => AfterWorkOption::SwarmManager,
                    other => return Err(invalid("after_work.recipient", other).into()),
                };
                Ok(AfterWork::Option(option))
            }
            "agent" => Ok(AfterWork::Agent(draft.recipient)),
            "callable" => Ok(AfterWork::Callable(ValidatedMethod::parse(
                MethodSlot::AfterWork,
                &draft.recipient,
            )?)),
            other => Err(invalid("after_work.recipient_type", other).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandOff {
    OnCondition {
        target: String,
        condition: String,
        available: OnConditionAvailable,
    },
    AfterWork(AfterWork),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasonConfig {
    pub method: Option<String>,
    pub max_depth: Option<u32>,
    pub forest_size: Option<u32>,
    pub rating_scale: Option<u32>,
    pub beam_size: Option<u32>,
    pub answer_approach: Option<String>,
    pub nsim: Option<u32>,
    pub exploration_constant: Option<f64>,
}

/// Variant-specific agent data.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentKind {
    User,
    Assistant {
        is_multimodal: bool,
    },
    RagUser {
        retrieve_config: RetrieveConfig,
    },
    GroupManager {
        max_round: Option<u32>,
        admin_name: Option<String>,
        speakers: SpeakerConfig,
        enable_clear_history: Option<bool>,
        send_introductions: bool,
    },
    Swarm {
        /// Skill ids callable by the agent.
        functions: Vec<String>,
        update_system_message: Vec<UpdateSystemMessage>,
        hand_offs: Vec<HandOff>,
    },
    Reasoning {
        verbose: bool,
        reason_config: ReasonConfig,
    },
}

impl AgentKind {
    pub fn variant(&self) -> AgentVariant {
        match self {
            AgentKind::User => AgentVariant::User,
            AgentKind::Assistant { .. } => AgentVariant::Assistant,
            AgentKind::RagUser { .. } => AgentVariant::RagUser,
            AgentKind::GroupManager { .. } => AgentVariant::GroupManager,
            AgentKind::Swarm { .. } => AgentVariant::Swarm,
            AgentKind::Reasoning { .. } => AgentVariant::Reasoning,
        }
    }
}

/// A participant node of the flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub common: AgentCommon,
    pub kind: AgentKind,
}

impl Agent {
    pub fn id(&self) -> &str {
        &self.common.id
    }

    pub fn name(&self) -> &str {
        &self.common.name
    }

    pub fn variant(&self) -> AgentVariant {
        self.kind.variant()
    }

    pub fn is_swarm(&self) -> bool {
        self.variant() == AgentVariant::Swarm
    }

    pub fn build(draft: AgentDraft) -> Result<Self, ValidationError> {
        let variant = AgentVariant::parse(&draft.agent_type)
            .ok_or_else(|| invalid_field(&draft.id, "agent_type", &draft.agent_type))?;
        let data = draft.data;
        let human_input_mode = match data.human_input_mode.as_deref() {
            None => match variant {
                AgentVariant::User | AgentVariant::RagUser => HumanInputMode::Always,
                _ => HumanInputMode::Never,
            },
            Some("ALWAYS") => HumanInputMode::Always,
            Some("NEVER") => HumanInputMode::Never,
            Some("TERMINATE") => HumanInputMode::Terminate,
            Some(other) => return Err(invalid_field(&draft.id, "human_input_mode", other).into()),
        };
        let termination = build_termination(data.termination.clone(), &draft.id)?;
        let kind = build_kind(variant, &data, &draft.id)?;

        let code_execution = match data.code_execution_config {
            CodeExecutionDraft::Flag(_) => None,
            CodeExecutionDraft::Config(config) => Some(CodeExecution {
                work_dir: config.work_dir,
                use_docker: config.use_docker.unwrap_or(false),
                last_n_messages: config.last_n_messages,
                timeout: config.timeout,
                functions: config.functions,
            }),
        };

        let common = AgentCommon {
            id: draft.id,
            name: draft.name,
            description: draft.description,
            tags: draft.tags,
            requirements: draft.requirements,
            system_message: data.system_message.filter(|m| !m.is_empty()),
            human_input_mode,
            max_consecutive_auto_reply: data.max_consecutive_auto_reply,
            default_auto_reply: data.agent_default_auto_reply.filter(|r| !r.is_empty()),
            code_execution,
            termination,
            model_ids: data.model_ids,
            skills: data
                .skills
                .into_iter()
                .map(|s| LinkedSkill {
                    id: s.id,
                    executor_id: s.executor_id,
                })
                .collect(),
            nested_chats: data
                .nested_chats
                .into_iter()
                .map(|n| NestedChatDecl {
                    triggered_by: n.triggered_by,
                    messages: n
                        .messages
                        .into_iter()
                        .map(|m| NestedChatMessageRef {
                            id: m.id,
                            is_reply: m.is_reply,
                        })
                        .collect(),
                })
                .collect(),
        };
        Ok(Self { common, kind })
    }

    /// Every agent id this agent's configuration points at.
    pub fn referenced_agents(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        ids.extend(self.common.skills.iter().map(|s| s.executor_id.as_str()));
        for nested in &self.common.nested_chats {
            ids.extend(nested.triggered_by.iter().map(String::as_str));
        }
        match &self.kind {
            AgentKind::Swarm { hand_offs, .. } => {
                for hand_off in hand_offs {
                    match hand_off {
                        HandOff::OnCondition { target, .. } => ids.push(target),
                        HandOff::AfterWork(AfterWork::Agent(target)) => ids.push(target),
                        HandOff::AfterWork(_) => {}
                    }
                }
            }
            AgentKind::GroupManager { speakers, .. } => {
                if let Some(transitions) = &speakers.transitions {
                    for (from, to) in &transitions.map {
                        ids.push(from);
                        ids.extend(to.iter().map(String::as_str));
                    }
                }
                if let AllowRepeat::Only(agents) = &speakers.allow_repeat {
                    ids.extend(agents.iter().map(String::as_str));
                }
            }
            _ => {}
        }
        ids
    }

    /// Skill ids used outside the linked-skill list.
    pub fn referenced_skills(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        if let Some(code_execution) = &self.common.code_execution {
            ids.extend(code_execution.functions.iter().map(String::as_str));
        }
        if let AgentKind::Swarm { functions, .. } = &self.kind {
            ids.extend(functions.iter().map(String::as_str));
        }
        ids
    }
}

fn invalid_field(agent_id: &str, field: &str, value: &str) -> StructuralValidationError {
    StructuralValidationError::InvalidField {
        kind: EntityKind::Agent,
        id: agent_id.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn build_termination(
    draft: TerminationDraft,
    agent_id: &str,
) -> Result<TerminationPolicy, ValidationError> {
    match draft.kind.as_str() {
        "none" | "" => Ok(TerminationPolicy::None),
        "keyword" => {
            let criterion = match draft.criterion.as_deref() {
                None | Some("found") => KeywordCriterion::Found,
                Some("ending") => KeywordCriterion::Ending,
                Some("exact") => KeywordCriterion::Exact,
                Some(other) => return Err(invalid_field(agent_id, "termination.criterion", other).into()),
            };
            let keywords: Vec<String> = draft.keywords.into_iter().filter(|k| !k.is_empty()).collect();
            if keywords.is_empty() {
                return Ok(TerminationPolicy::None);
            }
            Ok(TerminationPolicy::Keyword {
                keywords,
                criterion,
            })
        }
        "method" => {
            let content = draft.method_content.unwrap_or_default();
            Ok(TerminationPolicy::Method(ValidatedMethod::parse(
                MethodSlot::IsTerminationMessage,
                &content,
            )?))
        }
        other => Err(invalid_field(agent_id, "termination.type", other).into()),
    }
}

fn build_kind(
    variant: AgentVariant,
    data: &AgentDataDraft,
    agent_id: &str,
) -> Result<AgentKind, ValidationError> {
    let kind = match variant {
        AgentVariant::User => AgentKind::User,
        AgentVariant::Assistant => AgentKind::Assistant {
            is_multimodal: data.is_multimodal,
        },
        AgentVariant::RagUser => AgentKind::RagUser {
            retrieve_config: build_retrieve_config(data.retrieve_config.clone().unwrap_or_default()),
        },
        AgentVariant::GroupManager => AgentKind::GroupManager {
            max_round: data.max_round,
            admin_name: data.admin_name.clone().filter(|n| !n.is_empty()),
            speakers: build_speakers(data.speakers.clone().unwrap_or_default(), agent_id)?,
            enable_clear_history: data.enable_clear_history,
            send_introductions: data.send_introductions,
        },
        AgentVariant::Swarm => {
            let mut update_system_message = Vec::new();
            for update in &data.update_agent_state_before_reply {
                let entry = match update.update_function_type.as_str() {
                    "string" => UpdateSystemMessage::Text(update.update_function.clone()),
                    "callable" => UpdateSystemMessage::Callable(ValidatedMethod::parse(
                        MethodSlot::UpdateSystemMessage,
                        &update.update_function,
                    )?),
                    other => {
                        return Err(invalid_field(agent_id, "update_function_type", other).into());
                    }
                };
                update_system_message.push(entry);
            }
            let mut hand_offs = Vec::new();
            for hand_off in &data.hand_offs {
                hand_offs.push(build_hand_off(hand_off.clone(), agent_id)?);
            }
            AgentKind::Swarm {
                functions: data.functions.clone(),
                update_system_message,
                hand_offs,
            }
        }
        AgentVariant::Reasoning => AgentKind::Reasoning {
            verbose: data.verbose,
            reason_config: build_reason_config(data.reason_config.clone().unwrap_or_default()),
        },
    };
    Ok(kind)
}

fn build_retrieve_config(draft: RetrieveConfigDraft) -> RetrieveConfig {
    RetrieveConfig {
        task: draft.task,
        docs_path: draft.docs_path,
        collection_name: draft.collection_name,
        n_results: draft.n_results,
        distance_threshold: draft.distance_threshold,
        chunk_token_size: draft.chunk_token_size,
        get_or_create: draft.get_or_create,
        model: draft.model,
        customized_prompt: draft.customized_prompt,
    }
}

fn build_reason_config(draft: ReasonConfigDraft) -> ReasonConfig {
    ReasonConfig {
        method: draft.method,
        max_depth: draft.max_depth,
        forest_size: draft.forest_size,
        rating_scale: draft.rating_scale,
        beam_size: draft.beam_size,
        answer_approach: draft.answer_approach,
        nsim: draft.nsim,
        exploration_constant: draft.exploration_constant,
    }
}

fn build_speakers(draft: SpeakersDraft, agent_id: &str) -> Result<SpeakerConfig, ValidationError> {
    let selection = match draft.selection_method.as_deref() {
        None | Some("auto") => SpeakerSelection::Auto,
        Some("manual") => SpeakerSelection::Manual,
        Some("random") => SpeakerSelection::Random,
        Some("round_robin") => SpeakerSelection::RoundRobin,
        Some("custom") => {
            let content = draft.selection_custom_method.unwrap_or_default();
            SpeakerSelection::Custom(ValidatedMethod::parse(
                MethodSlot::CustomSpeakerSelection,
                &content,
            )?)
        }
        Some(other) => return Err(invalid_field(agent_id, "speakers.selection_method", other).into()),
    };
    let allow_repeat = match draft.allow_repeat {
        None => AllowRepeat::All(true),
        Some(AllowRepeatDraft::Flag(flag)) => AllowRepeat::All(flag),
        Some(AllowRepeatDraft::Agents(agents)) => AllowRepeat::Only(agents),
    };
    let transitions = match draft.selection_mode.as_deref() {
        Some("transition") if !draft.allowed_or_disallowed_transitions.is_empty() => {
            let kind = match draft.transitions_type.as_deref() {
                None | Some("allowed") => TransitionsKind::Allowed,
                Some("disallowed") => TransitionsKind::Disallowed,
                Some(other) => {
                    return Err(invalid_field(agent_id, "speakers.transitions_type", other).into());
                }
            };
            Some(SpeakerTransitions {
                kind,
                map: draft.allowed_or_disallowed_transitions,
            })
        }
        _ => None,
    };
    Ok(SpeakerConfig {
        selection,
        allow_repeat,
        max_retries_for_selecting: draft.max_retries_for_selecting,
        transitions,
    })
}

fn build_hand_off(draft: HandOffDraft, agent_id: &str) -> Result<HandOff, ValidationError> {
    match draft {
        HandOffDraft::OnCondition(on_condition) => {
            let available = match on_condition.available_check_type.as_deref() {
                None | Some("none") => OnConditionAvailable::None,
                Some("string") => match on_condition.available {
                    Some(variable) if !variable.is_empty() => OnConditionAvailable::Variable(variable),
                    _ => OnConditionAvailable::None,
                },
                Some("callable") => OnConditionAvailable::Callable(ValidatedMethod::parse(
                    MethodSlot::OnConditionAvailable,
                    on_condition.available.as_deref().unwrap_or_default(),
                )?),
                Some(other) => {
                    return Err(invalid_field(agent_id, "available_check_type", other).into());
                }
            };
            Ok(HandOff::OnCondition {
                target: on_condition.target,
                condition: on_condition.condition,
                available,
            })
        }
        HandOffDraft::AfterWork(after_work) => Ok(HandOff::AfterWork(AfterWork::build(
            after_work,
            EntityKind::Agent,
            agent_id,
        )?)),
    }
}
