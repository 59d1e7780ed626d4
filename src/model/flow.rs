use super::agent::{AfterWork, Agent, AgentVariant};
use super::chat::Chat;
use super::draft::FlowDraft;
use super::llm::LlmModel;
use super::message::{MessageKind, MessageOrigin};
use super::skill::Skill;
use crate::error::{
    EntityKind, ExportError, ReferentialIntegrityError, StructuralValidationError,
    ValidationError, ValidationErrors,
};
use crate::resolver::{ChatStep, FlowResolver, OrderedChat, SwarmMembers};
use ahash::AHashSet;
use itertools::Itertools;
use tracing::{debug, info};

/// A validated flow: its entities plus the resolved chat order.
///
/// The only way to get one is [`Flow::build`] (or [`Flow::from_json`]),
/// which either validates everything or returns every error it found.
#[derive(Debug, Clone)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub requirements: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub is_async: bool,
    pub cache_seed: Option<u32>,
    agents: Vec<Agent>,
    models: Vec<LlmModel>,
    skills: Vec<Skill>,
    chats: Vec<Chat>,
    order: Vec<ChatStep>,
    initial_swarm_agent: Option<usize>,
}

impl Flow {
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let draft: FlowDraft =
            serde_json::from_str(json).map_err(|e| ExportError::Json(e.to_string()))?;
        Ok(Self::build(draft)?)
    }

    pub fn build(draft: FlowDraft) -> Result<Self, ValidationErrors> {
        info!(flow = %draft.name, "Building flow");
        let data = draft.data;
        let mut errors: Vec<ValidationError> = Vec::new();

        let agents = collect_built(data.agents.into_iter().map(Agent::build), &mut errors);
        let models = collect_built(
            data.models
                .into_iter()
                .map(|m| LlmModel::build(m).map_err(ValidationError::from)),
            &mut errors,
        );
        let skills = collect_built(data.skills.into_iter().map(Skill::build), &mut errors);
        let chats = collect_built(data.chats.into_iter().map(Chat::build), &mut errors);
        ValidationErrors::from_vec(errors)?;

        let mut errors: Vec<ValidationError> = Vec::new();
        check_unique_ids(&agents, &models, &skills, &chats, &mut errors);
        for agent in &agents {
            if !chats.iter().any(|chat| chat.connects(agent.id())) {
                errors.push(
                    StructuralValidationError::DisconnectedAgent {
                        agent_id: agent.id().to_string(),
                        agent_name: agent.name().to_string(),
                    }
                    .into(),
                );
            }
        }
        check_references(&agents, &models, &skills, &chats, &mut errors);

        let resolver = FlowResolver::new(&agents, &chats);
        let mut endpoints_known = true;
        for chat in &chats {
            for endpoint in [&chat.source, &chat.target] {
                if let Err(e) = resolver.agent_index(endpoint, &chat.id) {
                    errors.push(e.into());
                    endpoints_known = false;
                }
            }
        }
        let (order, initial_swarm_agent) = if endpoints_known {
            check_resolution(&resolver, &chats, &mut errors).map_err(ValidationError::from)?
        } else {
            (Vec::new(), None)
        };
        ValidationErrors::from_vec(errors)?;

        debug!(
            agents = agents.len(),
            chats = chats.len(),
            steps = order.len(),
            "Flow validated"
        );
        Ok(Self {
            id: draft.id,
            name: draft.name,
            description: draft.description,
            tags: draft.tags,
            requirements: draft.requirements,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
            is_async: data.is_async,
            cache_seed: data.cache_seed,
            agents,
            models,
            skills,
            chats,
            order,
            initial_swarm_agent,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn models(&self) -> &[LlmModel] {
        &self.models
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == agent_id)
    }

    pub fn model(&self, model_id: &str) -> Option<&LlmModel> {
        self.models.iter().find(|m| m.id == model_id)
    }

    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.id == skill_id)
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn resolver(&self) -> FlowResolver<'_> {
        FlowResolver::new(&self.agents, &self.chats)
    }

    pub fn is_swarm_flow(&self) -> bool {
        self.agents.iter().any(Agent::is_swarm)
    }

    pub fn order(&self) -> &[ChatStep] {
        &self.order
    }

    /// The resolved order with its entities.
    pub fn ordered_flow(&self) -> Vec<OrderedChat<'_>> {
        self.order
            .iter()
            .map(|step| OrderedChat {
                chat: &self.chats[step.chat],
                source: &self.agents[step.source],
                target: &self.agents[step.target],
            })
            .collect()
    }

    pub fn initial_swarm_agent(&self) -> Option<&Agent> {
        self.initial_swarm_agent.map(|index| &self.agents[index])
    }

    pub fn agent_connections(
        &self,
        agent_id: &str,
        all_chats: bool,
    ) -> Result<Vec<&str>, ReferentialIntegrityError> {
        let resolver = self.resolver();
        resolver.agent_index(agent_id, agent_id)?;
        Ok(resolver.agent_connections(agent_id, &self.order, all_chats))
    }

    pub fn group_chat_members(
        &self,
        manager_id: &str,
    ) -> Result<Vec<&Agent>, ReferentialIntegrityError> {
        self.resolver().group_chat_members(manager_id)
    }

    pub fn swarm_chat_members(
        &self,
        initial_agent_id: &str,
    ) -> Result<SwarmMembers<'_>, ReferentialIntegrityError> {
        self.resolver().swarm_chat_members(initial_agent_id)
    }

    pub fn chat_prerequisite_indices(
        &self,
        chat: &Chat,
    ) -> Result<Vec<usize>, ReferentialIntegrityError> {
        self.resolver().chat_prerequisite_indices(chat, &self.order)
    }
}

fn collect_built<T>(
    results: impl Iterator<Item = Result<T, ValidationError>>,
    errors: &mut Vec<ValidationError>,
) -> Vec<T> {
    let mut built = Vec::new();
    for result in results {
        match result {
            Ok(entity) => built.push(entity),
            Err(e) => errors.push(e),
        }
    }
    built
}

fn push_duplicates<'a>(
    kind: EntityKind,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let duplicates = ids.duplicates().map(str::to_string).collect_vec();
    for id in duplicates {
        errors.push(StructuralValidationError::DuplicateId { kind, id }.into());
    }
}

fn check_unique_ids(
    agents: &[Agent],
    models: &[LlmModel],
    skills: &[Skill],
    chats: &[Chat],
    errors: &mut Vec<ValidationError>,
) {
    push_duplicates(EntityKind::Agent, agents.iter().map(Agent::id), errors);
    push_duplicates(EntityKind::Model, models.iter().map(|m| m.id.as_str()), errors);
    push_duplicates(EntityKind::Skill, skills.iter().map(|s| s.id.as_str()), errors);
    push_duplicates(EntityKind::Chat, chats.iter().map(|c| c.id.as_str()), errors);
}

fn check_references(
    agents: &[Agent],
    models: &[LlmModel],
    skills: &[Skill],
    chats: &[Chat],
    errors: &mut Vec<ValidationError>,
) {
    let agent_ids: AHashSet<&str> = agents.iter().map(Agent::id).collect();
    let model_ids: AHashSet<&str> = models.iter().map(|m| m.id.as_str()).collect();
    let skill_ids: AHashSet<&str> = skills.iter().map(|s| s.id.as_str()).collect();
    let chat_ids: AHashSet<&str> = chats.iter().map(|c| c.id.as_str()).collect();
    let mut missing = |kind: EntityKind, known: &AHashSet<&str>, id: &str, owner: &str| {
        if !known.contains(id) {
            errors.push(ReferentialIntegrityError::new(kind, id, owner).into());
        }
    };

    for agent in agents {
        let owner = agent.id();
        for model_id in &agent.common.model_ids {
            missing(EntityKind::Model, &model_ids, model_id, owner);
        }
        for linked in &agent.common.skills {
            missing(EntityKind::Skill, &skill_ids, &linked.id, owner);
        }
        for skill_id in agent.referenced_skills() {
            missing(EntityKind::Skill, &skill_ids, skill_id, owner);
        }
        for agent_id in agent.referenced_agents() {
            missing(EntityKind::Agent, &agent_ids, agent_id, owner);
        }
        for nested in &agent.common.nested_chats {
            for message in &nested.messages {
                missing(EntityKind::Chat, &chat_ids, &message.id, owner);
            }
        }
    }
    for chat in chats {
        for real in [&chat.real_source, &chat.real_target].into_iter().flatten() {
            missing(EntityKind::Agent, &agent_ids, real, &chat.id);
        }
        for prerequisite in &chat.prerequisites {
            missing(EntityKind::Chat, &chat_ids, prerequisite, &chat.id);
        }
        if let Some(AfterWork::Agent(agent_id)) = &chat.after_work {
            missing(EntityKind::Agent, &agent_ids, agent_id, &chat.id);
        }
    }
}

/// Resolves the order and checks the rules that depend on it.
fn check_resolution(
    resolver: &FlowResolver<'_>,
    chats: &[Chat],
    errors: &mut Vec<ValidationError>,
) -> Result<(Vec<ChatStep>, Option<usize>), ReferentialIntegrityError> {
    let order = resolver.resolve_order()?;
    if order.is_empty() {
        errors.push(StructuralValidationError::EmptyOrder.into());
    }
    let mut initial_swarm_agent = None;
    if resolver.is_swarm_flow() {
        initial_swarm_agent = resolver.initial_swarm_agent(&order)?;
        if initial_swarm_agent.is_none() {
            errors.push(StructuralValidationError::NoInitialSwarmAgent.into());
        }
        if let Some(entry) = order.first() {
            let chat = &chats[entry.chat];
            if !is_swarm_entry_message(&chat.message.kind) {
                errors.push(
                    StructuralValidationError::SwarmEntryMessage {
                        chat_id: chat.id.clone(),
                    }
                    .into(),
                );
            }
        }
    }
    for chat in chats {
        if needs_rag_sender(&chat.message.kind)
            && resolver.agent(&chat.source, &chat.id)?.variant() != AgentVariant::RagUser
        {
            errors.push(
                StructuralValidationError::GeneratorWithoutRagSender {
                    chat_id: chat.id.clone(),
                }
                .into(),
            );
        }
    }
    Ok((order, initial_swarm_agent))
}

fn needs_rag_sender(kind: &MessageKind) -> bool {
    match kind {
        MessageKind::Generator => true,
        MessageKind::Method { origin, .. } => *origin == MessageOrigin::RagCarryover,
        _ => false,
    }
}

/// The swarm runtime only takes a plain message to start with.
fn is_swarm_entry_message(kind: &MessageKind) -> bool {
    match kind {
        MessageKind::Text(_) | MessageKind::None => true,
        MessageKind::Method { origin, .. } => matches!(origin, MessageOrigin::Carryover { .. }),
        MessageKind::Generator => false,
    }
}
