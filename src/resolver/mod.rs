//! Derives the chat execution order and the connectivity views over a flow.
//!
//! The resolver works on borrowed agent and chat slices so it can run during
//! [`Flow::build`](crate::model::Flow::build), before a `Flow` exists. Chats
//! refer to agents by id; every lookup goes through the resolver's index and
//! an unknown id is a [`ReferentialIntegrityError`].

pub mod swarm;

use crate::error::{EntityKind, ReferentialIntegrityError};
use crate::model::{Agent, AgentVariant, Chat};
use ahash::AHashMap;
use itertools::Itertools;
use swarm::{SwarmCandidate, is_swarm_candidate, select_swarm_entry};
use tracing::debug;

/// One entry of the resolved order, as indices into the flow's collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatStep {
    pub chat: usize,
    pub source: usize,
    pub target: usize,
}

/// A resolved step with its entities.
#[derive(Debug, Clone, Copy)]
pub struct OrderedChat<'a> {
    pub chat: &'a Chat,
    pub source: &'a Agent,
    pub target: &'a Agent,
}

/// The agents taking part in a swarm chat.
#[derive(Debug, Clone)]
pub struct SwarmMembers<'a> {
    /// The initial agent first, then every other swarm agent.
    pub members: Vec<&'a Agent>,
    /// The first user (or RAG user) the initial agent talks to.
    pub user_agent: Option<&'a Agent>,
}

pub struct FlowResolver<'a> {
    agents: &'a [Agent],
    chats: &'a [Chat],
    index: AHashMap<&'a str, usize>,
}

impl<'a> FlowResolver<'a> {
    pub fn new(agents: &'a [Agent], chats: &'a [Chat]) -> Self {
        let mut index = AHashMap::with_capacity(agents.len());
        for (position, agent) in agents.iter().enumerate() {
            // first definition wins; duplicates are reported by validation
            index.entry(agent.id()).or_insert(position);
        }
        Self {
            agents,
            chats,
            index,
        }
    }

    pub fn agent_index(
        &self,
        agent_id: &str,
        referenced_by: &str,
    ) -> Result<usize, ReferentialIntegrityError> {
        self.index
            .get(agent_id)
            .copied()
            .ok_or_else(|| ReferentialIntegrityError::new(EntityKind::Agent, agent_id, referenced_by))
    }

    pub fn agent(
        &self,
        agent_id: &str,
        referenced_by: &str,
    ) -> Result<&'a Agent, ReferentialIntegrityError> {
        let agents = self.agents;
        self.agent_index(agent_id, referenced_by)
            .map(|index| &agents[index])
    }

    fn step(&self, chat_index: usize) -> Result<ChatStep, ReferentialIntegrityError> {
        let chat = &self.chats[chat_index];
        Ok(ChatStep {
            chat: chat_index,
            source: self.agent_index(&chat.source, &chat.id)?,
            target: self.agent_index(&chat.target, &chat.id)?,
        })
    }

    pub fn is_swarm_flow(&self) -> bool {
        self.agents.iter().any(Agent::is_swarm)
    }

    /// The resolved order.
    ///
    /// A swarm flow resolves to its single entry chat. Otherwise every chat
    /// with a non-negative `order` takes part, sorted by it (stable); a flow
    /// with exactly one chat always resolves to that chat.
    pub fn resolve_order(&self) -> Result<Vec<ChatStep>, ReferentialIntegrityError> {
        if self.is_swarm_flow() {
            if let Some(entry) = self.swarm_entry()? {
                debug!(chat = %self.chats[entry.chat].id, "Resolved swarm entry chat");
                return Ok(vec![entry]);
            }
        }
        let mut order: Vec<ChatStep> = self
            .chats
            .iter()
            .enumerate()
            .filter(|(_, chat)| chat.order >= 0)
            .sorted_by_key(|(_, chat)| chat.order)
            .map(|(index, _)| self.step(index))
            .collect::<Result<_, _>>()?;
        if order.is_empty() && self.chats.len() == 1 {
            order.push(self.step(0)?);
        }
        debug!(steps = order.len(), "Resolved chat order");
        Ok(order)
    }

    fn swarm_entry(&self) -> Result<Option<ChatStep>, ReferentialIntegrityError> {
        let mut steps = Vec::new();
        for index in 0..self.chats.len() {
            let step = self.step(index)?;
            if is_swarm_candidate(&self.agents[step.source], &self.agents[step.target]) {
                steps.push(step);
            }
        }
        let candidates: Vec<SwarmCandidate> = steps
            .iter()
            .map(|step| SwarmCandidate::from(&self.chats[step.chat]))
            .collect();
        Ok(select_swarm_entry(&candidates).map(|selected| steps[selected]))
    }

    /// The agent that starts the swarm: an endpoint of the entry chat
    /// (source first), or else the first swarm endpoint over all chats.
    pub fn initial_swarm_agent(
        &self,
        order: &[ChatStep],
    ) -> Result<Option<usize>, ReferentialIntegrityError> {
        if let Some(first) = order.first() {
            for candidate in [first.source, first.target] {
                if self.agents[candidate].is_swarm() {
                    return Ok(Some(candidate));
                }
            }
        }
        for chat in self.chats {
            for endpoint in [&chat.source, &chat.target] {
                let index = self.agent_index(endpoint, &chat.id)?;
                if self.agents[index].is_swarm() {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }

    /// Ids of the agents `agent_id` talks to, in encounter order, not
    /// deduplicated. Scans every chat, or only the resolved order.
    pub fn agent_connections(
        &self,
        agent_id: &str,
        order: &[ChatStep],
        all_chats: bool,
    ) -> Vec<&'a str> {
        let chats = self.chats;
        let pairs: Vec<(&'a str, &'a str)> = if all_chats {
            chats
                .iter()
                .map(|c| (c.source.as_str(), c.target.as_str()))
                .collect()
        } else {
            order
                .iter()
                .map(|step| {
                    let chat = &chats[step.chat];
                    (chat.source.as_str(), chat.target.as_str())
                })
                .collect()
        };
        let mut connections = Vec::new();
        for (source, target) in pairs {
            if source == agent_id {
                connections.push(target);
            }
            if target == agent_id {
                connections.push(source);
            }
        }
        connections
    }

    /// The agents connected to a group manager; empty for other variants.
    pub fn group_chat_members(
        &self,
        manager_id: &str,
    ) -> Result<Vec<&'a Agent>, ReferentialIntegrityError> {
        let manager = self.agent(manager_id, manager_id)?;
        if manager.variant() != AgentVariant::GroupManager {
            return Ok(Vec::new());
        }
        self.agent_connections(manager_id, &[], true)
            .into_iter()
            .map(|member| self.agent(member, manager_id))
            .collect()
    }

    pub fn swarm_chat_members(
        &self,
        initial_agent_id: &str,
    ) -> Result<SwarmMembers<'a>, ReferentialIntegrityError> {
        let initial = self.agent(initial_agent_id, initial_agent_id)?;
        if !initial.is_swarm() {
            return Ok(SwarmMembers {
                members: Vec::new(),
                user_agent: None,
            });
        }
        let mut user_agent = None;
        for connection in self.agent_connections(initial_agent_id, &[], true) {
            let agent = self.agent(connection, initial_agent_id)?;
            if agent.variant().is_user() {
                user_agent = Some(agent);
                break;
            }
        }
        let members = std::iter::once(initial)
            .chain(
                self.agents
                    .iter()
                    .filter(|a| a.is_swarm() && a.id() != initial.id()),
            )
            .collect();
        Ok(SwarmMembers {
            members,
            user_agent,
        })
    }

    /// Positions in `order` of the chats `chat` waits for.
    pub fn chat_prerequisite_indices(
        &self,
        chat: &Chat,
        order: &[ChatStep],
    ) -> Result<Vec<usize>, ReferentialIntegrityError> {
        chat.prerequisites
            .iter()
            .map(|prerequisite| {
                order
                    .iter()
                    .position(|step| self.chats[step.chat].id == *prerequisite)
                    .ok_or_else(|| {
                        ReferentialIntegrityError::new(EntityKind::Chat, prerequisite, &chat.id)
                    })
            })
            .collect()
    }
}
