//! Swarm entry-point selection.

use crate::model::{Agent, AgentVariant, Chat};

/// Ordering hints of one swarm entry candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwarmCandidate {
    pub order: i32,
    pub position: i32,
}

impl From<&Chat> for SwarmCandidate {
    fn from(chat: &Chat) -> Self {
        Self {
            order: chat.order,
            position: chat.position,
        }
    }
}

/// Whether a chat between `source` and `target` may start a swarm:
/// a user (or RAG user) talking to a swarm agent, or two swarm agents.
pub fn is_swarm_candidate(source: &Agent, target: &Agent) -> bool {
    matches!(
        source.variant(),
        AgentVariant::User | AgentVariant::RagUser | AgentVariant::Swarm
    ) && target.variant() == AgentVariant::Swarm
}

/// Picks the entry candidate, returning its index.
///
/// Two passes over all candidates: the smallest non-negative `order` wins;
/// when no candidate has one, the smallest `position` wins. Ties fall back
/// to input order.
pub fn select_swarm_entry(candidates: &[SwarmCandidate]) -> Option<usize> {
    let by_order = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.order >= 0)
        .min_by_key(|(index, c)| (c.order, *index))
        .map(|(index, _)| index);
    if by_order.is_some() {
        return by_order;
    }
    candidates
        .iter()
        .enumerate()
        .min_by_key(|(index, c)| (c.position, *index))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(order: i32, position: i32) -> SwarmCandidate {
        SwarmCandidate { order, position }
    }

    #[test]
    fn test_order_beats_position() {
        let candidates = [candidate(-1, 0), candidate(2, 5), candidate(1, 9)];
        assert_eq!(select_swarm_entry(&candidates), Some(2));
    }

    #[test]
    fn test_position_fallback_scans_all_candidates() {
        let candidates = [candidate(-1, 3), candidate(-1, 1), candidate(-1, 2)];
        assert_eq!(select_swarm_entry(&candidates), Some(1));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = [candidate(-1, -1), candidate(-1, -1)];
        assert_eq!(select_swarm_entry(&candidates), Some(0));
        let candidates = [candidate(0, 4), candidate(0, 1)];
        assert_eq!(select_swarm_entry(&candidates), Some(0));
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(select_swarm_entry(&[]), None);
    }
}
