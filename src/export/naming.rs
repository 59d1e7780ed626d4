//! Stable Python identifiers for every entity of a flow.

use crate::error::{EntityKind, ReferentialIntegrityError};
use crate::model::Flow;
use crate::snippet::lexer::is_keyword;
use crate::snippet::{MAX_VAR_NAME_LENGTH, truncate_identifier};
use ahash::{AHashMap, AHashSet};

/// Turns an arbitrary display name into a Python identifier.
///
/// Invalid characters become `_`, a leading digit gets a `w_` prefix and
/// keywords get a trailing `_`. Returns `fallback` for names with nothing
/// usable in them.
pub fn sanitize_identifier(name: &str, fallback: &str) -> String {
    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.chars().all(|c| c == '_') {
        out = fallback.to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "w_");
    }
    if is_keyword(&out) {
        out.push('_');
    }
    truncate_identifier(&out).to_string()
}

/// Assigns each entity a unique identifier, in a fixed visitation order:
/// skills, agents, models, chats.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    flow_name: String,
    used: AHashSet<String>,
    names: AHashMap<(EntityKind, String), String>,
}

impl NameRegistry {
    pub fn new(flow: &Flow) -> Self {
        let mut registry = Self {
            flow_name: sanitize_identifier(&flow.name, "flow"),
            ..Self::default()
        };
        for skill in flow.skills() {
            registry.assign(EntityKind::Skill, &skill.id, &skill.name);
        }
        for agent in flow.agents() {
            registry.assign(EntityKind::Agent, agent.id(), agent.name());
        }
        for model in flow.models() {
            registry.assign(EntityKind::Model, &model.id, &model.name);
        }
        for chat in flow.chats() {
            registry.assign(EntityKind::Chat, &chat.id, &chat.name);
        }
        registry
    }

    fn assign(&mut self, kind: EntityKind, id: &str, name: &str) {
        let key = (kind, id.to_string());
        if self.names.contains_key(&key) {
            return;
        }
        let base = sanitize_identifier(name, &kind.to_string());
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while self.used.contains(&candidate) {
            let suffix = format!("_{}", counter);
            let keep = MAX_VAR_NAME_LENGTH.saturating_sub(suffix.len());
            candidate = format!("{}{}", truncate_to(&base, keep), suffix);
            counter += 1;
        }
        self.used.insert(candidate.clone());
        self.names.insert(key, candidate);
    }

    /// The sanitized flow name, used in generated accessor names.
    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Result<&str, ReferentialIntegrityError> {
        self.names
            .get(&(kind, id.to_string()))
            .map(String::as_str)
            .ok_or_else(|| ReferentialIntegrityError::new(kind, id, &self.flow_name))
    }

    pub fn agent(&self, id: &str) -> Result<&str, ReferentialIntegrityError> {
        self.get(EntityKind::Agent, id)
    }

    pub fn model(&self, id: &str) -> Result<&str, ReferentialIntegrityError> {
        self.get(EntityKind::Model, id)
    }

    pub fn skill(&self, id: &str) -> Result<&str, ReferentialIntegrityError> {
        self.get(EntityKind::Skill, id)
    }

    pub fn chat(&self, id: &str) -> Result<&str, ReferentialIntegrityError> {
        self.get(EntityKind::Chat, id)
    }
}

fn truncate_to(name: &str, max_chars: usize) -> &str {
    match name.char_indices().nth(max_chars) {
        Some((cut, _)) => &name[..cut],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("My Agent", "agent"), "My_Agent");
        assert_eq!(sanitize_identifier("1st-agent", "agent"), "w_1st_agent");
        assert_eq!(sanitize_identifier("class", "agent"), "class_");
        assert_eq!(sanitize_identifier("  ", "agent"), "agent");
        assert_eq!(sanitize_identifier("---", "chat"), "chat");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = "a".repeat(100);
        assert_eq!(sanitize_identifier(&long, "x").len(), MAX_VAR_NAME_LENGTH);
    }

    #[test]
    fn test_truncate_to() {
        assert_eq!(truncate_to("abcdef", 3), "abc");
        assert_eq!(truncate_to("ab", 3), "ab");
    }
}
