use super::draft::SkillDraft;
use crate::error::{EntityKind, StructuralValidationError, ValidationError};
use crate::snippet::literal::is_identifier;
use crate::snippet::{ImportAggregator, ImportSet, parse_module};
use std::collections::BTreeMap;

pub const INTEROP_IMPORT: &str = "from autogen.interop import Interoperability";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillKind {
    Custom,
    Shared,
    Langchain,
    Crewai,
}

impl SkillKind {
    /// Tools written for another framework, converted at runtime.
    pub fn is_interop(self) -> bool {
        matches!(self, SkillKind::Langchain | SkillKind::Crewai)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkillKind::Custom => "custom",
            SkillKind::Shared => "shared",
            SkillKind::Langchain => "langchain",
            SkillKind::Crewai => "crewai",
        }
    }
}

/// A tool agents can call, with its imports lifted out of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub kind: SkillKind,
    pub secrets: BTreeMap<String, String>,
    content: String,
    imports: ImportSet,
}

impl Skill {
    pub fn build(draft: SkillDraft) -> Result<Self, ValidationError> {
        let kind = match draft.data.skill_type.as_deref() {
            None | Some("custom") => SkillKind::Custom,
            Some("shared") => SkillKind::Shared,
            Some("langchain") => SkillKind::Langchain,
            Some("crewai") => SkillKind::Crewai,
            Some(other) => {
                return Err(StructuralValidationError::InvalidField {
                    kind: EntityKind::Skill,
                    id: draft.id,
                    field: "skill_type".to_string(),
                    value: other.to_string(),
                }
                .into());
            }
        };
        if !is_identifier(&draft.name) {
            return Err(StructuralValidationError::InvalidSkillName {
                skill_id: draft.id,
                name: draft.name,
            }
            .into());
        }

        let content = strip_registrations(&draft.data.content, &draft.name);
        let module = parse_module(&content)?;
        let expected = match kind {
            SkillKind::Custom => Some(format!("def {}(", draft.name)),
            SkillKind::Langchain | SkillKind::Crewai => Some(format!("{} = ", draft.name)),
            SkillKind::Shared => None,
        };
        if let Some(expected) = expected {
            if !content.contains(&expected) {
                return Err(StructuralValidationError::SkillDefinitionMissing {
                    skill_id: draft.id,
                    expected,
                }
                .into());
            }
        }

        let mut aggregator = ImportAggregator::new();
        for import in &module.imports {
            aggregator.add_import(import);
        }
        if kind.is_interop() {
            aggregator.force(INTEROP_IMPORT);
        }
        let import_lines: Vec<(usize, usize)> = module
            .imports
            .iter()
            .map(|i| (i.start_line, i.end_line))
            .collect();
        let remaining: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(index, _)| {
                let line = index + 1;
                !import_lines
                    .iter()
                    .any(|(start, end)| (*start..=*end).contains(&line))
            })
            .map(|(_, line)| line)
            .collect();

        Ok(Self {
            id: draft.id,
            name: draft.name,
            description: draft.description,
            requirements: draft.requirements,
            kind,
            secrets: draft.data.secrets,
            content: trim_blank_lines(&remaining),
            imports: aggregator.finish(),
        })
    }

    /// The skill's code without its module-level imports.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The imports lifted out of the content, classified once at build time.
    pub fn imports(&self) -> &ImportSet {
        &self.imports
    }
}

/// Drops lines registering the skill on agents; those calls need the
/// generated agent names and are emitted by the exporter instead.
fn strip_registrations(content: &str, name: &str) -> String {
    let own_registration = format!("{}.register_for", name);
    let excluded = [
        own_registration.as_str(),
        ".register_for_llm(",
        ".register_for_execution(",
    ];
    if !excluded.iter().any(|e| content.contains(e)) {
        return content.to_string();
    }
    content
        .lines()
        .filter(|line| !excluded.iter().any(|e| line.contains(e)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}
