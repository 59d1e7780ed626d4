//! Merges the outputs of every section generator into one program.

use super::position::{ExportPosition, ImportPosition, Placement};
use super::section::SectionOutput;
use crate::model::Flow;
use crate::snippet::sort_imports;
use crate::snippet::literal::string_literal;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use tracing::debug;

/// The assembled program plus its side files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembled {
    pub program: String,
    pub aux_files: Vec<(String, String)>,
}

/// Accumulates generator outputs into per-position queues.
///
/// Outputs are only appended; [`Assembler::finish`] decides the final order.
#[derive(Debug, Default)]
pub struct Assembler {
    imports: AHashMap<ImportPosition, Vec<String>>,
    environment_variables: Vec<(String, String)>,
    before: AHashMap<ExportPosition, Vec<String>>,
    after: AHashMap<ExportPosition, Vec<String>>,
    contents: AHashMap<ExportPosition, Vec<String>>,
    agent_blocks: Vec<(String, String)>,
    before_agent: AHashMap<String, Vec<String>>,
    after_agent: AHashMap<String, Vec<String>>,
    aux_files: Vec<(String, String)>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, phase: ExportPosition, output: SectionOutput) {
        debug!(
            ?phase,
            imports = output.imports.len(),
            fragments = output.fragments.len(),
            agent_blocks = output.agent_blocks.len(),
            "Collected section output"
        );
        for (statement, position) in output.imports {
            self.imports.entry(position).or_default().push(statement);
        }
        self.environment_variables.extend(output.environment_variables);
        for (content, placement) in output.fragments {
            match placement {
                Placement::Before(at) => self.before.entry(at).or_default().push(content),
                Placement::After(at) => self.after.entry(at).or_default().push(content),
                Placement::BeforeAgent(id) => self.before_agent.entry(id).or_default().push(content),
                Placement::AfterAgent(id) => self.after_agent.entry(id).or_default().push(content),
            }
        }
        if !output.content.trim().is_empty() {
            self.contents.entry(phase).or_default().push(output.content);
        }
        self.agent_blocks.extend(output.agent_blocks);
        self.aux_files.extend(output.aux_files);
    }

    pub fn finish(mut self, flow: &Flow) -> Assembled {
        let mut pieces: Vec<String> = vec![header(flow)];

        let environment = self.environment_block();
        if !environment.is_empty() {
            self.imports
                .entry(ImportPosition::Builtin)
                .or_default()
                .push("import os".to_string());
        }
        for position in [
            ImportPosition::Builtin,
            ImportPosition::ThirdParty,
            ImportPosition::Local,
        ] {
            if let Some(statements) = self.imports.get(&position) {
                let sorted = sort_imports(statements.iter().map(String::as_str));
                if !sorted.is_empty() {
                    pieces.push(sorted.join("\n"));
                }
            }
        }
        if !environment.is_empty() {
            pieces.push(environment);
        }

        for phase in ExportPosition::ALL {
            pieces.extend(self.before.remove(&phase).unwrap_or_default());
            if phase == ExportPosition::Agents {
                pieces.extend(self.agent_pieces());
            }
            pieces.extend(self.contents.remove(&phase).unwrap_or_default());
            pieces.extend(self.after.remove(&phase).unwrap_or_default());
        }

        let program = pieces
            .iter()
            .map(|piece| piece.trim_end())
            .filter(|piece| !piece.is_empty())
            .join("\n\n\n");
        debug!(
            bytes = program.len(),
            aux_files = self.aux_files.len(),
            "Assembled program"
        );
        Assembled {
            program: format!("{}\n", program),
            aux_files: self.aux_files,
        }
    }

    /// `os.environ` assignments sorted by key; the first value of a key wins.
    fn environment_block(&self) -> String {
        let mut seen = AHashSet::new();
        self.environment_variables
            .iter()
            .filter(|(key, _)| seen.insert(key.as_str()))
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .map(|(key, value)| {
                format!(
                    "os.environ[{}] = {}",
                    string_literal(key),
                    string_literal(value)
                )
            })
            .join("\n")
    }

    /// Agent blocks wrapped in their own fragments, then fragments whose
    /// agent produced no block.
    fn agent_pieces(&mut self) -> Vec<String> {
        let mut pieces = Vec::new();
        for (agent_id, block) in std::mem::take(&mut self.agent_blocks) {
            let mut parts = self.before_agent.remove(&agent_id).unwrap_or_default();
            parts.push(block);
            parts.extend(self.after_agent.remove(&agent_id).unwrap_or_default());
            pieces.push(parts.iter().map(|part| part.trim_end()).join("\n\n"));
        }
        let orphans = self
            .before_agent
            .drain()
            .chain(self.after_agent.drain())
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .flat_map(|(_, fragments)| fragments);
        pieces.extend(orphans);
        pieces
    }
}

/// Shebang, lint pragmas and the module docstring.
fn header(flow: &Flow) -> String {
    let requirements = flow
        .requirements
        .iter()
        .chain(flow.agents().iter().flat_map(|a| a.common.requirements.iter()))
        .chain(flow.models().iter().flat_map(|m| m.requirements.iter()))
        .chain(flow.skills().iter().flat_map(|s| s.requirements.iter()))
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .chain(std::iter::once("ag2"))
        .unique()
        .sorted()
        .join(", ");
    let mut docstring = escape_docstring(&flow.name);
    if !flow.description.trim().is_empty() {
        docstring.push_str("\n\n");
        docstring.push_str(&escape_docstring(flow.description.trim()));
    }
    format!(
        "#!/usr/bin/env python\n# flake8: noqa: E501\n# pylint: disable=line-too-long,invalid-name,unused-import\n# pyright: reportUnusedImport=false\n\"\"\"{}\n\nRequirements: {}\nTags: {}\n\"\"\"",
        docstring,
        requirements,
        flow.tags.join(", ")
    )
}

fn escape_docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}
