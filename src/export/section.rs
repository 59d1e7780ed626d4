//! The contract every section generator implements, and what it returns.

use super::ExportSettings;
use super::naming::NameRegistry;
use super::position::{ExportPosition, ImportPosition, Placement};
use crate::error::ValidationError;
use crate::model::{Flow, MethodSlot, ValidatedMethod};
use crate::snippet::is_standard_library;

pub const TYPING_IMPORT: &str = "from typing import Any, Dict, List, Optional, Union";

/// Read-only view handed to every generator.
pub struct ExportContext<'a> {
    pub flow: &'a Flow,
    pub names: &'a NameRegistry,
    pub settings: &'a ExportSettings,
}

/// Everything one generator contributes to the program.
///
/// Outputs are only ever appended to the assembler's queues; no generator
/// sees or changes another one's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionOutput {
    /// The generator's own content for its phase.
    pub content: String,
    /// Per-agent blocks, keyed by agent id, in emission order.
    pub agent_blocks: Vec<(String, String)>,
    pub imports: Vec<(String, ImportPosition)>,
    pub environment_variables: Vec<(String, String)>,
    pub fragments: Vec<(String, Placement)>,
    /// Side files written next to the program: (file name, content).
    pub aux_files: Vec<(String, String)>,
}

impl SectionOutput {
    pub fn add_import(&mut self, statement: impl Into<String>, position: ImportPosition) {
        self.imports.push((statement.into(), position));
    }

    pub fn add_environment_variable(&mut self, key: &str, value: &str) {
        self.environment_variables
            .push((key.to_string(), value.to_string()));
    }

    pub fn add_fragment(&mut self, content: impl Into<String>, placement: Placement) {
        let content = content.into();
        if !content.trim().is_empty() {
            self.fragments.push((content, placement));
        }
    }

    pub fn add_agent_block(&mut self, agent_id: &str, content: String) {
        self.agent_blocks.push((agent_id.to_string(), content));
    }

    /// Renders `method` as `function_name` and records the imports it needs:
    /// the typing names of its signature plus the snippet's own imports.
    pub fn render_method(
        &mut self,
        method: &ValidatedMethod,
        function_name: &str,
        settings: &ExportSettings,
    ) -> String {
        self.add_import(TYPING_IMPORT, ImportPosition::Builtin);
        for name in slot_type_names(method.slot()) {
            self.add_import(format!("from autogen import {}", name), ImportPosition::ThirdParty);
        }
        for import in method.imports() {
            let position = if is_standard_library(&import.module) {
                ImportPosition::Builtin
            } else {
                ImportPosition::ThirdParty
            };
            self.add_import(import.statement.clone(), position);
        }
        method.render(function_name, settings.types_as_comments)
    }
}

/// Runtime classes named in a slot's signature.
fn slot_type_names(slot: MethodSlot) -> &'static [&'static str] {
    match slot {
        MethodSlot::CallableMessage
        | MethodSlot::NestedChatMessage
        | MethodSlot::NestedChatReply
        | MethodSlot::UpdateSystemMessage
        | MethodSlot::OnConditionAvailable => &["ConversableAgent"],
        MethodSlot::IsTerminationMessage => &[],
        MethodSlot::CustomSpeakerSelection => &["Agent", "ConversableAgent", "GroupChat"],
        MethodSlot::AfterWork => &["AfterWorkOption", "ConversableAgent", "GroupChat"],
    }
}

/// One contributor to the exported program.
pub trait SectionGenerator: Send + Sync {
    /// The phase whose content slot this generator fills.
    fn phase(&self) -> ExportPosition;

    fn export(&self, ctx: &ExportContext<'_>) -> Result<SectionOutput, ValidationError>;
}
