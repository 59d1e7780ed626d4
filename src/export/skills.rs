use super::position::{ExportPosition, ImportPosition, Placement};
use super::section::{ExportContext, SectionGenerator, SectionOutput};
use crate::error::ValidationError;
use crate::model::{Skill, SkillKind};
use crate::snippet::literal::string_literal;

/// Skill definitions, their secrets and their registration on agents.
pub struct SkillsSection;

impl SkillsSection {
    fn definition(skill: &Skill, name: &str) -> String {
        let mut out = skill.content().to_string();
        if skill.kind.is_interop() {
            out.push_str(&format!(
                "\n\n{name}_interop = Interoperability()\n{name}_tool = {name}_interop.convert_tool(\n    tool={name},\n    type={},\n)",
                string_literal(skill.kind.as_str()),
                name = name
            ));
        }
        out
    }

    fn registrations(ctx: &ExportContext<'_>, output: &mut SectionOutput) -> Result<String, ValidationError> {
        let mut blocks = Vec::new();
        for agent in ctx.flow.agents() {
            let caller = ctx.names.agent(agent.id())?;
            for linked in &agent.common.skills {
                let Some(skill) = ctx.flow.skill(&linked.id) else {
                    continue;
                };
                let skill_name = ctx.names.skill(&skill.id)?;
                let executor = ctx.names.agent(&linked.executor_id)?;
                match skill.kind {
                    SkillKind::Shared => {}
                    SkillKind::Langchain | SkillKind::Crewai => blocks.push(format!(
                        "{skill}_tool.register_for_llm({caller})\n{skill}_tool.register_for_execution({executor})",
                        skill = skill_name,
                        caller = caller,
                        executor = executor
                    )),
                    SkillKind::Custom => {
                        output.add_import("from autogen import register_function", ImportPosition::ThirdParty);
                        blocks.push(format!(
                            "register_function(\n    {skill},\n    caller={caller},\n    executor={executor},\n    name={name},\n    description={description},\n)",
                            skill = skill_name,
                            caller = caller,
                            executor = executor,
                            name = string_literal(skill_name),
                            description = string_literal(&skill.description)
                        ));
                    }
                }
            }
        }
        Ok(blocks.join("\n\n"))
    }
}

impl SectionGenerator for SkillsSection {
    fn phase(&self) -> ExportPosition {
        ExportPosition::Skills
    }

    fn export(&self, ctx: &ExportContext<'_>) -> Result<SectionOutput, ValidationError> {
        let mut output = SectionOutput::default();
        let mut definitions = Vec::new();
        for skill in ctx.flow.skills() {
            let name = ctx.names.skill(&skill.id)?;
            for statement in &skill.imports().builtin {
                output.add_import(statement.clone(), ImportPosition::Builtin);
            }
            for statement in &skill.imports().third_party {
                output.add_import(statement.clone(), ImportPosition::ThirdParty);
            }
            for (key, value) in &skill.secrets {
                output.add_environment_variable(key, value);
            }
            definitions.push(Self::definition(skill, name));
        }
        output.content = definitions.join("\n\n");
        let registrations = Self::registrations(ctx, &mut output)?;
        output.add_fragment(registrations, Placement::After(ExportPosition::Agents));
        Ok(output)
    }
}
