//! Agent construction, plus the registrations that need every agent to
//! exist first: swarm hand-offs and nested chats.

use super::position::{ExportPosition, ImportPosition, Placement};
use super::section::{ExportContext, SectionGenerator, SectionOutput};
use crate::error::{EntityKind, ReferentialIntegrityError, ValidationError};
use crate::model::agent::{
    AllowRepeat, CodeExecution, NestedChatDecl, ReasonConfig, RetrieveConfig, SpeakerConfig,
};
use crate::model::{
    AfterWork, Agent, AgentKind, AgentVariant, HandOff, KeywordCriterion, Message, MessageKind,
    OnConditionAvailable, SpeakerSelection, TerminationPolicy, UpdateSystemMessage,
};
use crate::snippet::literal::{
    bool_literal, call_expr, dict_expr, list_expr, string_literal, value_literal,
};
use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

pub struct AgentsSection;

/// The runtime class of an agent and the import that provides it.
fn agent_class(agent: &Agent) -> (&'static str, &'static str) {
    match &agent.kind {
        AgentKind::User => ("UserProxyAgent", "from autogen import UserProxyAgent"),
        AgentKind::Assistant { is_multimodal: true } => (
            "MultimodalConversableAgent",
            "from autogen.agentchat.contrib.multimodal_conversable_agent import MultimodalConversableAgent",
        ),
        AgentKind::Assistant { .. } => ("AssistantAgent", "from autogen import AssistantAgent"),
        AgentKind::RagUser { .. } => (
            "RetrieveUserProxyAgent",
            "from autogen.agentchat.contrib.retrieve_user_proxy_agent import RetrieveUserProxyAgent",
        ),
        AgentKind::GroupManager { .. } => ("GroupChatManager", "from autogen import GroupChatManager"),
        AgentKind::Swarm { .. } => ("SwarmAgent", "from autogen import SwarmAgent"),
        AgentKind::Reasoning { .. } => (
            "ReasoningAgent",
            "from autogen.agentchat.contrib.reasoning_agent import ReasoningAgent",
        ),
    }
}

struct AgentWriter<'c, 'a> {
    ctx: &'c ExportContext<'a>,
    agent: &'a Agent,
    name: &'a str,
    output: &'c mut SectionOutput,
}

impl<'c, 'a> AgentWriter<'c, 'a> {
    fn before(&mut self, content: String) {
        self.output
            .add_fragment(content, Placement::BeforeAgent(self.agent.id().to_string()));
    }

    fn render(mut self) -> Result<String, ValidationError> {
        let agent = self.agent;
        let common = &agent.common;
        let (class, import) = agent_class(agent);
        self.output.add_import(import, ImportPosition::ThirdParty);

        let mut args = vec![
            format!("name={}", string_literal(self.name)),
            format!("description={}", string_literal(&common.description)),
        ];
        if let Some(system_message) = &common.system_message {
            args.push(format!("system_message={}", string_literal(system_message)));
        }
        args.push(format!(
            "human_input_mode={}",
            string_literal(common.human_input_mode.as_str())
        ));
        if let Some(max_reply) = common.max_consecutive_auto_reply {
            args.push(format!("max_consecutive_auto_reply={}", max_reply));
        }
        if let Some(reply) = &common.default_auto_reply {
            args.push(format!("default_auto_reply={}", string_literal(reply)));
        }
        let code_execution = match &common.code_execution {
            Some(config) => self.code_executor(config)?,
            None => "False".to_string(),
        };
        args.push(format!("code_execution_config={}", code_execution));
        if let Some(termination) = self.termination() {
            args.push(format!("is_termination_msg={}", termination));
        }
        args.extend(self.variant_args()?);
        args.push(format!("llm_config={}", self.llm_config()?));

        Ok(format!("{} = {}", self.name, call_expr(class, &args, 0)))
    }

    fn code_executor(&mut self, config: &CodeExecution) -> Result<String, ValidationError> {
        let executor_name = format!("{}_executor", self.name);
        let (class, import) = if config.use_docker {
            (
                "DockerCommandLineCodeExecutor",
                "from autogen.coding import DockerCommandLineCodeExecutor",
            )
        } else {
            (
                "LocalCommandLineCodeExecutor",
                "from autogen.coding import LocalCommandLineCodeExecutor",
            )
        };
        self.output.add_import(import, ImportPosition::ThirdParty);
        let mut executor_args = Vec::new();
        if let Some(work_dir) = &config.work_dir {
            executor_args.push(format!("work_dir={}", string_literal(work_dir)));
        }
        if let Some(timeout) = config.timeout {
            executor_args.push(format!("timeout={}", timeout));
        }
        if !config.use_docker && !config.functions.is_empty() {
            let functions: Vec<String> = config
                .functions
                .iter()
                .map(|id| self.ctx.names.skill(id).map(str::to_string))
                .collect::<Result<_, _>>()?;
            executor_args.push(format!("functions={}", list_expr(&functions, 1)));
        }
        self.before(format!("{} = {}", executor_name, call_expr(class, &executor_args, 0)));

        let mut entries = vec![("\"executor\"".to_string(), executor_name)];
        if let Some(last_n) = config.last_n_messages {
            entries.push(("\"last_n_messages\"".to_string(), last_n.to_string()));
        }
        Ok(dict_expr(&entries, 1))
    }

    fn termination(&mut self) -> Option<String> {
        let agent = self.agent;
        match &agent.common.termination {
            TerminationPolicy::None => None,
            TerminationPolicy::Keyword {
                keywords,
                criterion,
            } => {
                let keywords = keywords.iter().map(|k| string_literal(k)).join(", ");
                let check = match criterion {
                    KeywordCriterion::Found => "keyword in (x.get(\"content\", \"\") or \"\")",
                    KeywordCriterion::Ending => {
                        "(x.get(\"content\", \"\") or \"\").rstrip().endswith(keyword)"
                    }
                    KeywordCriterion::Exact => "(x.get(\"content\", \"\") or \"\").strip() == keyword",
                };
                Some(format!(
                    "lambda x: any({} for keyword in [{}])",
                    check, keywords
                ))
            }
            TerminationPolicy::Method(method) => {
                let function_name = format!("is_termination_message_{}", self.name);
                let rendered =
                    self.output
                        .render_method(method, &function_name, self.ctx.settings);
                self.before(rendered);
                Some(function_name)
            }
        }
    }

    fn llm_config(&self) -> Result<String, ValidationError> {
        let model_ids = &self.agent.common.model_ids;
        if model_ids.is_empty() {
            return Ok("False".to_string());
        }
        let configs: Vec<String> = model_ids
            .iter()
            .map(|id| {
                self.ctx
                    .names
                    .model(id)
                    .map(|name| format!("{}_llm_config", name))
            })
            .collect::<Result<_, _>>()?;
        let mut entries = vec![("\"config_list\"".to_string(), list_expr(&configs, 2))];
        if let Some(seed) = self.ctx.settings.cache_seed {
            entries.push(("\"cache_seed\"".to_string(), seed.to_string()));
        }
        Ok(dict_expr(&entries, 1))
    }

    fn variant_args(&mut self) -> Result<Vec<String>, ValidationError> {
        let agent = self.agent;
        let mut args = Vec::new();
        match &agent.kind {
            AgentKind::User | AgentKind::Assistant { .. } => {}
            AgentKind::RagUser { retrieve_config } => {
                args.push(format!(
                    "retrieve_config={}",
                    value_literal(&retrieve_config_value(retrieve_config), 1)
                ));
            }
            AgentKind::GroupManager { .. } => {
                self.group_chat()?;
                args.push(format!("groupchat={}_group_chat", self.name));
            }
            AgentKind::Swarm {
                functions,
                update_system_message,
                ..
            } => {
                if !functions.is_empty() {
                    let names: Vec<String> = functions
                        .iter()
                        .map(|id| self.ctx.names.skill(id).map(str::to_string))
                        .collect::<Result<_, _>>()?;
                    args.push(format!("functions={}", list_expr(&names, 1)));
                }
                if !update_system_message.is_empty() {
                    self.output.add_import(
                        "from autogen import UPDATE_SYSTEM_MESSAGE",
                        ImportPosition::ThirdParty,
                    );
                    let mut updates = Vec::new();
                    for (index, update) in update_system_message.iter().enumerate() {
                        let argument = match update {
                            UpdateSystemMessage::Text(text) => string_literal(text),
                            UpdateSystemMessage::Callable(method) => {
                                let function_name = indexed(
                                    &format!("custom_update_system_message_{}", self.name),
                                    index,
                                );
                                let rendered = self.output.render_method(
                                    method,
                                    &function_name,
                                    self.ctx.settings,
                                );
                                self.before(rendered);
                                function_name
                            }
                        };
                        updates.push(format!("UPDATE_SYSTEM_MESSAGE({})", argument));
                    }
                    args.push(format!(
                        "update_agent_state_before_reply={}",
                        list_expr(&updates, 1)
                    ));
                }
            }
            AgentKind::Reasoning {
                verbose,
                reason_config,
            } => {
                args.push(format!("verbose={}", bool_literal(*verbose)));
                let config = reason_config_value(reason_config);
                if config.as_object().is_some_and(|map| !map.is_empty()) {
                    args.push(format!("reason_config={}", value_literal(&config, 1)));
                }
            }
        }
        Ok(args)
    }

    fn group_chat(&mut self) -> Result<(), ValidationError> {
        let agent = self.agent;
        let AgentKind::GroupManager {
            max_round,
            admin_name,
            speakers,
            enable_clear_history,
            send_introductions,
        } = &agent.kind
        else {
            return Ok(());
        };
        self.output
            .add_import("from autogen import GroupChat", ImportPosition::ThirdParty);
        let members = self
            .ctx
            .flow
            .group_chat_members(agent.id())?
            .into_iter()
            .unique_by(|member| member.id())
            .map(|member| self.ctx.names.agent(member.id()).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = vec![
            format!("agents={}", list_expr(&members, 1)),
            "messages=[]".to_string(),
        ];
        if let Some(max_round) = max_round {
            args.push(format!("max_round={}", max_round));
        }
        if let Some(admin_name) = admin_name {
            args.push(format!("admin_name={}", string_literal(admin_name)));
        }
        args.extend(self.speaker_args(speakers)?);
        if *send_introductions {
            args.push("send_introductions=True".to_string());
        }
        if let Some(enable) = enable_clear_history {
            args.push(format!("enable_clear_history={}", bool_literal(*enable)));
        }
        let group_chat = format!(
            "{}_group_chat = {}",
            self.name,
            call_expr("GroupChat", &args, 0)
        );
        self.before(group_chat);
        Ok(())
    }

    fn speaker_args(&mut self, speakers: &SpeakerConfig) -> Result<Vec<String>, ValidationError> {
        let mut args = Vec::new();
        let selection = match &speakers.selection {
            SpeakerSelection::Custom(method) => {
                let function_name = format!("custom_speaker_selection_{}", self.name);
                let rendered = self
                    .output
                    .render_method(method, &function_name, self.ctx.settings);
                self.before(rendered);
                function_name
            }
            other => string_literal(other.as_str().unwrap_or("auto")),
        };
        args.push(format!("speaker_selection_method={}", selection));
        let allow_repeat = match &speakers.allow_repeat {
            AllowRepeat::All(flag) => bool_literal(*flag).to_string(),
            AllowRepeat::Only(ids) => {
                let names: Vec<String> = ids
                    .iter()
                    .map(|id| self.ctx.names.agent(id).map(str::to_string))
                    .collect::<Result<_, _>>()?;
                list_expr(&names, 1)
            }
        };
        args.push(format!("allow_repeat_speaker={}", allow_repeat));
        if let Some(retries) = speakers.max_retries_for_selecting {
            args.push(format!("max_retries_for_selecting_speaker={}", retries));
        }
        if let Some(transitions) = &speakers.transitions {
            let mut entries = Vec::new();
            for (from, to) in &transitions.map {
                let targets: Vec<String> = to
                    .iter()
                    .map(|id| self.ctx.names.agent(id).map(str::to_string))
                    .collect::<Result<_, _>>()?;
                entries.push((
                    self.ctx.names.agent(from)?.to_string(),
                    list_expr(&targets, 2),
                ));
            }
            args.push(format!(
                "allowed_or_disallowed_speaker_transitions={}",
                dict_expr(&entries, 1)
            ));
            args.push(format!(
                "speaker_transitions_type={}",
                string_literal(transitions.kind.as_str())
            ));
        }
        Ok(args)
    }
}

fn indexed(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, index)
    }
}

fn retrieve_config_value(config: &RetrieveConfig) -> Value {
    let mut map = Map::new();
    if let Some(task) = &config.task {
        map.insert("task".into(), Value::from(task.as_str()));
    }
    if !config.docs_path.is_empty() {
        map.insert("docs_path".into(), Value::from(config.docs_path.clone()));
    }
    if let Some(name) = &config.collection_name {
        map.insert("collection_name".into(), Value::from(name.as_str()));
    }
    if let Some(n) = config.n_results {
        map.insert("n_results".into(), Value::from(n));
    }
    if let Some(threshold) = config.distance_threshold {
        map.insert("distance_threshold".into(), Value::from(threshold));
    }
    if let Some(size) = config.chunk_token_size {
        map.insert("chunk_token_size".into(), Value::from(size));
    }
    if let Some(flag) = config.get_or_create {
        map.insert("get_or_create".into(), Value::from(flag));
    }
    if let Some(model) = &config.model {
        map.insert("model".into(), Value::from(model.as_str()));
    }
    if let Some(prompt) = &config.customized_prompt {
        map.insert("customized_prompt".into(), Value::from(prompt.as_str()));
    }
    Value::Object(map)
}

fn reason_config_value(config: &ReasonConfig) -> Value {
    let mut map = Map::new();
    if let Some(method) = &config.method {
        map.insert("method".into(), Value::from(method.as_str()));
    }
    let counts = [
        ("max_depth", config.max_depth),
        ("forest_size", config.forest_size),
        ("rating_scale", config.rating_scale),
        ("beam_size", config.beam_size),
        ("nsim", config.nsim),
    ];
    for (key, value) in counts {
        if let Some(value) = value {
            map.insert(key.into(), Value::from(value));
        }
    }
    if let Some(approach) = &config.answer_approach {
        map.insert("answer_approach".into(), Value::from(approach.as_str()));
    }
    if let Some(constant) = config.exploration_constant {
        map.insert("exploration_constant".into(), Value::from(constant));
    }
    Value::Object(map)
}

/// `register_hand_off(...)` for a swarm agent, with the functions it uses.
fn hand_offs(
    ctx: &ExportContext<'_>,
    agent: &Agent,
    output: &mut SectionOutput,
) -> Result<Option<String>, ValidationError> {
    let AgentKind::Swarm { hand_offs, .. } = &agent.kind else {
        return Ok(None);
    };
    if hand_offs.is_empty() {
        return Ok(None);
    }
    let name = ctx.names.agent(agent.id())?;
    output.add_import("from autogen import register_hand_off", ImportPosition::ThirdParty);
    let mut functions = Vec::new();
    let mut targets = Vec::new();
    for (index, hand_off) in hand_offs.iter().enumerate() {
        match hand_off {
            HandOff::OnCondition {
                target,
                condition,
                available,
            } => {
                output.add_import("from autogen import ON_CONDITION", ImportPosition::ThirdParty);
                let mut args = vec![
                    format!("target={}", ctx.names.agent(target)?),
                    format!("condition={}", string_literal(condition)),
                ];
                match available {
                    OnConditionAvailable::None => {}
                    OnConditionAvailable::Variable(variable) => {
                        args.push(format!("available={}", string_literal(variable)));
                    }
                    OnConditionAvailable::Callable(method) => {
                        let function_name =
                            indexed(&format!("custom_on_condition_available_{}", name), index);
                        functions.push(output.render_method(method, &function_name, ctx.settings));
                        args.push(format!("available={}", function_name));
                    }
                }
                targets.push(call_expr("ON_CONDITION", &args, 2));
            }
            HandOff::AfterWork(after_work) => {
                let function_name = indexed(&format!("custom_after_work_{}", name), index);
                let argument = after_work_argument(ctx, after_work, &function_name, output)?;
                if let Some(function) = argument.1 {
                    functions.push(function);
                }
                targets.push(argument.0);
            }
        }
    }
    let call = call_expr(
        "register_hand_off",
        &[
            format!("agent={}", name),
            format!("hand_to={}", list_expr(&targets, 1)),
        ],
        0,
    );
    functions.push(call);
    Ok(Some(functions.join("\n\n")))
}

/// The `AFTER_WORK(...)` expression for `after_work`, plus the function
/// definition it refers to when it is a callable.
pub(super) fn after_work_argument(
    ctx: &ExportContext<'_>,
    after_work: &AfterWork,
    function_name: &str,
    output: &mut SectionOutput,
) -> Result<(String, Option<String>), ValidationError> {
    output.add_import("from autogen import AFTER_WORK", ImportPosition::ThirdParty);
    let result = match after_work {
        AfterWork::Option(option) => {
            output.add_import("from autogen import AfterWorkOption", ImportPosition::ThirdParty);
            (format!("AFTER_WORK(AfterWorkOption.{})", option.as_str()), None)
        }
        AfterWork::Agent(agent_id) => (format!("AFTER_WORK({})", ctx.names.agent(agent_id)?), None),
        AfterWork::Callable(method) => {
            let rendered = output.render_method(method, function_name, ctx.settings);
            (format!("AFTER_WORK({})", function_name), Some(rendered))
        }
    };
    Ok(result)
}

/// The chat queue and `register_nested_chats(...)` call for each nested
/// chat declared on `agent`.
fn nested_chats(
    ctx: &ExportContext<'_>,
    agent: &Agent,
    output: &mut SectionOutput,
) -> Result<Vec<String>, ValidationError> {
    let name = ctx.names.agent(agent.id())?;
    let mut blocks = Vec::new();
    let declarations = agent
        .common
        .nested_chats
        .iter()
        .filter(|decl| !decl.messages.is_empty());
    for (index, declaration) in declarations.enumerate() {
        let queue_name = indexed(&format!("{}_chat_queue", name), index);
        blocks.push(nested_chat_block(ctx, name, &queue_name, declaration, output)?);
    }
    Ok(blocks)
}

fn nested_chat_block(
    ctx: &ExportContext<'_>,
    agent_name: &str,
    queue_name: &str,
    declaration: &NestedChatDecl,
    output: &mut SectionOutput,
) -> Result<String, ValidationError> {
    let mut functions = Vec::new();
    let mut queue = Vec::new();
    for reference in &declaration.messages {
        let chat = ctx.flow.chat(&reference.id).ok_or_else(|| {
            ReferentialIntegrityError::new(EntityKind::Chat, &reference.id, agent_name)
        })?;
        let chat_name = ctx.names.chat(&chat.id)?;
        let (sender, recipient, message, prefix) = if reference.is_reply {
            (&chat.target, &chat.source, &chat.nested_chat.reply, "nested_chat_reply")
        } else {
            (&chat.source, &chat.target, &chat.nested_chat.message, "nested_chat_message")
        };
        let sender_name = ctx.names.agent(sender)?;
        let mut entries = vec![
            ("\"recipient\"".to_string(), ctx.names.agent(recipient)?.to_string()),
            ("\"sender\"".to_string(), sender_name.to_string()),
        ];
        if let Some(method) = chat.summary.method.as_str() {
            entries.push(("\"summary_method\"".to_string(), string_literal(method)));
        }
        entries.push((
            "\"max_turns\"".to_string(),
            chat.max_turns.unwrap_or(1).to_string(),
        ));
        let fallback = match &chat.message.kind {
            MessageKind::Text(_) => Some(&chat.message),
            _ => None,
        };
        if let Some(message) = message.as_ref().or(fallback) {
            let function_name = format!("{}_{}", prefix, chat_name);
            if let Some(value) =
                nested_message_value(ctx, message, sender_name, &function_name, output, &mut functions)
            {
                entries.push(("\"message\"".to_string(), value));
            }
        }
        queue.push(dict_expr(&entries, 1));
    }
    let triggers: Vec<String> = declaration
        .triggered_by
        .iter()
        .map(|id| ctx.names.agent(id).map(str::to_string))
        .collect::<Result<_, _>>()?;
    functions.push(format!("{} = {}", queue_name, list_expr(&queue, 0)));
    functions.push(format!(
        "{}.{}",
        agent_name,
        call_expr(
            "register_nested_chats",
            &[
                format!("trigger={}", list_expr(&triggers, 1)),
                format!("chat_queue={}", queue_name),
                format!("use_async={}", bool_literal(ctx.flow.is_async)),
                "ignore_async_in_sync_chat=True".to_string(),
            ],
            0,
        )
    ));
    Ok(functions.join("\n\n"))
}

fn nested_message_value(
    ctx: &ExportContext<'_>,
    message: &Message,
    sender_name: &str,
    function_name: &str,
    output: &mut SectionOutput,
    functions: &mut Vec<String>,
) -> Option<String> {
    match &message.kind {
        MessageKind::Text(text) => Some(string_literal(text)),
        MessageKind::Method { method, .. } => {
            functions.push(output.render_method(method, function_name, ctx.settings));
            Some(function_name.to_string())
        }
        MessageKind::Generator => Some(format!("{}.message_generator", sender_name)),
        MessageKind::None => None,
    }
}

impl SectionGenerator for AgentsSection {
    fn phase(&self) -> ExportPosition {
        ExportPosition::Agents
    }

    fn export(&self, ctx: &ExportContext<'_>) -> Result<SectionOutput, ValidationError> {
        let mut output = SectionOutput::default();
        // group managers reference their members, so they come last
        let (managers, others): (Vec<&Agent>, Vec<&Agent>) = ctx
            .flow
            .agents()
            .iter()
            .partition(|agent| agent.variant() == AgentVariant::GroupManager);
        for agent in others.into_iter().chain(managers) {
            let name = ctx.names.agent(agent.id())?;
            let writer = AgentWriter {
                ctx,
                agent,
                name,
                output: &mut output,
            };
            let block = writer.render()?;
            output.add_agent_block(agent.id(), block);
        }

        let mut registrations = Vec::new();
        for agent in ctx.flow.agents() {
            if let Some(block) = hand_offs(ctx, agent, &mut output)? {
                registrations.push(block);
            }
            registrations.extend(nested_chats(ctx, agent, &mut output)?);
        }
        output.add_fragment(
            registrations.join("\n\n"),
            Placement::After(ExportPosition::Agents),
        );
        debug!(
            agents = output.agent_blocks.len(),
            fragments = output.fragments.len(),
            "Exported agents"
        );
        Ok(output)
    }
}
