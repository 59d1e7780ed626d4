//! The `main()` entry point that starts the resolved chats.

use super::agents::after_work_argument;
use super::position::{ExportPosition, ImportPosition, Placement};
use super::section::{ExportContext, SectionGenerator, SectionOutput};
use crate::error::ValidationError;
use crate::model::{AfterWork, AfterWorkOption, Chat, MessageKind, MessageOrigin};
use crate::resolver::OrderedChat;
use crate::snippet::literal::{
    bool_literal, call_expr, context_value_literal, dict_expr, is_identifier, list_expr,
    string_literal, value_literal,
};
use serde_json::Value;
use tracing::{debug, warn};

pub struct ChatsSection;

/// Keyword arguments shared by every chat form, as `(key, value)` pairs.
struct ChatArguments {
    entries: Vec<(String, String)>,
    message: Option<String>,
}

impl ChatsSection {
    fn chat_arguments(
        ctx: &ExportContext<'_>,
        chat: &Chat,
        sender_name: &str,
        indent: usize,
        output: &mut SectionOutput,
    ) -> Result<ChatArguments, ValidationError> {
        let mut entries = Vec::new();
        if let Some(method) = chat.summary.method.as_str() {
            entries.push(("summary_method".to_string(), string_literal(method)));
        }
        let summary_args: Vec<(String, String)> = chat
            .summary
            .summary_args()
            .into_iter()
            .map(|(key, value)| (string_literal(key), string_literal(value)))
            .collect();
        if !summary_args.is_empty() {
            entries.push(("summary_args".to_string(), dict_expr(&summary_args, indent)));
        }
        if let Some(clear_history) = chat.clear_history {
            entries.push(("clear_history".to_string(), bool_literal(clear_history).to_string()));
        }
        if let Some(max_turns) = chat.max_turns {
            entries.push(("max_turns".to_string(), max_turns.to_string()));
        }
        if let Some(silent) = chat.silent {
            entries.push(("silent".to_string(), bool_literal(silent).to_string()));
        }
        for (key, value) in &chat.message.context {
            entries.push((key.clone(), context_value_literal(value, indent)));
        }

        let message = match &chat.message.kind {
            MessageKind::Text(text) => Some(string_literal(text)),
            MessageKind::Method { method, .. } => {
                let function_name = format!("callable_message_{}", ctx.names.chat(&chat.id)?);
                let rendered = output.render_method(method, &function_name, ctx.settings);
                output.add_fragment(rendered, Placement::Before(ExportPosition::Chats));
                Some(function_name)
            }
            MessageKind::Generator => Some(format!("{}.message_generator", sender_name)),
            MessageKind::None => None,
        };
        Ok(ChatArguments { entries, message })
    }

    /// `sender.initiate_chat(recipient, ...)`.
    fn single_chat(
        ctx: &ExportContext<'_>,
        step: &OrderedChat<'_>,
        output: &mut SectionOutput,
    ) -> Result<String, ValidationError> {
        let chat = step.chat;
        let sender = ctx.names.agent(chat.sender_id())?;
        let recipient = ctx.names.agent(chat.recipient_id())?;
        let arguments = Self::chat_arguments(ctx, chat, sender, 2, output)?;
        let mut args = vec![recipient.to_string()];
        for (key, value) in arguments.entries {
            if is_identifier(&key) {
                args.push(format!("{}={}", key, value));
            } else {
                warn!(chat = %chat.id, key = %key, "Skipping context key that is not an identifier");
            }
        }
        if let Some(message) = arguments.message {
            args.push(format!("message={}", message));
        }
        let (method, prefix) = if ctx.flow.is_async {
            ("a_initiate_chat", "await ")
        } else {
            ("initiate_chat", "")
        };
        Ok(format!(
            "results = {}{}.{}",
            prefix,
            sender,
            call_expr(method, &args, 1)
        ))
    }

    /// `initiate_chats([...])`, or its async form with chat ids and
    /// prerequisites.
    fn sequential_chats(
        ctx: &ExportContext<'_>,
        ordered: &[OrderedChat<'_>],
        output: &mut SectionOutput,
    ) -> Result<String, ValidationError> {
        let is_async = ctx.flow.is_async;
        let function = if is_async { "a_initiate_chats" } else { "initiate_chats" };
        output.add_import(
            format!("from autogen.agentchat.chat import {}", function),
            ImportPosition::ThirdParty,
        );
        let mut queue = Vec::with_capacity(ordered.len());
        for (index, step) in ordered.iter().enumerate() {
            let chat = step.chat;
            let sender = ctx.names.agent(chat.sender_id())?;
            let recipient = ctx.names.agent(chat.recipient_id())?;
            let arguments = Self::chat_arguments(ctx, chat, sender, 3, output)?;
            let mut entries = vec![
                ("\"sender\"".to_string(), sender.to_string()),
                ("\"recipient\"".to_string(), recipient.to_string()),
            ];
            entries.extend(
                arguments
                    .entries
                    .into_iter()
                    .map(|(key, value)| (string_literal(&key), value)),
            );
            if is_async {
                entries.push(("\"chat_id\"".to_string(), index.to_string()));
                let prerequisites: Vec<String> = ctx
                    .flow
                    .chat_prerequisite_indices(chat)?
                    .into_iter()
                    .map(|position| position.to_string())
                    .collect();
                entries.push(("\"prerequisites\"".to_string(), list_expr(&prerequisites, 3)));
            }
            if let Some(message) = arguments.message {
                entries.push(("\"message\"".to_string(), message));
            }
            queue.push(dict_expr(&entries, 2));
        }
        let prefix = if is_async { "await " } else { "" };
        Ok(format!(
            "results = {}{}({})",
            prefix,
            function,
            list_expr(&queue, 1)
        ))
    }

    /// `initiate_swarm_chat(...)` started from the entry chat.
    fn swarm_chat(
        ctx: &ExportContext<'_>,
        entry: &OrderedChat<'_>,
        output: &mut SectionOutput,
    ) -> Result<String, ValidationError> {
        let flow = ctx.flow;
        let chat = entry.chat;
        let function = if flow.is_async {
            "a_initiate_swarm_chat"
        } else {
            "initiate_swarm_chat"
        };
        output.add_import(format!("from autogen import {}", function), ImportPosition::ThirdParty);

        let mut args = Vec::new();
        if let Some(initial) = flow.initial_swarm_agent() {
            let members = flow.swarm_chat_members(initial.id())?;
            let member_names: Vec<String> = members
                .members
                .iter()
                .map(|agent| ctx.names.agent(agent.id()).map(str::to_string))
                .collect::<Result<_, _>>()?;
            args.push(format!("initial_agent={}", ctx.names.agent(initial.id())?));
            args.push(format!("agents={}", list_expr(&member_names, 2)));
            let messages = match &chat.message.kind {
                MessageKind::Text(text) => string_literal(text),
                MessageKind::Method {
                    origin: MessageOrigin::Carryover { text },
                    ..
                } => string_literal(text),
                _ => string_literal(""),
            };
            args.push(format!("messages={}", messages));
            args.push(format!(
                "context_variables={}",
                value_literal(&Value::Object(chat.context_variables.clone()), 2)
            ));
            if let Some(user) = members.user_agent {
                args.push(format!("user_agent={}", ctx.names.agent(user.id())?));
            }
        }
        let default_after_work = AfterWork::Option(AfterWorkOption::Terminate);
        let after_work = chat.after_work.as_ref().unwrap_or(&default_after_work);
        let function_name = format!("custom_after_work_{}", ctx.names.chat(&chat.id)?);
        let (argument, definition) = after_work_argument(ctx, after_work, &function_name, output)?;
        if let Some(definition) = definition {
            output.add_fragment(definition, Placement::Before(ExportPosition::Chats));
        }
        args.push(format!("after_work={}", argument));
        args.push(format!("max_rounds={}", chat.max_rounds));

        let prefix = if flow.is_async { "await " } else { "" };
        Ok(format!(
            "results, _, _ = {}{}",
            prefix,
            call_expr(function, &args, 1)
        ))
    }
}

impl SectionGenerator for ChatsSection {
    fn phase(&self) -> ExportPosition {
        ExportPosition::Chats
    }

    fn export(&self, ctx: &ExportContext<'_>) -> Result<SectionOutput, ValidationError> {
        let mut output = SectionOutput::default();
        let ordered = ctx.flow.ordered_flow();
        let call = match ordered.as_slice() {
            [] => "results = None".to_string(),
            [entry] if ctx.flow.is_swarm_flow() => Self::swarm_chat(ctx, entry, &mut output)?,
            [single] => Self::single_chat(ctx, single, &mut output)?,
            many => Self::sequential_chats(ctx, many, &mut output)?,
        };

        let (definition, run) = if ctx.flow.is_async {
            output.add_import("import asyncio", ImportPosition::Builtin);
            ("async def main():", "asyncio.run(main())")
        } else {
            ("def main():", "main()")
        };
        output.content = format!(
            "{}\n    \"\"\"Start chatting.\"\"\"\n    {}\n    return results\n\n\nif __name__ == \"__main__\":\n    {}",
            definition, call, run
        );
        debug!(chats = ordered.len(), "Exported chats");
        Ok(output)
    }
}
