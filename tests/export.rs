//! Section generator and exporter configuration tests.
mod common;
use chatweave::error::ValidationError;
use chatweave::export::{ExportContext, NameRegistry};
use chatweave::prelude::*;
use common::*;
use serde_json::json;

fn export(json: &str) -> ExportOutput {
    let flow = Flow::from_json(json).expect("flow should be valid");
    Exporter::new(&flow).export().expect("export should succeed")
}

#[cfg(test)]
mod chat_tests {
    use super::*;

    #[test]
    fn test_sequential_chats() {
        let program = export(&create_sequential_flow_json(false)).program;

        assert!(program.contains("from autogen.agentchat.chat import initiate_chats"));
        assert!(program.contains(
            "    results = initiate_chats([\n        {\n            \"sender\": user,\n            \"recipient\": writer,\n            \"summary_method\": \"last_msg\",\n            \"message\": \"Write a poem.\",\n        },\n"
        ));
        assert!(program.contains(
            "            \"summary_method\": \"reflection_with_llm\",\n            \"summary_args\": {\n                \"summary_prompt\": \"Summarize the review.\",\n                \"max_tokens\": \"100\",\n            },\n            \"message\": \"Review it.\",\n        },\n    ])\n"
        ));
        assert!(!program.contains("\"chat_id\""));
        assert!(program.contains("def main():"));
    }

    #[test]
    fn test_async_sequential_chats() {
        let program = export(&create_sequential_flow_json(true)).program;

        assert!(program.contains("import asyncio"));
        assert!(program.contains("from autogen.agentchat.chat import a_initiate_chats"));
        assert!(program.contains("async def main():"));
        assert!(program.contains("    results = await a_initiate_chats([\n"));
        assert!(program.contains("            \"chat_id\": 0,\n            \"prerequisites\": [],\n"));
        assert!(program.contains(
            "            \"chat_id\": 1,\n            \"prerequisites\": [\n                0,\n            ],\n"
        ));
        assert!(program.ends_with("if __name__ == \"__main__\":\n    asyncio.run(main())\n"));
    }

    #[test]
    fn test_carryover_message_function() {
        let mut chat = text_chat("c1", "u1", "a1", "Go on: ", 0, 0);
        chat["data"]["message"]["useCarryover"] = json!(true);
        chat["data"]["message"]["context"] = json!({"problem": "2 + 2", "retries": "3"});
        let json = flow_json(
            "Carry",
            vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &[])],
            vec![],
            vec![],
            vec![chat],
        );
        let program = export(&json).program;

        assert!(program.contains("def callable_message_c1_chat(\n    sender: ConversableAgent,"));
        assert!(program.contains("from autogen import ConversableAgent"));
        assert!(program.contains("from typing import Any, Dict, List, Optional, Union"));
        assert!(program.contains("        problem=\"2 + 2\",\n        retries=3,\n        message=callable_message_c1_chat,\n"));
        let function = program.find("def callable_message_c1_chat(").unwrap();
        let main = program.find("def main():").unwrap();
        assert!(function < main);
    }
}

#[cfg(test)]
mod agent_tests {
    use super::*;

    #[test]
    fn test_method_termination_as_comments() {
        let mut assistant = assistant_agent("a1", "assistant", &[]);
        assistant["data"]["termination"] = json!({
            "type": "method",
            "methodContent": "def is_termination_message(message):\n    return \"bye\" in message.get(\"content\", \"\")\n"
        });
        let json = flow_json(
            "Methods",
            vec![user_agent("u1", "user"), assistant],
            vec![],
            vec![],
            vec![text_chat("c1", "u1", "a1", "Hi", 0, 0)],
        );
        let flow = Flow::from_json(&json).unwrap();
        let program = Exporter::builder(&flow)
            .with_types_as_comments(true)
            .build()
            .export()
            .unwrap()
            .program;

        assert!(program.contains(
            "def is_termination_message_assistant(\n    message,  # type: Dict[str, Any]\n):\n    # type: (...) -> bool\n    return \"bye\" in message.get(\"content\", \"\")\n\nassistant = AssistantAgent("
        ));
        assert!(program.contains("    is_termination_msg=is_termination_message_assistant,\n"));
    }

    #[test]
    fn test_keyword_termination_lambda() {
        let program = export(&create_simple_flow_json()).program;

        assert!(program.contains(
            "    is_termination_msg=lambda x: any((x.get(\"content\", \"\") or \"\").rstrip().endswith(keyword) for keyword in [\"TERMINATE\"]),\n"
        ));
    }

    #[test]
    fn test_cache_seed_can_be_dropped() {
        let flow = create_simple_flow();
        let program = Exporter::builder(&flow)
            .with_cache_seed(None)
            .build()
            .export()
            .unwrap()
            .program;

        assert!(program.contains("\"config_list\": ["));
        assert!(!program.contains("cache_seed"));
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let json = flow_json(
            "Names",
            vec![
                user_agent("u1", "helper"),
                assistant_agent("a1", "helper", &[]),
                assistant_agent("a2", "class", &[]),
            ],
            vec![],
            vec![],
            vec![
                text_chat("c1", "u1", "a1", "one", 0, 0),
                text_chat("c2", "a1", "a2", "two", 1, 1),
            ],
        );
        let flow = Flow::from_json(&json).unwrap();
        let names = NameRegistry::new(&flow);

        assert_eq!(names.agent("u1").unwrap(), "helper");
        assert_eq!(names.agent("a1").unwrap(), "helper_1");
        assert_eq!(names.agent("a2").unwrap(), "class_");
        assert!(names.agent("missing").is_err());

        let program = Exporter::new(&flow).export().unwrap().program;
        assert!(program.contains("helper_1 = AssistantAgent(\n    name=\"helper_1\","));
    }

    #[test]
    fn test_group_manager_comes_last() {
        let manager = json!({
            "id": "g1",
            "name": "manager",
            "agentType": "group_manager",
            "data": {
                "maxRound": 5,
                "speakers": {"selectionMethod": "round_robin", "allowRepeat": false},
                "modelIds": ["m1"]
            }
        });
        let json = flow_json(
            "Group",
            vec![
                manager,
                user_agent("u1", "user"),
                assistant_agent("a1", "helper", &["m1"]),
            ],
            vec![openai_model()],
            vec![],
            vec![
                text_chat("c1", "u1", "g1", "Start", 0, 0),
                text_chat("c2", "a1", "g1", "", -1, 1),
                text_chat("c3", "g1", "a1", "", -1, 2),
            ],
        );
        let program = export(&json).program;

        assert!(program.contains(
            "manager_group_chat = GroupChat(\n    agents=[\n        user,\n        helper,\n    ],\n    messages=[],\n    max_round=5,\n    speaker_selection_method=\"round_robin\",\n    allow_repeat_speaker=False,\n"
        ));
        let helper = program.find("helper = AssistantAgent(").unwrap();
        let group_chat = program.find("manager_group_chat = GroupChat(").unwrap();
        let manager = program.find("manager = GroupChatManager(").unwrap();
        assert!(helper < group_chat);
        assert!(group_chat < manager);
        assert!(program.contains("    groupchat=manager_group_chat,\n"));
    }

    #[test]
    fn test_code_executor_precedes_agent() {
        let mut user = user_agent("u1", "user");
        user["data"]["codeExecutionConfig"] = json!({"workDir": "coding", "lastNMessages": 3, "timeout": 60});
        let json = flow_json(
            "Coding",
            vec![user, assistant_agent("a1", "assistant", &[])],
            vec![],
            vec![],
            vec![text_chat("c1", "u1", "a1", "Hi", 0, 0)],
        );
        let program = export(&json).program;

        assert!(program.contains("from autogen.coding import LocalCommandLineCodeExecutor"));
        assert!(program.contains(
            "user_executor = LocalCommandLineCodeExecutor(\n    work_dir=\"coding\",\n    timeout=60,\n)\n\nuser = UserProxyAgent("
        ));
        assert!(program.contains(
            "    code_execution_config={\n        \"executor\": user_executor,\n        \"last_n_messages\": 3,\n    },\n"
        ));
    }

    #[test]
    fn test_nested_chat_registration() {
        let mut writer = assistant_agent("a1", "writer", &[]);
        writer["data"]["nestedChats"] = json!([
            {"triggeredBy": ["u1"], "messages": [{"id": "c2", "isReply": false}]}
        ]);
        let mut nested = text_chat("c2", "a1", "a2", "Check this.", -1, 1);
        nested["data"]["nestedChat"] = json!({"message": "Please review the draft."});
        let json = flow_json(
            "Nested",
            vec![
                user_agent("u1", "user"),
                writer,
                assistant_agent("a2", "critic", &[]),
            ],
            vec![],
            vec![],
            vec![text_chat("c1", "u1", "a1", "Write.", 0, 0), nested],
        );
        let program = export(&json).program;

        assert!(program.contains(
            "writer_chat_queue = [\n    {\n        \"recipient\": critic,\n        \"sender\": writer,\n        \"summary_method\": \"last_msg\",\n        \"max_turns\": 1,\n        \"message\": \"Please review the draft.\",\n    },\n]"
        ));
        assert!(program.contains(
            "writer.register_nested_chats(\n    trigger=[\n        user,\n    ],\n    chat_queue=writer_chat_queue,\n    use_async=False,\n    ignore_async_in_sync_chat=True,\n)"
        ));
        let registration = program.find("writer.register_nested_chats(").unwrap();
        let critic = program.find("critic = AssistantAgent(").unwrap();
        assert!(critic < registration);
    }

    #[test]
    fn test_swarm_hand_offs() {
        let mut planner = swarm_agent("s1", "planner");
        planner["data"]["handOffs"] = json!([
            {"target": "s2", "condition": "Book when the plan is ready."},
            {"recipientType": "option", "recipient": "REVERT_TO_USER"}
        ]);
        let mut entry = text_chat("c2", "s1", "s2", "Plan.", 0, 1);
        entry["data"]["afterWork"] = json!({"recipientType": "agent", "recipient": "s1"});
        let json = flow_json(
            "Handoffs",
            vec![
                user_agent("u1", "traveler"),
                planner,
                swarm_agent("s2", "booker"),
            ],
            vec![openai_model()],
            vec![],
            vec![text_chat("c1", "u1", "s1", "Hi", -1, 0), entry],
        );
        let program = export(&json).program;

        assert!(program.contains("from autogen import register_hand_off"));
        assert!(program.contains("planner = SwarmAgent("));
        assert!(program.contains(
            "register_hand_off(\n    agent=planner,\n    hand_to=[\n        ON_CONDITION(\n            target=booker,\n            condition=\"Book when the plan is ready.\",\n        ),\n        AFTER_WORK(AfterWorkOption.REVERT_TO_USER),\n    ],\n)"
        ));
        assert!(program.contains("        after_work=AFTER_WORK(planner),\n"));
    }
}

#[cfg(test)]
mod skill_tests {
    use super::*;

    fn skill_flow_json() -> String {
        let mut assistant = assistant_agent("a1", "assistant", &["m1"]);
        assistant["data"]["skills"] = json!([{"id": "sk1", "executorId": "u1"}]);
        flow_json(
            "Weather",
            vec![user_agent("u1", "user"), assistant],
            vec![openai_model()],
            vec![weather_skill()],
            vec![text_chat("c1", "u1", "a1", "Weather in Paris?", 0, 0)],
        )
    }

    #[test]
    fn test_skill_definition_and_registration() {
        let program = export(&skill_flow_json()).program;

        assert!(program.contains("Requirements: ag2, requests\n"));
        assert!(program.contains("import os\n"));
        assert!(program.contains("import requests\n"));
        assert!(program.contains("os.environ[\"WEATHER_URL\"] = \"https://weather.example/\""));
        assert!(program.contains("def get_weather(city: str) -> str:"));
        assert!(program.contains(
            "register_function(\n    get_weather,\n    caller=assistant,\n    executor=user,\n    name=\"get_weather\",\n    description=\"Get the weather for a city.\",\n)"
        ));
        let definition = program.find("def get_weather(").unwrap();
        let agent = program.find("assistant = AssistantAgent(").unwrap();
        let registration = program.find("register_function(\n").unwrap();
        let main = program.find("def main():").unwrap();
        assert!(definition < agent);
        assert!(agent < registration);
        assert!(registration < main);
    }

    #[test]
    fn test_environment_comes_after_imports() {
        let program = export(&skill_flow_json()).program;

        let local_import = program.find("from Weather_api_keys import").unwrap();
        let environment = program.find("os.environ[\"WEATHER_URL\"]").unwrap();
        let first_model = program.find("gpt_4o_llm_config = {").unwrap();
        assert!(local_import < environment);
        assert!(environment < first_model);
    }
}

#[cfg(test)]
mod exporter_tests {
    use super::*;

    struct BannerSection;

    impl SectionGenerator for BannerSection {
        fn phase(&self) -> ExportPosition {
            ExportPosition::Chats
        }

        fn export(&self, ctx: &ExportContext<'_>) -> std::result::Result<SectionOutput, ValidationError> {
            let mut output = SectionOutput::default();
            output.add_import("import logging", ImportPosition::Builtin);
            output.add_fragment(
                format!("logging.info(\"{} agents ready\")", ctx.flow.agents().len()),
                Placement::After(ExportPosition::Agents),
            );
            output.add_fragment(
                "# the assistant answers",
                Placement::BeforeAgent("a1".to_string()),
            );
            Ok(output)
        }
    }

    #[test]
    fn test_custom_section() {
        let flow = create_simple_flow();
        let program = Exporter::builder(&flow)
            .with_section(Box::new(BannerSection))
            .build()
            .export()
            .unwrap()
            .program;

        assert!(program.contains("import logging\n"));
        assert!(program.contains("logging.info(\"2 agents ready\")"));
        assert!(program.contains("# the assistant answers\n\nassistant = AssistantAgent("));
    }

    #[test]
    fn test_file_stem_and_skip_aux_files() {
        let flow = create_simple_flow();
        let output = Exporter::builder(&flow)
            .with_file_stem("my flow")
            .with_skip_aux_files(true)
            .build()
            .export()
            .unwrap();

        assert_eq!(output.file_name, "my_flow.py");
        assert!(output.aux_files.is_empty());
        let program = &output.program;
        assert!(!program.contains("_api_keys import"));
        assert!(program.contains("\nimport os\n"));
        assert!(program.contains("\"gpt_4o\": (\"OPENAI_API_KEY\", None),"));
        let accessor = program
            .find("def get_Simple_Flow_model_api_key(model_name: str) -> str:")
            .unwrap();
        let config = program.find("gpt_4o_llm_config = {").unwrap();
        assert!(accessor < config);
    }

    #[test]
    fn test_settings_defaults() {
        let flow = create_simple_flow();
        let exporter = Exporter::new(&flow);
        let settings = exporter.settings();

        assert!(!settings.types_as_comments);
        assert_eq!(settings.cache_seed, Some(42));
        assert_eq!(settings.file_stem, "Simple_Flow");
        assert!(!settings.skip_aux_files);
    }
}
