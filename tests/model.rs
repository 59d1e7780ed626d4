//! Flow building and validation tests.
mod common;
use chatweave::error::{
    EntityKind, ExportError, SignatureError, StructuralValidationError, ValidationError,
    ValidationErrors,
};
use chatweave::model::{
    AgentKind, AgentVariant, HumanInputMode, KeywordCriterion, MessageKind, SummaryMethod,
    TerminationPolicy,
};
use chatweave::prelude::*;
use common::*;
use serde_json::json;

fn validation_errors(json: &str) -> ValidationErrors {
    match Flow::from_json(json) {
        Err(ExportError::Validation(errors)) => errors,
        Err(other) => panic!("Expected validation errors, got {:?}", other),
        Ok(_) => panic!("Expected the flow to be rejected"),
    }
}

#[test]
fn test_simple_flow_builds() {
    let flow = create_simple_flow();

    assert_eq!(flow.name, "Simple Flow");
    assert_eq!(flow.agents().len(), 2);
    assert_eq!(flow.chats().len(), 1);
    assert_eq!(flow.cache_seed, Some(42));
    assert!(!flow.is_swarm_flow());
    assert_eq!(flow.order().len(), 1);

    let user = flow.agent("u1").unwrap();
    assert_eq!(user.variant(), AgentVariant::User);
    assert_eq!(user.common.human_input_mode, HumanInputMode::Always);

    let assistant = flow.agent("a1").unwrap();
    assert_eq!(assistant.common.human_input_mode, HumanInputMode::Never);
    match &assistant.common.termination {
        TerminationPolicy::Keyword {
            keywords,
            criterion,
        } => {
            assert_eq!(keywords, &vec!["TERMINATE".to_string()]);
            assert_eq!(*criterion, KeywordCriterion::Ending);
        }
        other => panic!("Expected keyword termination, got {:?}", other),
    }

    let chat = flow.chat("c1").unwrap();
    assert_eq!(chat.message.kind, MessageKind::Text("Hello, world!".to_string()));
    assert_eq!(chat.summary.method, SummaryMethod::LastMessage);
    assert!(chat.summary.summary_args().is_empty());
}

#[test]
fn test_snake_case_keys_are_accepted() {
    let json = json!({
        "name": "Snake",
        "data": {
            "agents": [
                {"id": "u1", "name": "user", "agent_type": "user", "data": {"human_input_mode": "NEVER"}},
                {"id": "a1", "name": "assistant", "agent_type": "assistant", "data": {"model_ids": []}}
            ],
            "chats": [
                {"id": "c1", "data": {"source": "u1", "target": "a1", "order": 0, "message": "Hi", "max_turns": 3}}
            ],
            "is_async": true,
            "cache_seed": null
        }
    })
    .to_string();
    let flow = Flow::from_json(&json).expect("snake_case flow should build");

    assert!(flow.is_async);
    assert_eq!(flow.cache_seed, None);
    assert_eq!(
        flow.agent("u1").unwrap().common.human_input_mode,
        HumanInputMode::Never
    );
    let chat = flow.chat("c1").unwrap();
    assert_eq!(chat.max_turns, Some(3));
    assert_eq!(chat.message.kind, MessageKind::Text("Hi".to_string()));
}

#[test]
fn test_malformed_json_is_rejected() {
    let err = Flow::from_json("{ not json").unwrap_err();
    match err {
        ExportError::Json(_) => {}
        _ => panic!("Expected ExportError::Json, got {:?}", err),
    }
}

#[test]
fn test_disconnected_agent_is_reported() {
    let json = flow_json(
        "Lonely",
        vec![
            user_agent("u1", "user"),
            assistant_agent("a1", "assistant", &[]),
            assistant_agent("a2", "idle", &[]),
        ],
        vec![],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let errors = validation_errors(&json);

    assert_eq!(errors.len(), 1);
    match errors.first() {
        ValidationError::Structural(StructuralValidationError::DisconnectedAgent {
            agent_id,
            agent_name,
        }) => {
            assert_eq!(agent_id, "a2");
            assert_eq!(agent_name, "idle");
        }
        other => panic!("Expected DisconnectedAgent, got {:?}", other),
    }
}

#[test]
fn test_errors_are_aggregated() {
    let json = flow_json(
        "Broken",
        vec![
            user_agent("u1", "user"),
            assistant_agent("a1", "assistant", &["missing-model"]),
            assistant_agent("a2", "idle", &[]),
        ],
        vec![],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let errors = validation_errors(&json);

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::Structural(StructuralValidationError::DisconnectedAgent { .. })
    )));
    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::Referential(r) if r.kind == EntityKind::Model && r.missing_id == "missing-model" && r.referenced_by == "a1"
    )));
    let message = errors.to_string();
    assert!(message.contains("missing-model"));
    assert!(message.contains("a2"));
}

#[test]
fn test_duplicate_ids_are_reported() {
    let json = flow_json(
        "Duplicates",
        vec![
            user_agent("u1", "user"),
            assistant_agent("a1", "assistant", &[]),
            assistant_agent("a1", "twin", &[]),
        ],
        vec![],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let errors = validation_errors(&json);

    match errors.first() {
        ValidationError::Structural(StructuralValidationError::DuplicateId { kind, id }) => {
            assert_eq!(*kind, EntityKind::Agent);
            assert_eq!(id, "a1");
        }
        other => panic!("Expected DuplicateId, got {:?}", other),
    }
}

#[test]
fn test_unknown_chat_endpoint_is_reported() {
    let json = flow_json(
        "Dangling",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &[])],
        vec![],
        vec![],
        vec![
            text_chat("c1", "u1", "a1", "Hello", 0, 0),
            text_chat("c2", "a1", "ghost", "Boo", 1, 1),
        ],
    );
    let errors = validation_errors(&json);

    assert!(errors.iter().any(|e| matches!(
        e,
        ValidationError::Referential(r) if r.kind == EntityKind::Agent && r.missing_id == "ghost" && r.referenced_by == "c2"
    )));
}

#[test]
fn test_unknown_real_endpoint_is_reported() {
    let mut chat = text_chat("c1", "u1", "a1", "Hello", 0, 0);
    chat["data"]["realSource"] = json!("ghost");
    chat["data"]["realTarget"] = json!("a1");
    let json = flow_json(
        "Nested Override",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &[])],
        vec![],
        vec![],
        vec![chat],
    );
    let errors = validation_errors(&json);

    assert_eq!(errors.len(), 1);
    match errors.first() {
        ValidationError::Referential(r) => {
            assert_eq!(r.kind, EntityKind::Agent);
            assert_eq!(r.missing_id, "ghost");
            assert_eq!(r.referenced_by, "c1");
        }
        other => panic!("Expected a referential error, got {:?}", other),
    }
}

#[test]
fn test_bad_termination_signature() {
    let errors = validation_errors(&create_bad_termination_flow_json());

    match errors.first() {
        ValidationError::Signature(SignatureError::ArgumentName {
            function,
            expected,
            found,
        }) => {
            assert_eq!(function, "is_termination_message");
            assert_eq!(expected, "message");
            assert_eq!(found, "msg");
        }
        other => panic!("Expected ArgumentName, got {:?}", other),
    }
}

#[test]
fn test_unknown_agent_type() {
    let mut agent = user_agent("u1", "user");
    agent["agentType"] = json!("robot");
    let json = flow_json(
        "Robots",
        vec![agent, assistant_agent("a1", "assistant", &[])],
        vec![],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let errors = validation_errors(&json);

    match errors.first() {
        ValidationError::Structural(StructuralValidationError::InvalidField {
            kind,
            id,
            field,
            value,
        }) => {
            assert_eq!(*kind, EntityKind::Agent);
            assert_eq!(id, "u1");
            assert_eq!(field, "agent_type");
            assert_eq!(value, "robot");
        }
        other => panic!("Expected InvalidField, got {:?}", other),
    }
}

#[test]
fn test_carryover_message_becomes_method() {
    let mut chat = text_chat("c1", "u1", "a1", "Continue from here: ", 0, 0);
    chat["data"]["message"]["useCarryover"] = json!(true);
    let json = flow_json(
        "Carryover",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &[])],
        vec![],
        vec![],
        vec![chat],
    );
    let flow = Flow::from_json(&json).unwrap();

    match &flow.chat("c1").unwrap().message.kind {
        MessageKind::Method { method, .. } => {
            assert!(method.body().contains("carryover = context.get(\"carryover\", \"\")"));
            assert!(method.body().contains("\"Continue from here: \" + carryover"));
        }
        other => panic!("Expected a method message, got {:?}", other),
    }
}

#[test]
fn test_rag_generator_needs_rag_sender() {
    let mut chat = text_chat("c1", "u1", "a1", "", 0, 0);
    chat["data"]["message"] = json!({"type": "rag_message_generator"});
    let json = flow_json(
        "Rag",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &[])],
        vec![],
        vec![],
        vec![chat],
    );
    let errors = validation_errors(&json);

    match errors.first() {
        ValidationError::Structural(StructuralValidationError::GeneratorWithoutRagSender {
            chat_id,
        }) => assert_eq!(chat_id, "c1"),
        other => panic!("Expected GeneratorWithoutRagSender, got {:?}", other),
    }
}

#[test]
fn test_skill_name_must_match_definition() {
    let mut skill = weather_skill();
    skill["name"] = json!("get_forecast");
    let mut assistant = assistant_agent("a1", "assistant", &[]);
    assistant["data"]["skills"] = json!([{"id": "sk1", "executorId": "u1"}]);
    let json = flow_json(
        "Skills",
        vec![user_agent("u1", "user"), assistant],
        vec![],
        vec![skill],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let errors = validation_errors(&json);

    match errors.first() {
        ValidationError::Structural(StructuralValidationError::SkillDefinitionMissing {
            skill_id,
            expected,
        }) => {
            assert_eq!(skill_id, "sk1");
            assert_eq!(expected, "def get_forecast(");
        }
        other => panic!("Expected SkillDefinitionMissing, got {:?}", other),
    }
}

#[test]
fn test_skill_imports_are_lifted() {
    let mut assistant = assistant_agent("a1", "assistant", &[]);
    assistant["data"]["skills"] = json!([{"id": "sk1", "executorId": "u1"}]);
    let json = flow_json(
        "Skills",
        vec![user_agent("u1", "user"), assistant],
        vec![],
        vec![weather_skill()],
        vec![text_chat("c1", "u1", "a1", "Hello", 0, 0)],
    );
    let flow = Flow::from_json(&json).unwrap();
    let skill = flow.skill("sk1").unwrap();

    assert_eq!(skill.imports().builtin, vec!["import os".to_string()]);
    assert_eq!(skill.imports().third_party, vec!["import requests".to_string()]);
    assert!(skill.content().starts_with("def get_weather("));
    assert!(!skill.content().contains("import requests"));
}

#[test]
fn test_group_manager_kind() {
    let manager = json!({
        "id": "g1",
        "name": "manager",
        "agentType": "group_manager",
        "data": {
            "maxRound": 10,
            "adminName": "user",
            "speakers": {"selectionMethod": "round_robin"},
            "modelIds": []
        }
    });
    let json = flow_json(
        "Group",
        vec![user_agent("u1", "user"), manager],
        vec![],
        vec![],
        vec![text_chat("c1", "u1", "g1", "Start", 0, 0)],
    );
    let flow = Flow::from_json(&json).unwrap();

    match &flow.agent("g1").unwrap().kind {
        AgentKind::GroupManager {
            max_round,
            admin_name,
            ..
        } => {
            assert_eq!(*max_round, Some(10));
            assert_eq!(admin_name.as_deref(), Some("user"));
        }
        other => panic!("Expected a group manager, got {:?}", other),
    }
}
