//! Common test utilities for building flow descriptions.
use chatweave::prelude::*;
use serde_json::{Value, json};

/// A user agent with the given id and name.
#[allow(dead_code)]
pub fn user_agent(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("The {} agent", name),
        "agentType": "user",
        "data": {
            "humanInputMode": "ALWAYS",
            "maxConsecutiveAutoReply": null,
            "modelIds": []
        }
    })
}

/// An assistant agent using the given models.
#[allow(dead_code)]
pub fn assistant_agent(id: &str, name: &str, model_ids: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("The {} agent", name),
        "agentType": "assistant",
        "data": {
            "systemMessage": "You are a helpful assistant.",
            "modelIds": model_ids,
            "termination": {"type": "keyword", "keywords": ["TERMINATE"], "criterion": "ending"}
        }
    })
}

#[allow(dead_code)]
pub fn swarm_agent(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("The {} agent", name),
        "agentType": "swarm",
        "data": {"modelIds": ["m1"]}
    })
}

#[allow(dead_code)]
pub fn openai_model() -> Value {
    json!({
        "id": "m1",
        "name": "gpt-4o",
        "data": {"apiType": "openai", "model": "gpt-4o", "temperature": 0.5}
    })
}

/// A chat with a plain text message.
#[allow(dead_code)]
pub fn text_chat(id: &str, source: &str, target: &str, text: &str, order: i32, position: i32) -> Value {
    json!({
        "id": id,
        "data": {
            "name": format!("{}_chat", id),
            "source": source,
            "target": target,
            "order": order,
            "position": position,
            "message": {"type": "string", "content": text}
        }
    })
}

/// Wraps entities into a complete flow description.
#[allow(dead_code)]
pub fn flow_json(name: &str, agents: Vec<Value>, models: Vec<Value>, skills: Vec<Value>, chats: Vec<Value>) -> String {
    json!({
        "id": "flow-1",
        "name": name,
        "description": "A test flow",
        "tags": ["test"],
        "requirements": [],
        "data": {
            "agents": agents,
            "models": models,
            "skills": skills,
            "chats": chats,
            "isAsync": false,
            "cacheSeed": 42
        }
    })
    .to_string()
}

/// A user and an assistant with one "Hello, world!" chat between them.
#[allow(dead_code)]
pub fn create_simple_flow_json() -> String {
    flow_json(
        "Simple Flow",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &["m1"])],
        vec![openai_model()],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello, world!", 0, 0)],
    )
}

#[allow(dead_code)]
pub fn create_simple_flow() -> Flow {
    Flow::from_json(&create_simple_flow_json()).expect("simple flow should be valid")
}

/// Three agents chatting in sequence; the second chat reflects on the first.
#[allow(dead_code)]
pub fn create_sequential_flow_json(is_async: bool) -> String {
    let mut second = text_chat("c2", "a1", "a2", "Review it.", 1, 1);
    second["data"]["summary"] = json!({
        "method": "reflection_with_llm",
        "prompt": "Summarize the review.",
        "args": {"max_tokens": "100"}
    });
    second["data"]["prerequisites"] = json!(["c1"]);
    let mut flow: Value = serde_json::from_str(&flow_json(
        "Sequential Flow",
        vec![
            user_agent("u1", "user"),
            assistant_agent("a1", "writer", &["m1"]),
            assistant_agent("a2", "reviewer", &["m1"]),
        ],
        vec![openai_model()],
        vec![],
        vec![
            // listed out of order on purpose
            second,
            text_chat("c1", "u1", "a1", "Write a poem.", 0, 0),
        ],
    ))
    .expect("fixture is valid JSON");
    flow["data"]["isAsync"] = json!(is_async);
    flow.to_string()
}

/// A user and two swarm agents. The `order = 2` swarm-to-swarm chat must
/// win over the `position = 0` user-to-swarm chat, which has no order.
#[allow(dead_code)]
pub fn create_swarm_flow_json() -> String {
    let mut entry = text_chat("c2", "s1", "s2", "Plan the trip.", 2, 1);
    entry["data"]["contextVariables"] = json!({"budget": 1000});
    flow_json(
        "Swarm Flow",
        vec![
            user_agent("u1", "traveler"),
            swarm_agent("s1", "planner"),
            swarm_agent("s2", "booker"),
        ],
        vec![openai_model()],
        vec![],
        vec![text_chat("c1", "u1", "s1", "Hi", -1, 0), entry],
    )
}

/// A custom skill named `get_weather` with a secret and a third-party import.
#[allow(dead_code)]
pub fn weather_skill() -> Value {
    json!({
        "id": "sk1",
        "name": "get_weather",
        "description": "Get the weather for a city.",
        "requirements": ["requests"],
        "data": {
            "content": "import os\nimport requests\n\n\ndef get_weather(city: str) -> str:\n    \"\"\"Get the weather.\"\"\"\n    return requests.get(os.environ[\"WEATHER_URL\"] + city).text\n",
            "secrets": {"WEATHER_URL": "https://weather.example/"}
        }
    })
}

/// An assistant whose termination check names its argument `msg`.
#[allow(dead_code)]
pub fn create_bad_termination_flow_json() -> String {
    let mut assistant = assistant_agent("a1", "assistant", &["m1"]);
    assistant["data"]["termination"] = json!({
        "type": "method",
        "methodContent": "def is_termination_message(msg):\n    return msg.get(\"content\") == \"bye\"\n"
    });
    flow_json(
        "Bad Flow",
        vec![user_agent("u1", "user"), assistant],
        vec![openai_model()],
        vec![],
        vec![text_chat("c1", "u1", "a1", "Hello, world!", 0, 0)],
    )
}

/// A chat whose message builder names its second argument `receiver`.
#[allow(dead_code)]
pub fn create_bad_message_flow_json() -> String {
    let mut chat = text_chat("c1", "u1", "a1", "", 0, 0);
    chat["data"]["message"] = json!({
        "type": "method",
        "content": "def callable_message(sender, receiver, context):\n    return \"Hello from \" + sender.name\n"
    });
    flow_json(
        "Bad Message Flow",
        vec![user_agent("u1", "user"), assistant_agent("a1", "assistant", &["m1"])],
        vec![openai_model()],
        vec![],
        vec![chat],
    )
}
