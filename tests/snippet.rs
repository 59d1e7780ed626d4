//! Snippet extraction, rendering and import handling through the public API.
use chatweave::error::{SignatureError, ValidationError};
use chatweave::snippet::{
    Signature, classify_and_merge, render_function, sort_imports, validate_and_extract,
};
use itertools::Itertools;

const TERMINATION: &str = r#"import re

def is_termination_message(message):
    # stop when the assistant says so
    content = message.get("content", "") or ""
    return re.search(r"\bDONE\b", content) is not None
"#;

#[test]
fn test_extract_then_render() {
    let body = validate_and_extract(TERMINATION, "is_termination_message", &["message"]).unwrap();
    assert!(body.starts_with("    # stop when the assistant says so"));

    let rendered = render_function(
        Signature {
            name: "is_termination_message_assistant",
            args: &["message"],
            arg_types: &["Dict[str, Any]"],
            return_type: "bool",
        },
        &body,
        false,
    );
    assert_eq!(
        rendered,
        "def is_termination_message_assistant(\n    message: Dict[str, Any],\n) -> bool:\n    # stop when the assistant says so\n    content = message.get(\"content\", \"\") or \"\"\n    return re.search(r\"\\bDONE\\b\", content) is not None\n"
    );
}

#[test]
fn test_render_is_deterministic() {
    let signature = Signature {
        name: "callable_message_chat",
        args: &["sender", "recipient", "context"],
        arg_types: &["ConversableAgent", "ConversableAgent", "Dict[str, Any]"],
        return_type: "Union[Dict[str, Any], str]",
    };
    for types_as_comments in [false, true] {
        let first = render_function(signature, "    return \"hi\"", types_as_comments);
        let second = render_function(signature, "    return \"hi\"", types_as_comments);
        assert_eq!(first, second);
        assert!(first.ends_with("return \"hi\"\n"));
        assert!(!first.ends_with("\n\n"));
    }
}

#[test]
fn test_wrong_argument_name() {
    let code = "def callable_message(sender, receiver, context):\n    return \"\"\n";
    let err = validate_and_extract(code, "callable_message", &["sender", "recipient", "context"])
        .unwrap_err();
    match err {
        ValidationError::Signature(SignatureError::ArgumentName { expected, found, .. }) => {
            assert_eq!(expected, "recipient");
            assert_eq!(found, "receiver");
        }
        _ => panic!("Expected ArgumentName, got {:?}", err),
    }
}

#[test]
fn test_syntax_error_is_reported() {
    let code = "def callable_message(sender, recipient, context)\n    return \"\"\n";
    let err = validate_and_extract(code, "callable_message", &["sender", "recipient", "context"])
        .unwrap_err();
    match err {
        ValidationError::Syntax(e) => {
            assert_eq!(e.message, "expected ':'");
            assert!(e.to_string().contains("def callable_message"));
        }
        _ => panic!("Expected a syntax error, got {:?}", err),
    }
}

#[test]
fn test_import_order_is_permutation_stable() {
    let statements = [
        "import sys",
        "from typing import Any",
        "import os",
        "from autogen import AssistantAgent",
    ];
    let expected = sort_imports(statements);
    assert_eq!(
        expected,
        vec![
            "import os",
            "import sys",
            "from autogen import AssistantAgent",
            "from typing import Any",
        ]
    );
    for permutation in statements.iter().copied().permutations(statements.len()) {
        assert_eq!(sort_imports(permutation), expected);
    }
}

#[test]
fn test_classify_and_merge_across_snippets() {
    let first = "import os\nimport requests\n\ndef a():\n    pass\n";
    let second = "from os import path\nimport numpy as np\nimport os\n";
    let merged = classify_and_merge([first, second], &["from autogen import register_function"])
        .unwrap();

    assert_eq!(merged.builtin, vec!["import os", "from os import path"]);
    assert_eq!(
        merged.third_party,
        vec![
            "import numpy as np",
            "import requests",
            "from autogen import register_function",
        ]
    );
}
