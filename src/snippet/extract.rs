//! Validation of embedded functions against a name/argument contract.

use super::parser::{FunctionDef, ImportStmt, ParsedModule, parse_module};
use crate::error::{SignatureError, ValidationError};

/// A validated function: its body plus the snippet's module-level imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFunction {
    pub body: String,
    pub imports: Vec<ImportStmt>,
}

/// Checks that `code` defines `expected_name(expected_args...)` and returns
/// the function's body, verbatim, without the signature.
pub fn validate_and_extract(
    code: &str,
    expected_name: &str,
    expected_args: &[&str],
) -> Result<String, ValidationError> {
    extract_function(code, expected_name, expected_args).map(|f| f.body)
}

/// Like [`validate_and_extract`], keeping the snippet's imports as well.
///
/// The first definition found breadth first decides the outcome: a nested
/// function with the right name is only considered when no shallower one
/// exists.
pub fn extract_function(
    code: &str,
    expected_name: &str,
    expected_args: &[&str],
) -> Result<ExtractedFunction, ValidationError> {
    let module = parse_module(code)?;
    let function = module.find_function(expected_name).ok_or_else(|| {
        SignatureError::MissingFunction {
            function: expected_name.to_string(),
            expected_args: expected_args.iter().map(|a| a.to_string()).collect(),
        }
    })?;
    check_arguments(function, expected_args)?;
    let body = function_body(code, &module, function);
    if body.trim().is_empty() {
        return Err(SignatureError::EmptyBody {
            function: function.name.clone(),
        }
        .into());
    }
    Ok(ExtractedFunction {
        body,
        imports: module.imports.clone(),
    })
}

fn check_arguments(function: &FunctionDef, expected_args: &[&str]) -> Result<(), SignatureError> {
    let found: Vec<&str> = function.regular_args().collect();
    if found.len() != expected_args.len() {
        return Err(SignatureError::ArgumentCount {
            function: function.name.clone(),
            expected: expected_args.len(),
            found: found.len(),
        });
    }
    if let Some((found, expected)) = found
        .iter()
        .zip(expected_args)
        .find(|(found, expected)| found != expected)
    {
        return Err(SignatureError::ArgumentName {
            function: function.name.clone(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Everything after the signature up to the end of the snippet, with
/// surrounding blank lines removed. Module-level helpers that follow the
/// function stay with it.
fn function_body(code: &str, module: &ParsedModule, function: &FunctionDef) -> String {
    if function.inline_body {
        let rest: String = code
            .chars()
            .skip(function.colon_end)
            .take_while(|c| *c != '\n')
            .collect();
        return format!("    {}", rest.trim());
    }
    let lines = module.lines_from(function.signature_end_line + 1);
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].join("\n"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    #[test]
    fn test_extracts_body_with_comments_and_docstring() {
        let code = "def callable_message(sender, recipient, context):\n    \"\"\"Doc.\"\"\"\n    # say hi\n    return 'hi'\n";
        let body = validate_and_extract(code, "callable_message", &["sender", "recipient", "context"])
            .unwrap();
        assert_eq!(body, "    \"\"\"Doc.\"\"\"\n    # say hi\n    return 'hi'");
    }

    #[test]
    fn test_body_keeps_trailing_helpers() {
        let code = "def callable_message(sender, recipient, context):\n    return helper()\n\n\ndef helper():\n    return \"hi\"\n";
        let body = validate_and_extract(code, "callable_message", &["sender", "recipient", "context"])
            .unwrap();
        assert_eq!(body, "    return helper()\n\n\ndef helper():\n    return \"hi\"");
    }

    #[test]
    fn test_body_keeps_trailing_comment() {
        let body = validate_and_extract("def f(x):\n    return x\n    # keep me\n\n", "f", &["x"]).unwrap();
        assert_eq!(body, "    return x\n    # keep me");
    }

    #[test]
    fn test_multiline_signature_body() {
        let code = "def f(\n    x,\n    y,\n):\n\n    return x + y\n\n";
        let body = validate_and_extract(code, "f", &["x", "y"]).unwrap();
        assert_eq!(body, "    return x + y");
    }

    #[test]
    fn test_inline_body_is_indented() {
        let body = validate_and_extract("def f(x): return x", "f", &["x"]).unwrap();
        assert_eq!(body, "    return x");
    }

    #[test]
    fn test_keeps_module_imports() {
        let code = "import json\n\ndef f(x):\n    return json.dumps(x)\n";
        let extracted = extract_function(code, "f", &["x"]).unwrap();
        assert_eq!(extracted.imports.len(), 1);
        assert_eq!(extracted.imports[0].statement, "import json");
    }

    #[test]
    fn test_missing_function() {
        let err = validate_and_extract("def g(x):\n    return x\n", "f", &["x"]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Signature(SignatureError::MissingFunction { .. })
        ));
    }

    #[test]
    fn test_wrong_argument_count() {
        let err = validate_and_extract("def f(x):\n    return x\n", "f", &["x", "y"]).unwrap_err();
        match err {
            ValidationError::Signature(SignatureError::ArgumentCount { expected, found, .. }) => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("Expected ArgumentCount, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_argument_name_reports_first_mismatch() {
        let err =
            validate_and_extract("def f(a, b, c):\n    return a\n", "f", &["a", "x", "y"]).unwrap_err();
        match err {
            ValidationError::Signature(SignatureError::ArgumentName { found, expected, .. }) => {
                assert_eq!(found, "b");
                assert_eq!(expected, "x");
            }
            other => panic!("Expected ArgumentName, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_embeds_snippet() {
        let code = "def f(x):\n    return (x\n";
        let err = validate_and_extract(code, "f", &["x"]).unwrap_err();
        match err {
            ValidationError::Syntax(SyntaxError { snippet, .. }) => assert_eq!(snippet, code),
            other => panic!("Expected SyntaxError, got {:?}", other),
        }
    }
}
