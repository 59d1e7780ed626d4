//! Rendering of Rust/JSON values as Python literals.

use super::lexer::is_keyword;
use serde_json::Value;

/// A double-quoted Python string literal.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn bool_literal(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Whether `name` can be used as a Python keyword argument.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    valid_start && chars.all(|c| c.is_alphanumeric() || c == '_') && !is_keyword(name)
}

/// Renders a JSON value as a Python expression.
///
/// Containers are laid out one entry per line, indented by four spaces per
/// level starting at `indent`; empty containers stay on one line.
pub fn value_literal(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(b) => bool_literal(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string_literal(s),
        Value::Array(items) if items.is_empty() => "[]".to_string(),
        Value::Array(items) => {
            let pad = "    ".repeat(indent + 1);
            let mut out = String::from("[\n");
            for item in items {
                out.push_str(&format!("{}{},\n", pad, value_literal(item, indent + 1)));
            }
            out.push_str(&"    ".repeat(indent));
            out.push(']');
            out
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let pad = "    ".repeat(indent + 1);
            let mut out = String::from("{\n");
            for (key, item) in map {
                out.push_str(&format!(
                    "{}{}: {},\n",
                    pad,
                    string_literal(key),
                    value_literal(item, indent + 1)
                ));
            }
            out.push_str(&"    ".repeat(indent));
            out.push('}');
            out
        }
    }
}

/// Renders a message-context value. Strings spelling `null`, a boolean or a
/// number become the corresponding Python value.
pub fn context_value_literal(value: &Value, indent: usize) -> String {
    if let Value::String(s) = value {
        match s.as_str() {
            "null" | "None" => return "None".to_string(),
            "true" | "True" => return "True".to_string(),
            "false" | "False" => return "False".to_string(),
            _ => {}
        }
        if let Ok(int) = s.parse::<i64>() {
            return int.to_string();
        }
        if let Ok(float) = s.parse::<f64>() {
            if float.is_finite() {
                return s.trim().to_string();
            }
        }
    }
    value_literal(value, indent)
}

/// A dict display from already-rendered `(key, value)` expressions.
pub fn dict_expr(entries: &[(String, String)], indent: usize) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let pad = "    ".repeat(indent + 1);
    let mut out = String::from("{\n");
    for (key, value) in entries {
        out.push_str(&format!("{}{}: {},\n", pad, key, value));
    }
    out.push_str(&"    ".repeat(indent));
    out.push('}');
    out
}

/// A list display from already-rendered expressions.
pub fn list_expr(items: &[String], indent: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let pad = "    ".repeat(indent + 1);
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&format!("{}{},\n", pad, item));
    }
    out.push_str(&"    ".repeat(indent));
    out.push(']');
    out
}

/// A call with one argument per line, each followed by a comma.
pub fn call_expr(callee: &str, args: &[String], indent: usize) -> String {
    if args.is_empty() {
        return format!("{}()", callee);
    }
    let pad = "    ".repeat(indent + 1);
    let mut out = format!("{}(\n", callee);
    for arg in args {
        out.push_str(&format!("{}{},\n", pad, arg));
    }
    out.push_str(&"    ".repeat(indent));
    out.push(')');
    out
}
