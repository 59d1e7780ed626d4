//! Rendering of function definitions with enforced signatures.

/// Longest identifier emitted for generated names.
pub const MAX_VAR_NAME_LENGTH: usize = 64;

/// A function signature to render: parameter names paired with their types.
#[derive(Debug, Clone, Copy)]
pub struct Signature<'a> {
    pub name: &'a str,
    pub args: &'a [&'a str],
    pub arg_types: &'a [&'a str],
    pub return_type: &'a str,
}

/// Truncates `name` to [`MAX_VAR_NAME_LENGTH`] characters.
pub fn truncate_identifier(name: &str) -> &str {
    match name.char_indices().nth(MAX_VAR_NAME_LENGTH) {
        Some((cut, _)) => &name[..cut],
        None => name,
    }
}

/// Renders `def name(...)` followed by `body`.
///
/// Types go either inline (`arg: type,`) or, with `types_as_comments`, into
/// per-argument `# type:` comments plus a `# type: (...) -> ret` line. The
/// output always ends with exactly one newline.
pub fn render_function(signature: Signature<'_>, body: &str, types_as_comments: bool) -> String {
    let mut out = format!("def {}(", truncate_identifier(signature.name));
    if !signature.args.is_empty() {
        out.push('\n');
        for (arg, arg_type) in signature.args.iter().zip(signature.arg_types) {
            if types_as_comments {
                out.push_str(&format!("    {},  # type: {}\n", arg, arg_type));
            } else {
                out.push_str(&format!("    {}: {},\n", arg, arg_type));
            }
        }
    }
    out.push(')');
    if types_as_comments {
        out.push_str(":\n    # type: (...) -> ");
        out.push_str(signature.return_type);
    } else {
        out.push_str(" -> ");
        out.push_str(signature.return_type);
        out.push(':');
    }
    if !body.starts_with('\n') {
        out.push('\n');
    }
    out.push_str(body.trim_end_matches('\n'));
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
