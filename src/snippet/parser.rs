//! Structural parsing of embedded snippets.
//!
//! The parser groups tokens into logical lines, checks the block structure
//! (every `:`-terminated header owns an indented block, no stray indents,
//! compound statements carry their colon) and recovers the two things the
//! exporter cares about: function definitions and module-level imports.

use super::lexer::{LexError, Token, TokenKind, is_keyword, tokenize};
use crate::error::SyntaxError;

const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
];

/// A single statement line, possibly spanning several physical lines.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    pub tokens: Vec<Token>,
    pub start_line: usize,
    pub end_line: usize,
    pub depth: usize,
}

impl LogicalLine {
    fn first_name(&self) -> Option<&str> {
        self.tokens.first().and_then(Token::name)
    }

    fn ends_with_colon(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.is_op(":"))
    }

    /// Index of the first `:` that is not nested inside brackets.
    fn top_level_colon(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::Op(op) if matches!(op.as_str(), "(" | "[" | "{") => depth += 1,
                TokenKind::Op(op) if matches!(op.as_str(), ")" | "]" | "}") => {
                    depth = depth.saturating_sub(1)
                }
                TokenKind::Op(op) if op == ":" && depth == 0 => return Some(i),
                TokenKind::Name(n) if n == "lambda" && depth == 0 => return None,
                _ => {}
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    Regular,
    VarArgs,
    KeywordOnly,
    VarKeywords,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

/// A `def` statement found anywhere in the snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub is_async: bool,
    /// Nesting depth of the definition; 0 for module-level functions.
    pub depth: usize,
    /// First line of the definition, including decorators.
    pub start_line: usize,
    pub def_line: usize,
    /// Line holding the colon that closes the signature.
    pub signature_end_line: usize,
    /// Set when the body follows the colon on the header line.
    pub inline_body: bool,
    /// Character offset just past the header's colon.
    pub colon_end: usize,
    /// Last line of the function's block.
    pub end_line: usize,
}

impl FunctionDef {
    /// The plain positional-or-keyword arguments, which form the contract.
    pub fn regular_args(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Regular)
            .map(|p| p.name.as_str())
    }
}

/// A module-level `import` / `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStmt {
    pub statement: String,
    /// The referenced module as written, e.g. `os.path` or `..pkg`.
    pub module: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl ImportStmt {
    pub fn is_from_import(&self) -> bool {
        self.statement.starts_with("from ")
    }

    /// The top-level package used to classify the import.
    pub fn root_module(&self) -> &str {
        self.module.split('.').next().unwrap_or("")
    }
}

/// The structural view of a snippet.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    lines: Vec<String>,
    pub functions: Vec<FunctionDef>,
    pub imports: Vec<ImportStmt>,
}

impl ParsedModule {
    /// Physical lines from `start` (1-based) to the end of the snippet.
    pub fn lines_from(&self, start: usize) -> &[String] {
        self.line_range(start, self.lines.len())
    }

    /// Physical lines `start..=end` (1-based, inclusive).
    pub fn line_range(&self, start: usize, end: usize) -> &[String] {
        let start = start.saturating_sub(1).min(self.lines.len());
        let end = end.min(self.lines.len()).max(start);
        &self.lines[start..end]
    }

    /// Finds a function by name, breadth first: shallower definitions win,
    /// then earlier ones.
    pub fn find_function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions
            .iter()
            .filter(|f| f.name == name)
            .min_by_key(|f| (f.depth, f.def_line))
    }
}

/// Parses a snippet, reporting the first structural problem as a [`SyntaxError`].
pub fn parse_module(source: &str) -> Result<ParsedModule, SyntaxError> {
    let to_syntax_error = |e: LexError| SyntaxError {
        message: e.message,
        line: e.line,
        snippet: source.to_string(),
    };
    let tokens = tokenize(source).map_err(to_syntax_error)?;
    let logical = group_logical_lines(tokens).map_err(to_syntax_error)?;
    check_compound_headers(&logical).map_err(to_syntax_error)?;

    let lines: Vec<String> = source.lines().map(str::to_string).collect();
    let mut functions = Vec::new();
    for index in 0..logical.len() {
        if let Some(function) = parse_function(&logical, index).map_err(to_syntax_error)? {
            functions.push(function);
        }
    }
    let imports = logical
        .iter()
        .filter(|l| l.depth == 0)
        .filter_map(|l| parse_import(l, &lines))
        .collect();

    Ok(ParsedModule {
        lines,
        functions,
        imports,
    })
}

fn group_logical_lines(tokens: Vec<Token>) -> Result<Vec<LogicalLine>, LexError> {
    let mut lines: Vec<LogicalLine> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut expect_block: Option<usize> = None;

    for token in tokens {
        match token.kind {
            TokenKind::Newline => {
                let bounds = current.first().zip(current.last()).map(|(f, l)| (f.line, l.end_line));
                if let Some((start_line, end_line)) = bounds {
                    let line = LogicalLine {
                        start_line,
                        end_line,
                        depth,
                        tokens: std::mem::take(&mut current),
                    };
                    if line.ends_with_colon() {
                        expect_block = Some(line.start_line);
                    }
                    lines.push(line);
                }
            }
            TokenKind::Indent => {
                if expect_block.take().is_none() {
                    return Err(LexError {
                        message: "unexpected indent".to_string(),
                        line: token.line,
                    });
                }
                depth += 1;
            }
            TokenKind::Dedent | TokenKind::EndMarker => {
                if let Some(header) = expect_block.take() {
                    return Err(LexError {
                        message: format!("expected an indented block after line {}", header),
                        line: token.line,
                    });
                }
                if token.kind == TokenKind::Dedent {
                    depth = depth.saturating_sub(1);
                }
            }
            _ => {
                if current.is_empty() {
                    if let Some(header) = expect_block.take() {
                        return Err(LexError {
                            message: format!("expected an indented block after line {}", header),
                            line: token.line,
                        });
                    }
                }
                current.push(token);
            }
        }
    }
    Ok(lines)
}

fn check_compound_headers(lines: &[LogicalLine]) -> Result<(), LexError> {
    for line in lines {
        let mut first = line.first_name();
        if first == Some("async") {
            first = line.tokens.get(1).and_then(Token::name);
        }
        let Some(keyword) = first else {
            continue;
        };
        if COMPOUND_KEYWORDS.contains(&keyword) && line.top_level_colon().is_none() {
            return Err(LexError {
                message: "expected ':'".to_string(),
                line: line.end_line,
            });
        }
    }
    Ok(())
}

fn invalid_syntax(line: usize, detail: &str) -> LexError {
    LexError {
        message: format!("invalid syntax: {}", detail),
        line,
    }
}

fn parse_function(lines: &[LogicalLine], index: usize) -> Result<Option<FunctionDef>, LexError> {
    let line = &lines[index];
    let tokens = &line.tokens;
    let (is_async, def_index) = match line.first_name() {
        Some("def") => (false, 0),
        Some("async") if tokens.get(1).is_some_and(|t| t.is_name("def")) => (true, 1),
        _ => return Ok(None),
    };

    let name = match tokens.get(def_index + 1).and_then(Token::name) {
        Some(name) if !is_keyword(name) => name.to_string(),
        _ => return Err(invalid_syntax(line.start_line, "expected a function name")),
    };
    let open = def_index + 2;
    if !tokens.get(open).is_some_and(|t| t.is_op("(")) {
        return Err(invalid_syntax(line.start_line, "expected '(' after the function name"));
    }
    let close = matching_paren(tokens, open)
        .ok_or_else(|| invalid_syntax(line.start_line, "unclosed parameter list"))?;
    let params = parse_params(&tokens[open + 1..close], line.start_line)?;

    let colon = line
        .top_level_colon()
        .filter(|c| *c > close)
        .ok_or_else(|| LexError {
            message: "expected ':'".to_string(),
            line: line.end_line,
        })?;
    let after_paren = &tokens[close + 1..colon];
    if !after_paren.is_empty() && !after_paren[0].is_op("->") {
        return Err(invalid_syntax(tokens[close].line, "unexpected tokens after parameters"));
    }
    let inline_body = colon + 1 < tokens.len();

    let mut start_line = line.start_line;
    let mut cursor = index;
    while cursor > 0 {
        let previous = &lines[cursor - 1];
        if previous.depth == line.depth && previous.tokens.first().is_some_and(|t| t.is_op("@")) {
            start_line = previous.start_line;
            cursor -= 1;
        } else {
            break;
        }
    }

    let end_line = if inline_body {
        line.end_line
    } else {
        lines[index + 1..]
            .iter()
            .take_while(|l| l.depth > line.depth)
            .last()
            .map_or(line.end_line, |l| l.end_line)
    };

    Ok(Some(FunctionDef {
        name,
        params,
        is_async,
        depth: line.depth,
        start_line,
        def_line: line.start_line,
        signature_end_line: tokens[colon].line,
        inline_body,
        colon_end: tokens[colon].end,
        end_line,
    }))
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match &token.kind {
            TokenKind::Op(op) if matches!(op.as_str(), "(" | "[" | "{") => depth += 1,
            TokenKind::Op(op) if matches!(op.as_str(), ")" | "]" | "}") => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Op(op) if matches!(op.as_str(), "(" | "[" | "{") => depth += 1,
            TokenKind::Op(op) if matches!(op.as_str(), ")" | "]" | "}") => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Op(op) if op == "," && depth == 0 => {
                segments.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&tokens[start..]);
    segments
}

fn parse_params(tokens: &[Token], line: usize) -> Result<Vec<Param>, LexError> {
    let mut params: Vec<Param> = Vec::new();
    let mut keyword_only = false;
    let segments = split_top_level_commas(tokens);
    let last = segments.len().saturating_sub(1);

    for (i, segment) in segments.into_iter().enumerate() {
        let Some(head) = segment.first() else {
            if i == last {
                continue;
            }
            return Err(invalid_syntax(line, "empty parameter"));
        };
        if head.is_op("/") && segment.len() == 1 {
            for param in params.iter_mut() {
                if param.kind == ParamKind::Regular {
                    param.kind = ParamKind::PositionalOnly;
                }
            }
            continue;
        }
        if head.is_op("*") && segment.len() == 1 {
            keyword_only = true;
            continue;
        }
        let (kind, name_token, rest) = if head.is_op("*") || head.is_op("**") {
            let kind = if head.is_op("*") {
                ParamKind::VarArgs
            } else {
                ParamKind::VarKeywords
            };
            (kind, segment.get(1), segment.get(2..).unwrap_or(&[]))
        } else {
            let kind = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::Regular
            };
            (kind, Some(head), &segment[1..])
        };
        let name = match name_token.and_then(Token::name) {
            Some(name) if !is_keyword(name) => name.to_string(),
            _ => return Err(invalid_syntax(line, "expected a parameter name")),
        };
        if let Some(next) = rest.first() {
            if !next.is_op(":") && !next.is_op("=") {
                return Err(invalid_syntax(next.line, "unexpected token in parameter list"));
            }
        }
        if params.iter().any(|p| p.name == name) {
            return Err(LexError {
                message: format!("duplicate argument '{}' in function definition", name),
                line,
            });
        }
        if kind == ParamKind::VarArgs {
            keyword_only = true;
        }
        params.push(Param { name, kind });
    }
    Ok(params)
}

fn parse_import(line: &LogicalLine, source_lines: &[String]) -> Option<ImportStmt> {
    let keyword = line.first_name()?;
    let module = match keyword {
        "import" => dotted_name(&line.tokens[1..]),
        "from" => dotted_name(&line.tokens[1..]),
        _ => return None,
    };
    if module.is_empty() {
        return None;
    }
    let start = line.start_line.saturating_sub(1);
    let end = line.end_line.min(source_lines.len());
    let statement = source_lines.get(start..end)?.join("\n").trim().to_string();
    Some(ImportStmt {
        statement,
        module,
        start_line: line.start_line,
        end_line: line.end_line,
    })
}

fn dotted_name(tokens: &[Token]) -> String {
    let mut module = String::new();
    for token in tokens {
        match &token.kind {
            TokenKind::Op(op) if op == "." || op == "..." => module.push_str(op),
            TokenKind::Name(name) if name != "import" && name != "as" => {
                if !module.is_empty() && !module.ends_with('.') {
                    break;
                }
                module.push_str(name);
            }
            _ => break,
        }
    }
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_nested_and_top_level_functions() {
        let source = "def outer(a, b):\n    def inner(c):\n        return c\n    return inner(a)\n";
        let module = parse_module(source).unwrap();
        assert_eq!(module.functions.len(), 2);
        let outer = module.find_function("outer").unwrap();
        assert_eq!(outer.depth, 0);
        assert_eq!(outer.end_line, 4);
        let inner = module.find_function("inner").unwrap();
        assert_eq!(inner.depth, 1);
        assert_eq!(inner.end_line, 3);
    }

    #[test]
    fn test_multiline_signature() {
        let source = "def f(\n    a: int,\n    b: str = \"x\",\n) -> str:\n    return b\n";
        let module = parse_module(source).unwrap();
        let f = module.find_function("f").unwrap();
        assert_eq!(f.signature_end_line, 4);
        assert_eq!(f.regular_args().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_param_kinds() {
        let source = "def f(a, /, b, *args, c, d=1, **kwargs):\n    pass\n";
        let module = parse_module(source).unwrap();
        let kinds: Vec<ParamKind> = module.functions[0].params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::PositionalOnly,
                ParamKind::Regular,
                ParamKind::VarArgs,
                ParamKind::KeywordOnly,
                ParamKind::KeywordOnly,
                ParamKind::VarKeywords,
            ]
        );
    }

    #[test]
    fn test_decorators_extend_the_definition() {
        let source = "import functools\n\n@functools.cache\ndef f(x):\n    return x\n";
        let module = parse_module(source).unwrap();
        let f = module.find_function("f").unwrap();
        assert_eq!(f.start_line, 3);
        assert_eq!(f.def_line, 4);
    }

    #[test]
    fn test_module_level_imports_only() {
        let source = "import os\nfrom typing import (\n    Any,\n    Dict,\n)\n\ndef f():\n    import json\n    return json\n";
        let module = parse_module(source).unwrap();
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.imports[0].statement, "import os");
        assert_eq!(module.imports[1].module, "typing");
        assert_eq!(module.imports[1].end_line, 5);
        assert!(module.imports[1].statement.contains("Dict,"));
    }

    #[test]
    fn test_relative_and_dotted_modules() {
        let module = parse_module("from ..pkg.mod import x\nimport a.b.c as d\n").unwrap();
        assert_eq!(module.imports[0].module, "..pkg.mod");
        assert_eq!(module.imports[1].module, "a.b.c");
        assert_eq!(module.imports[1].root_module(), "a");
    }

    #[test]
    fn test_missing_block() {
        let err = parse_module("def f(x):\nreturn x\n").unwrap_err();
        assert!(err.message.contains("expected an indented block"));
    }

    #[test]
    fn test_unexpected_indent() {
        let err = parse_module("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_missing_colon() {
        let err = parse_module("def f(x)\n    return x\n").unwrap_err();
        assert_eq!(err.message, "expected ':'");
    }

    #[test]
    fn test_duplicate_argument() {
        let err = parse_module("def f(a, a):\n    pass\n").unwrap_err();
        assert!(err.message.contains("duplicate argument 'a'"));
    }

    #[test]
    fn test_inline_body() {
        let module = parse_module("def f(x): return x\n").unwrap();
        assert!(module.functions[0].inline_body);
    }
}
