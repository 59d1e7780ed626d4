//! A tokenizer for the Python subset that embedded snippets are written in.
//!
//! The lexer only needs to be precise enough to recover the statement and
//! block structure of a snippet: it understands strings (including prefixed
//! and triple-quoted ones), comments, bracket nesting, explicit and implicit
//! line joining, and indentation. It does not classify operators beyond what
//! the structural parser needs.

use std::fmt;

/// Reserved words that can never be used as identifiers.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "->", ":=", "==", "!=", "<=", ">=", "**", "//", "<<", ">>", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const ONE_CHAR_OPS: &str = "+-*/%@&|^~<>=.,:;";

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number,
    Str,
    Op(String),
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line where the token starts.
    pub line: usize,
    /// 1-based line where the token ends (differs for multi-line strings).
    pub end_line: usize,
    /// Character offset just past the token.
    pub end: usize,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(&self.kind, TokenKind::Op(o) if o == op)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == name)
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// A tokenization failure, located by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    brackets: Vec<(char, usize)>,
    indents: Vec<usize>,
    at_line_start: bool,
    line_has_tokens: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            brackets: Vec::new(),
            indents: vec![0],
            at_line_start: true,
            line_has_tokens: false,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the whole source.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.read_indentation()? {
                    continue;
                }
            }
            let Some(c) = self.peek(0) else {
                break;
            };
            match c {
                ' ' | '\t' | '\x0c' | '\r' => self.pos += 1,
                '\n' => self.newline(),
                '#' => self.skip_comment(),
                '\\' => self.line_continuation()?,
                '\'' | '"' => self.string(self.line)?,
                '(' | '[' | '{' => {
                    self.brackets.push((c, self.line));
                    self.pos += 1;
                    self.push(TokenKind::Op(c.to_string()), self.line);
                }
                ')' | ']' | '}' => self.close_bracket(c)?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                c if c.is_alphabetic() || c == '_' => self.name_or_prefixed_string()?,
                _ => self.operator()?,
            }
        }

        if let Some((open, line)) = self.brackets.last() {
            return Err(LexError {
                message: format!("'{}' was never closed", open),
                line: *line,
            });
        }
        if self.line_has_tokens {
            self.push(TokenKind::Newline, self.line);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.line);
        }
        self.push(TokenKind::EndMarker, self.line);
        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start_line: usize) {
        if !matches!(
            kind,
            TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::EndMarker
        ) {
            self.line_has_tokens = true;
        }
        self.tokens.push(Token {
            kind,
            line: start_line,
            end_line: self.line,
            end: self.pos,
        });
    }

    /// Measures the indentation of a new line. Returns `false` when the line
    /// was blank or comment-only and has been consumed.
    fn read_indentation(&mut self) -> Result<bool, LexError> {
        let mut width = 0;
        while let Some(c) = self.peek(0) {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek(0) {
            None => {
                self.at_line_start = false;
                return Ok(true);
            }
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(false);
            }
            Some('\r') => {
                self.pos += 1;
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                    self.line += 1;
                }
                return Ok(false);
            }
            _ => {}
        }

        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, self.line);
        } else if width < current {
            while self.indents.last().is_some_and(|top| *top > width) {
                self.indents.pop();
                self.push(TokenKind::Dedent, self.line);
            }
            if self.indents.last() != Some(&width) {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    line: self.line,
                });
            }
        }
        self.at_line_start = false;
        Ok(true)
    }

    fn newline(&mut self) {
        self.pos += 1;
        if self.brackets.is_empty() {
            if self.line_has_tokens {
                self.push(TokenKind::Newline, self.line);
            }
            self.line_has_tokens = false;
            self.at_line_start = true;
        }
        self.line += 1;
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn line_continuation(&mut self) -> Result<(), LexError> {
        let next = if self.peek(1) == Some('\r') {
            self.peek(2)
        } else {
            self.peek(1)
        };
        if next != Some('\n') {
            return Err(LexError {
                message: "unexpected character after line continuation character".to_string(),
                line: self.line,
            });
        }
        while self.peek(0) != Some('\n') {
            self.pos += 1;
        }
        self.pos += 1;
        self.line += 1;
        Ok(())
    }

    fn close_bracket(&mut self, close: char) -> Result<(), LexError> {
        let expected = match close {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.brackets.pop() {
            None => Err(LexError {
                message: format!("unmatched '{}'", close),
                line: self.line,
            }),
            Some((open, _)) if open != expected => Err(LexError {
                message: format!(
                    "closing parenthesis '{}' does not match opening parenthesis '{}'",
                    close, open
                ),
                line: self.line,
            }),
            Some(_) => {
                self.pos += 1;
                self.push(TokenKind::Op(close.to_string()), self.line);
                Ok(())
            }
        }
    }

    fn number(&mut self) {
        let start_line = self.line;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
                if matches!(c, 'e' | 'E') && matches!(self.peek(0), Some('+') | Some('-')) {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start_line);
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let quote_follows = matches!(self.peek(0), Some('\'') | Some('"'));
        if quote_follows && STRING_PREFIXES.contains(&word.to_lowercase().as_str()) {
            return self.string(self.line);
        }
        self.push(TokenKind::Name(word), self.line);
        Ok(())
    }

    fn string(&mut self, start_line: usize) -> Result<(), LexError> {
        let quote = self.chars[self.pos];
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };
        loop {
            let Some(c) = self.peek(0) else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(LexError {
                    message: message.to_string(),
                    line: start_line,
                });
            };
            match c {
                '\\' => {
                    if self.peek(1) == Some('\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                '\n' if !triple => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        line: start_line,
                    });
                }
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                c if c == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.push(TokenKind::Str, start_line);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), LexError> {
        let rest: String = self.chars[self.pos..(self.pos + 3).min(self.chars.len())]
            .iter()
            .collect();
        for ops in [THREE_CHAR_OPS, TWO_CHAR_OPS] {
            if let Some(op) = ops.iter().find(|op| rest.starts_with(**op)) {
                self.pos += op.chars().count();
                self.push(TokenKind::Op(op.to_string()), self.line);
                return Ok(());
            }
        }
        let c = self.chars[self.pos];
        if ONE_CHAR_OPS.contains(c) {
            self.pos += 1;
            self.push(TokenKind::Op(c.to_string()), self.line);
            return Ok(());
        }
        Err(LexError {
            message: format!("invalid character '{}'", c),
            line: self.line,
        })
    }
}

/// Convenience wrapper around [`Lexer::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_indent_and_dedent_are_balanced() {
        let tokens = kinds("def f(x):\n    return x\n");
        let indents = tokens.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = tokens.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
        assert_eq!(tokens.last(), Some(&TokenKind::EndMarker));
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = tokenize("x = (\n    1,\n    2,\n)\n").unwrap();
        let newlines = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Newline)
            .count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = tokenize("s = \"\"\"a\nb\nc\"\"\"\n").unwrap();
        let string = tokens.iter().find(|t| t.kind == TokenKind::Str).unwrap();
        assert_eq!(string.line, 1);
        assert_eq!(string.end_line, 3);
    }

    #[test]
    fn test_comment_lines_do_not_affect_indentation() {
        let source = "def f():\n# a comment at column zero\n    return 1\n";
        assert!(tokenize(source).is_ok());
    }

    #[test]
    fn test_prefixed_strings() {
        let tokens = kinds("x = rb'\\d' + f\"{y}\"\n");
        assert_eq!(tokens.iter().filter(|k| **k == TokenKind::Str).count(), 2);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("x = 'abc\n").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unclosed_bracket_reports_opening_line() {
        let err = tokenize("x = [1,\n2,\n").unwrap_err();
        assert_eq!(err.message, "'[' was never closed");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_mismatched_bracket() {
        let err = tokenize("x = (1, 2]\n").unwrap_err();
        assert!(err.message.contains("does not match"));
    }

    #[test]
    fn test_bad_dedent() {
        let err = tokenize("if x:\n        y = 1\n    z = 2\n").unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("x = $y\n").unwrap_err();
        assert_eq!(err.message, "invalid character '$'");
    }
}
