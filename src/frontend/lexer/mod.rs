//! Lexer for the pyrite source language
//!
//! Handles tokenization including:
//! - Keywords and identifiers, with lexical scope tagging
//! - Numeric and string literals (single- and triple-quoted)
//! - Longest-match operators and punctuation
//! - Indentation-based blocks (INDENT/DEDENT tokens)
//! - Backslash line continuation
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token) and the keyword table
//! - `strings` - String literal scanning
//! - `numbers` - Numeric literal scanning
//! - `indent` - INDENT/DEDENT handling and scope-stack draining

mod indent;
mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{Token, TokenKind, KEYWORDS};

use crate::frontend::diagnostics::Diagnostic;

/// The fixed operator vocabulary, longest-match first.
fn is_operator(text: &str) -> bool {
    matches!(
        text,
        "+" | "-"
            | "*"
            | "/"
            | "%"
            | "//"
            | "**"
            | "="
            | "=="
            | "!="
            | "<"
            | "<="
            | ">"
            | ">="
            | "+="
            | "-="
            | "*="
            | "/="
            | "%="
            | "//="
            | "**="
            | "|"
            | "&"
            | "^"
            | "~"
            | "<<"
            | ">>"
    )
}

fn is_operator_start(c: u8) -> bool {
    matches!(
        c,
        b'~' | b'+' | b'-' | b'*' | b'/' | b'%' | b'=' | b'!' | b'<' | b'>' | b'&' | b'|' | b'^'
    )
}

fn punctuation_kind(c: u8) -> Option<TokenKind> {
    match c {
        b'(' => Some(TokenKind::LeftParen),
        b')' => Some(TokenKind::RightParen),
        b'[' => Some(TokenKind::LeftBracket),
        b']' => Some(TokenKind::RightBracket),
        b'{' => Some(TokenKind::LeftBrace),
        b'}' => Some(TokenKind::RightBrace),
        b':' => Some(TokenKind::Colon),
        b',' => Some(TokenKind::Comma),
        b'.' => Some(TokenKind::Dot),
        b';' => Some(TokenKind::Semicolon),
        _ => None,
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// An enclosing function or class, recorded when its header is lexed.
///
/// `indent_level` is the indentation width at the header line; the frame is
/// dropped once the indentation engine dedents back to (or below) it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub name: String,
    pub indent_level: usize,
}

// ============================================================================
// LEXER STATE
// ----------------------------------------------------------------------------
// Four pieces of state interact at every line boundary:
//
// [Start of line] → indentation machine → INDENT/DEDENT, scope pops
//        ↑                                      ↓
//   see '\n' ←───────── [Inside code] ── see 'def'/'class' → scope push
//                            ↓
//                   see '\' + '\n' → continuation (skip next indentation)
// ============================================================================

/// Lexer for pyrite source code.
///
/// Converts source text into a token stream plus a list of recoverable
/// diagnostics. Never fails: invalid input is reported and skipped.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    at_line_start: bool,
    line_continuation: bool,
    indent_stack: Vec<usize>,
    scope_stack: Vec<ScopeFrame>,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            at_line_start: true,
            line_continuation: false,
            indent_stack: vec![0],
            scope_stack: Vec::new(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// Always produces a finite token list; errors are reported as
    /// diagnostics and lexing continues. At end of input the indent stack
    /// is drained, emitting one DEDENT per open level.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while self.pos < self.bytes.len() {
            if self.at_line_start && !self.line_continuation {
                self.handle_indentation();
                self.at_line_start = false;
            }

            self.skip_inline_whitespace();
            if self.pos >= self.bytes.len() {
                break;
            }

            let c = self.bytes[self.pos];
            match c {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                    self.at_line_start = true;
                    self.line_continuation = false;
                }
                b'\\' if self.bytes.get(self.pos + 1) == Some(&b'\n') => {
                    // Explicit line continuation: swallow both characters and
                    // skip the next line's indentation processing.
                    self.line_continuation = true;
                    self.pos += 2;
                    self.line += 1;
                    self.at_line_start = true;
                }
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'"' | b'\'' => self.scan_string(),
                c if is_ident_start(c) => self.scan_word(),
                c if c.is_ascii_digit() => self.scan_number(),
                c if is_operator_start(c) => {
                    if !self.scan_operator() {
                        self.invalid_character();
                    }
                }
                c => {
                    if let Some(kind) = punctuation_kind(c) {
                        let lexeme = &self.source[self.pos..self.pos + 1];
                        self.tokens.push(Token::new(kind, lexeme, self.line));
                        self.pos += 1;
                    } else {
                        self.invalid_character();
                    }
                }
            }
        }

        // Close any still-open layout levels at the last line seen.
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", self.line));
        }

        (self.tokens, self.diagnostics)
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn report(&mut self, message: impl Into<String>, line: usize, position: usize) {
        self.diagnostics.push(Diagnostic::new(message, line, position));
    }

    fn invalid_character(&mut self) {
        // Take the full (possibly multi-byte) character so the message and
        // the advance stay aligned.
        let c = self.source[self.pos..].chars().next().unwrap_or('\u{fffd}');
        self.report(format!("Invalid character '{}'", c), self.line, self.pos);
        self.pos += c.len_utf8();
    }

    // ========================================================================
    // Identifiers, keywords, and scope tagging
    // ========================================================================

    fn scan_word(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let word = &self.source[start..self.pos];

        let Some(&kind) = KEYWORDS.get(word) else {
            let scope = self.scope_path();
            self.tokens
                .push(Token::scoped(TokenKind::Identifier, word, self.line, scope));
            return;
        };

        self.tokens.push(Token::new(kind, word, self.line));

        // A def/class header opens a scope named by the identifier that
        // follows. The frame is pushed before the identifier token is
        // emitted, so a definition's own name already lives inside it.
        if kind == TokenKind::Def || kind == TokenKind::Class {
            self.skip_inline_whitespace();
            let name_start = self.pos;
            while self.peek().is_some_and(is_ident_continue) {
                self.pos += 1;
            }
            if name_start < self.pos {
                let name = self.source[name_start..self.pos].to_string();
                let indent_level = *self.indent_stack.last().unwrap_or(&0);
                self.scope_stack.push(ScopeFrame { name: name.clone(), indent_level });
                let scope = self.scope_path();
                self.tokens
                    .push(Token::scoped(TokenKind::Identifier, name, self.line, scope));
            }
        }
    }

    /// The active scope path: innermost-to-outermost frame names joined
    /// with `@`, or `global` when no scope is open.
    fn scope_path(&self) -> String {
        if self.scope_stack.is_empty() {
            return "global".to_string();
        }
        let mut path = String::new();
        for (i, frame) in self.scope_stack.iter().rev().enumerate() {
            if i > 0 {
                path.push('@');
            }
            path.push_str(&frame.name);
        }
        path
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Longest-match operator scan: three characters, then two, then one.
    fn scan_operator(&mut self) -> bool {
        for width in (1..=3).rev() {
            if self.pos + width > self.bytes.len() {
                continue;
            }
            let candidate = &self.source[self.pos..self.pos + width];
            if is_operator(candidate) {
                self.tokens
                    .push(Token::new(TokenKind::Operator, candidate, self.line));
                self.pos += width;
                return true;
            }
        }
        false
    }
}

/// Convenience function to lex a source string.
///
/// Shorthand for `Lexer::new(source).tokenize()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================
