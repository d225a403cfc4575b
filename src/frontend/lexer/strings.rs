//! String literal scanning for the pyrite lexer
//!
//! Handles single-line and triple-quoted strings. Emitted lexemes keep
//! their surrounding quotes verbatim.

use super::tokens::{Token, TokenKind};
use super::Lexer;

impl<'a> Lexer<'a> {
    /// Dispatch on the quote character at the cursor: a tripled opener
    /// starts a multi-line literal, anything else a single-line one.
    pub(super) fn scan_string(&mut self) {
        let quote = self.bytes[self.pos];
        let tripled = self.bytes.get(self.pos + 1) == Some(&quote)
            && self.bytes.get(self.pos + 2) == Some(&quote);
        if tripled {
            self.scan_triple_string(quote);
        } else {
            self.scan_single_string(quote);
        }
    }

    fn scan_triple_string(&mut self, quote: u8) {
        let start = self.pos;
        let start_line = self.line;
        self.pos += 3;

        loop {
            let Some(c) = self.peek() else {
                self.report("Unterminated triple-quoted string", start_line, start);
                return;
            };

            if c == b'\\' {
                // Escape: skip the backslash and the character it guards.
                self.pos = (self.pos + 2).min(self.bytes.len());
                continue;
            }

            if c == quote
                && self.bytes.get(self.pos + 1) == Some(&quote)
                && self.bytes.get(self.pos + 2) == Some(&quote)
            {
                self.pos += 3;
                let lexeme = &self.source[start..self.pos];
                self.tokens
                    .push(Token::new(TokenKind::StringLiteral, lexeme, start_line));
                return;
            }

            if c == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
    }

    fn scan_single_string(&mut self, quote: u8) {
        let start = self.pos;
        let start_line = self.line;
        self.pos += 1;

        loop {
            let Some(c) = self.peek() else {
                self.report("Unterminated string literal", start_line, start);
                return;
            };

            if c == b'\\' {
                self.pos = (self.pos + 2).min(self.bytes.len());
                continue;
            }

            if c == b'\n' {
                // The newline is consumed with the broken literal.
                self.pos += 1;
                self.report("Unterminated string literal", start_line, start);
                return;
            }

            self.pos += 1;
            if c == quote {
                let lexeme = &self.source[start..self.pos];
                self.tokens
                    .push(Token::new(TokenKind::StringLiteral, lexeme, start_line));
                return;
            }
        }
    }
}
