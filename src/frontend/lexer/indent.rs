//! Indentation handling for the pyrite lexer
//!
//! Emits INDENT/DEDENT tokens at line starts and keeps the scope stack
//! synchronized with dedents.

use super::tokens::{Token, TokenKind};
use super::Lexer;

impl<'a> Lexer<'a> {
    /// Run the indentation machine at the start of a physical line.
    ///
    /// Counts leading spaces and tabs (tab = 4 spaces), compares the width
    /// against the indent stack, and emits layout tokens. Blank lines emit
    /// nothing. Scope frames whose level is reached are dropped on every pop.
    pub(super) fn handle_indentation(&mut self) {
        let start = self.pos;
        let mut spaces = 0usize;
        let mut tabs = 0usize;

        while let Some(c) = self.peek() {
            match c {
                b' ' => spaces += 1,
                b'\t' => tabs += 1,
                _ => break,
            }
            self.pos += 1;
        }

        if spaces > 0 && tabs > 0 {
            self.report("Mixed tabs and spaces in indentation", self.line, start);
        }

        // Blank line (or trailing whitespace at end of input): no layout.
        if self.peek().is_none() || self.peek() == Some(b'\n') {
            return;
        }

        let new_indent = tabs * 4 + spaces;
        let current = *self.indent_stack.last().unwrap_or(&0);

        if new_indent > current {
            self.indent_stack.push(new_indent);
            self.tokens.push(Token::new(TokenKind::Indent, "", self.line));
        } else if new_indent < current {
            // Pop until we land on (or pass) the new width, one DEDENT per
            // pop; scopes opened at the abandoned levels close with them.
            while self
                .indent_stack
                .last()
                .is_some_and(|&top| top > new_indent)
            {
                self.indent_stack.pop();
                self.tokens.push(Token::new(TokenKind::Dedent, "", self.line));

                let floor = *self.indent_stack.last().unwrap_or(&0);
                while self
                    .scope_stack
                    .last()
                    .is_some_and(|frame| frame.indent_level >= floor)
                {
                    self.scope_stack.pop();
                }
            }

            if *self.indent_stack.last().unwrap_or(&0) != new_indent {
                self.report("Unindent does not match outer level", self.line, start);
            }
        }
    }
}
