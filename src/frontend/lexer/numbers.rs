//! Number scanning for the pyrite lexer

use super::tokens::{Token, TokenKind};
use super::Lexer;

impl<'a> Lexer<'a> {
    /// Scan a numeric literal: digits with at most one `.`.
    ///
    /// A second dot terminates the literal (so `1.2.3` lexes as `1.2`,
    /// `.`, `3`). Decimal integers with leading zeros are rejected.
    pub(super) fn scan_number(&mut self) {
        let start = self.pos;
        let mut has_dot = false;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == b'.' {
                if has_dot {
                    break;
                }
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = &self.source[start..self.pos];

        // `0` (and strings of zeros) are fine; `007` is not.
        let nonzero = text.bytes().any(|c| c != b'0' && c != b'.');
        if !has_dot && text.starts_with('0') && nonzero {
            self.report(
                "leading zeros in decimal integer literals are not permitted",
                self.line,
                start,
            );
            return;
        }

        self.tokens.push(Token::new(TokenKind::Number, text, self.line));
    }
}
