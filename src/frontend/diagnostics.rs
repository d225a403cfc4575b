//! Diagnostics for the pyrite front end
//!
//! Every stage appends to one shared, ordered diagnostic list. Diagnostics
//! are never fatal: the lexer and parser both record and recover.

use std::fmt;

/// A recoverable analysis error with location information.
///
/// `position` is the byte offset into the source where the problem starts.
/// Syntactic diagnostics carry position 0, since tokens only keep their
/// line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub position: usize,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, line: usize, position: usize) -> Self {
        Self {
            message: message.into(),
            line,
            position,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error at line {}, position {}: {}",
            self.line, self.position, self.message
        )
    }
}

/// Render the full diagnostic list, with a count header.
pub fn render(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "No errors found.\n".to_string();
    }

    let mut out = format!("Errors ({}):\n", diagnostics.len());
    for diagnostic in diagnostics {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::new("Unterminated string literal", 3, 17);
        assert_eq!(
            diagnostic.to_string(),
            "Error at line 3, position 17: Unterminated string literal"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "No errors found.\n");
    }

    #[test]
    fn test_render_counts() {
        let diagnostics = vec![
            Diagnostic::new("first", 1, 0),
            Diagnostic::new("second", 2, 4),
        ];
        let rendered = render(&diagnostics);
        assert!(rendered.starts_with("Errors (2):\n"));
        assert!(rendered.contains("Error at line 2, position 4: second"));
    }
}
