//! Concrete parse tree for pyrite
//!
//! A strict ownership tree: interior labels are grammar non-terminal names,
//! leaf labels are token lexemes. Consumers key on the label strings, so
//! they are stable identifiers.

use crate::frontend::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseTreeNode {
    pub label: String,
    pub children: Vec<ParseTreeNode>,
    /// The originating token, kept for leaves built from consumed tokens.
    pub token: Option<Token>,
}

impl ParseTreeNode {
    /// An interior node named after a grammar non-terminal.
    pub fn branch(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
            token: None,
        }
    }

    /// A leaf with a bare label (layout markers, recovery placeholders).
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
            token: None,
        }
    }

    /// A leaf labelled with a consumed token's lexeme.
    pub fn terminal(token: Token) -> Self {
        Self {
            label: token.lexeme.clone(),
            children: Vec::new(),
            token: Some(token),
        }
    }

    pub fn add(&mut self, child: ParseTreeNode) {
        self.children.push(child);
    }

    /// Indented text dump: two spaces per depth, `|- ` prefix.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out, 0);
        out
    }

    fn write_text(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str("|- ");
        out.push_str(&self.label);
        out.push('\n');
        for child in &self.children {
            child.write_text(out, depth + 1);
        }
    }

    /// DOT graph description of the tree, one box node per tree node.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ParseTree {\n    node [shape=box];\n");
        let mut next_id = 0usize;
        self.write_dot(&mut out, &mut next_id, None);
        out.push_str("}\n");
        out
    }

    fn write_dot(&self, out: &mut String, next_id: &mut usize, parent: Option<usize>) {
        let id = *next_id;
        *next_id += 1;

        let safe_label = self.label.replace('"', "\\\"");
        out.push_str(&format!("    node{} [label=\"{}\"];\n", id, safe_label));
        if let Some(parent_id) = parent {
            out.push_str(&format!("    node{} -> node{};\n", parent_id, id));
        }
        for child in &self.children {
            child.write_dot(out, next_id, Some(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParseTreeNode {
        let mut root = ParseTreeNode::branch("program");
        let mut stmt = ParseTreeNode::branch("statement");
        stmt.add(ParseTreeNode::leaf("x"));
        stmt.add(ParseTreeNode::leaf("\"hi\""));
        root.add(stmt);
        root
    }

    #[test]
    fn test_render_text_indents_by_depth() {
        let text = sample().render_text();
        assert_eq!(
            text,
            "|- program\n  |- statement\n    |- x\n    |- \"hi\"\n"
        );
    }

    #[test]
    fn test_dot_export_shape() {
        let dot = sample().to_dot();
        assert!(dot.starts_with("digraph ParseTree {\n    node [shape=box];\n"));
        assert!(dot.contains("    node0 [label=\"program\"];\n"));
        assert!(dot.contains("    node0 -> node1;\n"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_escapes_quotes_in_labels() {
        let dot = sample().to_dot();
        assert!(dot.contains("[label=\"\\\"hi\\\"\"];"));
    }

    #[test]
    fn test_dot_ids_are_preorder() {
        let dot = sample().to_dot();
        assert!(dot.contains("node1 [label=\"statement\"];"));
        assert!(dot.contains("node2 [label=\"x\"];"));
        assert!(dot.contains("node1 -> node2;"));
        assert!(dot.contains("node1 -> node3;"));
    }
}
