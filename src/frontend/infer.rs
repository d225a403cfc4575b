//! Assignment-driven type and value inference
//!
//! A single semi-structured pass over the token stream that populates the
//! symbol table: `def`/`class` headers name functions and classes, simple
//! and multiple assignments bind inferred types and literal values, and
//! every other identifier sighting bumps its usage count.
//!
//! This is deliberately not a parse: the pass scans comma lists and looks
//! for a following `=` without consulting line boundaries, so a stray
//! `a, b` expression followed by an `=` further on can be read as an
//! assignment. That trade-off is accepted.

use crate::frontend::lexer::{Token, TokenKind};
use crate::frontend::symbols::{SymbolTable, TypeTag};

/// Populate `table` from `tokens` in one left-to-right pass.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn infer(tokens: &[Token], table: &mut SymbolTable) {
    Inferrer::new(tokens, table).run();
}

struct Inferrer<'a> {
    tokens: &'a [Token],
    pos: usize,
    table: &'a mut SymbolTable,
    /// Pending `def`/`class` waiting for the identifier it names.
    last_keyword: Option<TokenKind>,
}

impl<'a> Inferrer<'a> {
    fn new(tokens: &'a [Token], table: &'a mut SymbolTable) -> Self {
        Self {
            tokens,
            pos: 0,
            table,
            last_keyword: None,
        }
    }

    fn run(&mut self) {
        while self.pos < self.tokens.len() {
            match self.tokens[self.pos].kind {
                TokenKind::Def | TokenKind::Class => {
                    self.last_keyword = Some(self.tokens[self.pos].kind);
                    self.pos += 1;
                }
                TokenKind::Identifier => self.identifier(),
                _ => self.pos += 1,
            }
        }
    }

    fn identifier(&mut self) {
        let token = self.tokens[self.pos].clone();
        match self.last_keyword {
            Some(TokenKind::Def) => {
                self.table
                    .add_symbol(&token.lexeme, TypeTag::Function, token.line, &token.scope, "");
                self.last_keyword = None;
                self.pos += 1;
            }
            Some(TokenKind::Class) => {
                self.table
                    .add_symbol(&token.lexeme, TypeTag::Class, token.line, &token.scope, "");
                self.last_keyword = None;
                self.pos += 1;
            }
            _ => {
                if !self.try_assignment() {
                    self.reference(&token);
                    self.pos += 1;
                }
            }
        }
    }

    /// Recognize `lhs [, lhs]* = rhs [, rhs]*` starting at the cursor.
    ///
    /// Returns false (cursor untouched) when no `=` follows the identifier
    /// list. On a match, binds RHS entries to LHS names positionally;
    /// mismatched counts leave the extras alone.
    fn try_assignment(&mut self) -> bool {
        let mut cursor = self.pos;
        let mut lhs: Vec<Token> = Vec::new();

        while cursor < self.tokens.len() {
            if self.tokens[cursor].kind != TokenKind::Identifier {
                break;
            }
            lhs.push(self.tokens[cursor].clone());
            cursor += 1;
            if cursor < self.tokens.len() && self.tokens[cursor].kind == TokenKind::Comma {
                cursor += 1;
            } else {
                break;
            }
        }

        let at_assign = cursor < self.tokens.len()
            && self.tokens[cursor].kind == TokenKind::Operator
            && self.tokens[cursor].lexeme == "=";
        if !at_assign {
            return false;
        }
        cursor += 1;

        let mut rhs: Vec<(TypeTag, String)> = Vec::new();
        while cursor < self.tokens.len() {
            rhs.push(self.eval_expression(&mut cursor));
            if cursor < self.tokens.len() && self.tokens[cursor].kind == TokenKind::Comma {
                cursor += 1;
            } else {
                break;
            }
        }

        for (j, var) in lhs.iter().enumerate() {
            if self.table.exists(&var.lexeme, &var.scope) {
                self.table.bump_usage(&var.lexeme, &var.scope);
            } else {
                self.table
                    .add_symbol(&var.lexeme, TypeTag::Unknown, var.line, &var.scope, "");
            }
            if let Some((type_tag, value)) = rhs.get(j) {
                if type_tag.is_known() {
                    self.table.update_type(&var.lexeme, &var.scope, *type_tag);
                }
                if !value.is_empty() {
                    self.table.update_value(&var.lexeme, &var.scope, value);
                }
            }
        }

        self.pos = cursor;
        true
    }

    fn reference(&mut self, token: &Token) {
        if self.table.exists(&token.lexeme, &token.scope) {
            self.table.bump_usage(&token.lexeme, &token.scope);
        } else {
            self.table
                .add_symbol(&token.lexeme, TypeTag::Unknown, token.line, &token.scope, "");
        }
    }

    // ========================================================================
    // Expression evaluation
    // ========================================================================

    /// Evaluate one operand, then fold further `+ - * /` operands into it
    /// by type unification. The literal value survives only for a
    /// single-operand expression.
    fn eval_expression(&mut self, cursor: &mut usize) -> (TypeTag, String) {
        let (mut type_tag, mut value) = self.eval_operand(cursor);

        while *cursor < self.tokens.len() {
            let token = &self.tokens[*cursor];
            let arithmetic = token.kind == TokenKind::Operator
                && matches!(token.lexeme.as_str(), "+" | "-" | "*" | "/");
            if !arithmetic {
                break;
            }
            *cursor += 1;
            let (next_tag, _) = self.eval_operand(cursor);
            type_tag = unify(type_tag, next_tag);
            value.clear();
        }

        (type_tag, value)
    }

    /// Evaluate a single operand, advancing the cursor past it.
    fn eval_operand(&mut self, cursor: &mut usize) -> (TypeTag, String) {
        if *cursor >= self.tokens.len() {
            return (TypeTag::Unknown, String::new());
        }

        let token = self.tokens[*cursor].clone();
        match token.kind {
            TokenKind::Number => {
                *cursor += 1;
                let tag = if token.lexeme.contains('.') {
                    TypeTag::Float
                } else {
                    TypeTag::Int
                };
                (tag, token.lexeme)
            }
            TokenKind::StringLiteral => {
                *cursor += 1;
                (TypeTag::Str, token.lexeme)
            }
            TokenKind::True | TokenKind::False => {
                *cursor += 1;
                (TypeTag::Bool, token.lexeme)
            }
            TokenKind::Identifier => {
                let known_type = self.table.get_type(&token.lexeme, &token.scope);
                let known_value = self.table.get_value(&token.lexeme, &token.scope);
                self.reference(&token);
                *cursor += 1;
                let value = if known_type.is_known() {
                    known_value
                } else {
                    String::new()
                };
                (known_type, value)
            }
            TokenKind::LeftParen => self.eval_parenthesized(cursor),
            TokenKind::LeftBracket => {
                // List literal: the value text is the raw member lexemes.
                let mut value = String::from("[");
                *cursor += 1;
                while *cursor < self.tokens.len()
                    && self.tokens[*cursor].kind != TokenKind::RightBracket
                {
                    value.push_str(&self.tokens[*cursor].lexeme);
                    *cursor += 1;
                }
                if *cursor < self.tokens.len() {
                    *cursor += 1;
                }
                value.push(']');
                (TypeTag::List, value)
            }
            TokenKind::LeftBrace => {
                // A top-level `:` makes it a dictionary, otherwise a set.
                let mut value = String::from("{");
                let mut is_set = true;
                *cursor += 1;
                while *cursor < self.tokens.len()
                    && self.tokens[*cursor].kind != TokenKind::RightBrace
                {
                    if self.tokens[*cursor].kind == TokenKind::Colon {
                        is_set = false;
                    }
                    value.push_str(&self.tokens[*cursor].lexeme);
                    *cursor += 1;
                }
                if *cursor < self.tokens.len() {
                    *cursor += 1;
                }
                value.push('}');
                let tag = if is_set { TypeTag::Set } else { TypeTag::Dictionary };
                (tag, value)
            }
            _ => {
                *cursor += 1;
                (TypeTag::Unknown, String::new())
            }
        }
    }

    /// `( ... )`: a tuple, unless the content reduces to exactly one
    /// element, in which case the element's type wins.
    fn eval_parenthesized(&mut self, cursor: &mut usize) -> (TypeTag, String) {
        let mut value = String::from("(");
        let mut element_types: Vec<TypeTag> = Vec::new();
        *cursor += 1;

        while *cursor < self.tokens.len() && self.tokens[*cursor].kind != TokenKind::RightParen {
            let (element_type, element_value) = self.eval_expression(cursor);
            element_types.push(element_type);
            value.push_str(&element_value);
            if *cursor < self.tokens.len() && self.tokens[*cursor].kind == TokenKind::Comma {
                value.push(',');
                *cursor += 1;
            } else {
                break;
            }
        }

        if *cursor < self.tokens.len() && self.tokens[*cursor].kind == TokenKind::RightParen {
            *cursor += 1;
            value.push(')');
            if element_types.len() == 1 {
                (element_types[0], value)
            } else {
                (TypeTag::Tuple, value)
            }
        } else {
            (TypeTag::Unknown, value)
        }
    }
}

/// Unify two inferred types into the most specific common one.
///
/// `unknown` defers to the other side; `float` absorbs other numerics;
/// strings mix with nothing; equal types survive; everything else decays
/// to `unknown`.
pub fn unify(t1: TypeTag, t2: TypeTag) -> TypeTag {
    use TypeTag::*;

    if t1 == Unknown && t2 == Unknown {
        return Unknown;
    }
    if t1 == Unknown {
        return t2;
    }
    if t2 == Unknown {
        return t1;
    }

    if t1 == Float || t2 == Float {
        if t1 == Str || t2 == Str || t1 == Bool || t2 == Bool {
            return Unknown;
        }
        return Float;
    }

    if t1 == Int && t2 == Int {
        return Int;
    }
    if t1 == Bool && t2 == Bool {
        return Bool;
    }

    if t1 == Str && t2 != Str {
        return Unknown;
    }
    if t2 == Str && t1 != Str {
        return Unknown;
    }

    if t1 == t2 {
        return t1;
    }
    Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer;

    fn table_for(source: &str) -> SymbolTable {
        let (tokens, _) = lexer::lex(source);
        let mut table = SymbolTable::new();
        infer(&tokens, &mut table);
        table
    }

    #[test]
    fn test_simple_int_assignment() {
        let table = table_for("x = 1\n");
        assert_eq!(table.get_type("x", "global"), TypeTag::Int);
        assert_eq!(table.get_value("x", "global"), "1");
    }

    #[test]
    fn test_float_and_string_assignment() {
        let table = table_for("pi = 3.14\nname = \"ada\"\n");
        assert_eq!(table.get_type("pi", "global"), TypeTag::Float);
        assert_eq!(table.get_type("name", "global"), TypeTag::Str);
        assert_eq!(table.get_value("name", "global"), "\"ada\"");
    }

    #[test]
    fn test_bool_assignment() {
        let table = table_for("flag = True\n");
        assert_eq!(table.get_type("flag", "global"), TypeTag::Bool);
        assert_eq!(table.get_value("flag", "global"), "True");
    }

    #[test]
    fn test_multiple_assignment_binds_positionally() {
        let table = table_for("a, b = 1, 2.5\n");
        assert_eq!(table.get_type("a", "global"), TypeTag::Int);
        assert_eq!(table.get_value("a", "global"), "1");
        assert_eq!(table.get_type("b", "global"), TypeTag::Float);
        assert_eq!(table.get_value("b", "global"), "2.5");
    }

    #[test]
    fn test_multiple_assignment_extra_lhs_ignored() {
        let table = table_for("a, b, c = 1, 2\n");
        assert_eq!(table.get_type("a", "global"), TypeTag::Int);
        assert_eq!(table.get_type("b", "global"), TypeTag::Int);
        assert_eq!(table.get_type("c", "global"), TypeTag::Unknown);
        assert_eq!(table.get_value("c", "global"), "");
    }

    #[test]
    fn test_def_names_function_in_its_own_scope() {
        let table = table_for("def f():\n    x = 1\n");
        assert_eq!(table.get_type("f", "f"), TypeTag::Function);
        assert_eq!(table.get_type("x", "f"), TypeTag::Int);
        assert_eq!(table.get_value("x", "f"), "1");
    }

    #[test]
    fn test_nested_function_scopes() {
        let source = "def outer():\n    def inner():\n        y = \"s\"\n";
        let table = table_for(source);
        assert_eq!(table.get_type("outer", "outer"), TypeTag::Function);
        assert_eq!(table.get_type("inner", "inner@outer"), TypeTag::Function);
        assert_eq!(table.get_type("y", "inner@outer"), TypeTag::Str);
        assert_eq!(table.get_value("y", "inner@outer"), "\"s\"");
    }

    #[test]
    fn test_class_naming() {
        let table = table_for("class Car:\n    pass\n");
        assert_eq!(table.get_type("Car", "Car"), TypeTag::Class);
    }

    #[test]
    fn test_arithmetic_unifies_and_clears_value() {
        let table = table_for("a = 1\nb = 2.5\nc = a + b\n");
        assert_eq!(table.get_type("c", "global"), TypeTag::Float);
        assert_eq!(table.get_value("c", "global"), "");
    }

    #[test]
    fn test_string_plus_int_is_unknown() {
        let table = table_for("c = \"x\" + 1\n");
        assert_eq!(table.get_type("c", "global"), TypeTag::Unknown);
    }

    #[test]
    fn test_identifier_rhs_copies_type_and_value() {
        let table = table_for("a = 7\nb = a\n");
        assert_eq!(table.get_type("b", "global"), TypeTag::Int);
        assert_eq!(table.get_value("b", "global"), "7");
        // The RHS sighting of `a` counts as a usage.
        let (_, info) = table
            .entries()
            .into_iter()
            .find(|(name, _)| *name == "a")
            .unwrap();
        assert_eq!(info.usage_count, 2);
    }

    #[test]
    fn test_reference_without_assignment() {
        let table = table_for("print\nprint\n");
        let (_, info) = table.entries()[0];
        assert_eq!(info.type_tag, TypeTag::Unknown);
        assert_eq!(info.usage_count, 2);
    }

    #[test]
    fn test_tuple_literal() {
        let table = table_for("t = (1, 2)\n");
        assert_eq!(table.get_type("t", "global"), TypeTag::Tuple);
        assert_eq!(table.get_value("t", "global"), "(1,2)");
    }

    #[test]
    fn test_single_element_parens_take_element_type() {
        let table = table_for("x = (5)\n");
        assert_eq!(table.get_type("x", "global"), TypeTag::Int);
        assert_eq!(table.get_value("x", "global"), "(5)");
    }

    #[test]
    fn test_list_literal() {
        let table = table_for("xs = [1, 2, 3]\n");
        assert_eq!(table.get_type("xs", "global"), TypeTag::List);
        assert_eq!(table.get_value("xs", "global"), "[1,2,3]");
    }

    #[test]
    fn test_dict_and_set_literals() {
        let table = table_for("d = {\"k\": 1}\ns = {1, 2}\n");
        assert_eq!(table.get_type("d", "global"), TypeTag::Dictionary);
        assert_eq!(table.get_type("s", "global"), TypeTag::Set);
        assert_eq!(table.get_value("s", "global"), "{1,2}");
    }

    #[test]
    fn test_dotted_assignment_updates_member_name_only() {
        // `car1.speed = 10` reads as a reference to `car1` and a plain
        // assignment to `speed`; no attribute modeling happens.
        let table = table_for("car1.speed = 10\n");
        assert_eq!(table.get_type("car1", "global"), TypeTag::Unknown);
        assert_eq!(table.get_type("speed", "global"), TypeTag::Int);
        assert_eq!(table.get_value("speed", "global"), "10");
    }

    #[test]
    fn test_usage_counts_start_at_one() {
        let table = table_for("x = 1\ny = x + x\n");
        for (_, info) in table.entries() {
            assert!(info.usage_count >= 1);
        }
    }

    #[test]
    fn test_unify_rules() {
        use TypeTag::*;
        assert_eq!(unify(Unknown, Int), Int);
        assert_eq!(unify(Int, Unknown), Int);
        assert_eq!(unify(Unknown, Unknown), Unknown);
        assert_eq!(unify(Int, Float), Float);
        assert_eq!(unify(Float, Bool), Unknown);
        assert_eq!(unify(Int, Int), Int);
        assert_eq!(unify(Bool, Bool), Bool);
        assert_eq!(unify(Str, Str), Str);
        assert_eq!(unify(Str, Int), Unknown);
        assert_eq!(unify(List, List), List);
        assert_eq!(unify(List, Tuple), Unknown);
    }
}
