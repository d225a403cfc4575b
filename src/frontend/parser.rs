//! Recursive-descent parser for pyrite
//!
//! Consumes the enriched token stream and builds a concrete parse tree for
//! the full grammar. Best-effort: every failure is recorded as a diagnostic
//! and recovery continues with the next statement.
//!
//! Error handling uses a payload-free recovery signal: each grammar rule
//! returns `Result<_, Recover>`, the diagnostic having been recorded before
//! the signal is raised. Rules rethrow with `?` until the top-level
//! `program` loop catches the signal and synchronizes past the current
//! line. Nothing escapes `parse`.

use crate::frontend::diagnostics::Diagnostic;
use crate::frontend::lexer::{Token, TokenKind};
use crate::frontend::tree::ParseTreeNode;

/// Unwind signal for panic-mode recovery. Carries nothing: the diagnostic
/// is already in the log when this is raised.
#[derive(Debug, Clone, Copy)]
pub struct Recover;

type Parse<T> = Result<T, Recover>;

const ASSIGN_OPERATORS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "//=", "**="];
const COMPARISON_OPERATORS: &[&str] = &["==", "!=", "<", ">", ">=", "<=", "&", "|"];

/// Parse a token stream into a concrete tree plus syntax diagnostics.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token]) -> (ParseTreeNode, Vec<Diagnostic>) {
    Parser::new(tokens).run()
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn run(mut self) -> (ParseTreeNode, Vec<Diagnostic>) {
        let root = self.program();
        (root, self.diagnostics)
    }

    // ========================================================================
    // Cursor primitives
    // ========================================================================

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn check_operator(&self, operators: &[&str]) -> bool {
        matches!(
            self.current(),
            Some(t) if t.kind == TokenKind::Operator && operators.contains(&t.lexeme.as_str())
        )
    }

    /// Line number used for diagnostics: the current token's, falling back
    /// to the last token once the cursor has run off the end.
    fn current_line(&self) -> usize {
        self.current()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    fn report_here(&mut self, message: impl Into<String>) {
        let line = self.current_line();
        self.diagnostics.push(Diagnostic::new(message, line, 0));
    }

    /// Match-and-advance. A kind mismatch is diagnosed and raises the
    /// recovery signal; past the end of the stream a synthetic `Unknown`
    /// token is handed back so enclosing rules finish their shape.
    fn consume(&mut self, kind: TokenKind) -> Parse<Token> {
        match self.tokens.get(self.pos) {
            None => Ok(Token::new(TokenKind::Unknown, "Error", 0)),
            Some(t) if t.kind == kind => {
                self.pos += 1;
                Ok(self.tokens[self.pos - 1].clone())
            }
            Some(t) => {
                let message = format!(
                    "Expected {} but found {}",
                    kind.describe(),
                    t.kind.describe()
                );
                let line = t.line;
                self.diagnostics.push(Diagnostic::new(message, line, 0));
                Err(Recover)
            }
        }
    }

    /// Panic-mode synchronization: discard tokens through the given line.
    fn synchronize(&mut self, line: usize) {
        while let Some(t) = self.tokens.get(self.pos) {
            if t.line <= line {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Run a rule body; on recovery, record the rule's failure message and
    /// rethrow to the enclosing scope.
    fn guard(&mut self, fail: &str, body: impl FnOnce(&mut Self) -> Parse<()>) -> Parse<()> {
        match body(self) {
            Ok(()) => Ok(()),
            Err(Recover) => {
                self.report_here(fail);
                Err(Recover)
            }
        }
    }

    /// `guard` wrapped around a fresh node for the common rule shape.
    fn rule(
        &mut self,
        label: &str,
        fail: &str,
        body: impl FnOnce(&mut Self, &mut ParseTreeNode) -> Parse<()>,
    ) -> Parse<ParseTreeNode> {
        let mut node = ParseTreeNode::branch(label);
        match body(self, &mut node) {
            Ok(()) => Ok(node),
            Err(Recover) => {
                self.report_here(fail);
                Err(Recover)
            }
        }
    }

    // ========================================================================
    // Program and statements
    // ========================================================================

    fn program(&mut self) -> ParseTreeNode {
        let mut node = ParseTreeNode::branch("program");
        while !self.at_end() {
            if self.program_item(&mut node).is_err() {
                let line = self.current_line();
                self.synchronize(line);
            }
        }
        node
    }

    fn program_item(&mut self, program: &mut ParseTreeNode) -> Parse<()> {
        // Two statements may not share a line unless a DEDENT sits between
        // them.
        if self.pos != 0 {
            let prev = &self.tokens[self.pos - 1];
            let cur = &self.tokens[self.pos];
            if cur.line <= prev.line && prev.kind != TokenKind::Dedent {
                let line = cur.line;
                self.diagnostics.push(Diagnostic::new(
                    "Statements must be separated by NEWLINE",
                    line,
                    0,
                ));
                self.synchronize(line);
                return Ok(());
            }
        }

        if self.check(TokenKind::Dedent) {
            self.consume(TokenKind::Dedent)?;
        }
        if self.at_end() {
            return Ok(());
        }

        if self.check(TokenKind::Def) {
            let function = self.function()?;
            program.add(function);
        } else {
            let statement = self.statement()?;
            program.add(statement);
        }
        Ok(())
    }

    fn statement(&mut self) -> Parse<ParseTreeNode> {
        self.rule("statement", "Could not parse statement", |p, node| {
            match p.current_kind() {
                Some(TokenKind::Identifier) => match p.peek_kind() {
                    Some(TokenKind::LeftParen) => node.add(p.function_call()?),
                    Some(TokenKind::Dot) => node.add(p.dotted_dispatch()?),
                    _ => node.add(p.assignment()?),
                },
                Some(TokenKind::While) => node.add(p.while_stmt()?),
                Some(TokenKind::For) => node.add(p.for_stmt()?),
                Some(TokenKind::If) => node.add(p.conditional_stmt()?),
                Some(TokenKind::Class) => node.add(p.class_def()?),
                Some(TokenKind::Import) | Some(TokenKind::From) => node.add(p.import_stmt()?),
                Some(TokenKind::Return) => node.add(p.return_stmt()?),
                Some(TokenKind::Pass) => node.add(p.simple_stmt("pass_statement", TokenKind::Pass)?),
                Some(TokenKind::Break) => node.add(p.simple_stmt("break_statement", TokenKind::Break)?),
                Some(TokenKind::Continue) => {
                    node.add(p.simple_stmt("continue_statement", TokenKind::Continue)?)
                }
                Some(TokenKind::Raise) => node.add(p.raise_stmt()?),
                Some(TokenKind::Try) => node.add(p.try_stmt()?),
                Some(TokenKind::StringLiteral) => node.add(p.factor()?),
                _ => {
                    p.report_here("Cannot parse statement");
                    return Err(Recover);
                }
            }
            Ok(())
        })
    }

    /// Disambiguate a statement that starts with a dotted name.
    ///
    /// Speculatively consumes the dotted name, inspects what follows, then
    /// rewinds and reparses as a call or an assignment. This is the only
    /// place the cursor moves backwards.
    fn dotted_dispatch(&mut self) -> Parse<ParseTreeNode> {
        let saved = self.pos;
        let _probe = self.dotted_name()?;
        match self.current_kind() {
            Some(TokenKind::LeftParen) => {
                self.pos = saved;
                self.function_call()
            }
            Some(TokenKind::Operator) if self.check_operator(&["="]) => {
                self.pos = saved;
                self.assignment()
            }
            Some(_) => {
                self.report_here("Expected '(' or '=' after dotted name");
                Err(Recover)
            }
            None => {
                self.report_here("Unexpected end after dotted name");
                Err(Recover)
            }
        }
    }

    fn simple_stmt(&mut self, label: &'static str, keyword: TokenKind) -> Parse<ParseTreeNode> {
        let fail = match keyword {
            TokenKind::Pass => "Could not parse pass statement",
            TokenKind::Break => "Could not parse break statement",
            _ => "Could not parse continue statement",
        };
        self.rule(label, fail, |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(keyword)?));
            Ok(())
        })
    }

    fn return_stmt(&mut self) -> Parse<ParseTreeNode> {
        let mut node = ParseTreeNode::branch("return_statement");
        node.add(ParseTreeNode::terminal(self.consume(TokenKind::Return)?));
        self.guard("Could not parse return statement", |p| {
            node.add(p.expression()?);
            Ok(())
        })?;
        Ok(node)
    }

    fn raise_stmt(&mut self) -> Parse<ParseTreeNode> {
        self.rule("raise_statement", "Could not parse raise statement", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Raise)?));
            node.add(p.expression()?);
            Ok(())
        })
    }

    // ========================================================================
    // Compound statements
    // ========================================================================

    fn function(&mut self) -> Parse<ParseTreeNode> {
        self.rule("function", "Could not parse function", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Def)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftParen)?));
            node.add(p.parameters()?);
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::RightParen)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.block()?);
            Ok(())
        })
    }

    fn parameters(&mut self) -> Parse<ParseTreeNode> {
        self.rule("parameters", "Could not parse parameters", |p, node| {
            if !p.at_end() && !p.check(TokenKind::RightParen) {
                node.add(p.parameter()?);
                while p.check(TokenKind::Comma) {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                    node.add(p.parameter()?);
                }
            }
            Ok(())
        })
    }

    fn parameter(&mut self) -> Parse<ParseTreeNode> {
        self.rule("parameter", "Could not parse parameter", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            if p.check_operator(&["="]) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
                node.add(p.expression()?);
            }
            Ok(())
        })
    }

    /// An indented block, or a single statement on the same line.
    fn block(&mut self) -> Parse<ParseTreeNode> {
        let mut node = ParseTreeNode::branch("block");
        let single_line = !self.check(TokenKind::Indent);
        let mut prev_line = self.current_line();

        self.guard("Could not parse block", |p| {
            if single_line {
                node.add(p.statement()?);
                return Ok(());
            }

            p.consume(TokenKind::Indent)?;
            node.add(ParseTreeNode::leaf("INDENT"));

            // Only the first item of a block may be a nested function.
            if p.check(TokenKind::Def) {
                node.add(p.function()?);
            } else {
                node.add(p.statement()?);
            }

            while !p.at_end() && !p.check(TokenKind::Dedent) {
                if p.current_line() <= prev_line {
                    p.report_here("Statements must be separated by NEWLINE");
                    let line = p.current_line();
                    p.synchronize(line);
                    continue;
                }
                prev_line = p.current_line();
                node.add(p.statement()?);
            }

            node.add(ParseTreeNode::leaf("DEDENT"));
            p.consume(TokenKind::Dedent)?;
            Ok(())
        })?;
        Ok(node)
    }

    fn while_stmt(&mut self) -> Parse<ParseTreeNode> {
        self.rule("while_statement", "Could not parse while statement", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::While)?));
            node.add(p.expression()?);
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.block()?);
            Ok(())
        })
    }

    fn for_stmt(&mut self) -> Parse<ParseTreeNode> {
        self.rule("for_statement", "Could not parse for statement", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::For)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::In)?));
            node.add(p.expression()?);
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.block()?);
            Ok(())
        })
    }

    fn conditional_stmt(&mut self) -> Parse<ParseTreeNode> {
        let mut node = ParseTreeNode::branch("conditional_statement");

        self.guard("Could not parse conditional", |p| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::If)?));
            node.add(p.expression()?);
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.block()?);
            Ok(())
        })?;

        while self.check(TokenKind::Elif) {
            let mut clause = ParseTreeNode::branch("elif_clause");
            self.guard("Could not parse elif", |p| {
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Elif)?));
                clause.add(p.expression()?);
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                clause.add(p.block()?);
                Ok(())
            })?;
            node.add(clause);
        }

        if self.check(TokenKind::Else) {
            let mut clause = ParseTreeNode::branch("else_clause");
            self.guard("Could not parse else", |p| {
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Else)?));
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                clause.add(p.block()?);
                Ok(())
            })?;
            node.add(clause);
        }

        Ok(node)
    }

    fn try_stmt(&mut self) -> Parse<ParseTreeNode> {
        self.rule("try_statement", "Could not parse try statement", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Try)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.block()?);

            while p.check(TokenKind::Except) {
                let mut clause = ParseTreeNode::branch("except_clause");
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Except)?));
                if p.check(TokenKind::Identifier) {
                    clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
                    if p.check(TokenKind::As) {
                        clause.add(ParseTreeNode::terminal(p.consume(TokenKind::As)?));
                        clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
                    }
                }
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                clause.add(p.block()?);
                node.add(clause);
            }

            if p.check(TokenKind::Else) {
                let mut clause = ParseTreeNode::branch("else_clause");
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Else)?));
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                clause.add(p.block()?);
                node.add(clause);
            }

            if p.check(TokenKind::Finally) {
                let mut clause = ParseTreeNode::branch("finally_clause");
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Finally)?));
                clause.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                clause.add(p.block()?);
                node.add(clause);
            }

            Ok(())
        })
    }

    fn class_def(&mut self) -> Parse<ParseTreeNode> {
        self.rule("class_def", "Could not parse class def", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Class)?));
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));

            if p.check(TokenKind::LeftParen) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftParen)?));
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::RightParen)?));
            }

            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
            node.add(p.class_block()?);
            Ok(())
        })
    }

    /// A class body: functions and assignments only.
    fn class_block(&mut self) -> Parse<ParseTreeNode> {
        let mut node = ParseTreeNode::branch("class_block");
        let mut prev_line = self.current_line();

        self.guard("Could not parse class block", |p| {
            p.consume(TokenKind::Indent)?;
            node.add(ParseTreeNode::leaf("INDENT"));

            while !p.at_end() && !p.check(TokenKind::Dedent) {
                if p.check(TokenKind::Def) {
                    node.add(p.function()?);
                } else {
                    node.add(p.assignment()?);
                }

                if p.at_end() {
                    break;
                }
                if p.current_line() <= prev_line {
                    p.report_here("Class members must be on separate lines");
                    let line = p.current_line();
                    p.synchronize(line);
                    continue;
                }
                prev_line = p.current_line();
            }

            node.add(ParseTreeNode::leaf("DEDENT"));
            p.consume(TokenKind::Dedent)?;
            Ok(())
        })?;
        Ok(node)
    }

    fn import_stmt(&mut self) -> Parse<ParseTreeNode> {
        self.rule("import_statement", "Could not parse import", |p, node| {
            if p.check(TokenKind::Import) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Import)?));
                node.add(p.dotted_name()?);
                p.import_alias(node)?;
                while p.check(TokenKind::Comma) {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                    node.add(p.dotted_name()?);
                    p.import_alias(node)?;
                }
            } else {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::From)?));
                node.add(p.dotted_name()?);
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Import)?));
                if p.check(TokenKind::Identifier) {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
                    p.import_alias(node)?;
                } else if p.check_operator(&["*"]) {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
                } else {
                    p.report_here("Expected import target after 'import'");
                    return Err(Recover);
                }
            }
            Ok(())
        })
    }

    fn import_alias(&mut self, node: &mut ParseTreeNode) -> Parse<()> {
        if self.check(TokenKind::As) {
            node.add(ParseTreeNode::terminal(self.consume(TokenKind::As)?));
            node.add(ParseTreeNode::terminal(self.consume(TokenKind::Identifier)?));
        }
        Ok(())
    }

    fn dotted_name(&mut self) -> Parse<ParseTreeNode> {
        self.rule("dotted_name", "Could not parse dotted name", |p, node| {
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            while p.check(TokenKind::Dot) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Dot)?));
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            }
            Ok(())
        })
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    fn assignment(&mut self) -> Parse<ParseTreeNode> {
        self.rule("assignment", "Could not parse assignment", |p, node| {
            let mut lhs = ParseTreeNode::branch("lhs");
            p.assignment_target(&mut lhs)?;
            while p.check(TokenKind::Comma) {
                lhs.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                p.assignment_target(&mut lhs)?;
            }
            node.add(lhs);

            node.add(p.assign_op()?);

            let mut rhs = ParseTreeNode::branch("rhs");
            rhs.add(p.expression()?);
            while p.check(TokenKind::Comma) {
                rhs.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                rhs.add(p.expression()?);
            }
            node.add(rhs);
            Ok(())
        })
    }

    fn assignment_target(&mut self, lhs: &mut ParseTreeNode) -> Parse<()> {
        if self.peek_kind() == Some(TokenKind::Dot) {
            lhs.add(self.dotted_name()?);
        } else {
            lhs.add(ParseTreeNode::terminal(self.consume(TokenKind::Identifier)?));
        }
        Ok(())
    }

    /// The assignment operator node. When the current token is an operator
    /// outside the assignment set, the node stays empty and the mismatch
    /// surfaces while parsing the right-hand side.
    fn assign_op(&mut self) -> Parse<ParseTreeNode> {
        self.rule("Assign_OP", "Could not parse assignment operator", |p, node| {
            if p.check(TokenKind::Operator) {
                if p.check_operator(ASSIGN_OPERATORS) {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
                }
                Ok(())
            } else {
                Err(Recover)
            }
        })
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn function_call(&mut self) -> Parse<ParseTreeNode> {
        self.rule("function_call", "Could not parse function call", |p, node| {
            if p.peek_kind() == Some(TokenKind::Dot) {
                node.add(p.dotted_name()?);
            } else {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
            }

            node.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftParen)?));
            if !p.at_end() && !p.check(TokenKind::RightParen) {
                node.add(p.arguments()?);
            }
            node.add(ParseTreeNode::terminal(p.consume(TokenKind::RightParen)?));

            // A call may carry a trailing conditional, mirroring the
            // conditional expression shape.
            if p.check(TokenKind::If) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::If)?));
                node.add(p.or_expr()?);
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Else)?));
                node.add(p.function_call()?);
            }
            Ok(())
        })
    }

    fn arguments(&mut self) -> Parse<ParseTreeNode> {
        self.rule("arguments", "Could not parse arguments", |p, node| {
            node.add(p.expression()?);
            while p.check(TokenKind::Comma) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                node.add(p.expression()?);
            }
            Ok(())
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Parse<ParseTreeNode> {
        self.rule("expression", "Could not parse expression", |p, node| {
            node.add(p.or_expr()?);

            if p.check(TokenKind::If) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::If)?));
                node.add(p.or_expr()?);
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Else)?));
                node.add(p.expression()?);
            }
            Ok(())
        })
    }

    fn or_expr(&mut self) -> Parse<ParseTreeNode> {
        self.rule("or_expression", "Could not parse or expression", |p, node| {
            node.add(p.and_expr()?);
            while p.check(TokenKind::Or) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Or)?));
                node.add(p.and_expr()?);
            }
            Ok(())
        })
    }

    fn and_expr(&mut self) -> Parse<ParseTreeNode> {
        self.rule("and_expression", "Could not parse and expression", |p, node| {
            node.add(p.not_expr()?);
            while p.check(TokenKind::And) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::And)?));
                node.add(p.not_expr()?);
            }
            Ok(())
        })
    }

    fn not_expr(&mut self) -> Parse<ParseTreeNode> {
        self.rule("not_expression", "Could not parse not expression", |p, node| {
            if p.check(TokenKind::Not) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Not)?));
                node.add(p.not_expr()?);
            } else {
                node.add(p.comparison()?);
            }
            Ok(())
        })
    }

    fn comparison(&mut self) -> Parse<ParseTreeNode> {
        self.rule("comparison", "Could not parse comparison", |p, node| {
            node.add(p.arithmetic()?);
            while p.check(TokenKind::Operator) {
                node.add(p.comparison_op()?);
                node.add(p.arithmetic()?);
            }
            Ok(())
        })
    }

    /// The comparison operator node; left empty for operators outside the
    /// comparison set, which then fail over in the operand parse.
    fn comparison_op(&mut self) -> Parse<ParseTreeNode> {
        self.rule("OP", "Could not parse comparison operator", |p, node| {
            if p.check_operator(COMPARISON_OPERATORS) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
            }
            Ok(())
        })
    }

    fn arithmetic(&mut self) -> Parse<ParseTreeNode> {
        self.rule("arithmetic", "Could not parse arithmetic", |p, node| {
            node.add(p.term()?);
            while p.check_operator(&["+", "-"]) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
                node.add(p.term()?);
            }
            Ok(())
        })
    }

    fn term(&mut self) -> Parse<ParseTreeNode> {
        self.rule("term", "Could not parse term", |p, node| {
            node.add(p.factor()?);
            while p.check_operator(&["*", "/", "%"]) {
                node.add(ParseTreeNode::terminal(p.consume(TokenKind::Operator)?));
                node.add(p.factor()?);
            }
            Ok(())
        })
    }

    fn factor(&mut self) -> Parse<ParseTreeNode> {
        self.rule("factor", "Could not parse factor", |p, node| {
            match p.current_kind() {
                Some(TokenKind::Number) => {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::Number)?));
                }
                Some(TokenKind::StringLiteral) => {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::StringLiteral)?));
                }
                Some(TokenKind::True) => {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::True)?));
                }
                Some(TokenKind::False) => {
                    node.add(ParseTreeNode::terminal(p.consume(TokenKind::False)?));
                }
                Some(TokenKind::Identifier) => {
                    if p.peek_kind() == Some(TokenKind::Dot) {
                        node.add(p.dotted_name()?);
                    } else {
                        node.add(ParseTreeNode::terminal(p.consume(TokenKind::Identifier)?));
                    }
                    // Plain or method call suffix.
                    if p.check(TokenKind::LeftParen) {
                        node.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftParen)?));
                        if !p.at_end() && !p.check(TokenKind::RightParen) {
                            node.add(p.arguments()?);
                        }
                        node.add(ParseTreeNode::terminal(p.consume(TokenKind::RightParen)?));
                    }
                }
                Some(TokenKind::LeftParen) => {
                    let mut group = ParseTreeNode::branch("tuple_or_group");
                    group.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftParen)?));
                    group.add(p.expression()?);
                    while p.check(TokenKind::Comma) {
                        group.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                        group.add(p.expression()?);
                    }
                    group.add(ParseTreeNode::terminal(p.consume(TokenKind::RightParen)?));
                    node.add(group);
                }
                Some(TokenKind::LeftBracket) => {
                    let mut list = ParseTreeNode::branch("list_literal");
                    list.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftBracket)?));
                    if !p.at_end() && !p.check(TokenKind::RightBracket) {
                        list.add(p.expression()?);
                        while p.check(TokenKind::Comma) {
                            list.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                            list.add(p.expression()?);
                        }
                    }
                    list.add(ParseTreeNode::terminal(p.consume(TokenKind::RightBracket)?));
                    node.add(list);
                }
                Some(TokenKind::LeftBrace) => {
                    let mut dict = ParseTreeNode::branch("dict_literal");
                    dict.add(ParseTreeNode::terminal(p.consume(TokenKind::LeftBrace)?));
                    if !p.at_end() && !p.check(TokenKind::RightBrace) {
                        dict.add(p.expression()?);
                        dict.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                        dict.add(p.expression()?);
                        while p.check(TokenKind::Comma) {
                            dict.add(ParseTreeNode::terminal(p.consume(TokenKind::Comma)?));
                            dict.add(p.expression()?);
                            dict.add(ParseTreeNode::terminal(p.consume(TokenKind::Colon)?));
                            dict.add(p.expression()?);
                        }
                    }
                    dict.add(ParseTreeNode::terminal(p.consume(TokenKind::RightBrace)?));
                    node.add(dict);
                }
                _ => return Err(Recover),
            }
            Ok(())
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
