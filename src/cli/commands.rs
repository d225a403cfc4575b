//! CLI command implementations
//!
//! Drives the three analysis stages over one source file and prints the
//! requested reports. Reports go to stdout, diagnostics to stderr.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::{Cli, CliError, CliResult, ExitCode};
use crate::frontend::diagnostics::{self, Diagnostic};
use crate::frontend::lexer::{self, Token, TokenKind};
use crate::frontend::symbols::SymbolTable;
use crate::frontend::tree::ParseTreeNode;
use crate::frontend::{infer, parser};

/// Unrecoverable host failures. Everything the analysis itself finds is a
/// [`Diagnostic`], not one of these.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("could not read '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write '{path}': {source}")]
    Unwritable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of running the full pipeline over one source text.
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub table: SymbolTable,
    pub tree: ParseTreeNode,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run lexer, inferrer, and parser over a source text.
///
/// Each stage completes before the next begins; the diagnostic list holds
/// the lexer's findings followed by the parser's.
pub fn analyze_source(source: &str) -> Analysis {
    let (tokens, mut all_diagnostics) = lexer::lex(source);
    debug!(token_count = tokens.len(), "lexing complete");

    let mut table = SymbolTable::new();
    infer::infer(&tokens, &mut table);
    debug!(symbol_count = table.len(), "inference complete");

    let (tree, parse_diagnostics) = parser::parse(&tokens);
    all_diagnostics.extend(parse_diagnostics);
    debug!(diagnostic_count = all_diagnostics.len(), "parsing complete");

    Analysis {
        tokens,
        table,
        tree,
        diagnostics: all_diagnostics,
    }
}

fn read_source(path: &Path) -> Result<String, HostError> {
    fs::read_to_string(path).map_err(|source| HostError::Unreadable {
        path: path.display().to_string(),
        source,
    })
}

/// One line per token: tag name, lexeme (identifiers show their symbol
/// table entry instead), and line number.
pub fn render_tokens(tokens: &[Token], table: &SymbolTable) -> String {
    let mut out = String::from("Tokens:\n");
    for token in tokens {
        let detail = if token.kind == TokenKind::Identifier {
            match table.entry_id(&token.lexeme, &token.scope) {
                Some(entry) => format!("symbol table entry: {}", entry),
                None => "symbol table entry: not found".to_string(),
            }
        } else {
            token.lexeme.clone()
        };
        out.push_str(&format!("< {:?}, {} >  | line {}\n", token.kind, detail, token.line));
    }
    out
}

/// The `analyze` command: run the pipeline and print reports.
///
/// With no report flags every surface is printed; flags narrow the output.
/// Diagnostics always go to stderr and never affect the exit code.
pub fn analyze(cli: &Cli) -> CliResult<ExitCode> {
    let source = read_source(&cli.file).map_err(|e| CliError::failure(e.to_string()))?;

    let analysis = analyze_source(&source);

    let show_all = !(cli.tokens || cli.symbols || cli.tree);

    if show_all || cli.symbols {
        print!("{}", analysis.table.render());
        println!();
    }
    if show_all || cli.tokens {
        print!("{}", render_tokens(&analysis.tokens, &analysis.table));
        println!();
    }

    eprint!("{}", diagnostics::render(&analysis.diagnostics));

    if show_all || cli.tree {
        println!("Parse Tree:");
        print!("{}", analysis.tree.render_text());
    }

    if let Some(dot_path) = &cli.dot {
        fs::write(dot_path, analysis.tree.to_dot()).map_err(|source| {
            CliError::failure(
                HostError::Unwritable {
                    path: dot_path.display().to_string(),
                    source,
                }
                .to_string(),
            )
        })?;
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::symbols::TypeTag;

    #[test]
    fn test_analyze_source_pipeline() {
        let analysis = analyze_source("def f():\n    x = 1\n    return x\n");
        assert!(analysis.diagnostics.is_empty());
        assert_eq!(analysis.table.get_type("f", "f"), TypeTag::Function);
        assert_eq!(analysis.table.get_type("x", "f"), TypeTag::Int);
        assert_eq!(analysis.tree.label, "program");
    }

    #[test]
    fn test_render_tokens_references_symbol_entries() {
        let analysis = analyze_source("x = 1\n");
        let listing = render_tokens(&analysis.tokens, &analysis.table);
        assert!(listing.starts_with("Tokens:\n"));
        assert!(listing.contains("< Identifier, symbol table entry: 1 >  | line 1"));
        assert!(listing.contains("< Number, 1 >  | line 1"));
    }

    #[test]
    fn test_diagnostics_do_not_fail_analysis() {
        let analysis = analyze_source("x = \"broken\n");
        assert!(!analysis.diagnostics.is_empty());
        assert_eq!(analysis.tree.label, "program");
    }
}
