//! CLI module for the pyrite front end
//!
//! ## Usage
//!
//! - `pyrite FILE` - run the full analysis and print every report
//! - `pyrite FILE --tokens` / `--symbols` / `--tree` - select reports
//! - `pyrite FILE --dot out.dot` - also export the parse tree as DOT
//!
//! ## Design
//!
//! Argument parsing uses clap derive macros. Command functions return
//! `CliResult<T>` instead of calling `process::exit`; only the top-level
//! `run()` handles errors and exits. Lexical and syntactic diagnostics do
//! not fail the process: only host failures (unreadable file, unwritable
//! DOT output) produce a non-zero exit.

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::Parser;

// ============================================================================
// CLI error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Carries a user-facing message and an exit code; the entry point prints
/// the message and exits with the code.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exit_code: ExitCode::FAILURE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Front end of a teaching compiler for a Python-like language
#[derive(Parser, Debug)]
#[command(name = "pyrite")]
#[command(version)]
#[command(
    about = "Front end of a teaching compiler for a Python-like indentation-sensitive language",
    long_about = None
)]
pub struct Cli {
    /// Source file to analyze
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the token stream report
    #[arg(long)]
    pub tokens: bool,

    /// Print the symbol table report
    #[arg(long)]
    pub symbols: bool,

    /// Print the parse tree dump
    #[arg(long)]
    pub tree: bool,

    /// Write a DOT graph description of the parse tree to PATH
    #[arg(long, value_name = "PATH")]
    pub dot: Option<PathBuf>,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// The only place where `process::exit` is called.
pub fn run() {
    let cli = Cli::parse();

    match commands::analyze(&cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e);
            }
            process::exit(e.exit_code.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
