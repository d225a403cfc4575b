//! pyrite — front end of a teaching compiler for a Python-like
//! indentation-sensitive language.
//!
//! Given one source file, pyrite produces a classified token stream with
//! synthetic layout tokens, a scoped symbol table with light type/value
//! inference, a full concrete parse tree (printable as text or DOT), and
//! an ordered diagnostic log. Analysis never aborts: every error is
//! recorded and recovered from.

pub mod cli;
pub mod frontend;

pub use frontend::diagnostics;
pub use frontend::infer;
pub use frontend::lexer;
pub use frontend::parser;
pub use frontend::symbols;
pub use frontend::tree;
