//! Surface syntax: lexing, parsing, and re-indexing program text into the
//! engine's `Program`/`VarCount` pair.
//!
//! This layer is non-authoritative: it exists to produce valid engine input
//! from a convenient textual notation, not to define the language's
//! semantics. Everything downstream of [`compile`] only ever sees normalised
//! [`multiverse::Statement`]s with absolute indices.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod reindex;

pub use error::SurfaceError;
pub use parser::{SurfaceExpr, SurfaceStatement, SurfaceStmtKind};

use multiverse::{Program, VarCount};

/// Lexes, parses, and re-indexes `text` into engine-ready input.
///
/// # Errors
///
/// Returns [`SurfaceError`] on the first lexing or parsing failure.
pub fn compile(text: &str) -> Result<(Program, VarCount), SurfaceError> {
    let tokens = lexer::lex(text)?;
    let statements = parser::parse_program(&tokens)?;
    Ok(reindex::reindex(statements))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use multiverse::{EngineConfig, Supervisor, UniverseResult};

    #[test]
    fn compiles_and_runs_a_small_program() {
        let (program, var_count) = compile("x = 1\nx = x:-1 + 1\nout = x:0\n").unwrap();
        let report = Supervisor::new().run(program, var_count, EngineConfig::new());
        match report.get("root") {
            Some(UniverseResult::Output(values)) => assert_eq!(values, &["2".to_string()]),
            other => panic!("expected a resolved output, got {other:?}"),
        }
    }
}
