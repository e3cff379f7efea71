//! Front-end failures: lexing, parsing, and re-indexing.
//!
//! Kept distinct from `multiverse::EngineError` — the engine never sees a
//! malformed statement, so a `SurfaceError` always means the program text
//! itself was rejected before a single universe ran.

use std::fmt;

/// A lex/parse/reindex failure: a message, the 1-based source line it
/// occurred on, and an optional clarifying note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceError {
    pub message: String,
    pub line: usize,
    pub note: Option<String>,
}

impl SurfaceError {
    #[must_use]
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self { message: message.into(), line, note: None }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)?;
        if let Some(note) = &self.note {
            write!(f, " ({note})")?;
        }
        Ok(())
    }
}

impl std::error::Error for SurfaceError {}
