//! Fatal, per-universe errors (§7).
//!
//! Every variant here kills exactly the universe that raised it; siblings
//! and ancestors are unaffected (§5, §8 *type-error locality*). None of
//! these are recoverable within a universe — a universe that hits one stops
//! and, if it has a label, is recorded as failed under that label in the
//! shared result map.

use crate::env::ForkError;
use crate::value::TypeMismatch;

/// A fatal error that terminates the universe in which it occurred.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// A mutation's LHS index was neither `0` nor the next expected slot.
    IllegalMutationIndex { universe: String, name: String, index: i64 },
    /// A revision's LHS index was negative, named an unknown variable, or
    /// was `>=` the current history length.
    IllegalRevisionIndex { universe: String, name: String, index: i64 },
    /// A prophecy's LHS index was `<` the current history length (it must
    /// name a future event).
    IllegalProphecyIndex { universe: String, name: String, index: i64 },
    /// An operator was applied to operand kinds it does not accept.
    TypeMismatch(TypeMismatch),
    /// A prophecy's resolved value disagreed with its target event's
    /// resolved value.
    ProphecyViolation { universe: String, name: String, index: i64 },
    /// The output variable's history still contained an unresolved event
    /// when the universe reached its end.
    IndeterminateOutput { universe: String, name: String },
    /// `Environment::fork`'s preconditions were violated — unreachable if
    /// the environment's invariants hold, but propagated as a fatal error
    /// rather than panicking, per §7's "should be unreachable if invariants
    /// hold" wording.
    Fork { universe: String, source: ForkError },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalMutationIndex { universe, name, index } => {
                write!(f, "[{universe}] mutation of {name}@{index} is not the next expected slot")
            }
            Self::IllegalRevisionIndex { universe, name, index } => {
                write!(f, "[{universe}] revision of {name}@{index} does not name a bound event")
            }
            Self::IllegalProphecyIndex { universe, name, index } => {
                write!(f, "[{universe}] prophecy of {name}@{index} does not name a future event")
            }
            Self::TypeMismatch(mismatch) => {
                write!(f, "type mismatch applying {} to {:?}", mismatch.op, mismatch.operand_kinds)
            }
            Self::ProphecyViolation { universe, name, index } => {
                write!(f, "[{universe}] prophecy violation: {name}@{index} did not resolve to the prophesied value")
            }
            Self::IndeterminateOutput { universe, name } => {
                write!(f, "[{universe}] output variable {name} has an unresolved event at universe end")
            }
            Self::Fork { universe, source } => {
                write!(f, "[{universe}] fork failed: {source}")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fork { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TypeMismatch> for EngineError {
    fn from(value: TypeMismatch) -> Self {
        Self::TypeMismatch(value)
    }
}
