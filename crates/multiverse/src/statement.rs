//! The engine's external interface: normalised statements and `var_count`.
//!
//! Everything in this module is produced upstream (lexing, parsing,
//! re-indexing) and consumed here. The engine never sees a statement whose
//! index has not already been resolved to an absolute, non-negative value.

use indexmap::IndexMap;

use crate::expr::Expr;

/// The kind of assignment a [`Statement`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum StmtKind {
    Mutation,
    Revision,
    Prophecy,
}

/// One normalised statement: `kind lhs = rhs`, with `lhs.index` already
/// resolved to an absolute index by the upstream re-indexing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    pub lhs_name: String,
    pub lhs_index: i64,
    pub rhs: Expr,
    pub source_line: Option<u32>,
}

/// An ordered, immutable program: the statement sequence a universe
/// processes from the beginning (the root) or from `code_index + 1`
/// onward (a forked child).
pub type Program = Vec<Statement>;

/// The immutable `name -> declared total count` table, the output of the
/// re-indexing pass. `0 <= index < count` is "within scope"; outside that
/// range is `Undefined`, never a type error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarCount(IndexMap<String, usize, ahash::RandomState>);

impl VarCount {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&usize> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, &count)| (name.as_str(), count))
    }
}

impl FromIterator<(String, usize)> for VarCount {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
