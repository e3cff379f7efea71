//! Variable histories, code history, and the fork operation.
//!
//! An [`Environment`] is owned by exactly one universe and mutated only
//! forward: histories and the code history only grow. Forking produces a
//! brand-new, independently-owned environment for a child universe; nothing
//! is aliased between parent and child after `fork` returns.

use indexmap::IndexMap;

use crate::expr::{Expr, VarRef};
use crate::statement::VarCount;

/// One binding `name@index`: an expression paired with the index of the
/// statement that bound it.
#[derive(Debug, Clone, PartialEq)]
pub struct VarEvent {
    pub expression: Expr,
    pub code_index: usize,
}

/// A prophecy carried forward because its target event was not yet bound,
/// or its right-hand side was not yet resolvable.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProphecy {
    pub target: VarRef,
    pub expr: Expr,
}

/// A revision whose right-hand side was not yet resolvable when the
/// revision statement was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFork {
    pub target: VarRef,
    pub expr: Expr,
}

/// A debug print whose expression was not yet resolvable when the `dbg`
/// statement was dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDebug {
    pub line: Option<u32>,
    pub expr: Expr,
}

/// Per-statement record: per-variable latest index, plus everything carried
/// forward to the resolver's next pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeStep {
    pub latest_indexes: IndexMap<String, usize, ahash::RandomState>,
    pub prophecies: Vec<PendingProphecy>,
    pub pending_forks: Vec<PendingFork>,
    pub pending_debugs: Vec<PendingDebug>,
}

/// Variable histories, code history, and the immutable `var_count` table.
#[derive(Debug, Clone)]
pub struct Environment {
    var_count: VarCount,
    histories: IndexMap<String, Vec<VarEvent>, ahash::RandomState>,
    code_history: Vec<CodeStep>,
}

impl Environment {
    /// Creates an empty environment for a fresh universe (the root, or the
    /// environment seeded before the first statement runs).
    #[must_use]
    pub fn new(var_count: VarCount) -> Self {
        Self {
            var_count,
            histories: IndexMap::default(),
            code_history: Vec::new(),
        }
    }

    #[must_use]
    pub fn var_count(&self, name: &str) -> Option<&usize> {
        self.var_count.get(name)
    }

    #[must_use]
    pub fn history(&self, name: &str) -> Option<&[VarEvent]> {
        self.histories.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn history_len(&self, name: &str) -> usize {
        self.histories.get(name).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn code_history(&self) -> &[CodeStep] {
        &self.code_history
    }

    /// Snapshot of every live variable's latest bound index, for recording
    /// into the `CodeStep` produced by the statement that was just
    /// dispatched.
    #[must_use]
    pub fn latest_indexes(&self) -> IndexMap<String, usize, ahash::RandomState> {
        self.histories
            .iter()
            .map(|(name, history)| (name.clone(), history.len() - 1))
            .collect()
    }

    /// `def(name@index)`: in scope iff `0 <= index < var_count[name]`.
    /// This does not require the event to be bound yet, only declared.
    #[must_use]
    pub fn is_defined(&self, r: &VarRef) -> bool {
        let Some(&count) = self.var_count.get(&r.name) else {
            return false;
        };
        r.index >= 0 && (r.index as u64) < count as u64
    }

    /// Appends a new event to `name`'s history. Callers are responsible for
    /// having already checked index legality (§7 mutation/revision/prophecy
    /// dispatch rules); this is the uniform low-level append.
    pub fn push_event(&mut self, name: &str, event: VarEvent) {
        self.histories.entry(name.to_string()).or_default().push(event);
    }

    /// Overwrites an existing event in place. Used by `fork` and, for the
    /// in-place mutation case, left unused by the universe runner (mutation
    /// always appends — see `push_event`).
    pub fn replace_event(&mut self, name: &str, index: usize, event: VarEvent) {
        if let Some(history) = self.histories.get_mut(name)
            && let Some(slot) = history.get_mut(index)
        {
            *slot = event;
        }
    }

    pub fn push_code_step(&mut self, step: CodeStep) {
        self.code_history.push(step);
    }

    /// Produces a child environment for a revision of `name@index`, per the
    /// fork algorithm: locate the step that bound the targeted event, copy
    /// the code history up to and including it, copy every variable's
    /// history as it stood at that step, then replace the targeted event
    /// with `new_value` (keeping its original `code_index` — only the *what*
    /// changes, not the *when*).
    ///
    /// # Errors
    ///
    /// Returns [`ForkError`] if `name` has no history, `index` is out of its
    /// current bounds, or the event's `code_index` does not refer to a real
    /// step (both preconditions from §4.3 — violating either indicates a
    /// broken invariant upstream, not user error).
    pub fn fork(&self, name: &str, index: usize, new_value: Expr) -> Result<(Self, usize), ForkError> {
        let history = self.histories.get(name).ok_or(ForkError::UnknownVariable)?;
        let event = history.get(index).ok_or(ForkError::IndexOutOfBounds)?;
        let code_index = event.code_index;
        if code_index >= self.code_history.len() {
            return Err(ForkError::BadCodeIndex);
        }

        let step = &self.code_history[code_index];
        let mut child_histories = IndexMap::default();
        for (var_name, &latest) in &step.latest_indexes {
            let source = self.histories.get(var_name).expect("latest_indexes must name a live history");
            child_histories.insert(var_name.clone(), source[..=latest].to_vec());
        }
        // The targeted event's own history must be present even if this
        // name did not (for some reason) appear in its own step's
        // latest_indexes map — in practice it always does, since the step
        // that bound name@index records name as live.
        child_histories
            .entry(name.to_string())
            .or_insert_with(|| history[..=index].to_vec());

        if let Some(slot) = child_histories.get_mut(name) {
            slot[index] = VarEvent {
                expression: new_value,
                code_index,
            };
        }

        let mut code_history = self.code_history[..=code_index].to_vec();
        if let Some(last) = code_history.last_mut() {
            // A prophecy still carried in this exact step was, by
            // construction, checked against its target just before this
            // step's own statement dispatched and found either unbound or
            // satisfied — an unsatisfied one would have killed this universe
            // before fork() was ever reached. If its target was already
            // bound at this step, that satisfaction is settled history and
            // must not be re-litigated against the child's diverging
            // future; drop it. One still unbound at this step remains
            // genuinely open and is left for the child to resolve on its
            // own terms.
            last.prophecies.retain(|p| {
                let target_index = p.target.index.max(0) as usize;
                !step
                    .latest_indexes
                    .get(&p.target.name)
                    .is_some_and(|&latest| target_index <= latest)
            });
        }

        let child = Self {
            var_count: self.var_count.clone(),
            histories: child_histories,
            code_history,
        };
        Ok((child, code_index))
    }

    /// True if `name@index` is already bound to `value` — revising it to the
    /// same value again would fork a child indistinguishable from this
    /// universe, so callers skip the fork rather than spawn an identical
    /// sibling that will keep re-triggering the same revision forever.
    #[must_use]
    pub fn revision_is_noop(&self, name: &str, index: usize, value: &crate::value::Value) -> bool {
        let Some(event) = self.histories.get(name).and_then(|h| h.get(index)) else {
            return false;
        };
        matches!(crate::expr::eval(&event.expression, self), Ok(crate::expr::Eval::Resolved(ref v)) if v == value)
    }
}

/// Fatal precondition failures for [`Environment::fork`] — per §4.3, any of
/// these indicates an upstream invariant violation and kills the universe
/// attempting the fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkError {
    UnknownVariable,
    IndexOutOfBounds,
    BadCodeIndex,
}

impl std::fmt::Display for ForkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownVariable => write!(f, "fork target has no history"),
            Self::IndexOutOfBounds => write!(f, "fork target index is out of bounds"),
            Self::BadCodeIndex => write!(f, "fork target's code_index does not refer to a recorded step"),
        }
    }
}

impl std::error::Error for ForkError {}

#[cfg(test)]
impl Environment {
    /// Test-only helper: binds `name@0` directly without going through the
    /// universe runner's dispatch rules, for evaluator unit tests that only
    /// care about `eval`'s behavior against a prepared environment.
    pub fn bind_for_test(&mut self, name: &str, expr: Expr) {
        let code_index = self.code_history.len();
        self.push_event(name, VarEvent {
            expression: expr,
            code_index,
        });
        let mut step = CodeStep::default();
        step.latest_indexes.insert(name.to_string(), self.history_len(name) - 1);
        self.push_code_step(step);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::value::Value;

    fn counts(pairs: &[(&str, usize)]) -> VarCount {
        VarCount::from_iter(pairs.iter().map(|(n, c)| ((*n).to_string(), *c)))
    }

    #[test]
    fn fork_isolates_parent_from_child() {
        let mut env = Environment::new(counts(&[("x", 3)]));
        env.push_event("x", VarEvent {
            expression: Expr::Lit(Value::Integer(1)),
            code_index: 0,
        });
        let mut step = CodeStep::default();
        step.latest_indexes.insert("x".to_string(), 0);
        env.push_code_step(step);
        env.push_event("x", VarEvent {
            expression: Expr::Lit(Value::Integer(2)),
            code_index: 1,
        });
        let mut step2 = CodeStep::default();
        step2.latest_indexes.insert("x".to_string(), 1);
        env.push_code_step(step2);

        let (child, code_index) = env.fork("x", 0, Expr::Lit(Value::Integer(99))).unwrap();
        assert_eq!(code_index, 0);
        assert_eq!(child.history("x").unwrap().len(), 1);
        assert_eq!(child.history("x").unwrap()[0].expression, Expr::Lit(Value::Integer(99)));
        // parent is untouched
        assert_eq!(env.history("x").unwrap()[0].expression, Expr::Lit(Value::Integer(1)));
        assert_eq!(env.history("x").unwrap().len(), 2);
    }

    #[test]
    fn fork_preserves_code_index_of_replaced_event() {
        let mut env = Environment::new(counts(&[("x", 2)]));
        env.push_event("x", VarEvent {
            expression: Expr::Lit(Value::Integer(1)),
            code_index: 0,
        });
        let mut step = CodeStep::default();
        step.latest_indexes.insert("x".to_string(), 0);
        env.push_code_step(step);

        let (child, _) = env.fork("x", 0, Expr::Lit(Value::Integer(7))).unwrap();
        assert_eq!(child.history("x").unwrap()[0].code_index, 0);
    }

    #[test]
    fn is_defined_checks_declared_range_only() {
        let env = Environment::new(counts(&[("x", 2)]));
        assert!(env.is_defined(&VarRef { name: "x".into(), index: 0 }));
        assert!(env.is_defined(&VarRef { name: "x".into(), index: 1 }));
        assert!(!env.is_defined(&VarRef { name: "x".into(), index: 2 }));
        assert!(!env.is_defined(&VarRef { name: "x".into(), index: -1 }));
        assert!(!env.is_defined(&VarRef { name: "y".into(), index: 0 }));
    }
}
