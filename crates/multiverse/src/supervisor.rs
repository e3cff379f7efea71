//! Top-level orchestration: own the root universe, join every descendant,
//! aggregate outputs (§4.6).
//!
//! This is the single public entry point into the engine, mirroring the
//! teacher's `SessionManager` as the one orchestration surface over lower-
//! level per-universe machinery — adapted here from session-multiplexing
//! to universe-tree-multiplexing.

use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::env::Environment;
use crate::statement::{Program, VarCount};
use crate::tracer::{EngineTracer, NoopTracer};
use crate::universe::{ResultMap, Universe, UniverseResult};

/// The root universe's label. Children are named `<parent>-<n>`.
pub const ROOT_LABEL: &str = "root";

/// The outcome of one full run: every universe's result, keyed by label,
/// plus how many universes the run spawned in total.
#[derive(Debug, Clone)]
pub struct RunReport {
    results: ahash::AHashMap<String, UniverseResult>,
    universe_count: usize,
}

impl RunReport {
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&UniverseResult> {
        self.results.get(label)
    }

    #[must_use]
    pub fn results(&self) -> &ahash::AHashMap<String, UniverseResult> {
        &self.results
    }

    /// Total number of universes this run spawned, root included.
    #[must_use]
    pub const fn universe_count(&self) -> usize {
        self.universe_count
    }

    /// `label`s of every universe that terminated with a fatal error.
    pub fn failed_labels(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, UniverseResult::Failed(_)))
            .map(|(label, _)| label.as_str())
    }
}

/// Owns nothing between runs — every call to [`Supervisor::run`] is
/// self-contained.
#[derive(Debug, Default)]
pub struct Supervisor;

impl Supervisor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs `program` to completion: builds the root environment seeded
    /// with `var_count`, runs the root universe, and blocks until every
    /// descendant it (transitively) spawns has terminated and joined.
    #[must_use]
    pub fn run(&self, program: Program, var_count: VarCount, config: EngineConfig) -> RunReport {
        self.run_with_tracer(program, var_count, config, Box::new(NoopTracer))
    }

    /// As [`Supervisor::run`], but with an explicit root tracer — every
    /// forked universe gets a fresh tracer via [`EngineTracer::for_child`].
    #[must_use]
    pub fn run_with_tracer(
        &self,
        program: Program,
        var_count: VarCount,
        config: EngineConfig,
        tracer: Box<dyn EngineTracer>,
    ) -> RunReport {
        let program = Arc::new(program);
        let config = Arc::new(config);
        let results: ResultMap = Arc::new(Mutex::new(ahash::AHashMap::default()));
        let universe_count = Arc::new(AtomicUsize::new(1));

        let root_env = Environment::new(var_count);
        let root = Universe::new(
            ROOT_LABEL.to_string(),
            root_env,
            program,
            config,
            Arc::clone(&results),
            Arc::clone(&universe_count),
            tracer,
        );
        // The root universe's `run` recursively joins every descendant it
        // spawns, so by the time this call returns the whole tree is down.
        root.run(0);

        let results = Arc::try_unwrap(results)
            .expect("all universe threads joined before Supervisor::run returns")
            .into_inner()
            .expect("result map mutex poisoned by a panicking universe");
        RunReport {
            results,
            universe_count: universe_count.load(std::sync::atomic::Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::{Expr, VarRef};
    use crate::statement::{Statement, StmtKind};
    use crate::value::Value;

    fn var_count(pairs: &[(&str, usize)]) -> VarCount {
        VarCount::from_iter(pairs.iter().map(|(n, c)| ((*n).to_string(), *c)))
    }

    #[test]
    fn mutation_only_program_produces_single_output() {
        // x=1; x=x@0+1; out=x@1
        let program = vec![
            Statement {
                kind: StmtKind::Mutation,
                lhs_name: "x".into(),
                lhs_index: 0,
                rhs: Expr::Lit(Value::Integer(1)),
                source_line: None,
            },
            Statement {
                kind: StmtKind::Mutation,
                lhs_name: "x".into(),
                lhs_index: 1,
                rhs: Expr::Binary {
                    op: crate::expr::Op::Add,
                    left: Box::new(Expr::Var(VarRef { name: "x".into(), index: 0 })),
                    right: Box::new(Expr::Lit(Value::Integer(1))),
                },
                source_line: None,
            },
            Statement {
                kind: StmtKind::Mutation,
                lhs_name: "out".into(),
                lhs_index: 0,
                rhs: Expr::Var(VarRef { name: "x".into(), index: 1 }),
                source_line: None,
            },
        ];
        let report = Supervisor::new().run(program, var_count(&[("x", 2), ("out", 1)]), EngineConfig::new());
        assert_eq!(report.universe_count(), 1);
        match report.get("root") {
            Some(UniverseResult::Output(values)) => assert_eq!(values, &["2".to_string()]),
            other => panic!("expected root output, got {other:?}"),
        }
    }
}
