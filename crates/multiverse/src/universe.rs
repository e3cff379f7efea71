//! Statement dispatch, history append, universe spawning and join,
//! output collection (§4.5).
//!
//! One [`Universe`] owns exactly one [`Environment`] and runs on its own
//! OS thread. It processes its statement slice in order, running the
//! resolver before each dispatch (§4.4), and joins every child it spawns
//! before reporting its own outcome — so a panic or fatal error in a
//! deeply-forked universe can never leak a dangling thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::EngineConfig;
use crate::env::{CodeStep, Environment, PendingDebug, PendingFork, PendingProphecy, VarEvent};
use crate::error::EngineError;
use crate::expr::{eval, Eval, Expr, VarRef};
use crate::resolver::resolve;
use crate::statement::{Program, Statement, StmtKind};
use crate::tracer::EngineTracer;
use crate::value::Value;

/// One universe's terminal outcome, as recorded in the shared result map.
#[derive(Debug, Clone)]
pub enum UniverseResult {
    /// The `out` variable's history, each event rendered via `Display`.
    Output(Vec<String>),
    /// A fatal error killed this universe (§7). Recording it here, rather
    /// than discarding it once the universe is dead, is a supplement over
    /// the original implementation — see `DESIGN.md`.
    Failed(EngineError),
}

/// `universe label -> outcome`, written exactly once per label, shared by
/// every universe in a run under a mutex (§5).
pub type ResultMap = Arc<Mutex<ahash::AHashMap<String, UniverseResult>>>;

/// A single concurrent execution: one environment, one label, one thread.
pub struct Universe {
    label: String,
    env: Environment,
    program: Arc<Program>,
    config: Arc<EngineConfig>,
    results: ResultMap,
    universe_count: Arc<AtomicUsize>,
    tracer: Box<dyn EngineTracer>,
}

impl Universe {
    #[must_use]
    pub fn new(
        label: String,
        env: Environment,
        program: Arc<Program>,
        config: Arc<EngineConfig>,
        results: ResultMap,
        universe_count: Arc<AtomicUsize>,
        tracer: Box<dyn EngineTracer>,
    ) -> Self {
        Self {
            label,
            env,
            program,
            config,
            results,
            universe_count,
            tracer,
        }
    }

    /// Runs every statement from `start` to the end of the program,
    /// records this universe's outcome, and joins every child it spawned
    /// along the way — in that order, regardless of how this universe's
    /// own run ended.
    pub fn run(mut self, start: usize) {
        let mut children: Vec<JoinHandle<()>> = Vec::new();
        let mut spawn_count: u32 = 0;
        let outcome = self.drive(start, &mut children, &mut spawn_count);
        let result = match outcome {
            Ok(()) => self.collect_output(),
            Err(e) => UniverseResult::Failed(e),
        };
        let failed = matches!(result, UniverseResult::Failed(_));
        self.tracer.on_universe_ended(&self.label, failed);
        self.results
            .lock()
            .expect("result map mutex poisoned by a panicking universe")
            .insert(self.label.clone(), result);
        for child in children {
            let _ = child.join();
        }
    }

    fn drive(
        &mut self,
        start: usize,
        children: &mut Vec<JoinHandle<()>>,
        spawn_count: &mut u32,
    ) -> Result<(), EngineError> {
        let program = Arc::clone(&self.program);
        for (offset, stmt) in program[start..].iter().enumerate() {
            let abs_index = start + offset;
            let mut next_step = CodeStep::default();

            // Resolver runs against the previous step before this statement
            // dispatches, so a fork that would contradict what this
            // statement is about to observe aborts first (§4.5).
            if let Some(prev) = self.env.code_history().last() {
                let prev = prev.clone();
                let resolved = resolve(&self.env, &prev, &self.label, self.tracer.as_mut())?;
                next_step.prophecies = resolved.prophecies;
                next_step.pending_forks = resolved.pending_forks;
                next_step.pending_debugs = resolved.pending_debugs;
                self.spawn_forks(resolved.forks_to_spawn, children, spawn_count);
            }

            self.tracer.on_dispatch(&self.label, abs_index, stmt.kind.as_str());
            self.dispatch(stmt, abs_index, &mut next_step, children, spawn_count)?;

            next_step.latest_indexes = self.env.latest_indexes();
            self.env.push_code_step(next_step);
        }

        // One last pass to fire any fork/prophecy that only became
        // resolvable after the final statement, and to flush pending
        // debugs. Nothing here is carried forward — there is no successor
        // step for a universe that just reached its end.
        if let Some(prev) = self.env.code_history().last() {
            let prev = prev.clone();
            let resolved = resolve(&self.env, &prev, &self.label, self.tracer.as_mut())?;
            self.spawn_forks(resolved.forks_to_spawn, children, spawn_count);
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        stmt: &Statement,
        abs_index: usize,
        next_step: &mut CodeStep,
        children: &mut Vec<JoinHandle<()>>,
        spawn_count: &mut u32,
    ) -> Result<(), EngineError> {
        match stmt.kind {
            StmtKind::Mutation => self.dispatch_mutation(stmt, abs_index, next_step),
            StmtKind::Revision => self.dispatch_revision(stmt, next_step, children, spawn_count),
            StmtKind::Prophecy => self.dispatch_prophecy(stmt, next_step),
        }
    }

    /// The LHS must name either a brand-new first event or the next
    /// expected slot — which, given how the re-indexing pass assigns
    /// mutation indices, is exactly `index == history_len(name)`.
    fn dispatch_mutation(&mut self, stmt: &Statement, abs_index: usize, next_step: &mut CodeStep) -> Result<(), EngineError> {
        let current_len = self.env.history_len(&stmt.lhs_name);
        if stmt.lhs_index < 0 || stmt.lhs_index as u64 != current_len as u64 {
            return Err(EngineError::IllegalMutationIndex {
                universe: self.label.clone(),
                name: stmt.lhs_name.clone(),
                index: stmt.lhs_index,
            });
        }

        if stmt.lhs_name == self.config.dbg_name_ref() {
            self.emit_debug(Some(abs_index as u32), &stmt.rhs, next_step)?;
        }

        let expression = self.resolved_or_verbatim(&stmt.rhs)?;
        self.env.push_event(&stmt.lhs_name, VarEvent {
            expression,
            code_index: abs_index,
        });
        Ok(())
    }

    /// The LHS must name an event already in history. Revisions never
    /// affect the current universe — a resolved RHS immediately forks a
    /// child that continues from `code_index + 1`.
    fn dispatch_revision(
        &mut self,
        stmt: &Statement,
        next_step: &mut CodeStep,
        children: &mut Vec<JoinHandle<()>>,
        spawn_count: &mut u32,
    ) -> Result<(), EngineError> {
        let current_len = self.env.history_len(&stmt.lhs_name);
        if stmt.lhs_index < 0 || stmt.lhs_index as u64 >= current_len as u64 {
            return Err(EngineError::IllegalRevisionIndex {
                universe: self.label.clone(),
                name: stmt.lhs_name.clone(),
                index: stmt.lhs_index,
            });
        }

        match eval(&stmt.rhs, &self.env).map_err(EngineError::TypeMismatch)? {
            Eval::Resolved(value) => self.fork_now(stmt.lhs_index as usize, &stmt.lhs_name, value, children, spawn_count)?,
            Eval::Undefined => self.fork_now(stmt.lhs_index as usize, &stmt.lhs_name, Value::Undefined, children, spawn_count)?,
            Eval::Unresolved => next_step.pending_forks.push(PendingFork {
                target: VarRef {
                    name: stmt.lhs_name.clone(),
                    index: stmt.lhs_index,
                },
                expr: stmt.rhs.clone(),
            }),
        }
        Ok(())
    }

    /// The LHS must name a future event. A prophecy never dispatches
    /// immediately — it is always recorded for the resolver to check on
    /// subsequent steps.
    fn dispatch_prophecy(&mut self, stmt: &Statement, next_step: &mut CodeStep) -> Result<(), EngineError> {
        let current_len = self.env.history_len(&stmt.lhs_name);
        if stmt.lhs_index >= 0 && (stmt.lhs_index as u64) < current_len as u64 {
            return Err(EngineError::IllegalProphecyIndex {
                universe: self.label.clone(),
                name: stmt.lhs_name.clone(),
                index: stmt.lhs_index,
            });
        }

        let expr = self.resolved_or_verbatim(&stmt.rhs)?;
        next_step.prophecies.push(PendingProphecy {
            target: VarRef {
                name: stmt.lhs_name.clone(),
                index: stmt.lhs_index,
            },
            expr,
        });
        Ok(())
    }

    /// Evaluates `expr`; a resolved or determinately-undefined outcome
    /// folds to a literal (nothing about either can change later), while
    /// an unresolved outcome is kept verbatim for lazy re-evaluation.
    fn resolved_or_verbatim(&self, expr: &Expr) -> Result<Expr, EngineError> {
        Ok(match eval(expr, &self.env).map_err(EngineError::TypeMismatch)? {
            Eval::Resolved(v) => Expr::Lit(v),
            Eval::Undefined => Expr::Lit(Value::Undefined),
            Eval::Unresolved => expr.clone(),
        })
    }

    fn emit_debug(&mut self, line: Option<u32>, expr: &Expr, next_step: &mut CodeStep) -> Result<(), EngineError> {
        match eval(expr, &self.env).map_err(EngineError::TypeMismatch)? {
            Eval::Resolved(v) => {
                println!("{}", crate::render::debug_line(&self.label, line, &v));
                self.tracer.on_debug_flushed(&self.label, line);
            }
            Eval::Undefined => {
                println!("{}", crate::render::debug_line(&self.label, line, &Value::Undefined));
                self.tracer.on_debug_flushed(&self.label, line);
            }
            Eval::Unresolved => {
                println!("{}", crate::render::debug_line(&self.label, line, expr));
                next_step.pending_debugs.push(PendingDebug {
                    line,
                    expr: expr.clone(),
                });
            }
        }
        Ok(())
    }

    fn fork_now(
        &mut self,
        index: usize,
        name: &str,
        value: Value,
        children: &mut Vec<JoinHandle<()>>,
        spawn_count: &mut u32,
    ) -> Result<(), EngineError> {
        if self.env.revision_is_noop(name, index, &value) {
            return Ok(());
        }
        let (child_env, code_index) = self.env.fork(name, index, Expr::Lit(value)).map_err(|e| EngineError::Fork {
            universe: self.label.clone(),
            source: e,
        })?;
        self.tracer.on_fork(name, index as i64, code_index);
        self.spawn_child(child_env, code_index, children, spawn_count);
        Ok(())
    }

    fn spawn_forks(&mut self, forks: Vec<(Environment, usize)>, children: &mut Vec<JoinHandle<()>>, spawn_count: &mut u32) {
        for (child_env, code_index) in forks {
            self.spawn_child(child_env, code_index, children, spawn_count);
        }
    }

    /// Spawns a child universe on its own thread, unless `max_universes`
    /// is configured and already saturated — in which case this fork is
    /// silently dropped rather than growing the tree further. `spec.md`
    /// leaves the universe tree unbounded by default (`max_universes` is
    /// `None`), so this branch is unreachable under the spec's own
    /// behavior and only matters for embedders who opt in.
    fn spawn_child(&mut self, child_env: Environment, code_index: usize, children: &mut Vec<JoinHandle<()>>, spawn_count: &mut u32) {
        if let Some(limit) = self.config.max_universes_limit() {
            let mut current = self.universe_count.load(Ordering::Relaxed);
            loop {
                if current >= limit {
                    return;
                }
                match self
                    .universe_count
                    .compare_exchange_weak(current, current + 1, Ordering::SeqCst, Ordering::Relaxed)
                {
                    Ok(_) => break,
                    Err(actual) => current = actual,
                }
            }
        } else {
            self.universe_count.fetch_add(1, Ordering::Relaxed);
        }

        let label = format!("{}-{spawn_count}", self.label);
        *spawn_count += 1;
        let program = Arc::clone(&self.program);
        let config = Arc::clone(&self.config);
        let results = Arc::clone(&self.results);
        let universe_count = Arc::clone(&self.universe_count);
        let tracer = self.tracer.for_child();
        let handle = thread::spawn(move || {
            Universe::new(label, child_env, program, config, results, universe_count, tracer).run(code_index + 1);
        });
        children.push(handle);
    }

    /// Evaluates every event in the configured output variable's history.
    /// Any event still `Unresolved` fails the universe with
    /// `IndeterminateOutput`; a missing `out` history is not an error —
    /// it simply contributes no output.
    fn collect_output(&self) -> UniverseResult {
        let out_name = self.config.out_name_ref();
        let Some(history) = self.env.history(out_name) else {
            return UniverseResult::Output(Vec::new());
        };

        let mut rendered = Vec::with_capacity(history.len());
        for event in history {
            match eval(&event.expression, &self.env) {
                Ok(Eval::Resolved(v)) => rendered.push(v.to_string()),
                Ok(Eval::Undefined) => rendered.push(Value::Undefined.to_string()),
                Ok(Eval::Unresolved) => {
                    return UniverseResult::Failed(EngineError::IndeterminateOutput {
                        universe: self.label.clone(),
                        name: out_name.to_string(),
                    })
                }
                Err(e) => return UniverseResult::Failed(EngineError::TypeMismatch(e)),
            }
        }
        UniverseResult::Output(rendered)
    }
}

impl StmtKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Mutation => "mutation",
            Self::Revision => "revision",
            Self::Prophecy => "prophecy",
        }
    }
}
