//! Per-step prophecy checking, pending-fork retry, and pending-debug flush.
//!
//! The resolver is invoked twice per statement: once before dispatching the
//! statement (against the previous step, so a resolved fork can abort before
//! the current statement observes state that would contradict it), and once
//! after the last statement (against the final step, with no successor, to
//! flush whatever is still carried).

use crate::env::{CodeStep, Environment, PendingDebug, PendingFork, PendingProphecy};
use crate::error::EngineError;
use crate::expr::{eval, Eval};
use crate::tracer::EngineTracer;

/// Output of one resolver pass: carry-forward lists for the next step, plus
/// any forks that resolved and must be spawned as child universes.
#[derive(Debug, Default)]
pub struct ResolvedStep {
    pub prophecies: Vec<PendingProphecy>,
    pub pending_forks: Vec<PendingFork>,
    pub pending_debugs: Vec<PendingDebug>,
    pub forks_to_spawn: Vec<(Environment, usize)>,
}

/// Runs one resolver pass over `prev` against the current state of `env`.
///
/// # Errors
///
/// Returns [`EngineError::ProphecyViolation`] if a prophecy's target event
/// resolved to a value unequal to the prophecy's own resolved value, or a
/// fork-precondition error if a pending fork's preconditions are violated
/// (unreachable if the environment's invariants hold, but propagated as
/// fatal rather than panicking).
pub fn resolve(
    env: &Environment,
    prev: &CodeStep,
    universe_label: &str,
    tracer: &mut dyn EngineTracer,
) -> Result<ResolvedStep, EngineError> {
    let mut out = ResolvedStep::default();

    for prophecy in &prev.prophecies {
        resolve_prophecy(prophecy, env, universe_label, tracer, &mut out)?;
    }

    for fork in &prev.pending_forks {
        resolve_pending_fork(fork, env, universe_label, tracer, &mut out)?;
    }

    for debug in &prev.pending_debugs {
        resolve_pending_debug(debug, env, universe_label, tracer, &mut out);
    }

    Ok(out)
}

fn resolve_prophecy(
    prophecy: &PendingProphecy,
    env: &Environment,
    universe_label: &str,
    tracer: &mut dyn EngineTracer,
    out: &mut ResolvedStep,
) -> Result<(), EngineError> {
    let predicted = eval(&prophecy.expr, env).map_err(EngineError::TypeMismatch)?;
    let Eval::Resolved(predicted_value) = predicted else {
        out.prophecies.push(prophecy.clone());
        return Ok(());
    };

    // Statement indices are always resolved to non-negative absolutes
    // upstream (§6), so a prophecy's target index is never negative here.
    let target_index = prophecy.target.index as usize;
    let bound = env.history_len(&prophecy.target.name) > target_index;
    if !bound {
        // Refine the carried expression to its resolved literal; this is a
        // monotone step, never a loss of information.
        out.prophecies.push(PendingProphecy {
            target: prophecy.target.clone(),
            expr: crate::expr::Expr::Lit(predicted_value),
        });
        return Ok(());
    }

    let actual_expr = &env.history(&prophecy.target.name).expect("checked bound above")[target_index].expression;
    let actual = eval(actual_expr, env).map_err(EngineError::TypeMismatch)?;
    match actual {
        Eval::Resolved(actual_value) => {
            if actual_value == predicted_value {
                tracer.on_prophecy_resolved(&prophecy.target.name, prophecy.target.index, true);
            } else {
                tracer.on_prophecy_resolved(&prophecy.target.name, prophecy.target.index, false);
                return Err(EngineError::ProphecyViolation {
                    universe: universe_label.to_string(),
                    name: prophecy.target.name.clone(),
                    index: prophecy.target.index,
                });
            }
        }
        Eval::Unresolved => {
            out.prophecies.push(PendingProphecy {
                target: prophecy.target.clone(),
                expr: crate::expr::Expr::Lit(predicted_value),
            });
        }
        Eval::Undefined => {
            out.prophecies.push(prophecy.clone());
        }
    }
    Ok(())
}

fn resolve_pending_fork(
    fork: &PendingFork,
    env: &Environment,
    universe_label: &str,
    tracer: &mut dyn EngineTracer,
    out: &mut ResolvedStep,
) -> Result<(), EngineError> {
    let rhs = eval(&fork.expr, env).map_err(EngineError::TypeMismatch)?;
    let Eval::Resolved(value) = rhs else {
        out.pending_forks.push(fork.clone());
        return Ok(());
    };
    let index = usize::try_from(fork.target.index).map_err(|_| EngineError::IllegalRevisionIndex {
        universe: universe_label.to_string(),
        name: fork.target.name.clone(),
        index: fork.target.index,
    })?;
    if env.revision_is_noop(&fork.target.name, index, &value) {
        return Ok(());
    }
    let (child_env, code_index) = env
        .fork(&fork.target.name, index, crate::expr::Expr::Lit(value))
        .map_err(|e| EngineError::Fork {
            universe: universe_label.to_string(),
            source: e,
        })?;
    tracer.on_fork(&fork.target.name, fork.target.index, code_index);
    out.forks_to_spawn.push((child_env, code_index));
    Ok(())
}

fn resolve_pending_debug(
    debug: &PendingDebug,
    env: &Environment,
    universe_label: &str,
    tracer: &mut dyn EngineTracer,
    out: &mut ResolvedStep,
) {
    match eval(&debug.expr, env) {
        Ok(Eval::Resolved(value)) => {
            println!("{}", crate::render::debug_line(universe_label, debug.line, &value));
            tracer.on_debug_flushed(universe_label, debug.line);
        }
        Ok(Eval::Unresolved) | Err(_) => out.pending_debugs.push(debug.clone()),
        Ok(Eval::Undefined) => {
            println!(
                "{}",
                crate::render::debug_line(universe_label, debug.line, &crate::value::Value::Undefined)
            );
            tracer.on_debug_flushed(universe_label, debug.line);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::{Expr, VarRef};
    use crate::statement::VarCount;
    use crate::tracer::NoopTracer;
    use crate::value::Value;

    fn counts(pairs: &[(&str, usize)]) -> VarCount {
        VarCount::from_iter(pairs.iter().map(|(n, c)| ((*n).to_string(), *c)))
    }

    #[test]
    fn satisfied_prophecy_is_dropped() {
        let mut env = Environment::new(counts(&[("x", 1)]));
        env.push_event(
            "x",
            crate::env::VarEvent {
                expression: Expr::Lit(Value::Integer(2)),
                code_index: 0,
            },
        );
        let prev = CodeStep {
            prophecies: vec![PendingProphecy {
                target: VarRef { name: "x".into(), index: 0 },
                expr: Expr::Lit(Value::Integer(2)),
            }],
            ..Default::default()
        };
        let mut tracer = NoopTracer;
        let result = resolve(&env, &prev, "root", &mut tracer).unwrap();
        assert!(result.prophecies.is_empty());
    }

    #[test]
    fn violated_prophecy_is_fatal() {
        let mut env = Environment::new(counts(&[("x", 1)]));
        env.push_event(
            "x",
            crate::env::VarEvent {
                expression: Expr::Lit(Value::Integer(3)),
                code_index: 0,
            },
        );
        let prev = CodeStep {
            prophecies: vec![PendingProphecy {
                target: VarRef { name: "x".into(), index: 0 },
                expr: Expr::Lit(Value::Integer(2)),
            }],
            ..Default::default()
        };
        let mut tracer = NoopTracer;
        let err = resolve(&env, &prev, "root", &mut tracer).unwrap_err();
        assert!(matches!(err, EngineError::ProphecyViolation { .. }));
    }

    #[test]
    fn unresolved_prophecy_is_carried_forward() {
        let env = Environment::new(counts(&[("x", 2)]));
        let prev = CodeStep {
            prophecies: vec![PendingProphecy {
                target: VarRef { name: "x".into(), index: 1 },
                expr: Expr::Lit(Value::Integer(2)),
            }],
            ..Default::default()
        };
        let mut tracer = NoopTracer;
        let result = resolve(&env, &prev, "root", &mut tracer).unwrap();
        assert_eq!(result.prophecies.len(), 1);
    }
}
