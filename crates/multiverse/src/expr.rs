//! The expression AST and its evaluator.
//!
//! Evaluation is a pure function of an expression and an [`Environment`]: it
//! performs no I/O and never mutates the environment. It returns one of
//! three outcomes rather than a plain `Value`, because an expression may
//! refer to events that are not bound yet.

use crate::env::Environment;
use crate::value::Value;

/// The closed set of operators the language defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Not,
    Neg,
    Len,
    Idx,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    Def,
}

impl Op {
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::Not | Self::Neg | Self::Len)
    }
}

/// A reference to one event in a variable's history: `name@index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub name: String,
    pub index: i64,
}

/// A recursive expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Var(VarRef),
    Unary {
        op: Op,
        operand: Box<Expr>,
    },
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `concrete: true` means every element is already a fully-resolved
    /// literal (produced once by a prior fold); such a tuple is returned
    /// as-is rather than re-evaluated element by element.
    TupleExpr {
        elements: Vec<Expr>,
        concrete: bool,
    },
    /// `def(name@index)` — never fails, answers whether that event is
    /// declared in scope (`0 <= index < var_count[name]`) and bound.
    Def(VarRef),
}

/// The outcome of evaluating an [`Expr`] against an [`Environment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Eval {
    Resolved(Value),
    Unresolved,
    Undefined,
}

impl Eval {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Fatal evaluation failure: an operator applied to operand kinds it does
/// not support. Distinct from [`Eval::Undefined`], which is a normal,
/// non-fatal outcome.
pub use crate::value::TypeMismatch as EvalTypeError;

impl std::fmt::Display for Expr {
    /// Renders the syntactic form of an expression, not its value — used
    /// for the immediate `dbg` print when the expression is not yet
    /// resolvable (§4.5).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lit(v) => write!(f, "{v}"),
            Self::Var(r) => write!(f, "{}@{}", r.name, r.index),
            Self::Def(r) => write!(f, "def {}@{}", r.name, r.index),
            Self::Unary { op, operand } => write!(f, "{op} {operand}"),
            Self::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            Self::TupleExpr { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Evaluates `expr` against `env`.
///
/// `visited` tracks the set of variable names currently on the evaluation
/// stack, for cycle detection (`x@0 = y@0; y@0 = x@0` must not diverge —
/// re-entering a name already being evaluated yields `Unresolved`, since the
/// cycle may break if a different evaluation order is tried later).
///
/// # Errors
///
/// Returns [`EvalTypeError`] if an operator is applied to operand kinds it
/// does not accept.
pub fn eval(expr: &Expr, env: &Environment) -> Result<Eval, EvalTypeError> {
    eval_inner(expr, env, &mut ahash::AHashSet::default())
}

fn eval_inner(expr: &Expr, env: &Environment, visited: &mut ahash::AHashSet<String>) -> Result<Eval, EvalTypeError> {
    match expr {
        Expr::Lit(v) => Ok(Eval::Resolved(v.clone())),

        Expr::Var(r) => eval_var(r, env, visited),

        Expr::Def(r) => Ok(Eval::Resolved(Value::Boolean(env.is_defined(r)))),

        Expr::Unary { op, operand } => {
            let operand = eval_inner(operand, env, visited)?;
            match operand {
                Eval::Unresolved => Ok(Eval::Unresolved),
                Eval::Undefined => Ok(Eval::Undefined),
                Eval::Resolved(v) => match Value::apply_unary(*op, v) {
                    Ok(result) => Ok(Eval::Resolved(result)),
                    Err(e) => Err(e),
                },
            }
        }

        Expr::Binary { op, left, right } => {
            let left = eval_inner(left, env, visited)?;
            let right = eval_inner(right, env, visited)?;
            match (left, right) {
                (Eval::Unresolved, _) | (_, Eval::Unresolved) => Ok(Eval::Unresolved),
                (Eval::Undefined, _) | (_, Eval::Undefined) => Ok(Eval::Undefined),
                (Eval::Resolved(l), Eval::Resolved(r)) => match Value::apply_binary(*op, l, r) {
                    Ok(result) => Ok(Eval::Resolved(result)),
                    Err(e) => Err(e),
                },
            }
        }

        Expr::TupleExpr { elements, concrete } if *concrete => {
            let mut values = Vec::with_capacity(elements.len());
            for e in elements {
                let Expr::Lit(v) = e else {
                    unreachable!("a concrete TupleExpr must only contain Lit elements");
                };
                values.push(v.clone());
            }
            Ok(Eval::Resolved(Value::Tuple(values)))
        }

        Expr::TupleExpr { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for e in elements {
                match eval_inner(e, env, visited)? {
                    Eval::Unresolved => return Ok(Eval::Unresolved),
                    Eval::Undefined => return Ok(Eval::Undefined),
                    Eval::Resolved(v) => values.push(v),
                }
            }
            Ok(Eval::Resolved(Value::Tuple(values)))
        }
    }
}

fn eval_var(r: &VarRef, env: &Environment, visited: &mut ahash::AHashSet<String>) -> Result<Eval, EvalTypeError> {
    let Some(&count) = env.var_count(&r.name) else {
        return Ok(Eval::Undefined);
    };
    if r.index < 0 || r.index >= i64::try_from(count).unwrap_or(i64::MAX) {
        return Ok(Eval::Undefined);
    }
    let idx = r.index as usize;
    let Some(history) = env.history(&r.name) else {
        return Ok(Eval::Unresolved);
    };
    if idx >= history.len() {
        return Ok(Eval::Unresolved);
    }
    if !visited.insert(r.name.clone()) {
        return Ok(Eval::Unresolved);
    }
    let result = eval_inner(&history[idx].expression, env, visited);
    visited.remove(&r.name);
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::env::Environment;
    use crate::statement::VarCount;

    fn var_count(pairs: &[(&str, usize)]) -> VarCount {
        VarCount::from_iter(pairs.iter().map(|(n, c)| ((*n).to_string(), *c)))
    }

    #[test]
    fn literal_is_resolved() {
        let env = Environment::new(var_count(&[]));
        let result = eval(&Expr::Lit(Value::Integer(5)), &env).unwrap();
        assert_eq!(result, Eval::Resolved(Value::Integer(5)));
    }

    #[test]
    fn var_out_of_declared_range_is_undefined() {
        let env = Environment::new(var_count(&[("x", 1)]));
        let result = eval(
            &Expr::Var(VarRef {
                name: "x".into(),
                index: 5,
            }),
            &env,
        )
        .unwrap();
        assert_eq!(result, Eval::Undefined);
    }

    #[test]
    fn var_in_range_but_unbound_is_unresolved() {
        let env = Environment::new(var_count(&[("x", 2)]));
        let result = eval(
            &Expr::Var(VarRef {
                name: "x".into(),
                index: 0,
            }),
            &env,
        )
        .unwrap();
        assert_eq!(result, Eval::Unresolved);
    }

    #[test]
    fn self_referential_cycle_is_unresolved_not_a_hang() {
        let mut env = Environment::new(var_count(&[("x", 1), ("y", 1)]));
        env.bind_for_test(
            "x",
            Expr::Var(VarRef {
                name: "y".into(),
                index: 0,
            }),
        );
        env.bind_for_test(
            "y",
            Expr::Var(VarRef {
                name: "x".into(),
                index: 0,
            }),
        );
        let result = eval(
            &Expr::Var(VarRef {
                name: "x".into(),
                index: 0,
            }),
            &env,
        )
        .unwrap();
        assert_eq!(result, Eval::Unresolved);
    }
}
