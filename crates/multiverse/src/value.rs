//! Concrete values and the operator table that acts on them.
//!
//! A [`Value`] is immutable and structurally comparable. Operators are type
//! dispatched in [`Value::apply_unary`]/[`Value::apply_binary`]: a mismatch
//! between operand kinds is a fatal error for the universe evaluating it
//! (see [`crate::error::EngineError::TypeMismatch`]), while an `Undefined`
//! operand propagates through every operator except `def`.

use num_integer::Integer as _;

use crate::expr::Op;

/// A concrete runtime value.
///
/// `Undefined` is a first-class value, not an error: it means "this index is
/// out of scope" or "this derived operation has no defined result". Structural
/// equality between two `Undefined` values is deliberately never exercised by
/// this engine — see the `eq`/`neq` operator implementation below.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Atom(String),
    Tuple(Vec<Value>),
    Undefined,
}

/// Outcome of evaluating an operator against operand kinds it does not support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub op: Op,
    pub operand_kinds: Vec<&'static str>,
}

impl Value {
    /// A short name for the value's kind, used in [`TypeMismatch`] messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Atom(_) => "atom",
            Self::Tuple(_) => "tuple",
            Self::Undefined => "undefined",
        }
    }

    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Applies a unary operator. `def` never reaches this path (it is
    /// resolved directly against the environment, not against a value).
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatch`] if `op` does not accept `operand`'s kind.
    pub fn apply_unary(op: Op, operand: Value) -> Result<Value, TypeMismatch> {
        if operand.is_undefined() {
            return Ok(Value::Undefined);
        }
        match (op, operand) {
            (Op::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            (Op::Neg, Value::Integer(n)) => Ok(Value::Integer(-n)),
            (Op::Len, Value::Tuple(elems)) => Ok(Value::Integer(elems.len() as i64)),
            (Op::Len, Value::Atom(s)) => Ok(Value::Integer(s.chars().count() as i64)),
            (op, operand) => Err(TypeMismatch {
                op,
                operand_kinds: vec![operand.kind_name()],
            }),
        }
    }

    /// Applies a binary operator.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatch`] if `op` does not accept the pair of operand
    /// kinds given.
    pub fn apply_binary(op: Op, lhs: Value, rhs: Value) -> Result<Value, TypeMismatch> {
        // eq/neq are the only operators defined over every kind, including
        // Undefined, so they're dispatched before the propagation check.
        if let Op::Eq | Op::Neq = op {
            debug_assert!(
                !(lhs.is_undefined() && rhs.is_undefined()),
                "comparing two Undefined values is ill-defined and must never be queried"
            );
            let equal = lhs == rhs;
            return Ok(Value::Boolean(if op == Op::Eq { equal } else { !equal }));
        }
        if lhs.is_undefined() || rhs.is_undefined() {
            return Ok(Value::Undefined);
        }
        use Value::{Atom, Boolean, Integer, Tuple};
        match (op, lhs, rhs) {
            (Op::Add, Integer(a), Integer(b)) => Ok(Integer(a + b)),
            (Op::Add, Tuple(mut a), Tuple(b)) => {
                a.extend(b);
                Ok(Tuple(a))
            }
            (Op::Add, Atom(mut a), Atom(b)) => {
                a.push_str(&b);
                Ok(Atom(a))
            }
            (Op::Sub, Integer(a), Integer(b)) => Ok(Integer(a - b)),
            (Op::Mul, Integer(a), Integer(b)) => Ok(Integer(a * b)),
            (Op::Div, Integer(a), Integer(b)) => Ok(Integer(a.div_floor(&b))),
            (Op::Mod, Integer(a), Integer(b)) => Ok(Integer(a.mod_floor(&b))),
            (Op::And, Boolean(a), Boolean(b)) => Ok(Boolean(a && b)),
            (Op::And, Integer(a), Integer(b)) => Ok(Integer(a.min(b))),
            (Op::Or, Boolean(a), Boolean(b)) => Ok(Boolean(a || b)),
            (Op::Or, Integer(a), Integer(b)) => Ok(Integer(a.max(b))),
            (Op::Lt, Integer(a), Integer(b)) => Ok(Boolean(a < b)),
            (Op::Gt, Integer(a), Integer(b)) => Ok(Boolean(a > b)),
            (Op::Leq, Integer(a), Integer(b)) => Ok(Boolean(a <= b)),
            (Op::Geq, Integer(a), Integer(b)) => Ok(Boolean(a >= b)),
            (Op::Idx, Tuple(elems), Integer(i)) => {
                let idx = usize::try_from(i).ok();
                Ok(idx.and_then(|i| elems.get(i).cloned()).unwrap_or(Value::Undefined))
            }
            (op, lhs, rhs) => Err(TypeMismatch {
                op,
                operand_kinds: vec![lhs.kind_name(), rhs.kind_name()],
            }),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Atom(s) => write!(f, "\u{201c}{s}\u{201d}"),
            Self::Tuple(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn add_concatenates_tuples() {
        let a = Value::Tuple(vec![Value::Integer(1)]);
        let b = Value::Tuple(vec![Value::Integer(2)]);
        let result = Value::apply_binary(Op::Add, a, b).unwrap();
        assert_eq!(result, Value::Tuple(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn div_is_floor_division() {
        let result = Value::apply_binary(Op::Div, Value::Integer(-7), Value::Integer(2)).unwrap();
        assert_eq!(result, Value::Integer(-4));
    }

    #[test]
    fn undefined_propagates_through_add() {
        let result = Value::apply_binary(Op::Add, Value::Undefined, Value::Integer(1)).unwrap();
        assert_eq!(result, Value::Undefined);
    }

    #[test]
    fn mismatched_kinds_are_fatal() {
        let err = Value::apply_binary(Op::Add, Value::Integer(1), Value::Boolean(true)).unwrap_err();
        assert_eq!(err.op, Op::Add);
    }

    #[test]
    fn idx_out_of_range_is_undefined() {
        let t = Value::Tuple(vec![Value::Integer(1)]);
        let result = Value::apply_binary(Op::Idx, t, Value::Integer(5)).unwrap();
        assert_eq!(result, Value::Undefined);
    }

    #[test]
    fn render_matches_spec_format() {
        assert_eq!(Value::Integer(2).to_string(), "2");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Atom("hi".into()).to_string(), "\u{201c}hi\u{201d}");
        assert_eq!(
            Value::Tuple(vec![Value::Integer(1), Value::Integer(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }
}
