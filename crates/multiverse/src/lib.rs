#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "indices and counts fit i64/usize by construction")]
#![expect(clippy::cast_sign_loss, reason = "non-negative indices are cast to usize after bounds checks")]
#![expect(clippy::cast_possible_wrap, reason = "history lengths fit i64 for comparison against absolute indices")]
#![expect(clippy::module_name_repetitions, reason = "EngineError/EngineConfig/EngineTracer read clearly at call sites")]

mod config;
mod env;
mod error;
mod expr;
mod render;
mod resolver;
mod statement;
mod supervisor;
mod tracer;
mod universe;
mod value;

pub use crate::{
    config::EngineConfig,
    env::{CodeStep, Environment, ForkError, PendingDebug, PendingFork, PendingProphecy, VarEvent},
    error::EngineError,
    expr::{eval, Eval, Expr, Op, VarRef},
    render::debug_line,
    statement::{Program, Statement, StmtKind, VarCount},
    supervisor::{RunReport, Supervisor, ROOT_LABEL},
    tracer::{EngineTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    universe::UniverseResult,
    value::{TypeMismatch, Value},
};
