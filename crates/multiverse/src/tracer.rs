//! Engine execution tracing.
//!
//! Provides a trait-based tracing system with zero-cost abstraction: with
//! [`NoopTracer`], every hook compiles away via inlining. Concrete
//! implementations observe different slices of what the resolver and
//! universe runner do:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`StderrTracer`] | Human-readable event log to stderr |
//! | [`RecordingTracer`] | Full event recording for post-mortem inspection |

/// One traced event, as captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A universe dispatched a statement.
    Dispatch { universe: String, stmt_index: usize, kind: &'static str },
    /// A revision resolved and spawned a child universe.
    Fork { parent: String, var: String, index: i64, code_index: usize },
    /// A prophecy resolved, satisfied or violated.
    ProphecyResolved { var: String, index: i64, satisfied: bool },
    /// A pending debug print flushed.
    DebugFlushed { universe: String, line: Option<u32> },
    /// A universe terminated, successfully or not.
    UniverseEnded { universe: String, failed: bool },
}

/// Hook points for observing engine execution.
///
/// All methods have default no-op bodies, so implementing only the hooks
/// you care about is enough. The universe runner and resolver carry the
/// tracer as `&mut dyn EngineTracer` rather than a generic parameter,
/// since a universe tree forks across threads and a trait object is the
/// simplest way to let each universe hold its own tracer instance.
pub trait EngineTracer: std::fmt::Debug + Send {
    /// Called before a statement is dispatched.
    fn on_dispatch(&mut self, _universe: &str, _stmt_index: usize, _kind: &'static str) {}
    /// Called when a revision resolves and a child universe is about to be
    /// spawned.
    fn on_fork(&mut self, _var: &str, _index: i64, _code_index: usize) {}
    /// Called when a prophecy resolves, either satisfied or violated.
    fn on_prophecy_resolved(&mut self, _var: &str, _index: i64, _satisfied: bool) {}
    /// Called when a pending debug print is flushed.
    fn on_debug_flushed(&mut self, _universe: &str, _line: Option<u32>) {}
    /// Called when a universe terminates.
    fn on_universe_ended(&mut self, _universe: &str, _failed: bool) {}
    /// Produces a fresh tracer of the same kind for a child universe. The
    /// default clones nothing and returns a fresh [`NoopTracer`]-equivalent
    /// via the implementor's own `Default`; override when a tracer needs to
    /// share state (e.g. [`RecordingTracer`] reuses its own type but starts
    /// the child with an empty event log).
    fn for_child(&self) -> Box<dyn EngineTracer>;
}

/// A tracer that does nothing. All hooks use the trait's no-op defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EngineTracer for NoopTracer {
    fn for_child(&self) -> Box<dyn EngineTracer> {
        Box::new(Self)
    }
}

/// Tracer that prints a human-readable event log to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl EngineTracer for StderrTracer {
    fn on_dispatch(&mut self, universe: &str, stmt_index: usize, kind: &'static str) {
        eprintln!("[{universe}] dispatch #{stmt_index} {kind}");
    }

    fn on_fork(&mut self, var: &str, index: i64, code_index: usize) {
        eprintln!("  >>> FORK {var}@{index} at code_index={code_index}");
    }

    fn on_prophecy_resolved(&mut self, var: &str, index: i64, satisfied: bool) {
        let verdict = if satisfied { "satisfied" } else { "VIOLATED" };
        eprintln!("  ... PROPHECY {var}@{index} {verdict}");
    }

    fn on_debug_flushed(&mut self, universe: &str, line: Option<u32>) {
        eprintln!("  ... DEBUG flushed [{universe}] line={line:?}");
    }

    fn on_universe_ended(&mut self, universe: &str, failed: bool) {
        eprintln!("[{universe}] ended failed={failed}");
    }

    fn for_child(&self) -> Box<dyn EngineTracer> {
        Box::new(*self)
    }
}

/// Tracer that records every event for post-mortem inspection.
///
/// Each child universe gets its own `RecordingTracer` with an empty event
/// log — events are not pooled across the universe tree, since universes
/// run on independent threads and pooling would require the same
/// synchronization the engine otherwise avoids within a single universe's
/// hot path.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl EngineTracer for RecordingTracer {
    fn on_dispatch(&mut self, universe: &str, stmt_index: usize, kind: &'static str) {
        self.events.push(TraceEvent::Dispatch {
            universe: universe.to_string(),
            stmt_index,
            kind,
        });
    }

    fn on_fork(&mut self, var: &str, index: i64, code_index: usize) {
        self.events.push(TraceEvent::Fork {
            parent: String::new(),
            var: var.to_string(),
            index,
            code_index,
        });
    }

    fn on_prophecy_resolved(&mut self, var: &str, index: i64, satisfied: bool) {
        self.events.push(TraceEvent::ProphecyResolved {
            var: var.to_string(),
            index,
            satisfied,
        });
    }

    fn on_debug_flushed(&mut self, universe: &str, line: Option<u32>) {
        self.events.push(TraceEvent::DebugFlushed {
            universe: universe.to_string(),
            line,
        });
    }

    fn on_universe_ended(&mut self, universe: &str, failed: bool) {
        self.events.push(TraceEvent::UniverseEnded {
            universe: universe.to_string(),
            failed,
        });
    }

    fn for_child(&self) -> Box<dyn EngineTracer> {
        Box::new(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn recording_tracer_captures_events_in_order() {
        let mut tracer = RecordingTracer::new();
        tracer.on_dispatch("root", 0, "mutation");
        tracer.on_prophecy_resolved("x", 1, true);
        assert_eq!(tracer.events().len(), 2);
        assert!(matches!(tracer.events()[0], TraceEvent::Dispatch { .. }));
    }

    #[test]
    fn noop_tracer_for_child_is_noop() {
        let tracer = NoopTracer;
        let mut child = tracer.for_child();
        child.on_dispatch("root-0", 0, "mutation");
    }
}
