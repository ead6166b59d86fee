//! Subscript dispatch tracing.
//!
//! A trait-based tracing system for the subscript entry points. Every operation reports
//! which path served it: the exact-type fast path, or the generic dispatcher through a
//! mapping slot, a sequence slot or the generic deletion collaborator. Failed operations
//! additionally report the error they raised.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (default) |
//! | [`StderrTracer`] | Human-readable log to stderr |
//! | [`ProfilingTracer`] | Per-path hit counters |
//! | [`RecordingTracer`] | Full event recording for tests or post-mortem |
//!
//! The runtime owns its tracer as a boxed trait object, so tracers that collect data
//! share their buffers through `Rc` handles: keep a clone, install the other one with
//! [`Runtime::set_tracer`](crate::Runtime::set_tracer), and read the clone afterwards.

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use strum::{Display, IntoStaticStr};

use crate::{
    exception::{ErrorKind, ExcType, RunError},
    types::BuiltinKind,
};

/// The public subscript operation being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr)]
pub enum Operation {
    /// `lookup_subscript`
    Get,
    /// `lookup_subscript_const`
    GetConst,
    /// `set_subscript`
    Set,
    /// `del_subscript`
    Del,
}

/// How the generic dispatcher served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr)]
pub enum DispatchPath {
    /// Through the type's key-based slot.
    Mapping,
    /// Through the type's position-based slot after index conversion.
    Sequence,
    /// Through the generic deletion collaborator, or rejected before reaching any slot.
    Generic,
}

/// Trace event emitted by the subscript entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A constant-index read was served without consulting the capability table.
    FastPath {
        kind: BuiltinKind,
        /// Absolute position that was read.
        position: usize,
    },
    /// The generic dispatcher selected a path for the target's type.
    Dispatch {
        op: Operation,
        path: DispatchPath,
        type_name: String,
    },
    /// An operation failed.
    Error {
        op: Operation,
        kind: ErrorKind,
        exc_type: ExcType,
    },
}

/// Hooks called by the subscript entry points.
///
/// All methods default to no-ops, so implementations only override the hooks they need.
pub trait SubscriptTracer: fmt::Debug {
    /// Called when the fast path serves a read.
    #[inline(always)]
    fn on_fast_path(&mut self, _kind: BuiltinKind, _position: usize) {}

    /// Called when the generic dispatcher has chosen a path, before the slot runs.
    #[inline(always)]
    fn on_dispatch(&mut self, _op: Operation, _path: DispatchPath, _type_name: &str) {}

    /// Called with the error an operation is about to return.
    #[inline(always)]
    fn on_error(&mut self, _op: Operation, _error: &RunError) {}
}

/// Tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl SubscriptTracer for NoopTracer {}

/// Prints one line per event to stderr.
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Stop printing after this many events. None = unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stderr tracer that goes quiet after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    /// Counts an event and reports whether it should be printed.
    fn admit(&mut self) -> bool {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return false;
        }
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count == limit
        {
            eprintln!("--- subscript trace limit reached ({limit} events) ---");
        }
        true
    }
}

impl SubscriptTracer for StderrTracer {
    fn on_fast_path(&mut self, kind: BuiltinKind, position: usize) {
        if self.admit() {
            eprintln!("[subscript] fast {kind} position={position}");
        }
    }

    fn on_dispatch(&mut self, op: Operation, path: DispatchPath, type_name: &str) {
        if self.admit() {
            eprintln!("[subscript] {op:<8} via {path:<8} type={type_name}");
        }
    }

    fn on_error(&mut self, op: Operation, error: &RunError) {
        if self.admit() {
            eprintln!("[subscript] {op:<8} failed ({}): {error}", error.kind());
        }
    }
}

/// Aggregated counters collected by [`ProfilingTracer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilingReport {
    /// Reads served by the fast path, per builtin kind.
    pub fast_path_hits: BTreeMap<&'static str, u64>,
    /// Generic dispatches, per (operation, path).
    pub dispatches: BTreeMap<(Operation, DispatchPath), u64>,
    /// Failures, per error kind.
    pub errors: BTreeMap<&'static str, u64>,
}

impl ProfilingReport {
    #[must_use]
    pub fn total_fast_path_hits(&self) -> u64 {
        self.fast_path_hits.values().sum()
    }

    #[must_use]
    pub fn total_dispatches(&self) -> u64 {
        self.dispatches.values().sum()
    }
}

impl fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fast path hits: {}", self.total_fast_path_hits())?;
        for (kind, count) in &self.fast_path_hits {
            writeln!(f, "  {kind:<10} {count:>8}")?;
        }
        writeln!(f, "generic dispatches: {}", self.total_dispatches())?;
        for ((op, path), count) in &self.dispatches {
            writeln!(f, "  {op:<8} {path:<8} {count:>8}")?;
        }
        for (kind, count) in &self.errors {
            writeln!(f, "errors {kind}: {count}")?;
        }
        Ok(())
    }
}

/// Counts fast-path hits, dispatches and errors.
#[derive(Debug, Clone, Default)]
pub struct ProfilingTracer {
    report: Rc<RefCell<ProfilingReport>>,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters collected so far by this tracer and its clones.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        self.report.borrow().clone()
    }
}

impl SubscriptTracer for ProfilingTracer {
    fn on_fast_path(&mut self, kind: BuiltinKind, _position: usize) {
        *self.report.borrow_mut().fast_path_hits.entry(kind.into()).or_insert(0) += 1;
    }

    fn on_dispatch(&mut self, op: Operation, path: DispatchPath, _type_name: &str) {
        *self.report.borrow_mut().dispatches.entry((op, path)).or_insert(0) += 1;
    }

    fn on_error(&mut self, _op: Operation, error: &RunError) {
        *self.report.borrow_mut().errors.entry(error.kind().into()).or_insert(0) += 1;
    }
}

/// Records every event in order.
///
/// Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::with_capacity(limit.min(1024)))),
            limit: Some(limit),
        }
    }

    /// Returns a copy of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.borrow().len()
    }

    /// Discards everything recorded so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&mut self, event: TraceEvent) {
        let mut events = self.events.borrow_mut();
        if self.limit.is_some_and(|limit| events.len() >= limit) {
            return;
        }
        events.push(event);
    }
}

impl SubscriptTracer for RecordingTracer {
    fn on_fast_path(&mut self, kind: BuiltinKind, position: usize) {
        self.record(TraceEvent::FastPath { kind, position });
    }

    fn on_dispatch(&mut self, op: Operation, path: DispatchPath, type_name: &str) {
        self.record(TraceEvent::Dispatch {
            op,
            path,
            type_name: type_name.to_owned(),
        });
    }

    fn on_error(&mut self, op: Operation, error: &RunError) {
        self.record(TraceEvent::Error {
            op,
            kind: error.kind(),
            exc_type: error.exc_type(),
        });
    }
}
