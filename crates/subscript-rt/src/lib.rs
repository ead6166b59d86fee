#![doc = include_str!("../../../README.md")]
// first so every module sees the arena types
mod heap;

mod config;
mod exception;
mod pending;
mod resource;
mod runtime;
mod subscript;
pub mod tracer;
mod types;
mod value;

pub use crate::{
    config::{RuntimeConfig, TextModel, TraceMode},
    exception::{ErrorKind, ExcType, RunError, RunResult, SimpleException},
    heap::{HeapId, HeapStats},
    pending::{PendingError, Raised, SlotResult},
    resource::{ResourceError, ResourceLimits},
    runtime::Runtime,
    subscript::{
        del_subscript,
        index::{IndexKind, checked_position, normalize_index},
        lookup_subscript, lookup_subscript_const, set_subscript,
    },
    tracer::{
        DispatchPath, NoopTracer, Operation, ProfilingReport, ProfilingTracer, RecordingTracer, StderrTracer,
        SubscriptTracer, TraceEvent,
    },
    types::{
        AsIndexFn, BuiltinKind, Capabilities, DelByKeyFn, GetByKeyFn, GetByPositionFn, LengthFn, MappingSlots,
        SequenceSlots, SetByKeyFn, SetByPositionFn, TypeId, TypeObject, TypeSpec,
    },
    value::Value,
};
