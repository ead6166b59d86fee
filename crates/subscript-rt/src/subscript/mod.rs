//! The subscript access protocol: `x[k]`, `x[k] = v` and `del x[k]`.
//!
//! Compiled code calls one of four entry points. Reads with an index the caller already
//! resolved to an integer enter [`lookup_subscript_const`], which serves exact builtin
//! lists (and byte strings under [`TextModel::ByteString`](crate::TextModel::ByteString))
//! without consulting the capability table. Every other read, and every write and
//! delete, is resolved through the target type's capability table.
//!
//! Each entry point borrows its operands and either returns an owned result or a
//! [`RunError`](crate::RunError). Errors recorded by slots in the pending error slot are
//! translated into [`RunError::Propagated`](crate::RunError::Propagated) with their type and
//! message intact, leaving the slot empty.

mod dispatch;
mod fast_path;
pub(crate) mod index;

use crate::{exception::RunResult, runtime::Runtime, tracer::Operation, value::Value};

fn enter(rt: &Runtime, operands: &[&Value]) {
    for operand in operands {
        rt.assert_object(operand);
    }
    debug_assert!(
        !rt.pending.is_set(),
        "subscript operation entered with an untranslated pending error"
    );
}

fn finish<T>(rt: &mut Runtime, op: Operation, result: RunResult<T>) -> RunResult<T> {
    if let Err(err) = &result {
        rt.tracer.on_error(op, err);
    }
    result
}

/// `source[const_subscript]` where the caller has already resolved the key to `int_subscript`.
///
/// `const_subscript` must be the key object `int_subscript` was derived from; it is
/// used unchanged when the source is not a builtin served by the fast path.
///
/// # Errors
/// `IndexOutOfRange` when the index is outside the container, otherwise as
/// [`lookup_subscript`].
pub fn lookup_subscript_const(
    rt: &mut Runtime,
    source: &Value,
    const_subscript: &Value,
    int_subscript: isize,
) -> RunResult<Value> {
    enter(rt, &[source, const_subscript]);
    let result = fast_path::lookup_const(rt, source, const_subscript, int_subscript);
    finish(rt, Operation::GetConst, result)
}

/// `source[subscript]`.
///
/// # Errors
/// - `TypeMismatch` when the source's type cannot be read by the key's kind.
/// - `IndexOutOfRange` when an index-like key does not fit a native index.
/// - `Propagated` with whatever the type's slot raised.
pub fn lookup_subscript(rt: &mut Runtime, source: &Value, subscript: &Value) -> RunResult<Value> {
    enter(rt, &[source, subscript]);
    let result = dispatch::lookup(rt, source, subscript, Operation::Get);
    finish(rt, Operation::Get, result)
}

/// `target[subscript] = value`.
///
/// Operands are listed in the order the caller must have evaluated them: value, then
/// target, then subscript. The target stores its own reference to `value`.
///
/// # Errors
/// As [`lookup_subscript`], with `TypeMismatch` phrased for item assignment.
pub fn set_subscript(rt: &mut Runtime, value: &Value, target: &Value, subscript: &Value) -> RunResult<()> {
    enter(rt, &[value, target, subscript]);
    let result = dispatch::assign(rt, value, target, subscript);
    finish(rt, Operation::Set, result)
}

/// `del target[subscript]`.
///
/// # Errors
/// `TypeMismatch` when the target's type has no delete slot, `Propagated` with whatever
/// the slot raised otherwise.
pub fn del_subscript(rt: &mut Runtime, target: &Value, subscript: &Value) -> RunResult<()> {
    enter(rt, &[target, subscript]);
    let result = dispatch::delete(rt, target, subscript);
    finish(rt, Operation::Del, result)
}
