//! Capability-table dispatch for reads, writes and deletes.
//!
//! Slot function pointers are copied out of the type registry before they are called,
//! so slots receive the runtime mutably and may allocate, raise or call back in.

use crate::{
    exception::{ExcType, RunResult},
    runtime::Runtime,
    subscript::index::{convert_to_index, is_index_like},
    tracer::{DispatchPath, Operation},
    types::{SequenceSlots, TypeId, protocol::del_item},
    value::Value,
};

fn trace(rt: &mut Runtime, op: Operation, path: DispatchPath, type_id: TypeId) {
    rt.tracer.on_dispatch(op, path, rt.types.name(type_id));
}

/// Wraps a negative index by the sequence's length so position slots see absolute positions.
///
/// Indices still negative afterwards are passed through for the slot to reject.
fn wrap_index(rt: &Runtime, seq: &SequenceSlots, target: &Value, index: isize) -> isize {
    match seq.length {
        Some(length) if index < 0 => index.saturating_add_unsigned(length(rt, target)),
        _ => index,
    }
}

/// Generic `source[key]`.
pub(crate) fn lookup(rt: &mut Runtime, source: &Value, key: &Value, op: Operation) -> RunResult<Value> {
    let source_type = source.py_type(&rt.heap);
    let capabilities = *rt.types.get(source_type).capabilities();

    if let Some(get) = capabilities.mapping_get() {
        trace(rt, op, DispatchPath::Mapping, source_type);
        return get(rt, source, key).map_err(|raised| rt.pending.translate(raised));
    }

    if let Some(seq) = capabilities.sequence() {
        if is_index_like(rt, key) {
            let Some(get) = seq.get else {
                return Err(ExcType::type_error_no_indexing(rt.types.name(source_type)));
            };
            let index = convert_to_index(rt, key)?;
            let index = wrap_index(rt, seq, source, index);
            trace(rt, op, DispatchPath::Sequence, source_type);
            return get(rt, source, index).map_err(|raised| rt.pending.translate(raised));
        }
        if seq.get.is_some() {
            return Err(ExcType::type_error_sequence_index(rt.type_name(key)));
        }
    }

    Err(ExcType::type_error_unsubscriptable(rt.types.name(source_type)))
}

/// Generic `target[key] = value`.
pub(crate) fn assign(rt: &mut Runtime, value: &Value, target: &Value, key: &Value) -> RunResult<()> {
    let target_type = target.py_type(&rt.heap);
    let capabilities = *rt.types.get(target_type).capabilities();

    if let Some(set) = capabilities.mapping_set() {
        trace(rt, Operation::Set, DispatchPath::Mapping, target_type);
        return set(rt, target, key, value).map_err(|raised| rt.pending.translate(raised));
    }

    if let Some(seq) = capabilities.sequence() {
        if is_index_like(rt, key) {
            if let Some(set) = seq.set {
                let index = convert_to_index(rt, key)?;
                let index = wrap_index(rt, seq, target, index);
                trace(rt, Operation::Set, DispatchPath::Sequence, target_type);
                return set(rt, target, index, value).map_err(|raised| rt.pending.translate(raised));
            }
        } else if seq.set.is_some() {
            return Err(ExcType::type_error_sequence_index(rt.type_name(key)));
        }
    }

    Err(ExcType::type_error_no_assignment(rt.types.name(target_type)))
}

/// Generic `del target[key]`, always through the generic deletion collaborator.
pub(crate) fn delete(rt: &mut Runtime, target: &Value, key: &Value) -> RunResult<()> {
    let target_type = target.py_type(&rt.heap);
    trace(rt, Operation::Del, DispatchPath::Generic, target_type);
    del_item(rt, target, key)
}
