//! Generic item primitives shared by the builtin slot implementations.

use crate::{
    exception::{ExcType, RunResult},
    pending::SlotResult,
    runtime::Runtime,
    subscript::index::{convert_to_index, is_index_like},
    value::Value,
};

/// Converts `key` to a native index on behalf of a slot, recording failures in the pending slot.
///
/// Non index-like keys raise `TypeError: {owner} indices must be integers, not '{type}'`.
pub(crate) fn slot_index(rt: &mut Runtime, key: &Value, owner: &str) -> SlotResult<isize> {
    if !is_index_like(rt, key) {
        let msg = format!("{owner} indices must be integers, not '{}'", rt.type_name(key));
        return Err(rt.pending.set_msg(ExcType::TypeError, msg));
    }
    convert_to_index(rt, key).map_err(|err| rt.pending.set(err.into_exception()))
}

/// Bounds check for position slots: the index must already be absolute, anything outside `0..len` is `None`.
pub(crate) fn absolute_position(index: isize, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&position| position < len)
}

/// Deletes `target[key]` through the type's mapping delete slot.
///
/// Slot failures come back translated from the pending slot. Types without a delete
/// slot raise `TypeError: '{type}' object does not support item deletion`.
pub(crate) fn del_item(rt: &mut Runtime, target: &Value, key: &Value) -> RunResult<()> {
    let target_type = target.py_type(&rt.heap);
    match rt.types.get(target_type).capabilities().mapping_del() {
        Some(del) => del(rt, target, key).map_err(|raised| rt.pending.translate(raised)),
        None => Err(ExcType::type_error_no_deletion(rt.types.name(target_type))),
    }
}
