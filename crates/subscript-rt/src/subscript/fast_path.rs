//! Constant-index reads on builtin containers.
//!
//! Only exact builtin kinds qualify: instances of user types never match, whatever
//! their slots do, and go through the generic dispatcher with the original key.

use crate::{
    config::TextModel,
    exception::RunResult,
    heap::HeapData,
    runtime::Runtime,
    subscript::{
        dispatch,
        index::{IndexKind, normalize_index},
    },
    tracer::Operation,
    types::BuiltinKind,
    value::Value,
};

/// Serves `source[index]` directly for lists (and byte strings under the byte text model),
/// falling back to the generic dispatcher with `key` for everything else.
pub(super) fn lookup_const(rt: &mut Runtime, source: &Value, key: &Value, index: isize) -> RunResult<Value> {
    if let Value::Ref(id) = source {
        match rt.heap.get(*id) {
            HeapData::List(list) => {
                let position = normalize_index(index, list.len(), IndexKind::List)?;
                let item = list.as_slice()[position].clone_with_heap(&rt.heap);
                rt.tracer.on_fast_path(BuiltinKind::List, position);
                return Ok(item);
            }
            HeapData::ByteStr(s) if rt.config().text_model == TextModel::ByteString => {
                let position = normalize_index(index, s.len(), IndexKind::Str)?;
                let byte = s.as_bytes()[position];
                let char_id = rt.heap.single_byte(byte)?;
                rt.tracer.on_fast_path(BuiltinKind::ByteStr, position);
                return Ok(Value::Ref(char_id));
            }
            _ => {}
        }
    }
    dispatch::lookup(rt, source, key, Operation::GetConst)
}
