//! Index conversion for the builtin integer types.

use crate::{
    exception::ExcType,
    heap::HeapData,
    pending::SlotResult,
    runtime::Runtime,
    value::Value,
};

/// `int.__index__` / `bool.__index__`: the value itself as an `int`.
pub(crate) fn int_as_index(rt: &mut Runtime, value: &Value) -> SlotResult<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Ref(id) if matches!(rt.heap.get(*id), HeapData::LongInt(_)) => Ok(value.clone_with_heap(&rt.heap)),
        _ => {
            let msg = format!("'{}' object cannot be interpreted as an index", rt.type_name(value));
            Err(rt.pending.set_msg(ExcType::TypeError, msg))
        }
    }
}
