use crate::{
    exception::ExcType,
    heap::{Heap, HeapData},
    pending::SlotResult,
    runtime::Runtime,
    subscript::index::{IndexKind, checked_position},
    types::{
        MappingSlots, SequenceSlots, TypeSpec,
        protocol::{absolute_position, slot_index},
    },
    value::Value,
};

/// Builtin immutable byte string.
///
/// Indexing yields another byte string of length one, taken from the heap's
/// single-byte cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteStr(Vec<u8>);

impl ByteStr {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn type_spec(name: &str) -> TypeSpec {
        TypeSpec::new(name)
            .mapping(MappingSlots::new().get(str_subscript))
            .sequence(SequenceSlots::new().get(str_item).length(str_length))
    }
}

impl From<Vec<u8>> for ByteStr {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteStr {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

fn as_byte_str<'h>(heap: &'h Heap, obj: &Value) -> &'h ByteStr {
    match obj.heap_data(heap) {
        Some(HeapData::ByteStr(s)) => s,
        _ => unreachable!("string slot called on a non-string value"),
    }
}

/// Allocation failures inside a slot surface as a pending `MemoryError`.
fn single_byte(rt: &mut Runtime, byte: u8) -> SlotResult<Value> {
    match rt.heap.single_byte(byte) {
        Ok(id) => Ok(Value::Ref(id)),
        Err(err) => Err(rt.pending.set_msg(ExcType::MemoryError, err.to_string())),
    }
}

fn str_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<Value> {
    let index = slot_index(rt, key, "string")?;
    let s = as_byte_str(&rt.heap, obj);
    match checked_position(index, s.len()) {
        Some(position) => {
            let byte = s.0[position];
            single_byte(rt, byte)
        }
        None => Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::Str.message())),
    }
}

fn str_item(rt: &mut Runtime, obj: &Value, index: isize) -> SlotResult<Value> {
    let s = as_byte_str(&rt.heap, obj);
    match absolute_position(index, s.len()) {
        Some(position) => {
            let byte = s.0[position];
            single_byte(rt, byte)
        }
        None => Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::Str.message())),
    }
}

fn str_length(rt: &Runtime, obj: &Value) -> usize {
    as_byte_str(&rt.heap, obj).len()
}
