use smallvec::SmallVec;

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

/// Builtin immutable sequence. Readable by key or position; never assignable.
#[derive(Debug, Default)]
pub struct Tuple {
    items: SmallVec<[Value; 3]>,
}

impl Tuple {
    #[must_use]
    pub fn new(items: SmallVec<[Value; 3]>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn type_spec() -> TypeSpec {
        TypeSpec::new("tuple")
            .mapping(MappingSlots::new().get(tuple_subscript))
            .sequence(SequenceSlots::new().get(tuple_item).length(tuple_length))
    }
}

fn as_tuple<'h>(heap: &'h Heap, obj: &Value) -> &'h Tuple {
    match obj.heap_data(heap) {
        Some(HeapData::Tuple(tuple)) => tuple,
        _ => unreachable!("tuple slot called on a non-tuple value"),
    }
}

fn tuple_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<Value> {
    let index = slot_index(rt, key, "tuple")?;
    let tuple = as_tuple(&rt.heap, obj);
    match checked_position(index, tuple.len()) {
        Some(position) => Ok(tuple.items[position].clone_with_heap(&rt.heap)),
        None => Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::Tuple.message())),
    }
}

fn tuple_item(rt: &mut Runtime, obj: &Value, index: isize) -> SlotResult<Value> {
    let tuple = as_tuple(&rt.heap, obj);
    match absolute_position(index, tuple.len()) {
        Some(position) => Ok(tuple.items[position].clone_with_heap(&rt.heap)),
        None => Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::Tuple.message())),
    }
}

fn tuple_length(rt: &Runtime, obj: &Value) -> usize {
    as_tuple(&rt.heap, obj).len()
}
