use std::mem;

use crate::{
    exception::ExcType,
    heap::{Heap, HeapData, ITEM_SIZE},
    pending::SlotResult,
    runtime::Runtime,
    subscript::index::{IndexKind, checked_position},
    types::{
        MappingSlots, SequenceSlots, TypeSpec,
        protocol::{absolute_position, slot_index},
    },
    value::Value,
};

/// Builtin ordered mutable sequence.
///
/// Served directly by the constant-index fast path; every other access goes through
/// the slots registered in [`List::type_spec`].
#[derive(Debug, Default)]
pub struct List {
    items: Vec<Value>,
}

impl List {
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
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
        TypeSpec::new("list")
            .mapping(
                MappingSlots::new()
                    .get(list_subscript)
                    .set(list_ass_subscript)
                    .del(list_del_subscript),
            )
            .sequence(
                SequenceSlots::new()
                    .get(list_item)
                    .set(list_ass_item)
                    .length(list_length),
            )
    }
}

fn as_list<'h>(heap: &'h Heap, obj: &Value) -> &'h List {
    match obj.heap_data(heap) {
        Some(HeapData::List(list)) => list,
        _ => unreachable!("list slot called on a non-list value"),
    }
}

fn as_list_mut<'h>(heap: &'h mut Heap, obj: &Value) -> &'h mut List {
    let id = obj.ref_id().expect("list slot called on an immediate value");
    match heap.get_mut(id) {
        HeapData::List(list) => list,
        _ => unreachable!("list slot called on a non-list value"),
    }
}

/// Replaces the item at `position`, releasing the old one.
fn store_item(rt: &mut Runtime, obj: &Value, position: usize, value: &Value) {
    let new_item = value.clone_with_heap(&rt.heap);
    let old = mem::replace(&mut as_list_mut(&mut rt.heap, obj).items[position], new_item);
    old.drop_with_heap(&mut rt.heap);
}

fn list_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<Value> {
    let index = slot_index(rt, key, "list")?;
    let list = as_list(&rt.heap, obj);
    let Some(position) = checked_position(index, list.len()) else {
        return Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::List.message()));
    };
    Ok(list.items[position].clone_with_heap(&rt.heap))
}

fn list_ass_subscript(rt: &mut Runtime, obj: &Value, key: &Value, value: &Value) -> SlotResult<()> {
    let index = slot_index(rt, key, "list")?;
    let Some(position) = checked_position(index, as_list(&rt.heap, obj).len()) else {
        return Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::ListAssignment.message()));
    };
    store_item(rt, obj, position, value);
    Ok(())
}

fn list_del_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<()> {
    let index = slot_index(rt, key, "list")?;
    let Some(position) = checked_position(index, as_list(&rt.heap, obj).len()) else {
        return Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::ListAssignment.message()));
    };
    let removed = as_list_mut(&mut rt.heap, obj).items.remove(position);
    removed.drop_with_heap(&mut rt.heap);
    if let Some(id) = obj.ref_id() {
        rt.heap.shrink(id, ITEM_SIZE);
    }
    Ok(())
}

fn list_item(rt: &mut Runtime, obj: &Value, index: isize) -> SlotResult<Value> {
    let list = as_list(&rt.heap, obj);
    match absolute_position(index, list.len()) {
        Some(position) => Ok(list.items[position].clone_with_heap(&rt.heap)),
        None => Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::List.message())),
    }
}

fn list_ass_item(rt: &mut Runtime, obj: &Value, index: isize, value: &Value) -> SlotResult<()> {
    let Some(position) = absolute_position(index, as_list(&rt.heap, obj).len()) else {
        return Err(rt.pending.set_msg(ExcType::IndexError, IndexKind::ListAssignment.message()));
    };
    store_item(rt, obj, position, value);
    Ok(())
}

fn list_length(rt: &Runtime, obj: &Value) -> usize {
    as_list(&rt.heap, obj).len()
}
