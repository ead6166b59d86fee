use std::{cell::Cell, collections::BTreeMap, vec};

use strum::IntoStaticStr;

use crate::{
    resource::{LimitedTracker, ResourceError, ResourceLimits},
    types::{ByteStr, Dict, Instance, List, LongInt, Tuple, TypeId},
    value::Value,
};

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_type` map uses `BTreeMap` for deterministic iteration order,
/// making snapshots suitable for display and comparison without sort overhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by `HeapData` variant name ("List", "Dict", ...).
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Allocations performed over the heap's lifetime, as seen by the resource tracker.
    pub tracker_allocations: usize,
    /// Estimated bytes held by live values; only tracked when a memory limit is configured.
    pub tracker_memory_bytes: usize,
}

/// Unique identifier for values stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Estimated bytes per list or tuple item.
pub(crate) const ITEM_SIZE: usize = size_of::<Value>();
/// Estimated bytes per dict entry: key, value and hash slot.
pub(crate) const DICT_ENTRY_SIZE: usize = 3 * size_of::<Value>();

/// Payload of a heap slot: one variant per heap-allocated kind.
#[derive(Debug, IntoStaticStr)]
pub(crate) enum HeapData {
    List(List),
    Tuple(Tuple),
    Dict(Dict),
    ByteStr(ByteStr),
    LongInt(LongInt),
    Instance(Instance),
}

impl HeapData {
    /// Exact type of the stored value; the byte-string type depends on the text model.
    pub fn py_type(&self) -> TypeId {
        match self {
            Self::List(_) => TypeId::LIST,
            Self::Tuple(_) => TypeId::TUPLE,
            Self::Dict(_) => TypeId::DICT,
            Self::ByteStr(_) => TypeId::BYTE_STR,
            Self::LongInt(_) => TypeId::INT,
            Self::Instance(inst) => inst.type_id(),
        }
    }

    /// Rough size estimate used by the memory limit.
    pub fn py_estimate_size(&self) -> usize {
        let items = match self {
            Self::List(list) => list.as_slice().len() * ITEM_SIZE,
            Self::Tuple(tuple) => tuple.as_slice().len() * ITEM_SIZE,
            Self::Dict(dict) => dict.len() * DICT_ENTRY_SIZE,
            Self::ByteStr(s) => s.len(),
            Self::LongInt(li) => usize::try_from(li.0.bits().div_ceil(8)).unwrap_or(usize::MAX),
            Self::Instance(inst) => inst.fields().len() * ITEM_SIZE,
        };
        size_of::<Self>() + items
    }

    /// Pushes the ids of every heap value this entry holds a reference to.
    fn collect_child_ids(&self, out: &mut Vec<HeapId>) {
        let refs = |values: &[Value], out: &mut Vec<HeapId>| {
            out.extend(values.iter().filter_map(Value::ref_id));
        };
        match self {
            Self::List(list) => refs(list.as_slice(), out),
            Self::Tuple(tuple) => refs(tuple.as_slice(), out),
            Self::Instance(inst) => refs(inst.fields(), out),
            Self::Dict(dict) => {
                for (key, value) in dict.iter() {
                    out.extend(key.ref_id());
                    out.extend(value.ref_id());
                }
            }
            Self::ByteStr(_) | Self::LongInt(_) => {}
        }
    }
}

#[derive(Debug)]
struct HeapValue {
    refcount: Cell<usize>,
    data: HeapData,
    /// Bytes currently charged to the memory limit for this entry; credited back on free.
    charged: usize,
}

/// Reference-counted arena that backs all heap-only runtime values.
///
/// Uses a free list to reuse slots from freed values. When a value is freed via
/// `dec_ref`, its slot ID is added to the free list; new allocations pop from the
/// free list when available, otherwise append.
#[derive(Debug)]
pub(crate) struct Heap {
    entries: Vec<Option<HeapValue>>,
    /// IDs of freed slots available for reuse. Populated by `dec_ref`, consumed by `allocate`.
    free_list: Vec<HeapId>,
    tracker: LimitedTracker,
    /// Lazily allocated length-one byte strings, one per byte value.
    ///
    /// Each cached entry keeps one extra reference so it is never freed.
    single_byte_ids: Vec<Option<HeapId>>,
}

impl Heap {
    pub fn new(capacity: usize, limits: ResourceLimits) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            tracker: LimitedTracker::new(limits),
            single_byte_ids: vec![None; 256],
        }
    }

    /// Allocates a new heap entry with a reference count of one.
    ///
    /// Returns `Err(ResourceError)` if the allocation would exceed configured limits.
    pub fn allocate(&mut self, data: HeapData) -> Result<HeapId, ResourceError> {
        let charged = self.tracker.on_allocate(|| data.py_estimate_size())?;
        let new_entry = HeapValue {
            refcount: Cell::new(1),
            data,
            charged,
        };

        let id = if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(new_entry);
            id
        } else {
            let id = self.entries.len();
            self.entries.push(Some(new_entry));
            HeapId(id)
        };
        Ok(id)
    }

    /// Returns an owned reference to the cached length-one byte string for `byte`.
    pub fn single_byte(&mut self, byte: u8) -> Result<HeapId, ResourceError> {
        let slot = usize::from(byte);
        if let Some(id) = self.single_byte_ids[slot] {
            self.inc_ref(id);
            return Ok(id);
        }
        let id = self.allocate(HeapData::ByteStr(ByteStr::from(vec![byte])))?;
        // the cache keeps the first reference, the caller gets the second
        self.inc_ref(id);
        self.single_byte_ids[slot] = Some(id);
        Ok(id)
    }

    /// Increments the reference count for an existing heap entry.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn inc_ref(&self, id: HeapId) {
        let value = self.entry(id, "Heap::inc_ref");
        value.refcount.set(value.refcount.get() + 1);
    }

    /// Decrements the reference count and frees the value (plus children) once it hits zero.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn dec_ref(&mut self, id: HeapId) {
        let value = {
            let slot = self.entries.get_mut(id.index()).expect("Heap::dec_ref: slot missing");
            let entry = slot.as_mut().expect("Heap::dec_ref: object already freed");
            let count = entry.refcount.get();
            if count > 1 {
                entry.refcount.set(count - 1);
                return;
            }
            slot.take().expect("Heap::dec_ref: object already freed")
        };

        self.free_list.push(id);
        self.tracker.on_free(value.charged);

        let mut child_ids = Vec::new();
        value.data.collect_child_ids(&mut child_ids);
        drop(value);
        for child_id in child_ids {
            self.dec_ref(child_id);
        }
    }

    /// Charges `bytes` more to the memory limit on behalf of a container that is about to grow.
    ///
    /// Fails without recording anything if the limit would be exceeded.
    pub fn grow(&mut self, id: HeapId, bytes: usize) -> Result<(), ResourceError> {
        let added = self.tracker.on_grow(bytes)?;
        self.entry_mut(id, "Heap::grow").charged += added;
        Ok(())
    }

    /// Credits back up to `bytes` of a container's charge after it shrank.
    pub fn shrink(&mut self, id: HeapId, bytes: usize) {
        let entry = self.entry_mut(id, "Heap::shrink");
        let released = entry.charged.min(bytes);
        entry.charged -= released;
        self.tracker.on_free(released);
    }

    /// Returns the current reference count, or `None` if the slot is free.
    pub fn refcount(&self, id: HeapId) -> Option<usize> {
        self.entries
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|entry| entry.refcount.get())
    }

    /// Whether `id` names a live entry.
    pub fn is_live(&self, id: HeapId) -> bool {
        self.refcount(id).is_some()
    }

    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.entry(id, "Heap::get").data
    }

    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self.entry_mut(id, "Heap::get_mut").data
    }

    pub fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        let mut live_objects = 0;
        for entry in self.entries.iter().flatten() {
            live_objects += 1;
            let name: &'static str = (&entry.data).into();
            *objects_by_type.entry(name).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            objects_by_type,
            tracker_allocations: self.tracker.allocation_count(),
            tracker_memory_bytes: self.tracker.current_memory(),
        }
    }

    fn entry(&self, id: HeapId, context: &str) -> &HeapValue {
        match self.entries.get(id.index()) {
            Some(Some(entry)) => entry,
            Some(None) => panic!("{context}: object already freed"),
            None => panic!("{context}: slot missing"),
        }
    }

    fn entry_mut(&mut self, id: HeapId, context: &str) -> &mut HeapValue {
        match self.entries.get_mut(id.index()) {
            Some(Some(entry)) => entry,
            Some(None) => panic!("{context}: object already freed"),
            None => panic!("{context}: slot missing"),
        }
    }
}

/// Trait for types that hold heap references and must release them explicitly.
///
/// **All types implementing this trait must be cleaned up on every code path**, not just
/// the happy path. A missed call on any branch leaks reference counts.
pub(crate) trait DropWithHeap {
    /// Consume `self` and decrement reference counts for any heap-allocated values contained within.
    fn drop_with_heap(self, heap: &mut Heap);
}

impl DropWithHeap for Value {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap) {
        Self::drop_with_heap(self, heap);
    }
}

impl<U: DropWithHeap> DropWithHeap for Option<U> {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap) {
        if let Some(value) = self {
            value.drop_with_heap(heap);
        }
    }
}

impl<U: DropWithHeap> DropWithHeap for vec::IntoIter<U> {
    fn drop_with_heap(self, heap: &mut Heap) {
        for value in self {
            value.drop_with_heap(heap);
        }
    }
}

impl DropWithHeap for (Value, Value) {
    fn drop_with_heap(self, heap: &mut Heap) {
        let (key, value) = self;
        key.drop_with_heap(heap);
        value.drop_with_heap(heap);
    }
}
