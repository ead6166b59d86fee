use crate::{
    heap::{Heap, HeapData, HeapId},
    types::TypeId,
};

/// Handle to a runtime value.
///
/// Small immediate values (None, Bool, Int, Float) are stored inline, while containers
/// and other heap-allocated values live in the arena and are referenced via `Ref(HeapId)`.
///
/// NOTE: `Clone` is intentionally NOT derived. Use [`Runtime::clone_value`](crate::Runtime::clone_value)
/// (or `clone_with_heap` inside the crate) so the reference count is incremented, and
/// [`Runtime::drop_value`](crate::Runtime::drop_value) to release a handle. `PartialEq` compares
/// immediates by value and heap handles by identity.
#[derive(Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Owned reference to a heap entry.
    Ref(HeapId),
}

impl Value {
    /// Clones a value with proper heap reference counting.
    ///
    /// For immediate values this performs a simple copy; for `Ref` it increments the
    /// reference count and returns a new reference to the same heap value.
    #[must_use]
    pub(crate) fn clone_with_heap(&self, heap: &Heap) -> Self {
        match self {
            Self::Ref(id) => {
                heap.inc_ref(*id);
                Self::Ref(*id)
            }
            other => other.clone_immediate(),
        }
    }

    /// Drops a value, decrementing its heap reference count if applicable.
    ///
    /// # Important
    /// This method MUST be called before overwriting a container slot or discarding
    /// a value to prevent memory leaks.
    #[inline]
    pub(crate) fn drop_with_heap(self, heap: &mut Heap) {
        if let Self::Ref(id) = self {
            heap.dec_ref(id);
        }
    }

    /// Copies an immediate value without heap interaction.
    ///
    /// Attempting to clone a Ref variant will panic.
    pub(crate) fn clone_immediate(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Bool(b) => Self::Bool(*b),
            Self::Int(i) => Self::Int(*i),
            Self::Float(f) => Self::Float(*f),
            Self::Ref(_) => panic!("Ref clones must go through clone_with_heap to maintain refcounts"),
        }
    }

    /// Returns the heap id for `Ref` values.
    #[inline]
    #[must_use]
    pub fn ref_id(&self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Exact type of this value.
    pub(crate) fn py_type(&self, heap: &Heap) -> TypeId {
        match self {
            Self::None => TypeId::NONE,
            Self::Bool(_) => TypeId::BOOL,
            Self::Int(_) => TypeId::INT,
            Self::Float(_) => TypeId::FLOAT,
            Self::Ref(id) => heap.get(*id).py_type(),
        }
    }

    /// Borrows the heap payload behind a `Ref`.
    pub(crate) fn heap_data<'h>(&self, heap: &'h Heap) -> Option<&'h HeapData> {
        self.ref_id().map(|id| heap.get(id))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
