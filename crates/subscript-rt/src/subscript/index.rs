//! Index normalization and index-like key conversion.

use num_traits::ToPrimitive;

use crate::{
    exception::{ExcType, RunError, RunResult, SimpleException},
    heap::{Heap, HeapData},
    runtime::Runtime,
    value::Value,
};

/// Container kind used to pick the out-of-range message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    List,
    ListAssignment,
    Tuple,
    Str,
}

impl IndexKind {
    /// Message matching CPython's, e.g. `list index out of range`.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::List => "list index out of range",
            Self::ListAssignment => "list assignment index out of range",
            Self::Tuple => "tuple index out of range",
            Self::Str => "string index out of range",
        }
    }

    #[must_use]
    pub(crate) fn error(self) -> RunError {
        RunError::IndexOutOfRange(SimpleException::new_msg(ExcType::IndexError, self.message()))
    }
}

/// Converts a possibly negative index into an absolute position, or `None` when out of range.
///
/// Negative indices count from the end: `-1` is the last position. An index is in range
/// when `-len <= index < len`.
#[must_use]
pub fn checked_position(index: isize, len: usize) -> Option<usize> {
    if index < 0 {
        // magnitude of a negative isize always fits usize
        len.checked_sub(index.unsigned_abs())
    } else {
        let position = index.cast_unsigned();
        (position < len).then_some(position)
    }
}

/// Like [`checked_position`], raising `IndexError` with the kind's message when out of range.
pub fn normalize_index(index: isize, len: usize, kind: IndexKind) -> RunResult<usize> {
    checked_position(index, len).ok_or_else(|| kind.error())
}

/// Whether `key`'s type provides an index conversion.
pub(crate) fn is_index_like(rt: &Runtime, key: &Value) -> bool {
    let key_type = key.py_type(&rt.heap);
    rt.types.get(key_type).as_index().is_some()
}

enum NativeIndex {
    Fits(isize),
    Overflow,
    NotInt,
}

fn native_index(value: &Value, heap: &Heap) -> NativeIndex {
    let fits = match value {
        Value::Int(i) => isize::try_from(*i).ok(),
        Value::Bool(b) => Some(isize::from(*b)),
        Value::Ref(id) => match heap.get(*id) {
            HeapData::LongInt(long_int) => long_int.0.to_isize(),
            _ => return NativeIndex::NotInt,
        },
        Value::None | Value::Float(_) => return NativeIndex::NotInt,
    };
    fits.map_or(NativeIndex::Overflow, NativeIndex::Fits)
}

/// Converts an index-like key to a native index.
///
/// Calls the key type's index conversion slot; values outside `isize` raise `IndexError`
/// rather than being clamped.
pub(crate) fn convert_to_index(rt: &mut Runtime, key: &Value) -> RunResult<isize> {
    let key_type = key.py_type(&rt.heap);
    let Some(as_index) = rt.types.get(key_type).as_index() else {
        return Err(ExcType::type_error(format!(
            "'{}' object cannot be interpreted as an index",
            rt.types.name(key_type)
        )));
    };
    let int_value = as_index(rt, key).map_err(|raised| rt.pending.translate(raised))?;
    let converted = native_index(&int_value, &rt.heap);
    let int_type = int_value.py_type(&rt.heap);
    int_value.drop_with_heap(&mut rt.heap);

    match converted {
        NativeIndex::Fits(index) => Ok(index),
        NativeIndex::Overflow => Err(ExcType::index_error_overflow(rt.types.name(key_type))),
        NativeIndex::NotInt => Err(ExcType::type_error(format!(
            "__index__ returned non-int (type {})",
            rt.types.name(int_type)
        ))),
    }
}
