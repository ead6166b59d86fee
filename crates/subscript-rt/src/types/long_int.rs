//! LongInt wrapper for arbitrary precision integer support.
//!
//! We use `Value::Int(i64)` for performance when values fit, and keep larger integers
//! on the heap as `LongInt`. Index conversion is the only place the subscript layer
//! needs to look inside one: values beyond `isize` must raise rather than wrap.

use std::fmt::{self, Display};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::{
    heap::{Heap, HeapData},
    resource::ResourceError,
    value::Value,
};

/// Wrapper around `num_bigint::BigInt` for arbitrary precision integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct LongInt(pub BigInt);

impl LongInt {
    #[must_use]
    pub fn new(bi: BigInt) -> Self {
        Self(bi)
    }

    /// Converts to a `Value`, demoting to i64 if it fits.
    pub(crate) fn into_value(self, heap: &mut Heap) -> Result<Value, ResourceError> {
        if let Some(i) = self.0.to_i64() {
            Ok(Value::Int(i))
        } else {
            let heap_id = heap.allocate(HeapData::LongInt(self))?;
            Ok(Value::Ref(heap_id))
        }
    }
}

impl Display for LongInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
