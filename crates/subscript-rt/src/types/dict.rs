use ahash::RandomState;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::FromPrimitive;

use crate::{
    exception::ExcType,
    heap::{DICT_ENTRY_SIZE, DropWithHeap, Heap, HeapData, HeapId},
    pending::{Raised, SlotResult},
    runtime::Runtime,
    types::{MappingSlots, TypeId, TypeSpec},
    value::Value,
};

/// Hashable identity of a dict key.
///
/// Numeric keys that compare equal hash equal (`1`, `1.0` and `True` are one key),
/// byte strings and tuples hash by content, instances by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum DictKey {
    None,
    Int(i64),
    Long(BigInt),
    /// Bit pattern of a float with a fractional part (or NaN/inf).
    Float(u64),
    Bytes(Box<[u8]>),
    Tuple(Box<[DictKey]>),
    Identity(HeapId),
}

impl DictKey {
    /// Computes the key for `value`, or returns the type of the first unhashable value found.
    pub fn from_value(value: &Value, heap: &Heap) -> Result<Self, TypeId> {
        match value {
            Value::None => Ok(Self::None),
            Value::Bool(b) => Ok(Self::Int(i64::from(*b))),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Float(f) => Ok(float_key(*f)),
            Value::Ref(id) => match heap.get(*id) {
                HeapData::ByteStr(s) => Ok(Self::Bytes(s.as_bytes().into())),
                HeapData::LongInt(long_int) => Ok(Self::Long(long_int.0.clone())),
                HeapData::Tuple(tuple) => tuple
                    .as_slice()
                    .iter()
                    .map(|item| Self::from_value(item, heap))
                    .collect::<Result<Box<[_]>, _>>()
                    .map(Self::Tuple),
                HeapData::Instance(_) => Ok(Self::Identity(*id)),
                data @ (HeapData::List(_) | HeapData::Dict(_)) => Err(data.py_type()),
            },
        }
    }
}

#[expect(clippy::cast_possible_truncation, reason = "value is integral and range-checked")]
fn float_key(f: f64) -> DictKey {
    if !f.is_finite() || f.fract() != 0.0 {
        return DictKey::Float(f.to_bits());
    }
    // i64::MIN is exactly representable; i64::MAX rounds up to 2^63 which is out of range
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        DictKey::Int(f as i64)
    } else {
        // integral floats beyond i64 equal the heap ints they convert to
        BigInt::from_f64(f).map_or(DictKey::Float(f.to_bits()), DictKey::Long)
    }
}

/// Builtin insertion-ordered mapping.
#[derive(Debug, Default)]
pub struct Dict {
    entries: IndexMap<DictKey, (Value, Value), RandomState>,
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    pub(crate) fn get(&self, key: &DictKey) -> Option<&Value> {
        self.entries.get(key).map(|(_, value)| value)
    }

    /// Inserts an owned key/value pair.
    ///
    /// When the key already exists the original key object is kept and the value replaced;
    /// the returned pair (unused new key, old value) must be dropped by the caller.
    #[must_use]
    pub(crate) fn insert(&mut self, hashed: DictKey, key: Value, value: Value) -> Option<(Value, Value)> {
        match self.entries.get_mut(&hashed) {
            Some(entry) => {
                let old_value = std::mem::replace(&mut entry.1, value);
                Some((key, old_value))
            }
            None => {
                self.entries.insert(hashed, (key, value));
                None
            }
        }
    }

    /// Removes a key, preserving the order of the remaining entries.
    #[must_use]
    pub(crate) fn remove(&mut self, key: &DictKey) -> Option<(Value, Value)> {
        self.entries.shift_remove(key)
    }

    /// Removes every entry, yielding the owned `(key, value)` pairs.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.entries.drain(..).map(|(_, pair)| pair)
    }

    pub(crate) fn type_spec() -> TypeSpec {
        TypeSpec::new("dict").mapping(
            MappingSlots::new()
                .get(dict_subscript)
                .set(dict_ass_subscript)
                .del(dict_del_subscript),
        )
    }
}

fn as_dict<'h>(heap: &'h Heap, obj: &Value) -> &'h Dict {
    match obj.heap_data(heap) {
        Some(HeapData::Dict(dict)) => dict,
        _ => unreachable!("dict slot called on a non-dict value"),
    }
}

fn as_dict_mut<'h>(heap: &'h mut Heap, obj: &Value) -> &'h mut Dict {
    let id = obj.ref_id().expect("dict slot called on an immediate value");
    match heap.get_mut(id) {
        HeapData::Dict(dict) => dict,
        _ => unreachable!("dict slot called on a non-dict value"),
    }
}

/// Hashes `key`, raising `TypeError: unhashable type: '{type}'` for mutable containers.
fn hash_key(rt: &mut Runtime, key: &Value) -> SlotResult<DictKey> {
    DictKey::from_value(key, &rt.heap).map_err(|type_id| {
        let msg = format!("unhashable type: '{}'", rt.types.name(type_id));
        rt.pending.set_msg(ExcType::TypeError, msg)
    })
}

fn key_error(rt: &mut Runtime, key: &Value) -> Raised {
    let msg = rt.repr(key);
    rt.pending.set_msg(ExcType::KeyError, msg)
}

fn dict_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<Value> {
    let hashed = hash_key(rt, key)?;
    if let Some(value) = as_dict(&rt.heap, obj).get(&hashed) {
        return Ok(value.clone_with_heap(&rt.heap));
    }
    Err(key_error(rt, key))
}

fn dict_ass_subscript(rt: &mut Runtime, obj: &Value, key: &Value, value: &Value) -> SlotResult<()> {
    let hashed = hash_key(rt, key)?;
    if as_dict(&rt.heap, obj).get(&hashed).is_none()
        && let Some(id) = obj.ref_id()
        && let Err(err) = rt.heap.grow(id, DICT_ENTRY_SIZE)
    {
        return Err(rt.pending.set_msg(ExcType::MemoryError, err.to_string()));
    }
    let new_key = key.clone_with_heap(&rt.heap);
    let new_value = value.clone_with_heap(&rt.heap);
    let replaced = as_dict_mut(&mut rt.heap, obj).insert(hashed, new_key, new_value);
    replaced.drop_with_heap(&mut rt.heap);
    Ok(())
}

fn dict_del_subscript(rt: &mut Runtime, obj: &Value, key: &Value) -> SlotResult<()> {
    let hashed = hash_key(rt, key)?;
    match as_dict_mut(&mut rt.heap, obj).remove(&hashed) {
        Some(pair) => {
            pair.drop_with_heap(&mut rt.heap);
            if let Some(id) = obj.ref_id() {
                rt.heap.shrink(id, DICT_ENTRY_SIZE);
            }
            Ok(())
        }
        None => Err(key_error(rt, key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceLimits;

    #[test]
    fn equal_numbers_share_a_key() {
        let heap = Heap::new(0, ResourceLimits::default());
        let one = DictKey::from_value(&Value::Int(1), &heap).unwrap();
        assert_eq!(DictKey::from_value(&Value::Float(1.0), &heap).unwrap(), one);
        assert_eq!(DictKey::from_value(&Value::Bool(true), &heap).unwrap(), one);
        assert_ne!(DictKey::from_value(&Value::Float(1.5), &heap).unwrap(), one);
    }

    #[test]
    fn integral_floats_beyond_i64_share_a_key_with_big_ints() {
        let mut heap = Heap::new(1, ResourceLimits::default());
        let two_pow_63 = BigInt::from(1u64 << 63);
        let big = crate::types::LongInt::new(two_pow_63.clone()).into_value(&mut heap).unwrap();
        let key = DictKey::from_value(&big, &heap).unwrap();
        assert_eq!(key, DictKey::Long(two_pow_63));
        assert_eq!(DictKey::from_value(&Value::Float(9_223_372_036_854_775_808.0), &heap).unwrap(), key);
        assert_eq!(
            DictKey::from_value(&Value::Float(-1e20), &heap).unwrap(),
            DictKey::Long(BigInt::from(-100_000_000_000_000_000_000i128))
        );
        assert_eq!(
            DictKey::from_value(&Value::Float(f64::INFINITY), &heap).unwrap(),
            DictKey::Float(f64::INFINITY.to_bits())
        );
    }

    #[test]
    fn lists_are_unhashable() {
        let mut heap = Heap::new(1, ResourceLimits::default());
        let id = heap
            .allocate(HeapData::List(crate::types::List::new(vec![])))
            .unwrap();
        assert_eq!(DictKey::from_value(&Value::Ref(id), &heap), Err(TypeId::LIST));
    }
}
