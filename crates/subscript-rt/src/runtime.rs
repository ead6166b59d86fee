use std::fmt::Write as _;

use ahash::AHashSet;
use num_bigint::BigInt;
use smallvec::SmallVec;

use crate::{
    config::{RuntimeConfig, TextModel, TraceMode},
    exception::{ExcType, RunResult},
    heap::{DropWithHeap, Heap, HeapData, HeapId, HeapStats},
    pending::{PendingError, Raised},
    tracer::{NoopTracer, StderrTracer, SubscriptTracer},
    types::{ByteStr, Dict, DictKey, Instance, List, LongInt, Tuple, TypeId, TypeObject, TypeRegistry, TypeSpec},
    value::Value,
};

/// Everything one logical thread of execution needs to perform subscript operations:
/// the heap, the registered types, the pending error slot, configuration and a tracer.
///
/// A runtime is not `Send`; it is driven by a single thread, and its pending error
/// slot is scoped to that thread.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) heap: Heap,
    pub(crate) types: TypeRegistry,
    pub(crate) pending: PendingError,
    pub(crate) tracer: Box<dyn SubscriptTracer>,
    config: RuntimeConfig,
}

impl Runtime {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        let tracer: Box<dyn SubscriptTracer> = match config.trace {
            TraceMode::Off => Box::new(NoopTracer),
            TraceMode::Stderr => Box::new(StderrTracer::new()),
        };
        Self {
            heap: Heap::new(64, config.limits),
            types: TypeRegistry::new(config.text_model),
            pending: PendingError::new(),
            tracer,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Replaces the tracer installed from the configuration.
    pub fn set_tracer(&mut self, tracer: impl SubscriptTracer + 'static) {
        self.tracer = Box::new(tracer);
    }

    /// Registers a user type; its capability table is resolved once, here.
    pub fn register_type(&mut self, spec: TypeSpec) -> TypeId {
        self.types.register(spec)
    }

    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.types.find(name)
    }

    /// # Panics
    /// Panics if `id` was not issued by this runtime.
    #[must_use]
    pub fn type_object(&self, id: TypeId) -> &TypeObject {
        self.types.get(id)
    }

    /// Exact type of `value`.
    #[must_use]
    pub fn type_of(&self, value: &Value) -> TypeId {
        value.py_type(&self.heap)
    }

    #[must_use]
    pub fn type_name(&self, value: &Value) -> &str {
        self.types.name(self.type_of(value))
    }

    #[must_use]
    pub fn type_name_of(&self, id: TypeId) -> &str {
        self.types.name(id)
    }

    /// Records an exception in the pending slot; for use by slot implementations.
    pub fn raise(&mut self, exc_type: ExcType, msg: impl Into<String>) -> Raised {
        self.pending.set_msg(exc_type, msg)
    }

    #[must_use]
    pub fn pending(&self) -> &PendingError {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingError {
        &mut self.pending
    }

    fn alloc(&mut self, data: HeapData) -> RunResult<Value> {
        Ok(Value::Ref(self.heap.allocate(data)?))
    }

    /// Allocates a list that takes ownership of `items`.
    pub fn new_list(&mut self, items: Vec<Value>) -> RunResult<Value> {
        self.alloc(HeapData::List(List::new(items)))
    }

    /// Allocates a tuple that takes ownership of `items`.
    pub fn new_tuple(&mut self, items: Vec<Value>) -> RunResult<Value> {
        self.alloc(HeapData::Tuple(Tuple::new(SmallVec::from_vec(items))))
    }

    /// Allocates a dict from owned pairs; later duplicates replace earlier values.
    ///
    /// Unhashable keys fail with `TypeError: unhashable type: '{type}'` and release every pair.
    pub fn new_dict(&mut self, pairs: Vec<(Value, Value)>) -> RunResult<Value> {
        let mut dict = Dict::new();
        let mut pairs = pairs.into_iter();
        while let Some((key, value)) = pairs.next() {
            match DictKey::from_value(&key, &self.heap) {
                Ok(hashed) => {
                    let replaced = dict.insert(hashed, key, value);
                    replaced.drop_with_heap(&mut self.heap);
                }
                Err(type_id) => {
                    let err = ExcType::type_error(format!("unhashable type: '{}'", self.types.name(type_id)));
                    (key, value).drop_with_heap(&mut self.heap);
                    pairs.drop_with_heap(&mut self.heap);
                    for (key, value) in dict.drain() {
                        (key, value).drop_with_heap(&mut self.heap);
                    }
                    return Err(err);
                }
            }
        }
        self.alloc(HeapData::Dict(dict))
    }

    /// Allocates a byte string (`str` or `bytes` depending on the text model).
    pub fn new_bytes(&mut self, bytes: &[u8]) -> RunResult<Value> {
        self.alloc(HeapData::ByteStr(ByteStr::from(bytes)))
    }

    /// Creates an `int`, heap-allocating it only when it does not fit `i64`.
    pub fn new_int(&mut self, value: BigInt) -> RunResult<Value> {
        Ok(LongInt::new(value).into_value(&mut self.heap)?)
    }

    /// Allocates an instance of a user type that takes ownership of `fields`.
    ///
    /// Builtin ids and ids issued by another runtime fail with a `TypeError`; the
    /// fields are released.
    pub fn new_instance(&mut self, type_id: TypeId, fields: Vec<Value>) -> RunResult<Value> {
        let msg = match self.types.try_get(type_id) {
            Some(ty) if ty.builtin().is_none() => None,
            Some(ty) => Some(format!("cannot create '{}' instances", ty.name())),
            None => Some(format!("{type_id:?} was not registered with this runtime")),
        };
        if let Some(msg) = msg {
            fields.into_iter().drop_with_heap(&mut self.heap);
            return Err(ExcType::type_error(msg));
        }
        self.alloc(HeapData::Instance(Instance::new(type_id, fields)))
    }

    /// Returns a new reference to field `index` of an instance, or `None` if `obj`
    /// is not an instance or has no such field.
    #[must_use]
    pub fn instance_field(&self, obj: &Value, index: usize) -> Option<Value> {
        match obj.heap_data(&self.heap) {
            Some(HeapData::Instance(inst)) => inst.fields().get(index).map(|field| field.clone_with_heap(&self.heap)),
            _ => None,
        }
    }

    /// Stores a new reference to `value` in field `index` of an instance, releasing the old field.
    ///
    /// Returns `false` (storing nothing) if `obj` is not an instance or has no such field.
    pub fn set_instance_field(&mut self, obj: &Value, index: usize, value: &Value) -> bool {
        let Some(id) = obj.ref_id() else {
            return false;
        };
        let new_field = value.clone_with_heap(&self.heap);
        let slot = match self.heap.get_mut(id) {
            HeapData::Instance(inst) => inst.fields_mut().get_mut(index),
            _ => None,
        };
        match slot {
            Some(slot) => {
                let old = std::mem::replace(slot, new_field);
                old.drop_with_heap(&mut self.heap);
                true
            }
            None => {
                new_field.drop_with_heap(&mut self.heap);
                false
            }
        }
    }

    /// Contents of a byte string, or `None` for any other value.
    #[must_use]
    pub fn as_bytes(&self, value: &Value) -> Option<&[u8]> {
        match value.heap_data(&self.heap) {
            Some(HeapData::ByteStr(s)) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Returns a new reference to `value`.
    #[must_use]
    pub fn clone_value(&self, value: &Value) -> Value {
        value.clone_with_heap(&self.heap)
    }

    /// Releases a reference.
    pub fn drop_value(&mut self, value: Value) {
        value.drop_with_heap(&mut self.heap);
    }

    /// Reference count of a heap value; `None` for immediates and freed handles.
    #[must_use]
    pub fn refcount(&self, value: &Value) -> Option<usize> {
        value.ref_id().and_then(|id| self.heap.refcount(id))
    }

    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Checks the handle precondition of the subscript entry points.
    #[inline]
    pub(crate) fn assert_object(&self, value: &Value) {
        if let Value::Ref(id) = value {
            debug_assert!(self.heap.is_live(*id), "subscript operand {id:?} has been freed");
        }
    }

    /// Python-style `repr()` of a value. Self-referencing containers render as `[...]`.
    #[must_use]
    pub fn repr(&self, value: &Value) -> String {
        let mut out = String::new();
        let mut in_progress = AHashSet::new();
        self.repr_into(value, &mut out, &mut in_progress);
        out
    }

    fn repr_into(&self, value: &Value, out: &mut String, in_progress: &mut AHashSet<HeapId>) {
        let id = match value {
            Value::None => return out.push_str("None"),
            Value::Bool(true) => return out.push_str("True"),
            Value::Bool(false) => return out.push_str("False"),
            Value::Int(i) => return write_display(out, i),
            Value::Float(f) => return float_repr(*f, out),
            Value::Ref(id) => *id,
        };
        match self.heap.get(id) {
            HeapData::ByteStr(s) => {
                let prefix = match self.config.text_model {
                    TextModel::ByteString => "",
                    TextModel::Unicode => "b",
                };
                bytes_repr(prefix, s.as_bytes(), out);
            }
            HeapData::LongInt(li) => write_display(out, li),
            HeapData::Instance(inst) => {
                let _ = write!(out, "<{} object>", self.types.name(inst.type_id()));
            }
            data @ (HeapData::List(_) | HeapData::Tuple(_) | HeapData::Dict(_)) => {
                let (open, close) = match data {
                    HeapData::List(_) => ('[', ']'),
                    HeapData::Tuple(_) => ('(', ')'),
                    _ => ('{', '}'),
                };
                if !in_progress.insert(id) {
                    out.push(open);
                    out.push_str("...");
                    out.push(close);
                    return;
                }
                out.push(open);
                match data {
                    HeapData::List(list) => self.repr_items(list.as_slice(), out, in_progress),
                    HeapData::Tuple(tuple) => {
                        self.repr_items(tuple.as_slice(), out, in_progress);
                        if tuple.len() == 1 {
                            out.push(',');
                        }
                    }
                    HeapData::Dict(dict) => {
                        for (i, (key, value)) in dict.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.repr_into(key, out, in_progress);
                            out.push_str(": ");
                            self.repr_into(value, out, in_progress);
                        }
                    }
                    _ => unreachable!("matched container variants above"),
                }
                out.push(close);
                in_progress.remove(&id);
            }
        }
    }

    fn repr_items(&self, items: &[Value], out: &mut String, in_progress: &mut AHashSet<HeapId>) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.repr_into(item, out, in_progress);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

fn write_display(out: &mut String, value: impl std::fmt::Display) {
    let _ = write!(out, "{value}");
}

fn float_repr(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("nan");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "inf" } else { "-inf" });
    } else {
        // shortest round-trip digits, laid out the way Python's repr does
        let sci = format!("{f:e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let (sign, mantissa) = mantissa.strip_prefix('-').map_or(("", mantissa), |m| ("-", m));
        out.push_str(sign);
        if (-4..16).contains(&exp) {
            let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
            fixed_notation(&digits, exp, out);
        } else {
            let _ = write!(out, "{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.unsigned_abs());
        }
    }
}

/// Places the decimal point into `digits`, where the first digit has weight `10^exp`.
fn fixed_notation(digits: &str, exp: i32, out: &mut String) {
    match usize::try_from(exp) {
        Ok(int_len) if digits.len() > int_len + 1 => {
            let (int_part, frac) = digits.split_at(int_len + 1);
            let _ = write!(out, "{int_part}.{frac}");
        }
        Ok(int_len) => {
            let zeros = int_len + 1 - digits.len();
            let _ = write!(out, "{digits}{}.0", "0".repeat(zeros));
        }
        Err(_) => {
            let zeros = usize::try_from(-exp - 1).unwrap_or(0);
            let _ = write!(out, "0.{}{digits}", "0".repeat(zeros));
        }
    }
}

/// Quotes like CPython: single quotes unless the content has a single quote and no double quote.
fn bytes_repr(prefix: &str, bytes: &[u8], out: &mut String) {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        '"'
    } else {
        '\''
    };
    out.push_str(prefix);
    out.push(quote);
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            _ if char::from(byte) == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..0x7f => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\x{byte:02x}");
            }
        }
    }
    out.push(quote);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_of_nested_containers() {
        let mut rt = Runtime::default();
        let bytes = rt.new_bytes(b"it's").unwrap();
        let inner = rt.new_tuple(vec![Value::Int(1)]).unwrap();
        let list = rt
            .new_list(vec![Value::None, Value::Bool(true), Value::Float(2.0), inner, bytes])
            .unwrap();
        assert_eq!(rt.repr(&list), "[None, True, 2.0, (1,), b\"it's\"]");
    }

    #[test]
    fn float_repr_matches_python() {
        let repr = |f: f64| {
            let mut out = String::new();
            float_repr(f, &mut out);
            out
        };
        assert_eq!(repr(2.0), "2.0");
        assert_eq!(repr(-0.0), "-0.0");
        assert_eq!(repr(1.5), "1.5");
        assert_eq!(repr(0.1), "0.1");
        assert_eq!(repr(0.0001), "0.0001");
        assert_eq!(repr(0.000_015), "1.5e-05");
        assert_eq!(repr(123_456.789), "123456.789");
        assert_eq!(repr(1e15), "1000000000000000.0");
        assert_eq!(repr(1e16), "1e+16");
        assert_eq!(repr(9_223_372_036_854_775_808.0), "9.223372036854776e+18");
        assert_eq!(repr(-2.5e-300), "-2.5e-300");
        assert_eq!(repr(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn repr_of_byte_string_follows_text_model() {
        let mut rt = Runtime::new(RuntimeConfig::new().text_model(TextModel::ByteString));
        let s = rt.new_bytes(b"a\n\xff").unwrap();
        assert_eq!(rt.repr(&s), "'a\\n\\xff'");
    }

    #[test]
    fn repr_of_self_referencing_list_terminates() {
        let mut rt = Runtime::default();
        let list = rt.new_list(vec![Value::Int(1)]).unwrap();
        assert!(!rt.set_instance_field(&list, 0, &Value::None));
        let id = list.ref_id().unwrap();
        let self_ref = rt.clone_value(&list);
        if let HeapData::List(inner) = rt.heap.get_mut(id) {
            *inner = List::new(vec![Value::Int(1), self_ref]);
        }
        assert_eq!(rt.repr(&list), "[1, [...]]");
    }

    #[test]
    fn dict_with_unhashable_key_releases_everything() {
        let mut rt = Runtime::default();
        let key = rt.new_list(vec![]).unwrap();
        let held = rt.new_bytes(b"x").unwrap();
        let held_copy = rt.clone_value(&held);
        let err = rt
            .new_dict(vec![(Value::Int(1), held_copy), (key, Value::None)])
            .unwrap_err();
        assert_eq!(err.message(), Some("unhashable type: 'list'"));
        assert_eq!(rt.refcount(&held), Some(1));
        assert_eq!(rt.heap_stats().live_objects, 1);
    }

    #[test]
    fn large_ints_stay_on_the_heap() {
        let mut rt = Runtime::default();
        assert_eq!(rt.new_int(BigInt::from(5)).unwrap(), Value::Int(5));
        let big = rt.new_int(BigInt::from(i64::MAX) * 4).unwrap();
        assert_eq!(rt.type_name(&big), "int");
        assert_eq!(rt.repr(&big), (BigInt::from(i64::MAX) * 4_i32).to_string());
    }
}
