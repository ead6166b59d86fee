use ahash::AHashMap;
use strum::{Display, IntoStaticStr};

use crate::{
    config::TextModel,
    types::{
        ByteStr, Dict, List, Tuple, int,
        slots::{AsIndexFn, Capabilities, MappingSlots, SequenceSlots},
    },
};

/// Identity of a registered type. Compared for exact-type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub const NONE: Self = Self(0);
    pub const BOOL: Self = Self(1);
    pub const INT: Self = Self(2);
    pub const FLOAT: Self = Self(3);
    pub const LIST: Self = Self(4);
    pub const TUPLE: Self = Self(5);
    pub const DICT: Self = Self(6);
    /// Immutable byte string; named `str` or `bytes` depending on the text model.
    pub const BYTE_STR: Self = Self(7);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of builtin kinds, used as the exact-type tag for fast paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, serde::Serialize, serde::Deserialize)]
pub enum BuiltinKind {
    NoneType,
    Bool,
    Int,
    Float,
    List,
    Tuple,
    Dict,
    ByteStr,
}

/// A registered type: its name, capability table and index conversion slot.
#[derive(Debug, Clone)]
pub struct TypeObject {
    name: String,
    builtin: Option<BuiltinKind>,
    capabilities: Capabilities,
    as_index: Option<AsIndexFn>,
}

impl TypeObject {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn builtin(&self) -> Option<BuiltinKind> {
        self.builtin
    }

    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn as_index(&self) -> Option<AsIndexFn> {
        self.as_index
    }
}

/// Description of a user type passed to [`Runtime::register_type`](crate::Runtime::register_type).
///
/// ```
/// use subscript_rt::{MappingSlots, Runtime, RuntimeConfig, SlotResult, TypeSpec, Value};
///
/// fn always_seven(_: &mut Runtime, _: &Value, _: &Value) -> SlotResult<Value> {
///     Ok(Value::Int(7))
/// }
///
/// let mut rt = Runtime::new(RuntimeConfig::default());
/// let seven = rt.register_type(TypeSpec::new("Seven").mapping(MappingSlots::new().get(always_seven)));
/// assert_eq!(rt.type_name_of(seven), "Seven");
/// ```
#[derive(Debug, Clone)]
pub struct TypeSpec {
    name: String,
    mapping: Option<MappingSlots>,
    sequence: Option<SequenceSlots>,
    as_index: Option<AsIndexFn>,
}

impl TypeSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mapping: None,
            sequence: None,
            as_index: None,
        }
    }

    #[must_use]
    pub fn mapping(mut self, slots: MappingSlots) -> Self {
        self.mapping = Some(slots);
        self
    }

    #[must_use]
    pub fn sequence(mut self, slots: SequenceSlots) -> Self {
        self.sequence = Some(slots);
        self
    }

    /// Marks values of this type as index-like.
    #[must_use]
    pub fn as_index(mut self, slot: AsIndexFn) -> Self {
        self.as_index = Some(slot);
        self
    }
}

/// All types known to a runtime, indexed by [`TypeId`].
#[derive(Debug, Clone)]
pub(crate) struct TypeRegistry {
    types: Vec<TypeObject>,
    by_name: AHashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Creates a registry holding the builtin types at their fixed ids.
    pub fn new(text_model: TextModel) -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: AHashMap::new(),
        };
        let byte_str_name = match text_model {
            TextModel::ByteString => "str",
            TextModel::Unicode => "bytes",
        };
        let builtins = [
            (TypeId::NONE, BuiltinKind::NoneType, TypeSpec::new("NoneType")),
            (TypeId::BOOL, BuiltinKind::Bool, TypeSpec::new("bool").as_index(int::int_as_index)),
            (TypeId::INT, BuiltinKind::Int, TypeSpec::new("int").as_index(int::int_as_index)),
            (TypeId::FLOAT, BuiltinKind::Float, TypeSpec::new("float")),
            (TypeId::LIST, BuiltinKind::List, List::type_spec()),
            (TypeId::TUPLE, BuiltinKind::Tuple, Tuple::type_spec()),
            (TypeId::DICT, BuiltinKind::Dict, Dict::type_spec()),
            (TypeId::BYTE_STR, BuiltinKind::ByteStr, ByteStr::type_spec(byte_str_name)),
        ];
        for (expected, kind, spec) in builtins {
            let id = registry.insert(spec, Some(kind));
            debug_assert_eq!(id, expected, "builtin type registered out of order");
        }
        registry
    }

    /// Registers a user type, resolving its capability table once.
    pub fn register(&mut self, spec: TypeSpec) -> TypeId {
        self.insert(spec, None)
    }

    fn insert(&mut self, spec: TypeSpec, builtin: Option<BuiltinKind>) -> TypeId {
        let id = TypeId(u32::try_from(self.types.len()).expect("type registry overflow"));
        self.by_name.insert(spec.name.clone(), id);
        self.types.push(TypeObject {
            name: spec.name,
            builtin,
            capabilities: Capabilities::resolve(spec.mapping, spec.sequence),
            as_index: spec.as_index,
        });
        id
    }

    /// # Panics
    /// Panics if `id` was not issued by this registry.
    pub fn get(&self, id: TypeId) -> &TypeObject {
        &self.types[id.index()]
    }

    /// Like [`Self::get`], but `None` for ids issued elsewhere.
    pub fn try_get(&self, id: TypeId) -> Option<&TypeObject> {
        self.types.get(id.index())
    }

    /// Most recently registered type with the given name.
    pub fn find(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_occupy_fixed_ids() {
        let registry = TypeRegistry::new(TextModel::Unicode);
        assert_eq!(registry.name(TypeId::LIST), "list");
        assert_eq!(registry.name(TypeId::BYTE_STR), "bytes");
        assert_eq!(registry.get(TypeId::DICT).builtin(), Some(BuiltinKind::Dict));
        assert_eq!(registry.find("tuple"), Some(TypeId::TUPLE));
    }

    #[test]
    fn byte_string_is_named_str_under_byte_text_model() {
        let registry = TypeRegistry::new(TextModel::ByteString);
        assert_eq!(registry.name(TypeId::BYTE_STR), "str");
    }

    #[test]
    fn builtin_capability_shapes() {
        let registry = TypeRegistry::new(TextModel::Unicode);
        assert!(matches!(registry.get(TypeId::LIST).capabilities(), Capabilities::Both(..)));
        assert!(matches!(registry.get(TypeId::DICT).capabilities(), Capabilities::Mapping(_)));
        assert!(matches!(registry.get(TypeId::INT).capabilities(), Capabilities::None));
        assert!(registry.get(TypeId::INT).as_index().is_some());
        assert!(registry.get(TypeId::FLOAT).as_index().is_none());
    }

    #[test]
    fn user_types_get_fresh_ids() {
        let mut registry = TypeRegistry::new(TextModel::Unicode);
        let id = registry.register(TypeSpec::new("Opaque"));
        assert_eq!(registry.find("Opaque"), Some(id));
        assert!(registry.get(id).builtin().is_none());
        assert!(matches!(registry.get(id).capabilities(), Capabilities::None));

        let other = TypeRegistry::new(TextModel::Unicode);
        assert!(other.try_get(id).is_none());
        assert!(other.try_get(TypeId::LIST).is_some());
    }
}
