//! Per-type capability tables.
//!
//! A type exposes item access through optional slot functions grouped into a
//! mapping table (lookup by arbitrary key) and a sequence table (lookup by integer
//! position). The combination is resolved once, when the type is registered, into
//! the closed [`Capabilities`] variant that the subscript dispatchers consult.

use crate::{pending::SlotResult, runtime::Runtime, value::Value};

/// `obj[key]` by arbitrary key. Returns an owned value.
pub type GetByKeyFn = fn(&mut Runtime, &Value, &Value) -> SlotResult<Value>;
/// `obj[key] = value` by arbitrary key. Arguments are `(obj, key, value)`.
pub type SetByKeyFn = fn(&mut Runtime, &Value, &Value, &Value) -> SlotResult<()>;
/// `del obj[key]` by arbitrary key.
pub type DelByKeyFn = fn(&mut Runtime, &Value, &Value) -> SlotResult<()>;
/// `obj[index]` by position. Negative indices have already been wrapped when the type has a length slot.
pub type GetByPositionFn = fn(&mut Runtime, &Value, isize) -> SlotResult<Value>;
/// `obj[index] = value` by position. Arguments are `(obj, index, value)`.
pub type SetByPositionFn = fn(&mut Runtime, &Value, isize, &Value) -> SlotResult<()>;
/// Current number of positions in a sequence.
pub type LengthFn = fn(&Runtime, &Value) -> usize;
/// Converts an index-like key into an integer value (`int`, possibly arbitrary precision).
pub type AsIndexFn = fn(&mut Runtime, &Value) -> SlotResult<Value>;

/// Key-based slots of a type.
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingSlots {
    pub get: Option<GetByKeyFn>,
    pub set: Option<SetByKeyFn>,
    pub del: Option<DelByKeyFn>,
}

impl MappingSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(mut self, slot: GetByKeyFn) -> Self {
        self.get = Some(slot);
        self
    }

    #[must_use]
    pub fn set(mut self, slot: SetByKeyFn) -> Self {
        self.set = Some(slot);
        self
    }

    #[must_use]
    pub fn del(mut self, slot: DelByKeyFn) -> Self {
        self.del = Some(slot);
        self
    }

    fn is_empty(&self) -> bool {
        self.get.is_none() && self.set.is_none() && self.del.is_none()
    }
}

/// Position-based slots of a type.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceSlots {
    pub get: Option<GetByPositionFn>,
    pub set: Option<SetByPositionFn>,
    pub length: Option<LengthFn>,
}

impl SequenceSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(mut self, slot: GetByPositionFn) -> Self {
        self.get = Some(slot);
        self
    }

    #[must_use]
    pub fn set(mut self, slot: SetByPositionFn) -> Self {
        self.set = Some(slot);
        self
    }

    #[must_use]
    pub fn length(mut self, slot: LengthFn) -> Self {
        self.length = Some(slot);
        self
    }

    fn is_empty(&self) -> bool {
        self.get.is_none() && self.set.is_none() && self.length.is_none()
    }
}

/// Resolved capability shape of a type.
#[derive(Debug, Clone, Copy, Default)]
pub enum Capabilities {
    #[default]
    None,
    Mapping(MappingSlots),
    Sequence(SequenceSlots),
    Both(MappingSlots, SequenceSlots),
}

impl Capabilities {
    /// Resolves the capability shape; a table with no slots set counts as absent.
    #[must_use]
    pub fn resolve(mapping: Option<MappingSlots>, sequence: Option<SequenceSlots>) -> Self {
        let mapping = mapping.filter(|m| !m.is_empty());
        let sequence = sequence.filter(|s| !s.is_empty());
        match (mapping, sequence) {
            (None, None) => Self::None,
            (Some(m), None) => Self::Mapping(m),
            (None, Some(s)) => Self::Sequence(s),
            (Some(m), Some(s)) => Self::Both(m, s),
        }
    }

    #[must_use]
    pub fn mapping(&self) -> Option<&MappingSlots> {
        match self {
            Self::Mapping(m) | Self::Both(m, _) => Some(m),
            Self::None | Self::Sequence(_) => None,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> Option<&SequenceSlots> {
        match self {
            Self::Sequence(s) | Self::Both(_, s) => Some(s),
            Self::None | Self::Mapping(_) => None,
        }
    }

    #[must_use]
    pub fn mapping_get(&self) -> Option<GetByKeyFn> {
        self.mapping().and_then(|m| m.get)
    }

    #[must_use]
    pub fn mapping_set(&self) -> Option<SetByKeyFn> {
        self.mapping().and_then(|m| m.set)
    }

    #[must_use]
    pub fn mapping_del(&self) -> Option<DelByKeyFn> {
        self.mapping().and_then(|m| m.del)
    }
}
