mod byte_str;
mod dict;
mod instance;
pub(crate) mod int;
mod list;
mod long_int;
pub(crate) mod protocol;
mod slots;
mod r#type;
mod tuple;

pub use byte_str::ByteStr;
pub(crate) use dict::DictKey;
pub use dict::Dict;
pub(crate) use instance::Instance;
pub use list::List;
pub use long_int::LongInt;
pub use r#type::{BuiltinKind, TypeId, TypeObject, TypeSpec};
pub(crate) use r#type::TypeRegistry;
pub use slots::{
    AsIndexFn, Capabilities, DelByKeyFn, GetByKeyFn, GetByPositionFn, LengthFn, MappingSlots, SequenceSlots,
    SetByKeyFn, SetByPositionFn,
};
pub use tuple::Tuple;
