use crate::{types::TypeId, value::Value};

/// Object of a user-registered type: its exact type plus a fixed set of field slots.
///
/// The subscript layer never looks inside an instance; the type's own slots do, through
/// [`Runtime::instance_field`](crate::Runtime::instance_field) and
/// [`Runtime::set_instance_field`](crate::Runtime::set_instance_field).
#[derive(Debug)]
pub(crate) struct Instance {
    type_id: TypeId,
    fields: Vec<Value>,
}

impl Instance {
    pub fn new(type_id: TypeId, fields: Vec<Value>) -> Self {
        Self { type_id, fields }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Value] {
        &mut self.fields
    }
}
