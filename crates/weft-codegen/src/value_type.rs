// src/value_type.rs
//
// Value types and the registry that owns them. Each value type carries at
// most one descriptor, attached once by the type's owner before any graph
// using it is compiled. The registry is filled up front and only read while
// compiling, so sharing it across sessions needs no locking.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use crate::descriptor::TypeDescriptor;
use crate::errors::{CodegenError, CodegenResult};

/// A kind of data flowing through graphs (a number, a vector, a list, ...).
pub struct ValueType {
    name: String,
    descriptor: OnceLock<Arc<dyn TypeDescriptor>>,
}

pub type SharedType = Arc<ValueType>;

impl ValueType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach this type's descriptor. Fails if one is already attached.
    pub fn attach_descriptor(&self, descriptor: Arc<dyn TypeDescriptor>) -> CodegenResult<()> {
        self.descriptor
            .set(descriptor)
            .map_err(|_| CodegenError::descriptor_already_attached(&self.name))?;
        tracing::debug!(type_name = %self.name, "attached descriptor");
        Ok(())
    }

    pub fn descriptor(&self) -> Option<&Arc<dyn TypeDescriptor>> {
        self.descriptor.get()
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueType")
            .field("name", &self.name)
            .field("has_descriptor", &self.descriptor.get().is_some())
            .finish()
    }
}

/// Value types by name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, SharedType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the type called `name`, creating it (without a descriptor) if new.
    pub fn get_or_create(&mut self, name: &str) -> SharedType {
        self.types
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ValueType::new(name)))
            .clone()
    }

    /// Create `name` and attach `descriptor` to it.
    pub fn register(
        &mut self,
        name: &str,
        descriptor: Arc<dyn TypeDescriptor>,
    ) -> CodegenResult<SharedType> {
        let ty = self.get_or_create(name);
        ty.attach_descriptor(descriptor)?;
        Ok(ty)
    }

    pub fn get(&self, name: &str) -> Option<&SharedType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedType> {
        self.types.values()
    }
}

#[cfg(test)]
mod tests {
    use cranelift::prelude::types;

    use super::*;
    use crate::descriptor::PackedDescriptor;
    use crate::errors::CodegenErrorKind;

    #[test]
    fn attach_once() {
        let ty = ValueType::new("float");
        assert!(ty.descriptor().is_none());

        ty.attach_descriptor(Arc::new(PackedDescriptor::scalar(types::F32)))
            .unwrap();
        assert!(ty.descriptor().is_some());

        let err = ty
            .attach_descriptor(Arc::new(PackedDescriptor::scalar(types::F64)))
            .unwrap_err();
        assert_eq!(
            err.kind,
            CodegenErrorKind::DescriptorAlreadyAttached {
                type_name: "float".into()
            }
        );
    }

    #[test]
    fn registry_returns_same_instance() {
        let mut registry = TypeRegistry::new();
        let a = registry.get_or_create("int32");
        let b = registry.get_or_create("int32");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_twice_fails() {
        let mut registry = TypeRegistry::new();
        registry
            .register("bool", Arc::new(PackedDescriptor::scalar(types::I8)))
            .unwrap();
        let err = registry
            .register("bool", Arc::new(PackedDescriptor::scalar(types::I8)))
            .unwrap_err();
        assert!(err.is_contract_violation());
    }
}
