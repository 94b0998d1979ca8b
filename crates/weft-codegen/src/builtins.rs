// src/builtins.rs
//
// Descriptors for the engine's standard value types.

use std::sync::Arc;

use cranelift::prelude::types;
use weft_runtime::{TYPE_FLOAT_LIST, TYPE_TEXT};

use crate::descriptor::{PackedDescriptor, PointerDescriptor, TypeDescriptor};
use crate::errors::CodegenResult;
use crate::value_type::TypeRegistry;

/// Host layout of `fvec3` values.
pub type Float3 = [f32; 3];

fn entry(
    name: &'static str,
    descriptor: impl TypeDescriptor + 'static,
) -> (&'static str, Arc<dyn TypeDescriptor>) {
    (name, Arc::new(descriptor))
}

/// Names and descriptors of every built-in value type.
pub fn builtin_descriptors() -> Vec<(&'static str, Arc<dyn TypeDescriptor>)> {
    vec![
        entry("float", PackedDescriptor::scalar(types::F32)),
        entry("int32", PackedDescriptor::scalar(types::I32)),
        entry("int64", PackedDescriptor::scalar(types::I64)),
        // Rust's bool is one byte holding 0 or 1.
        entry("bool", PackedDescriptor::scalar(types::I8)),
        entry("fvec3", PackedDescriptor::record(&[types::F32; 3])),
        entry(
            "float_list",
            PointerDescriptor::boxed::<Vec<f32>>(TYPE_FLOAT_LIST).with_label("float_list"),
        ),
        entry(
            "text",
            PointerDescriptor::boxed::<String>(TYPE_TEXT).with_label("text"),
        ),
    ]
}

/// Register every built-in value type with its descriptor.
pub fn register_builtins(registry: &mut TypeRegistry) -> CodegenResult<()> {
    for (name, descriptor) in builtin_descriptors() {
        registry.register(name, descriptor)?;
    }
    tracing::debug!(count = registry.len(), "registered builtin value types");
    Ok(())
}
