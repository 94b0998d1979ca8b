// src/lookup.rs
//
// Descriptor lookup for the compiler: from a value type to its descriptor,
// and from descriptors to the machine types used to build signatures and
// struct layouts.

use std::sync::Arc;

use cranelift::prelude::AbiParam;
use cranelift_codegen::isa::TargetFrontendConfig;

use crate::descriptor::TypeDescriptor;
use crate::errors::{CodegenError, CodegenResult};
use crate::machine::MachineType;
use crate::value_type::ValueType;

/// The descriptor attached to `ty`.
///
/// A type without one is a contract violation: the caller must abort the
/// compilation instead of substituting anything.
pub fn descriptor_of(ty: &ValueType) -> CodegenResult<&Arc<dyn TypeDescriptor>> {
    ty.descriptor()
        .ok_or_else(|| CodegenError::missing_descriptor(ty.name()))
}

/// Machine representation of `ty` for `target`.
pub fn representation_of(
    ty: &ValueType,
    target: &TargetFrontendConfig,
) -> CodegenResult<MachineType> {
    Ok(descriptor_of(ty)?.representation(target))
}

/// Representations of `descriptors`, in order.
#[tracing::instrument(level = "trace", skip_all, fields(count = descriptors.len()))]
pub fn representations_of(
    descriptors: &[Arc<dyn TypeDescriptor>],
    target: &TargetFrontendConfig,
) -> Vec<MachineType> {
    descriptors
        .iter()
        .map(|descriptor| descriptor.representation(target))
        .collect()
}

/// Flattened signature parameters for passing `reprs` in registers.
pub fn abi_params_of(reprs: &[MachineType]) -> Vec<AbiParam> {
    reprs.iter().flat_map(|repr| repr.abi_params()).collect()
}
