// src/descriptor/packed.rs
//
// Packed values: the JIT representation is byte-for-byte the host's
// in-memory layout, so loading and storing is a plain memory access per slot
// at its natural size and alignment. Numbers and small plain structs use this.

use cranelift::prelude::{Type, Value};
use cranelift_codegen::isa::TargetFrontendConfig;

use super::trivial::{TrivialDescriptor, TrivialLayout};
use crate::emit::EmitCtx;
use crate::errors::CodegenResult;
use crate::handle::ValueHandle;
use crate::machine::MachineType;

/// Builds the machine type matching the host layout for a target.
pub type ReprFn = Box<dyn Fn(&TargetFrontendConfig) -> MachineType + Send + Sync>;

pub struct PackedLayout {
    create: ReprFn,
}

impl TrivialLayout for PackedLayout {
    fn representation(&self, target: &TargetFrontendConfig) -> MachineType {
        (self.create)(target)
    }

    fn emit_load(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<ValueHandle> {
        let repr = self.representation(cg.target());
        cg.load_slots(&repr, address)
    }

    fn emit_store(
        &self,
        cg: &mut EmitCtx,
        value: &ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        let repr = self.representation(cg.target());
        cg.store_slots(&repr, value, address)
    }
}

/// Trivial descriptor whose representation matches host memory exactly.
pub type PackedDescriptor = TrivialDescriptor<PackedLayout>;

impl TrivialDescriptor<PackedLayout> {
    /// The caller asserts that `create` yields a layout identical to the
    /// host's for every target.
    pub fn new(
        create: impl Fn(&TargetFrontendConfig) -> MachineType + Send + Sync + 'static,
    ) -> Self {
        Self::from_layout(PackedLayout {
            create: Box::new(create),
        })
    }

    /// A single scalar of the same type on every target.
    pub fn scalar(ty: Type) -> Self {
        Self::new(move |_| MachineType::Scalar(ty))
    }

    /// A `#[repr(C)]` struct of scalar fields.
    pub fn record(fields: &[Type]) -> Self {
        let repr = MachineType::record(fields);
        Self::new(move |_| repr.clone())
    }
}
