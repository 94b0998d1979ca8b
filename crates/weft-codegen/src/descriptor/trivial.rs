// src/descriptor/trivial.rs
//
// Trivial values: no teardown, and a bitwise copy is a valid duplicate. What
// still varies between trivial types is how the JIT representation relates
// to the host's memory layout, so load/store and the representation itself
// come from a TrivialLayout strategy.

use cranelift::prelude::Value;
use cranelift_codegen::isa::TargetFrontendConfig;

use super::TypeDescriptor;
use crate::emit::EmitCtx;
use crate::errors::CodegenResult;
use crate::handle::ValueHandle;
use crate::machine::MachineType;

/// How a trivial type moves between registers and host memory.
pub trait TrivialLayout: Send + Sync {
    fn representation(&self, target: &TargetFrontendConfig) -> MachineType;

    /// Read the host-layout value at `address` into its JIT representation.
    fn emit_load(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<ValueHandle>;

    /// Write a JIT-representation value to `address` in host layout.
    fn emit_store(&self, cg: &mut EmitCtx, value: &ValueHandle, address: Value)
    -> CodegenResult<()>;
}

/// Descriptor for any trivial type, parameterized by its layout strategy.
pub struct TrivialDescriptor<L> {
    layout: L,
}

impl<L: TrivialLayout> TrivialDescriptor<L> {
    pub fn from_layout(layout: L) -> Self {
        Self { layout }
    }

    fn check_handle(
        &self,
        operation: &'static str,
        cg: &EmitCtx,
        value: &ValueHandle,
    ) -> CodegenResult<()> {
        self.layout
            .representation(cg.target())
            .check_handle(operation, value, &cg.builder.func.dfg)
    }
}

impl<L: TrivialLayout> TypeDescriptor for TrivialDescriptor<L> {
    fn representation(&self, target: &TargetFrontendConfig) -> MachineType {
        self.layout.representation(target)
    }

    fn emit_copy(&self, cg: &mut EmitCtx, value: &ValueHandle) -> CodegenResult<ValueHandle> {
        self.check_handle("copy", cg, value)?;
        Ok(value.bit_copy())
    }

    // Nothing to release, but the handle must still be one of ours.
    fn emit_free(&self, cg: &mut EmitCtx, value: ValueHandle) -> CodegenResult<()> {
        self.check_handle("free", cg, &value)
    }

    fn emit_store_relocate(
        &self,
        cg: &mut EmitCtx,
        value: ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        self.layout.emit_store(cg, &value, address)
    }

    fn emit_store_copy(
        &self,
        cg: &mut EmitCtx,
        value: &ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        self.layout.emit_store(cg, value, address)
    }

    fn emit_load_copy(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<ValueHandle> {
        self.layout.emit_load(cg, address)
    }

    fn emit_load_relocate(
        &self,
        cg: &mut EmitCtx,
        address: Value,
    ) -> CodegenResult<ValueHandle> {
        self.layout.emit_load(cg, address)
    }

    fn emit_default(&self, cg: &mut EmitCtx) -> CodegenResult<ValueHandle> {
        let repr = self.layout.representation(cg.target());
        let parts = repr
            .slots()
            .iter()
            .map(|slot| cg.zero_value(slot.ty))
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(ValueHandle::from_parts(parts))
    }
}
