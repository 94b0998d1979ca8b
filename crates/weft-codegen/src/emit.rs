// src/emit.rs
//
// The code-generation context handed to descriptors: a Cranelift function
// builder positioned inside the body under construction, plus the target
// description used to pick machine types. One EmitCtx per function being
// built; nothing in it is shared between sessions.

use cranelift::prelude::{
    AbiParam, FunctionBuilder, InstBuilder, MemFlags, Signature, Type, Value, types,
};
use cranelift_codegen::isa::TargetFrontendConfig;
use smallvec::SmallVec;

use crate::errors::{CodegenError, CodegenResult};
use crate::handle::ValueHandle;
use crate::machine::MachineType;

pub struct EmitCtx<'a, 'f> {
    pub builder: &'a mut FunctionBuilder<'f>,
    target: TargetFrontendConfig,
}

impl<'a, 'f> EmitCtx<'a, 'f> {
    pub fn new(builder: &'a mut FunctionBuilder<'f>, target: TargetFrontendConfig) -> Self {
        Self { builder, target }
    }

    #[inline]
    pub fn target(&self) -> &TargetFrontendConfig {
        &self.target
    }

    #[inline]
    pub fn ptr_type(&self) -> Type {
        self.target.pointer_type()
    }

    #[inline]
    pub fn value_type(&self, value: Value) -> Type {
        self.builder.func.dfg.value_type(value)
    }

    /// Addresses must be pointer-sized integers for the current target.
    pub fn check_address(&self, operation: &'static str, address: Value) -> CodegenResult<()> {
        let found = self.value_type(address);
        if found != self.ptr_type() {
            return Err(CodegenError::representation_mismatch(
                operation,
                format_args!("{} address", self.ptr_type()),
                format_args!("{} address", found),
            ));
        }
        Ok(())
    }

    /// Read every slot of `repr` from memory at `address`, unconverted.
    pub fn load_slots(&mut self, repr: &MachineType, address: Value) -> CodegenResult<ValueHandle> {
        self.check_address("load", address)?;
        let parts: SmallVec<[Value; 4]> = repr
            .slots()
            .iter()
            .map(|slot| {
                self.builder
                    .ins()
                    .load(slot.ty, MemFlags::trusted(), address, slot.offset as i32)
            })
            .collect();
        Ok(ValueHandle::from_parts(parts))
    }

    /// Write every slot of `handle` to memory at `address`, unconverted.
    pub fn store_slots(
        &mut self,
        repr: &MachineType,
        handle: &ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        self.check_address("store", address)?;
        repr.check_handle("store", handle, &self.builder.func.dfg)?;
        for (slot, &value) in repr.slots().iter().zip(handle.parts()) {
            self.builder
                .ins()
                .store(MemFlags::trusted(), value, address, slot.offset as i32);
        }
        Ok(())
    }

    /// All-zero bits of a scalar type.
    pub fn zero_value(&mut self, ty: Type) -> CodegenResult<Value> {
        if ty == types::F32 {
            Ok(self.builder.ins().f32const(0.0))
        } else if ty == types::F64 {
            Ok(self.builder.ins().f64const(0.0))
        } else if ty == types::I128 {
            let low = self.builder.ins().iconst(types::I64, 0);
            Ok(self.builder.ins().uextend(types::I128, low))
        } else if ty.is_int() {
            Ok(self.builder.ins().iconst(ty, 0))
        } else {
            Err(CodegenError::unsupported_with_context(
                "zero value",
                ty.to_string(),
            ))
        }
    }

    /// Emit a call to a host function by address, using the target's
    /// default calling convention. Returns the call's results.
    pub fn call_host(
        &mut self,
        func: *const u8,
        params: &[Type],
        returns: &[Type],
        args: &[Value],
    ) -> SmallVec<[Value; 2]> {
        let mut sig = Signature::new(self.target.default_call_conv);
        sig.params
            .extend(params.iter().map(|&param| AbiParam::new(param)));
        sig.returns
            .extend(returns.iter().map(|&ret| AbiParam::new(ret)));
        let sig_ref = self.builder.import_signature(sig);

        let ptr_type = self.ptr_type();
        let callee = self.builder.ins().iconst(ptr_type, func as i64);
        let call = self.builder.ins().call_indirect(sig_ref, callee, args);
        SmallVec::from_slice(self.builder.inst_results(call))
    }
}
