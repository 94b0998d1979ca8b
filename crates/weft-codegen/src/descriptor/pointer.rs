// src/descriptor/pointer.rs
//
// Managed values represented as an opaque pointer. Copy, free and default
// construction are host callbacks supplied once at construction; generated
// code calls them at run time through extern "C" trampolines that receive the
// callback set's address as their first argument. Relocation moves the
// pointer bits and calls nothing. Every operation is traced with the
// descriptor's label.

use std::any::type_name;
use std::ffi::c_void;

use cranelift::prelude::{InstBuilder, MemFlags, Value};
use cranelift_codegen::isa::TargetFrontendConfig;

use super::TypeDescriptor;
use crate::emit::EmitCtx;
use crate::errors::{CodegenError, CodegenResult};
use crate::handle::ValueHandle;
use crate::machine::MachineType;

pub type CopyFn = Box<dyn Fn(*mut c_void) -> *mut c_void + Send + Sync>;
pub type FreeFn = Box<dyn Fn(*mut c_void) + Send + Sync>;
pub type DefaultFn = Box<dyn Fn() -> *mut c_void + Send + Sync>;

/// Host callbacks invoked by generated code.
pub struct PointerCallbacks {
    copy: CopyFn,
    free: FreeFn,
    default: DefaultFn,
}

extern "C" fn copy_trampoline(
    callbacks: *const PointerCallbacks,
    value: *mut c_void,
) -> *mut c_void {
    // SAFETY: generated code passes the address of a PointerCallbacks owned by
    // a live descriptor; descriptors outlive the code emitted from them.
    let callbacks = unsafe { &*callbacks };
    (callbacks.copy)(value)
}

extern "C" fn free_trampoline(callbacks: *const PointerCallbacks, value: *mut c_void) {
    // SAFETY: see copy_trampoline.
    let callbacks = unsafe { &*callbacks };
    (callbacks.free)(value)
}

extern "C" fn default_trampoline(callbacks: *const PointerCallbacks) -> *mut c_void {
    // SAFETY: see copy_trampoline.
    let callbacks = unsafe { &*callbacks };
    (callbacks.default)()
}

/// Descriptor for values that are owned pointers to host-managed data.
///
/// The descriptor, and whatever state its callbacks capture, must outlive
/// every function compiled with it.
pub struct PointerDescriptor {
    label: String,
    // Boxed so the address baked into generated code survives moves.
    callbacks: Box<PointerCallbacks>,
}

impl PointerDescriptor {
    pub fn new(
        copy: impl Fn(*mut c_void) -> *mut c_void + Send + Sync + 'static,
        free: impl Fn(*mut c_void) + Send + Sync + 'static,
        default: impl Fn() -> *mut c_void + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: String::from("opaque"),
            callbacks: Box::new(PointerCallbacks {
                copy: Box::new(copy),
                free: Box::new(free),
                default: Box::new(default),
            }),
        }
    }

    /// Descriptor for `Box<T>` values, counted under `runtime_type_id` by the
    /// runtime's allocation tracker.
    pub fn boxed<T: Clone + Default + 'static>(runtime_type_id: u32) -> Self {
        Self::new(
            move |ptr| weft_runtime::copy_boxed::<T>(runtime_type_id, ptr),
            move |ptr| weft_runtime::free_boxed::<T>(runtime_type_id, ptr),
            move || weft_runtime::default_boxed::<T>(runtime_type_id),
        )
        .with_label(type_name::<T>())
    }

    /// Name used in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn callbacks_addr(&self) -> i64 {
        let callbacks: *const PointerCallbacks = &*self.callbacks;
        callbacks as i64
    }

    /// The single pointer value of `handle`, checked against the target.
    fn pointer_of(
        &self,
        operation: &'static str,
        cg: &EmitCtx,
        handle: &ValueHandle,
    ) -> CodegenResult<Value> {
        MachineType::pointer(cg.target()).check_handle(operation, handle, &cg.builder.func.dfg)?;
        handle
            .as_scalar()
            .ok_or_else(|| CodegenError::internal("checked pointer handle is not scalar"))
    }

    fn call_copy(&self, cg: &mut EmitCtx, ptr: Value) -> Value {
        let ptr_type = cg.ptr_type();
        let env = cg.builder.ins().iconst(ptr_type, self.callbacks_addr());
        let results = cg.call_host(
            copy_trampoline as *const u8,
            &[ptr_type, ptr_type],
            &[ptr_type],
            &[env, ptr],
        );
        results[0]
    }

    fn call_free(&self, cg: &mut EmitCtx, ptr: Value) {
        let ptr_type = cg.ptr_type();
        let env = cg.builder.ins().iconst(ptr_type, self.callbacks_addr());
        cg.call_host(
            free_trampoline as *const u8,
            &[ptr_type, ptr_type],
            &[],
            &[env, ptr],
        );
    }

    fn call_default(&self, cg: &mut EmitCtx) -> Value {
        let ptr_type = cg.ptr_type();
        let env = cg.builder.ins().iconst(ptr_type, self.callbacks_addr());
        let results = cg.call_host(
            default_trampoline as *const u8,
            &[ptr_type],
            &[ptr_type],
            &[env],
        );
        results[0]
    }

    fn load_pointer(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<Value> {
        cg.check_address("load", address)?;
        let ptr_type = cg.ptr_type();
        Ok(cg
            .builder
            .ins()
            .load(ptr_type, MemFlags::trusted(), address, 0))
    }

    fn store_pointer(&self, cg: &mut EmitCtx, ptr: Value, address: Value) -> CodegenResult<()> {
        cg.check_address("store", address)?;
        cg.builder.ins().store(MemFlags::trusted(), ptr, address, 0);
        Ok(())
    }
}

impl TypeDescriptor for PointerDescriptor {
    fn representation(&self, target: &TargetFrontendConfig) -> MachineType {
        MachineType::pointer(target)
    }

    fn emit_copy(&self, cg: &mut EmitCtx, value: &ValueHandle) -> CodegenResult<ValueHandle> {
        let ptr = self.pointer_of("copy", cg, value)?;
        tracing::trace!(descriptor = %self.label, "emit copy");
        Ok(ValueHandle::scalar(self.call_copy(cg, ptr)))
    }

    fn emit_free(&self, cg: &mut EmitCtx, value: ValueHandle) -> CodegenResult<()> {
        let ptr = self.pointer_of("free", cg, &value)?;
        tracing::trace!(descriptor = %self.label, "emit free");
        self.call_free(cg, ptr);
        Ok(())
    }

    fn emit_store_relocate(
        &self,
        cg: &mut EmitCtx,
        value: ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        let ptr = self.pointer_of("store relocate", cg, &value)?;
        tracing::trace!(descriptor = %self.label, "emit store relocate");
        self.store_pointer(cg, ptr, address)
    }

    fn emit_store_copy(
        &self,
        cg: &mut EmitCtx,
        value: &ValueHandle,
        address: Value,
    ) -> CodegenResult<()> {
        let ptr = self.pointer_of("store copy", cg, value)?;
        cg.check_address("store", address)?;
        tracing::trace!(descriptor = %self.label, "emit store copy");
        let copy = self.call_copy(cg, ptr);
        self.store_pointer(cg, copy, address)
    }

    fn emit_load_copy(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<ValueHandle> {
        let ptr = self.load_pointer(cg, address)?;
        tracing::trace!(descriptor = %self.label, "emit load copy");
        Ok(ValueHandle::scalar(self.call_copy(cg, ptr)))
    }

    fn emit_load_relocate(
        &self,
        cg: &mut EmitCtx,
        address: Value,
    ) -> CodegenResult<ValueHandle> {
        let ptr = self.load_pointer(cg, address)?;
        tracing::trace!(descriptor = %self.label, "emit load relocate");
        Ok(ValueHandle::scalar(ptr))
    }

    fn emit_default(&self, cg: &mut EmitCtx) -> CodegenResult<ValueHandle> {
        tracing::trace!(descriptor = %self.label, "emit default");
        Ok(ValueHandle::scalar(self.call_default(cg)))
    }
}
