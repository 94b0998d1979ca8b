//! Type descriptors: what every value type must provide to be used in
//! JIT-compiled graph functions.
//!
//! A descriptor knows the machine representation of its value type and emits
//! the code that duplicates, releases, stores and loads such values. Store
//! and load come in two ownership modes:
//!
//! - *copy*: source and destination are both valid and independently owned
//!   afterwards. For managed values this duplicates the underlying resource.
//! - *relocate*: ownership moves. The vacated side (the consumed handle, or
//!   the memory slot that was loaded from) must not be freed or read again.
//!
//! At every point of the emitted instruction stream each logical value has
//! exactly one owner responsible for freeing it. Relocation moves that
//! responsibility; copying creates a second, independent one.
//!
//! Overwriting a slot that still owns a value is the caller's business: no
//! store frees the previous occupant of its destination.

mod packed;
mod pointer;
mod trivial;

pub use packed::{PackedDescriptor, PackedLayout, ReprFn};
pub use pointer::{CopyFn, DefaultFn, FreeFn, PointerCallbacks, PointerDescriptor};
pub use trivial::{TrivialDescriptor, TrivialLayout};

use cranelift::prelude::Value;
use cranelift_codegen::isa::TargetFrontendConfig;

use crate::emit::EmitCtx;
use crate::errors::CodegenResult;
use crate::handle::ValueHandle;
use crate::machine::MachineType;

/// Code generation contract for one value type.
///
/// Descriptors are immutable once attached to their value type and are read
/// concurrently by any number of compilation sessions.
pub trait TypeDescriptor: Send + Sync {
    /// Machine representation for `target`. Pure: the same descriptor and
    /// target always produce an equal type.
    fn representation(&self, target: &TargetFrontendConfig) -> MachineType;

    /// Emit an independent duplicate of `value`. `value` stays valid and
    /// owned by its holder.
    fn emit_copy(&self, cg: &mut EmitCtx, value: &ValueHandle) -> CodegenResult<ValueHandle>;

    /// Emit the release of everything `value` owns.
    fn emit_free(&self, cg: &mut EmitCtx, value: ValueHandle) -> CodegenResult<()>;

    /// Write `value` to `address`, moving ownership into memory.
    fn emit_store_relocate(
        &self,
        cg: &mut EmitCtx,
        value: ValueHandle,
        address: Value,
    ) -> CodegenResult<()>;

    /// Write a duplicate of `value` to `address`; `value` is unaffected.
    fn emit_store_copy(
        &self,
        cg: &mut EmitCtx,
        value: &ValueHandle,
        address: Value,
    ) -> CodegenResult<()>;

    /// Read a duplicate of the value at `address`; memory keeps its value.
    fn emit_load_copy(&self, cg: &mut EmitCtx, address: Value) -> CodegenResult<ValueHandle>;

    /// Read the value at `address`, taking ownership. The slot is
    /// uninitialized for freeing purposes afterwards.
    fn emit_load_relocate(&self, cg: &mut EmitCtx, address: Value)
    -> CodegenResult<ValueHandle>;

    /// Materialize a fresh owned instance. Only explicit initialization
    /// sites call this; no other operation does so implicitly.
    fn emit_default(&self, cg: &mut EmitCtx) -> CodegenResult<ValueHandle>;
}
