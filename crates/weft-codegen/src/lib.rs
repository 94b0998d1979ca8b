//! Weft code generation: type descriptors for Cranelift JIT compilation of
//! node graphs.
//!
//! Every value type that flows through a compiled graph has a
//! [`TypeDescriptor`] attached to it. The compiler looks descriptors up with
//! [`descriptor_of`] and asks them for machine representations and for the
//! code that copies, frees, stores and loads values of their type.

pub mod builtins;
pub mod descriptor;
mod emit;
pub mod errors;
mod handle;
pub mod jit;
mod lookup;
mod machine;
mod value_type;

pub use descriptor::{
    PackedDescriptor, PackedLayout, PointerCallbacks, PointerDescriptor, TrivialDescriptor,
    TrivialLayout, TypeDescriptor,
};
pub use emit::EmitCtx;
pub use handle::ValueHandle;
pub use jit::{JitContext, JitOptions};
pub use lookup::{abi_params_of, descriptor_of, representation_of, representations_of};
pub use machine::{MachineType, RecordLayout, Slot};
pub use value_type::{SharedType, TypeRegistry, ValueType};

// Error types
pub use errors::{CodegenError, CodegenErrorKind, CodegenResult};
