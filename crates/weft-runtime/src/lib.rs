//! Weft runtime: host-side support for managed values used by JIT-compiled
//! graph functions.
//!
//! Managed values reach generated code as opaque pointers. Their copy, free
//! and default callbacks are ordinary Rust functions from [`boxed`], and
//! [`alloc_track`] counts live instances so tests and leak checks can verify
//! that generated code releases every value exactly once.
pub mod alloc_track;
pub mod boxed;

pub use boxed::{boxed_ref, copy_boxed, default_boxed, free_boxed, new_boxed, take_boxed};

/// Runtime type id for user-defined boxed values without a dedicated slot.
pub const TYPE_OPAQUE: u32 = 0;
/// Runtime type id for `Vec<f32>` lists.
pub const TYPE_FLOAT_LIST: u32 = 1;
/// Runtime type id for `String` values.
pub const TYPE_TEXT: u32 = 2;
