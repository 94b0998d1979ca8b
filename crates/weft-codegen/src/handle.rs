// src/handle.rs
//
// Register-form value handles. A handle is one SSA value per slot of the
// descriptor's representation. Handles are move-only: duplicating the value a
// handle stands for is a descriptor operation (`emit_copy`), and relocating
// operations take the handle by value so the consumed side cannot be reused.

use cranelift::prelude::Value;
use smallvec::SmallVec;

/// A value held in registers while a function body is being emitted.
#[derive(Debug, PartialEq, Eq)]
pub struct ValueHandle {
    parts: SmallVec<[Value; 4]>,
}

impl ValueHandle {
    pub fn scalar(value: Value) -> Self {
        Self {
            parts: smallvec::smallvec![value],
        }
    }

    pub fn from_parts(parts: impl IntoIterator<Item = Value>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
        }
    }

    /// SSA values in slot order.
    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The single SSA value of a scalar handle.
    pub fn as_scalar(&self) -> Option<Value> {
        match self.parts.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn into_parts(self) -> SmallVec<[Value; 4]> {
        self.parts
    }

    /// Same bits, new owner. Only valid for types whose copies need no work.
    pub(crate) fn bit_copy(&self) -> Self {
        Self {
            parts: self.parts.clone(),
        }
    }
}
