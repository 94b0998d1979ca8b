// src/machine.rs
//
// Machine representations produced by descriptors.
//
// Cranelift has no aggregate types, so a record is kept as an ordered list of
// scalar slots with C layout offsets. In registers a record is one SSA value
// per slot; in memory each slot sits at its offset.

use std::fmt;

use cranelift::prelude::{AbiParam, Type};
use cranelift_codegen::ir::DataFlowGraph;
use cranelift_codegen::isa::TargetFrontendConfig;
use smallvec::SmallVec;

use crate::errors::{CodegenError, CodegenResult};
use crate::handle::ValueHandle;

/// One scalar field of a representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Byte offset from the start of the value in memory.
    pub offset: u32,
    pub ty: Type,
}

/// C-compatible layout of a sequence of scalar fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordLayout {
    slots: SmallVec<[Slot; 4]>,
    size: u32,
    align: u32,
}

impl RecordLayout {
    /// Lay out `fields` the way `#[repr(C)]` would: each field at its natural
    /// alignment, total size rounded up to the largest alignment.
    pub fn new(fields: &[Type]) -> Self {
        let mut slots = SmallVec::with_capacity(fields.len());
        let mut offset = 0u32;
        let mut align = 1u32;
        for &ty in fields {
            let field_align = natural_align(ty);
            offset = align_to(offset, field_align);
            slots.push(Slot { offset, ty });
            offset += ty.bytes();
            align = align.max(field_align);
        }
        Self {
            slots,
            size: align_to(offset, align),
            align,
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }
}

/// The low-level type a descriptor produces for a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MachineType {
    /// A single Cranelift value.
    Scalar(Type),
    /// Several Cranelift values with a fixed memory layout.
    Record(RecordLayout),
}

impl MachineType {
    pub fn record(fields: &[Type]) -> Self {
        MachineType::Record(RecordLayout::new(fields))
    }

    /// An opaque pointer-sized value for the given target.
    pub fn pointer(target: &TargetFrontendConfig) -> Self {
        MachineType::Scalar(target.pointer_type())
    }

    /// Size in bytes when stored in memory.
    pub fn size(&self) -> u32 {
        match self {
            MachineType::Scalar(ty) => ty.bytes(),
            MachineType::Record(layout) => layout.size(),
        }
    }

    /// Alignment in bytes when stored in memory.
    pub fn align(&self) -> u32 {
        match self {
            MachineType::Scalar(ty) => natural_align(*ty),
            MachineType::Record(layout) => layout.align(),
        }
    }

    /// Scalar slots in layout order. A scalar is a single slot at offset 0.
    pub fn slots(&self) -> SmallVec<[Slot; 4]> {
        match self {
            MachineType::Scalar(ty) => smallvec::smallvec![Slot { offset: 0, ty: *ty }],
            MachineType::Record(layout) => layout.slots.clone(),
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            MachineType::Scalar(_) => 1,
            MachineType::Record(layout) => layout.slots.len(),
        }
    }

    /// Signature parameters for passing a value of this type in registers.
    pub fn abi_params(&self) -> SmallVec<[AbiParam; 4]> {
        self.slots()
            .iter()
            .map(|slot| AbiParam::new(slot.ty))
            .collect()
    }

    /// Verify that `handle` holds one value of the right type per slot.
    pub(crate) fn check_handle(
        &self,
        operation: &'static str,
        handle: &ValueHandle,
        dfg: &DataFlowGraph,
    ) -> CodegenResult<()> {
        let slots = self.slots();
        if handle.len() != slots.len() {
            return Err(CodegenError::representation_mismatch(
                operation,
                format_args!("{} slot(s) of {}", slots.len(), self),
                format_args!("{} value(s)", handle.len()),
            ));
        }
        for (slot, &value) in slots.iter().zip(handle.parts()) {
            let found = dfg.value_type(value);
            if found != slot.ty {
                return Err(CodegenError::representation_mismatch(
                    operation,
                    format_args!("{} at offset {}", slot.ty, slot.offset),
                    found,
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineType::Scalar(ty) => write!(f, "{}", ty),
            MachineType::Record(layout) => {
                f.write_str("{")?;
                for (i, slot) in layout.slots.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}@{}", slot.ty, slot.offset)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn natural_align(ty: Type) -> u32 {
    ty.bytes().max(1)
}

fn align_to(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift::prelude::types;

    #[test]
    fn record_matches_repr_c() {
        #[repr(C)]
        struct Mixed {
            a: u8,
            b: f32,
            c: u16,
            d: f64,
        }

        let layout = RecordLayout::new(&[types::I8, types::F32, types::I16, types::F64]);
        let offsets: Vec<u32> = layout.slots().iter().map(|s| s.offset).collect();
        assert_eq!(
            offsets,
            vec![
                std::mem::offset_of!(Mixed, a) as u32,
                std::mem::offset_of!(Mixed, b) as u32,
                std::mem::offset_of!(Mixed, c) as u32,
                std::mem::offset_of!(Mixed, d) as u32,
            ]
        );
        assert_eq!(layout.size(), std::mem::size_of::<Mixed>() as u32);
        assert_eq!(layout.align(), std::mem::align_of::<Mixed>() as u32);
    }

    #[test]
    fn vector_of_three_floats() {
        let repr = MachineType::record(&[types::F32; 3]);
        assert_eq!(repr.size(), 12);
        assert_eq!(repr.align(), 4);
        assert_eq!(repr.slot_count(), 3);
        assert_eq!(repr.to_string(), "{f32@0, f32@4, f32@8}");
    }

    #[test]
    fn scalar_is_one_slot() {
        let repr = MachineType::Scalar(types::I64);
        assert_eq!(
            repr.slots().as_slice(),
            &[Slot {
                offset: 0,
                ty: types::I64
            }]
        );
        assert_eq!(repr.abi_params().len(), 1);
        assert_eq!(repr.to_string(), "i64");
    }

    #[test]
    fn empty_record() {
        let repr = MachineType::record(&[]);
        assert_eq!(repr.size(), 0);
        assert_eq!(repr.align(), 1);
        assert_eq!(repr.slot_count(), 0);
    }
}
