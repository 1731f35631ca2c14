//! Fixed-width table records.
//!
//! Each record decodes from its little-endian byte form. Decoding checks only
//! the record's own fields (value type tags); cross-references are validated
//! by [`Module`](super::Module) at load time.

use super::ids::{RoutineId, StringId};
use super::value_type::ValueType;
use super::{IMPORT_DEF_SIZE, PARAM_DEF_SIZE, ROUTINE_DEF_SIZE, TYPE_DEF_SIZE};

/// Routine flag bits.
pub mod routine_flags {
    /// Bit 0: visible outside the declaring type.
    pub const PUBLIC: u8 = 0x01;
    /// Bit 1: callable without an instance.
    pub const STATIC: u8 = 0x02;
}

#[inline]
fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Type declaration (8 bytes). Routines of a type are contiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub namespace: StringId,
    pub name: StringId,
    pub routine_start: u16,
    pub routine_count: u16,
}

impl TypeDef {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            namespace: StringId(u16_at(bytes, 0)),
            name: StringId(u16_at(bytes, 2)),
            routine_start: u16_at(bytes, 4),
            routine_count: u16_at(bytes, 6),
        }
    }

    pub fn to_bytes(&self) -> [u8; TYPE_DEF_SIZE] {
        let mut b = [0u8; TYPE_DEF_SIZE];
        b[0..2].copy_from_slice(&self.namespace.0.to_le_bytes());
        b[2..4].copy_from_slice(&self.name.0.to_le_bytes());
        b[4..6].copy_from_slice(&self.routine_start.to_le_bytes());
        b[6..8].copy_from_slice(&self.routine_count.to_le_bytes());
        b
    }

    /// Ids of the routines this type declares, in declaration order.
    pub fn routine_ids(&self) -> impl Iterator<Item = RoutineId> + use<> {
        let start = self.routine_start;
        (start..start + self.routine_count).map(RoutineId)
    }
}

/// Routine declaration (16 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutineDef {
    pub name: StringId,
    pub flags: u8,
    pub return_type: ValueType,
    pub param_start: u16,
    pub param_count: u8,
    /// Number of local slots.
    pub locals: u8,
    /// Start offset relative to the code section.
    pub code_start: u32,
    pub code_len: u32,
}

impl RoutineDef {
    /// Decode a record. Fails with the raw tag when the return type is unknown.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, u8> {
        let return_type = ValueType::from_u8(bytes[3]).ok_or(bytes[3])?;
        Ok(Self {
            name: StringId(u16_at(bytes, 0)),
            flags: bytes[2],
            return_type,
            param_start: u16_at(bytes, 4),
            param_count: bytes[6],
            locals: bytes[7],
            code_start: u32_at(bytes, 8),
            code_len: u32_at(bytes, 12),
        })
    }

    pub fn to_bytes(&self) -> [u8; ROUTINE_DEF_SIZE] {
        let mut b = [0u8; ROUTINE_DEF_SIZE];
        b[0..2].copy_from_slice(&self.name.0.to_le_bytes());
        b[2] = self.flags;
        b[3] = self.return_type.to_u8();
        b[4..6].copy_from_slice(&self.param_start.to_le_bytes());
        b[6] = self.param_count;
        b[7] = self.locals;
        b[8..12].copy_from_slice(&self.code_start.to_le_bytes());
        b[12..16].copy_from_slice(&self.code_len.to_le_bytes());
        b
    }

    pub fn is_public(&self) -> bool {
        self.flags & routine_flags::PUBLIC != 0
    }

    pub fn is_static(&self) -> bool {
        self.flags & routine_flags::STATIC != 0
    }

    pub fn param_range(&self) -> std::ops::Range<usize> {
        let start = self.param_start as usize;
        start..start + self.param_count as usize
    }

    pub fn code_range(&self) -> std::ops::Range<usize> {
        let start = self.code_start as usize;
        start..start + self.code_len as usize
    }
}

/// Routine parameter (4 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamDef {
    pub name: StringId,
    pub ty: ValueType,
}

impl ParamDef {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, u8> {
        let ty = ValueType::from_u8(bytes[2]).ok_or(bytes[2])?;
        Ok(Self {
            name: StringId(u16_at(bytes, 0)),
            ty,
        })
    }

    pub fn to_bytes(&self) -> [u8; PARAM_DEF_SIZE] {
        let mut b = [0u8; PARAM_DEF_SIZE];
        b[0..2].copy_from_slice(&self.name.0.to_le_bytes());
        b[2] = self.ty.to_u8();
        b
    }
}

/// Routine imported from another module (4 bytes).
///
/// `routine` holds the qualified name (`Namespace.Type.Routine`) looked up in
/// the imported module when the import is first called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportDef {
    pub module: StringId,
    pub routine: StringId,
}

impl ImportDef {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            module: StringId(u16_at(bytes, 0)),
            routine: StringId(u16_at(bytes, 2)),
        }
    }

    pub fn to_bytes(&self) -> [u8; IMPORT_DEF_SIZE] {
        let mut b = [0u8; IMPORT_DEF_SIZE];
        b[0..2].copy_from_slice(&self.module.0.to_le_bytes());
        b[2..4].copy_from_slice(&self.routine.0.to_le_bytes());
        b
    }
}
