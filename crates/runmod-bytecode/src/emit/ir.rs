//! Instruction IR with symbolic operands.

use crate::bytecode::Opcode;

/// A jump target inside one routine, placed with [`InstructionIR::Mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// Handle to a type added to a [`ModuleBuilder`](super::ModuleBuilder).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef(pub(crate) usize);

/// Handle to a routine added to a [`ModuleBuilder`](super::ModuleBuilder).
///
/// Final routine ids are assigned at emission, grouped by declaring type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoutineRef(pub(crate) usize);

/// Pre-layout instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstructionIR {
    /// Any opcode without operands.
    Op(Opcode),
    PushInt(i64),
    PushStr(String),
    LoadArg(u8),
    LoadLocal(u8),
    StoreLocal(u8),
    Jump(Label),
    JumpIfFalse(Label),
    JumpIfTrue(Label),
    /// Call a routine of the same module by qualified name.
    Call(String),
    /// Call a routine of another module.
    CallImport { module: String, routine: String },
    /// Raise a fault of the named type.
    Throw(String),
    /// Place a label at the current position. Emits nothing.
    Mark(Label),
}

impl InstructionIR {
    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Mark(_) => 0,
            Self::Op(op) => op.size(),
            Self::PushInt(_) => Opcode::PushInt.size(),
            Self::PushStr(_) => Opcode::PushStr.size(),
            Self::LoadArg(_) | Self::LoadLocal(_) | Self::StoreLocal(_) => 2,
            Self::Jump(_) | Self::JumpIfFalse(_) | Self::JumpIfTrue(_) => Opcode::Jump.size(),
            Self::Call(_) => Opcode::Call.size(),
            Self::CallImport { .. } => Opcode::CallImport.size(),
            Self::Throw(_) => Opcode::Throw.size(),
        }
    }
}
