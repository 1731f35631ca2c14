//! Instruction encoding.
//!
//! Instructions are variable-length: a one-byte opcode followed by its fixed
//! operand bytes. Jump targets are byte offsets relative to the start of the
//! routine's code.

use super::ids::{ImportId, RoutineId, StringId};

/// Instruction opcodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    PushNull = 0x01,
    PushTrue = 0x02,
    PushFalse = 0x03,
    PushInt = 0x04,
    PushStr = 0x05,
    LoadArg = 0x06,
    LoadLocal = 0x07,
    StoreLocal = 0x08,
    Pop = 0x09,
    Dup = 0x0A,
    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Rem = 0x14,
    Eq = 0x18,
    Ne = 0x19,
    Lt = 0x1A,
    Le = 0x1B,
    Gt = 0x1C,
    Ge = 0x1D,
    Not = 0x1E,
    Len = 0x20,
    Index = 0x21,
    ToStr = 0x22,
    Jump = 0x28,
    JumpIfFalse = 0x29,
    JumpIfTrue = 0x2A,
    Call = 0x30,
    CallImport = 0x31,
    Print = 0x38,
    Write = 0x39,
    Sleep = 0x3A,
    Throw = 0x40,
    Ret = 0x48,
    RetVoid = 0x49,
}

impl Opcode {
    pub fn from_u8(v: u8) -> Option<Self> {
        use Opcode::*;
        Some(match v {
            0x00 => Nop,
            0x01 => PushNull,
            0x02 => PushTrue,
            0x03 => PushFalse,
            0x04 => PushInt,
            0x05 => PushStr,
            0x06 => LoadArg,
            0x07 => LoadLocal,
            0x08 => StoreLocal,
            0x09 => Pop,
            0x0A => Dup,
            0x10 => Add,
            0x11 => Sub,
            0x12 => Mul,
            0x13 => Div,
            0x14 => Rem,
            0x18 => Eq,
            0x19 => Ne,
            0x1A => Lt,
            0x1B => Le,
            0x1C => Gt,
            0x1D => Ge,
            0x1E => Not,
            0x20 => Len,
            0x21 => Index,
            0x22 => ToStr,
            0x28 => Jump,
            0x29 => JumpIfFalse,
            0x2A => JumpIfTrue,
            0x30 => Call,
            0x31 => CallImport,
            0x38 => Print,
            0x39 => Write,
            0x3A => Sleep,
            0x40 => Throw,
            0x48 => Ret,
            0x49 => RetVoid,
            _ => return None,
        })
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_size(self) -> usize {
        use Opcode::*;
        match self {
            PushInt => 8,
            Jump | JumpIfFalse | JumpIfTrue => 4,
            PushStr | Call | CallImport | Throw => 2,
            LoadArg | LoadLocal | StoreLocal => 1,
            _ => 0,
        }
    }

    /// Encoded size in bytes (opcode + operands).
    pub fn size(self) -> usize {
        1 + self.operand_size()
    }

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            PushNull | PushTrue | PushFalse | PushInt | PushStr => "push",
            LoadArg => "ldarg",
            LoadLocal => "ldloc",
            StoreLocal => "stloc",
            Pop => "pop",
            Dup => "dup",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Rem => "rem",
            Eq => "eq",
            Ne => "ne",
            Lt => "lt",
            Le => "le",
            Gt => "gt",
            Ge => "ge",
            Not => "not",
            Len => "len",
            Index => "index",
            ToStr => "tostr",
            Jump => "jmp",
            JumpIfFalse => "jmpf",
            JumpIfTrue => "jmpt",
            Call => "call",
            CallImport => "callext",
            Print => "print",
            Write => "write",
            Sleep => "sleep",
            Throw => "throw",
            Ret => "ret",
            RetVoid => "retv",
        }
    }
}

/// Decoded instruction with its operands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Nop,
    PushNull,
    PushBool(bool),
    PushInt(i64),
    PushStr(StringId),
    LoadArg(u8),
    LoadLocal(u8),
    StoreLocal(u8),
    Pop,
    Dup,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    Len,
    Index,
    ToStr,
    Jump(u32),
    JumpIfFalse(u32),
    JumpIfTrue(u32),
    Call(RoutineId),
    CallImport(ImportId),
    Print,
    Write,
    Sleep,
    /// Raise a callee fault of the named type; the message is popped.
    Throw(StringId),
    Ret,
    RetVoid,
}

/// Error decoding an instruction stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of code at offset {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nop => Opcode::Nop,
            Self::PushNull => Opcode::PushNull,
            Self::PushBool(true) => Opcode::PushTrue,
            Self::PushBool(false) => Opcode::PushFalse,
            Self::PushInt(_) => Opcode::PushInt,
            Self::PushStr(_) => Opcode::PushStr,
            Self::LoadArg(_) => Opcode::LoadArg,
            Self::LoadLocal(_) => Opcode::LoadLocal,
            Self::StoreLocal(_) => Opcode::StoreLocal,
            Self::Pop => Opcode::Pop,
            Self::Dup => Opcode::Dup,
            Self::Add => Opcode::Add,
            Self::Sub => Opcode::Sub,
            Self::Mul => Opcode::Mul,
            Self::Div => Opcode::Div,
            Self::Rem => Opcode::Rem,
            Self::Eq => Opcode::Eq,
            Self::Ne => Opcode::Ne,
            Self::Lt => Opcode::Lt,
            Self::Le => Opcode::Le,
            Self::Gt => Opcode::Gt,
            Self::Ge => Opcode::Ge,
            Self::Not => Opcode::Not,
            Self::Len => Opcode::Len,
            Self::Index => Opcode::Index,
            Self::ToStr => Opcode::ToStr,
            Self::Jump(_) => Opcode::Jump,
            Self::JumpIfFalse(_) => Opcode::JumpIfFalse,
            Self::JumpIfTrue(_) => Opcode::JumpIfTrue,
            Self::Call(_) => Opcode::Call,
            Self::CallImport(_) => Opcode::CallImport,
            Self::Print => Opcode::Print,
            Self::Write => Opcode::Write,
            Self::Sleep => Opcode::Sleep,
            Self::Throw(_) => Opcode::Throw,
            Self::Ret => Opcode::Ret,
            Self::RetVoid => Opcode::RetVoid,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.opcode().size()
    }

    /// Decode the instruction starting at `offset` in `code`.
    pub fn decode(code: &[u8], offset: usize) -> Result<Self, DecodeError> {
        let &byte = code.get(offset).ok_or(DecodeError::UnexpectedEnd { offset })?;
        let opcode = Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode {
            opcode: byte,
            offset,
        })?;

        let start = offset + 1;
        let end = start + opcode.operand_size();
        let ops = code
            .get(start..end)
            .ok_or(DecodeError::UnexpectedEnd { offset: code.len() })?;
        let u16_op = || u16::from_le_bytes([ops[0], ops[1]]);
        let u32_op = || u32::from_le_bytes([ops[0], ops[1], ops[2], ops[3]]);

        Ok(match opcode {
            Opcode::Nop => Self::Nop,
            Opcode::PushNull => Self::PushNull,
            Opcode::PushTrue => Self::PushBool(true),
            Opcode::PushFalse => Self::PushBool(false),
            Opcode::PushInt => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(ops);
                Self::PushInt(i64::from_le_bytes(raw))
            }
            Opcode::PushStr => Self::PushStr(StringId(u16_op())),
            Opcode::LoadArg => Self::LoadArg(ops[0]),
            Opcode::LoadLocal => Self::LoadLocal(ops[0]),
            Opcode::StoreLocal => Self::StoreLocal(ops[0]),
            Opcode::Pop => Self::Pop,
            Opcode::Dup => Self::Dup,
            Opcode::Add => Self::Add,
            Opcode::Sub => Self::Sub,
            Opcode::Mul => Self::Mul,
            Opcode::Div => Self::Div,
            Opcode::Rem => Self::Rem,
            Opcode::Eq => Self::Eq,
            Opcode::Ne => Self::Ne,
            Opcode::Lt => Self::Lt,
            Opcode::Le => Self::Le,
            Opcode::Gt => Self::Gt,
            Opcode::Ge => Self::Ge,
            Opcode::Not => Self::Not,
            Opcode::Len => Self::Len,
            Opcode::Index => Self::Index,
            Opcode::ToStr => Self::ToStr,
            Opcode::Jump => Self::Jump(u32_op()),
            Opcode::JumpIfFalse => Self::JumpIfFalse(u32_op()),
            Opcode::JumpIfTrue => Self::JumpIfTrue(u32_op()),
            Opcode::Call => Self::Call(RoutineId(u16_op())),
            Opcode::CallImport => Self::CallImport(ImportId(u16_op())),
            Opcode::Print => Self::Print,
            Opcode::Write => Self::Write,
            Opcode::Sleep => Self::Sleep,
            Opcode::Throw => Self::Throw(StringId(u16_op())),
            Opcode::Ret => Self::Ret,
            Opcode::RetVoid => Self::RetVoid,
        })
    }

    /// Append the encoded instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Self::PushInt(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::PushStr(id) | Self::Throw(id) => out.extend_from_slice(&id.0.to_le_bytes()),
            Self::LoadArg(i) | Self::LoadLocal(i) | Self::StoreLocal(i) => out.push(i),
            Self::Jump(t) | Self::JumpIfFalse(t) | Self::JumpIfTrue(t) => {
                out.extend_from_slice(&t.to_le_bytes())
            }
            Self::Call(id) => out.extend_from_slice(&id.0.to_le_bytes()),
            Self::CallImport(id) => out.extend_from_slice(&id.0.to_le_bytes()),
            _ => {}
        }
    }

    /// Jump target, for control-flow instructions.
    pub fn jump_target(&self) -> Option<u32> {
        match *self {
            Self::Jump(t) | Self::JumpIfFalse(t) | Self::JumpIfTrue(t) => Some(t),
            _ => None,
        }
    }
}

/// Iterate `(offset, instruction)` pairs over a routine's code.
///
/// Stops after the first decode error, which is yielded as the last item.
pub fn decode_all(code: &[u8]) -> impl Iterator<Item = (usize, Result<Instruction, DecodeError>)> + '_ {
    let mut offset = 0;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed || offset >= code.len() {
            return None;
        }
        let at = offset;
        let decoded = Instruction::decode(code, at);
        match &decoded {
            Ok(instr) => offset += instr.size(),
            Err(_) => failed = true,
        }
        Some((at, decoded))
    })
}
