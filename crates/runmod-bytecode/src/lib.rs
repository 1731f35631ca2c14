//! Module format and runtime-facing types for runmod.
//!
//! This crate contains:
//! - The `RMOD` binary format (header, sections, instructions)
//! - Module loading and validation, with a descriptor table built at load time
//! - Emission of modules from an in-memory IR ([`ModuleBuilder`])
//! - Human-readable signatures and dumps

pub mod bytecode;
pub mod emit;

pub use bytecode::{
    ByteStorage, DecodeError, HEADER_SIZE, Header, ImportDef, ImportId, Instruction, MAGIC,
    Module, ModuleError, NO_ENTRY, Opcode, ParamDef, ParamDescriptor, RoutineDef,
    RoutineDescriptor, RoutineId, StringId, StringsView, TypeDef, TypeDescriptor, TypeDefId,
    VERSION, ValueType, Visibility, decode_all, dump, format_signature, routine_flags,
};
pub use emit::{
    CodeBuilder, EmitError, InstructionIR, Label, ModuleBuilder, RoutineBuilder, RoutineRef,
    StringTableBuilder, TypeRef,
};

#[cfg(test)]
pub(crate) mod test_utils;
