//! The `RMOD` binary module format.
//!
//! Layout: a 64-byte [`Header`] followed by the string blob, string table,
//! type, routine, param and import tables, and finally the code section.

mod constants;
mod descriptor;
mod dump;
mod header;
mod ids;
mod instructions;
mod module;
mod sections;
mod signature;
mod value_type;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod module_tests;

pub use constants::{
    HEADER_SIZE, IMPORT_DEF_SIZE, MAGIC, NO_ENTRY, PARAM_DEF_SIZE, ROUTINE_DEF_SIZE,
    TYPE_DEF_SIZE, VERSION,
};
pub use descriptor::{ParamDescriptor, RoutineDescriptor, TypeDescriptor, Visibility};
pub use dump::dump;
pub use header::Header;
pub use ids::{ImportId, RoutineId, StringId, TypeDefId};
pub use instructions::{DecodeError, Instruction, Opcode, decode_all};
pub use module::{ByteStorage, Module, ModuleError, StringsView};
pub use sections::{ImportDef, ParamDef, RoutineDef, TypeDef, routine_flags};
pub use signature::format_signature;
pub use value_type::ValueType;
