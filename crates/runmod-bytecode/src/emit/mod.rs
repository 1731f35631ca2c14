//! Module emission from an in-memory IR.
//!
//! [`ModuleBuilder`] collects types and routines with symbolic operands
//! (labels, qualified call targets, literal strings) and lays them out into
//! the binary format:
//! - String table construction and interning
//! - Routine ordering by declaring type
//! - Label, call and import resolution
//! - Section assembly and header generation

mod builder;
mod error;
mod ir;
mod string_table;


pub use builder::{CodeBuilder, ModuleBuilder, RoutineBuilder};
pub use error::EmitError;
pub use ir::{InstructionIR, Label, RoutineRef, TypeRef};
pub use string_table::StringTableBuilder;
