//! Interpreter for RMOD modules.
//!
//! This crate provides the stack machine that invokes a routine of a loaded
//! [`Module`](runmod_bytecode::Module), the values it passes around, the
//! faults it raises, and the lookup of dependency modules at call time.

pub mod engine;

pub use engine::{
    CalleeFault, Console, Dependency, DirectoryResolver, Fault, HostFault, HostFaultKind, Limits,
    ModuleResolver, ResolveError, Value, Vm, VmBuilder,
};

#[cfg(test)]
pub(crate) mod test_utils;
