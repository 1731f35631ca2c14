//! Runtime engine for invoking module routines.
//!
//! The VM runs one invocation at a time against a root module. Dependency
//! modules named by imports are loaded through a [`ModuleResolver`] the
//! first time a `callext` reaches them.

mod console;
mod fault;
mod frame;
mod modules;
mod resolver;
mod value;
mod vm;

#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod vm_tests;

pub use console::Console;
pub use fault::{CalleeFault, Fault, HostFault, HostFaultKind};
pub use resolver::{Dependency, DirectoryResolver, ModuleResolver, ResolveError};
pub use value::Value;
pub use vm::{Limits, Vm, VmBuilder};
