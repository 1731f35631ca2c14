//! Argument marshalling and the call into the VM.

use std::path::Path;

use runmod_bytecode::{Module, RoutineDescriptor, ValueType};
use runmod_vm::{Console, DirectoryResolver, Fault, Value, Vm};

/// A resolved routine with the arguments it will be called with.
#[derive(Debug)]
pub struct InvocationRequest<'m> {
    pub routine: &'m RoutineDescriptor,
    pub args: Vec<Value>,
    /// Parameter that received the forwarded arguments, if any.
    pub args_param: Option<&'m str>,
}

/// Forwarded arguments go in as one `String[]` when that is the first
/// parameter. Any other signature is called with no arguments.
pub fn marshal_arguments<'m>(
    routine: &'m RoutineDescriptor,
    forwarded: &[String],
) -> InvocationRequest<'m> {
    match routine.first_param() {
        Some(param) if param.ty == ValueType::StringArray => InvocationRequest {
            routine,
            args: vec![Value::StrArray(forwarded.to_vec())],
            args_param: Some(&param.name),
        },
        _ => InvocationRequest {
            routine,
            args: Vec::new(),
            args_param: None,
        },
    }
}

/// Run the request on a fresh VM. Dependencies are looked up in `base_dir`.
pub fn invoke<C: Console>(
    module: &Module,
    request: InvocationRequest<'_>,
    base_dir: &Path,
    console: &mut C,
) -> Result<Value, Fault> {
    let resolver = DirectoryResolver::new(base_dir);
    let mut vm = Vm::builder(&resolver).build();
    vm.invoke(module, request.routine.id, request.args, console)
}
