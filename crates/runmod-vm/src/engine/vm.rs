//! Stack machine for invoking module routines.

use std::time::Duration;

use runmod_bytecode::{
    ImportId, Instruction, Module, Opcode, RoutineDescriptor, RoutineId, StringId, ValueType,
};

use super::console::Console;
use super::fault::{CalleeFault, Fault, HostFaultKind};
use super::frame::{CallStack, Frame};
use super::modules::{ModuleSet, Origin};
use super::resolver::{ModuleResolver, ResolveError};
use super::value::Value;

/// Runtime limits for an invocation. Only call depth is bounded.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Maximum call depth (default: 1,024).
    pub(crate) recursion_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            recursion_limit: 1024,
        }
    }
}

impl Limits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the recursion limit.
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }
}

/// Builder for [`Vm`] instances.
pub struct VmBuilder<'r> {
    resolver: &'r dyn ModuleResolver,
    limits: Limits,
}

impl<'r> VmBuilder<'r> {
    pub fn new(resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            resolver,
            limits: Limits::default(),
        }
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.limits = self.limits.recursion_limit(limit);
        self
    }

    pub fn build(self) -> Vm<'r> {
        Vm {
            resolver: self.resolver,
            limits: self.limits,
            modules: ModuleSet::new(),
            frames: CallStack::new(),
            stack: Vec::new(),
        }
    }
}

/// Virtual machine state.
///
/// Dependency modules stay loaded across invocations of the same VM.
pub struct Vm<'r> {
    resolver: &'r dyn ModuleResolver,
    limits: Limits,
    modules: ModuleSet,
    frames: CallStack,
    stack: Vec<Value>,
}

impl<'r> Vm<'r> {
    pub fn builder(resolver: &'r dyn ModuleResolver) -> VmBuilder<'r> {
        VmBuilder::new(resolver)
    }

    /// Invoke `routine` of `module` with `args`, one value per declared
    /// parameter.
    pub fn invoke<C: Console>(
        &mut self,
        module: &Module,
        routine: RoutineId,
        args: Vec<Value>,
        console: &mut C,
    ) -> Result<Value, Fault> {
        let Some(desc) = module.routines().get(routine.index()) else {
            return Err(Fault::host(
                HostFaultKind::UnresolvedRoutine,
                format!(
                    "module '{}' declares no routine R{}",
                    module.name(),
                    routine.0
                ),
            ));
        };
        if !desc.is_static {
            return Err(Fault::host(
                HostFaultKind::InstanceRequired,
                format!(
                    "routine '{}' is not static and needs an instance",
                    desc.qualified_name()
                ),
            ));
        }
        check_args(desc, &args)?;
        tracing::debug!(routine = %desc.qualified_name(), args = args.len(), "invoking");

        self.frames.clear();
        self.stack.clear();
        let result = self
            .enter(module, Origin::Root, routine, args)
            .and_then(|()| self.run(module, console));
        self.frames.clear();
        self.stack.clear();
        result
    }

    fn run<C: Console>(&mut self, root: &Module, console: &mut C) -> Result<Value, Fault> {
        loop {
            let Some(frame) = self.frames.top() else {
                return Ok(Value::Null);
            };
            let (origin, routine, at) = (frame.origin, frame.routine, frame.ip);
            let code = self.modules.get(root, origin).code(routine);
            let instr = Instruction::decode(code, at).map_err(|e| {
                Fault::host(
                    HostFaultKind::Decode,
                    format!("{e} in routine '{}'", self.routine_name(root, origin, routine)),
                )
            })?;
            tracing::trace!(ip = at, ?instr, "step");
            if let Some(frame) = self.frames.top_mut() {
                frame.ip = at + instr.size();
            }
            if let Some(value) = self.exec(root, origin, instr, console)? {
                return Ok(value);
            }
        }
    }

    /// Execute one instruction. Returns the result once the outermost frame
    /// returns.
    fn exec<C: Console>(
        &mut self,
        root: &Module,
        origin: Origin,
        instr: Instruction,
        console: &mut C,
    ) -> Result<Option<Value>, Fault> {
        use Instruction as I;
        let op = instr.opcode();
        match instr {
            I::Nop => {}
            I::PushNull => self.stack.push(Value::Null),
            I::PushBool(b) => self.stack.push(Value::Bool(b)),
            I::PushInt(i) => self.stack.push(Value::Int(i)),
            I::PushStr(id) => {
                let s = self.string(root, origin, id)?.to_owned();
                self.stack.push(Value::Str(s));
            }
            I::LoadArg(slot) => {
                let v = self.slot(root, Slots::Args, slot)?.clone();
                self.stack.push(v);
            }
            I::LoadLocal(slot) => {
                let v = self.slot(root, Slots::Locals, slot)?.clone();
                self.stack.push(v);
            }
            I::StoreLocal(slot) => {
                let v = self.pop()?;
                self.slot(root, Slots::Locals, slot)?;
                if let Some(local) = self
                    .frames
                    .top_mut()
                    .and_then(|f| f.locals.get_mut(slot as usize))
                {
                    *local = v;
                }
            }
            I::Pop => {
                self.pop()?;
            }
            I::Dup => {
                let v = self.pop()?;
                self.stack.push(v.clone());
                self.stack.push(v);
            }
            I::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                let v = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => {
                        Value::Int(self.checked(root, a.checked_add(b))?)
                    }
                    (Value::Str(mut a), Value::Str(b)) => {
                        a.push_str(&b);
                        Value::Str(a)
                    }
                    (a, b) => return Err(mismatch2(op, "Int64 or String", &a, &b)),
                };
                self.stack.push(v);
            }
            I::Sub | I::Mul | I::Div | I::Rem => {
                let b = self.pop_int(op)?;
                let a = self.pop_int(op)?;
                if b == 0 && matches!(instr, I::Div | I::Rem) {
                    return Err(self.callee_fault(
                        root,
                        CalleeFault::DIVIDE_BY_ZERO,
                        "Attempted to divide by zero.",
                    ));
                }
                let v = match instr {
                    I::Sub => a.checked_sub(b),
                    I::Mul => a.checked_mul(b),
                    I::Div => a.checked_div(b),
                    _ => a.checked_rem(b),
                };
                let v = self.checked(root, v)?;
                self.stack.push(Value::Int(v));
            }
            I::Eq | I::Ne => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(Value::Bool((a == b) == matches!(instr, I::Eq)));
            }
            I::Lt | I::Le | I::Gt | I::Ge => {
                let b = self.pop()?;
                let a = self.pop()?;
                let ord = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => x.cmp(y),
                    (Value::Str(x), Value::Str(y)) => x.cmp(y),
                    _ => return Err(mismatch2(op, "Int64 or String", &a, &b)),
                };
                let v = match instr {
                    I::Lt => ord.is_lt(),
                    I::Le => ord.is_le(),
                    I::Gt => ord.is_gt(),
                    _ => ord.is_ge(),
                };
                self.stack.push(Value::Bool(v));
            }
            I::Not => {
                let b = self.pop_bool(op)?;
                self.stack.push(Value::Bool(!b));
            }
            I::Len => {
                let v = match self.pop()? {
                    Value::Str(s) => s.chars().count(),
                    Value::StrArray(items) => items.len(),
                    Value::Null => return Err(self.null_reference(root)),
                    other => return Err(mismatch(op, "String or String[]", &other)),
                };
                self.stack.push(Value::Int(v as i64));
            }
            I::Index => {
                let idx = self.pop_int(op)?;
                let target = self.pop()?;
                let at = usize::try_from(idx).ok();
                let item = match &target {
                    Value::StrArray(items) => at.and_then(|i| items.get(i)).cloned(),
                    Value::Str(s) => at.and_then(|i| s.chars().nth(i)).map(String::from),
                    Value::Null => return Err(self.null_reference(root)),
                    other => return Err(mismatch(op, "String or String[]", other)),
                };
                let Some(item) = item else {
                    return Err(self.callee_fault(
                        root,
                        CalleeFault::INDEX_OUT_OF_RANGE,
                        "Index was outside the bounds of the array.",
                    ));
                };
                self.stack.push(Value::Str(item));
            }
            I::ToStr => {
                let v = self.pop()?;
                self.stack.push(Value::Str(v.to_string()));
            }
            I::Jump(target) => self.jump(root, target)?,
            I::JumpIfFalse(target) => {
                if !self.pop_bool(op)? {
                    self.jump(root, target)?;
                }
            }
            I::JumpIfTrue(target) => {
                if self.pop_bool(op)? {
                    self.jump(root, target)?;
                }
            }
            I::Call(id) => {
                let module = self.modules.get(root, origin);
                let Some(desc) = module.routines().get(id.index()).cloned() else {
                    return Err(Fault::host(
                        HostFaultKind::InvalidOperand,
                        format!("call to undeclared routine R{} in module '{}'", id.0, module.name()),
                    ));
                };
                self.call(root, origin, &desc)?;
            }
            I::CallImport(id) => {
                let (target, desc) = self.import(root, origin, id, console)?;
                self.call(root, target, &desc)?;
            }
            I::Print => {
                let v = self.pop()?;
                console.print(&v.to_string()).map_err(io_fault)?;
            }
            I::Write => {
                let v = self.pop()?;
                console.write(&v.to_string()).map_err(io_fault)?;
            }
            I::Sleep => {
                let ms = self.pop_int(op)?;
                let Ok(ms) = u64::try_from(ms) else {
                    return Err(self.callee_fault(
                        root,
                        CalleeFault::ARGUMENT_OUT_OF_RANGE,
                        &format!("Sleep duration must be non-negative, got {ms}."),
                    ));
                };
                console.sleep(Duration::from_millis(ms));
            }
            I::Throw(id) => {
                let type_name = self.string(root, origin, id)?.to_owned();
                let message = match self.pop()? {
                    Value::Str(s) if !s.is_empty() => s,
                    Value::Str(_) | Value::Null => format!("Fault of type '{type_name}' was thrown."),
                    other => return Err(mismatch(op, "String", &other)),
                };
                return Err(self.callee_fault(root, &type_name, &message));
            }
            I::Ret => {
                let v = self.pop()?;
                return self.leave(root, Some(v));
            }
            I::RetVoid => return self.leave(root, None),
        }
        Ok(None)
    }

    fn enter(
        &mut self,
        root: &Module,
        origin: Origin,
        routine: RoutineId,
        args: Vec<Value>,
    ) -> Result<(), Fault> {
        if self.frames.depth() >= self.limits.recursion_limit as usize {
            return Err(Fault::host(
                HostFaultKind::CallDepthExceeded,
                format!(
                    "call depth limit of {} exceeded calling '{}'",
                    self.limits.recursion_limit,
                    self.routine_name(root, origin, routine)
                ),
            ));
        }
        let def = self.modules.get(root, origin).routine_def(routine);
        let frame = Frame {
            origin,
            routine,
            ip: 0,
            args,
            locals: vec![Value::Null; def.locals as usize],
            stack_base: self.stack.len(),
            return_type: def.return_type,
        };
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the callee's arguments and push its frame.
    fn call(
        &mut self,
        root: &Module,
        origin: Origin,
        desc: &RoutineDescriptor,
    ) -> Result<(), Fault> {
        let args = self.pop_args(desc.params.len())?;
        check_args(desc, &args)?;
        self.enter(root, origin, desc.id, args)
    }

    /// Resolve an import of the module at `origin`, loading its module on
    /// first use.
    fn import<C: Console>(
        &mut self,
        root: &Module,
        origin: Origin,
        id: ImportId,
        console: &mut C,
    ) -> Result<(Origin, RoutineDescriptor), Fault> {
        let (module_name, routine_name) = {
            let module = self.modules.get(root, origin);
            let Some(import) = module.imports().get(id.index()) else {
                return Err(Fault::host(
                    HostFaultKind::InvalidOperand,
                    format!("undeclared import I{} in module '{}'", id.0, module.name()),
                ));
            };
            (
                self.string(root, origin, import.module)?.to_owned(),
                self.string(root, origin, import.routine)?.to_owned(),
            )
        };

        let target = match self.modules.lookup(&module_name) {
            Some(target) => target,
            None => {
                let dep = self.resolver.resolve(&module_name).map_err(|e| {
                    let kind = match e {
                        ResolveError::NotFound { .. } => HostFaultKind::UnresolvedModule,
                        ResolveError::Rejected { .. } => HostFaultKind::Load,
                    };
                    Fault::host(kind, e.to_string())
                })?;
                console
                    .module_loaded(&dep.module, &dep.path)
                    .map_err(io_fault)?;
                tracing::debug!(
                    module = %module_name,
                    path = %dep.path.display(),
                    loaded = self.modules.len() + 1,
                    "dependency loaded"
                );
                self.modules.insert(&module_name, dep.module)
            }
        };

        let module = self.modules.get(root, target);
        match module.find_routine(&routine_name) {
            Some(desc) => Ok((target, desc.clone())),
            None => Err(Fault::host(
                HostFaultKind::UnresolvedRoutine,
                format!("routine '{routine_name}' not found in module '{module_name}'"),
            )),
        }
    }

    /// Return from the current frame. Yields the result when it was the
    /// outermost one.
    fn leave(&mut self, root: &Module, value: Option<Value>) -> Result<Option<Value>, Fault> {
        let Some(frame) = self.frames.top() else {
            return Ok(Some(value.unwrap_or_default()));
        };
        let expected = frame.return_type;
        let problem = match (&value, expected) {
            (None, ValueType::Void) => None,
            (Some(_), ValueType::Void) => Some("returned a value from a Void routine".to_owned()),
            (None, ty) => Some(format!("returned no value, expected {ty}")),
            (Some(v), ty) if !v.fits(ty) => Some(format!("returned {}, expected {ty}", v.type_name())),
            _ => None,
        };
        if let Some(problem) = problem {
            let name = self.routine_name(root, frame.origin, frame.routine);
            return Err(Fault::host(
                HostFaultKind::TypeMismatch,
                format!("routine '{name}' {problem}"),
            ));
        }

        if let Some(frame) = self.frames.pop() {
            self.stack.truncate(frame.stack_base);
        }
        if self.frames.is_empty() {
            return Ok(Some(value.unwrap_or_default()));
        }
        if let Some(v) = value {
            self.stack.push(v);
        }
        Ok(None)
    }

    fn jump(&mut self, root: &Module, target: u32) -> Result<(), Fault> {
        let Some(frame) = self.frames.top() else {
            return Ok(());
        };
        let (origin, routine) = (frame.origin, frame.routine);
        let len = self.modules.get(root, origin).code(routine).len();
        if target as usize >= len {
            return Err(Fault::host(
                HostFaultKind::InvalidJump,
                format!(
                    "jump target {target:04x} is outside routine '{}' ({len} bytes)",
                    self.routine_name(root, origin, routine)
                ),
            ));
        }
        if let Some(frame) = self.frames.top_mut() {
            frame.ip = target as usize;
        }
        Ok(())
    }

    fn string<'a>(&'a self, root: &'a Module, origin: Origin, id: StringId) -> Result<&'a str, Fault> {
        let module = self.modules.get(root, origin);
        module.strings().try_get(id).ok_or_else(|| {
            Fault::host(
                HostFaultKind::InvalidOperand,
                format!("string S{} is not declared by module '{}'", id.get(), module.name()),
            )
        })
    }

    fn slot(&self, root: &Module, kind: Slots, slot: u8) -> Result<&Value, Fault> {
        let Some(frame) = self.frames.top() else {
            return Err(Fault::host(HostFaultKind::StackUnderflow, "no active frame"));
        };
        let (values, what) = match kind {
            Slots::Args => (&frame.args, "argument"),
            Slots::Locals => (&frame.locals, "local"),
        };
        values.get(slot as usize).ok_or_else(|| {
            Fault::host(
                HostFaultKind::InvalidOperand,
                format!(
                    "{what} slot {slot} is out of range in routine '{}'",
                    self.routine_name(root, frame.origin, frame.routine)
                ),
            )
        })
    }

    fn stack_base(&self) -> usize {
        self.frames.top().map_or(0, |f| f.stack_base)
    }

    fn pop(&mut self) -> Result<Value, Fault> {
        if self.stack.len() > self.stack_base()
            && let Some(v) = self.stack.pop()
        {
            return Ok(v);
        }
        Err(Fault::host(HostFaultKind::StackUnderflow, "operand stack is empty"))
    }

    fn pop_args(&mut self, count: usize) -> Result<Vec<Value>, Fault> {
        let available = self.stack.len() - self.stack_base();
        if available < count {
            return Err(Fault::host(
                HostFaultKind::StackUnderflow,
                format!("call needs {count} argument(s), operand stack holds {available}"),
            ));
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn pop_int(&mut self, op: Opcode) -> Result<i64, Fault> {
        match self.pop()? {
            Value::Int(i) => Ok(i),
            other => Err(mismatch(op, "Int64", &other)),
        }
    }

    fn pop_bool(&mut self, op: Opcode) -> Result<bool, Fault> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(op, "Boolean", &other)),
        }
    }

    fn checked(&self, root: &Module, v: Option<i64>) -> Result<i64, Fault> {
        v.ok_or_else(|| {
            self.callee_fault(
                root,
                CalleeFault::OVERFLOW,
                "Arithmetic operation resulted in an overflow.",
            )
        })
    }

    fn null_reference(&self, root: &Module) -> Fault {
        self.callee_fault(
            root,
            CalleeFault::NULL_REFERENCE,
            "Object reference not set to an instance of an object.",
        )
    }

    /// Fault raised by the running code, with a trace of the active frames.
    fn callee_fault(&self, root: &Module, type_name: &str, message: &str) -> Fault {
        let mut description = message.to_owned();
        for frame in self.frames.innermost_first() {
            description.push_str("\n   at ");
            description.push_str(&self.routine_name(root, frame.origin, frame.routine));
        }
        Fault::Callee(CalleeFault {
            type_name: type_name.to_owned(),
            description,
        })
    }

    fn routine_name(&self, root: &Module, origin: Origin, routine: RoutineId) -> String {
        self.modules
            .get(root, origin)
            .routine(routine)
            .qualified_name()
    }
}

#[derive(Clone, Copy)]
enum Slots {
    Args,
    Locals,
}

/// Check marshalled arguments against the declared parameters.
fn check_args(desc: &RoutineDescriptor, args: &[Value]) -> Result<(), Fault> {
    if args.len() != desc.params.len() {
        return Err(Fault::host(
            HostFaultKind::ParameterCount,
            format!(
                "routine '{}' takes {} parameter(s) but {} argument(s) were supplied",
                desc.qualified_name(),
                desc.params.len(),
                args.len()
            ),
        ));
    }
    for (i, (param, arg)) in desc.params.iter().zip(args).enumerate() {
        if !arg.fits(param.ty) {
            return Err(Fault::host(
                HostFaultKind::ArgumentType,
                format!(
                    "argument {i} ('{}') of routine '{}' expects {}, got {}",
                    param.name,
                    desc.qualified_name(),
                    param.ty,
                    arg.type_name()
                ),
            ));
        }
    }
    Ok(())
}

fn mismatch(op: Opcode, expected: &str, got: &Value) -> Fault {
    Fault::host(
        HostFaultKind::TypeMismatch,
        format!("`{}` expects {expected}, got {}", op.mnemonic(), got.type_name()),
    )
}

fn mismatch2(op: Opcode, expected: &str, a: &Value, b: &Value) -> Fault {
    Fault::host(
        HostFaultKind::TypeMismatch,
        format!(
            "`{}` expects {expected} operands, got {} and {}",
            op.mnemonic(),
            a.type_name(),
            b.type_name()
        ),
    )
}

fn io_fault(e: std::io::Error) -> Fault {
    Fault::host(HostFaultKind::Io, e.to_string())
}
