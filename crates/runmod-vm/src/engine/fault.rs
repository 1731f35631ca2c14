//! Faults raised while invoking a routine.
//!
//! A [`CalleeFault`] comes from the invoked code itself (`throw`, division
//! by zero, a bad index). A [`HostFault`] comes from the machinery around it:
//! argument marshalling, malformed code, dependency lookup, console I/O.

/// Outcome of a failed invocation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Callee(#[from] CalleeFault),
    #[error(transparent)]
    Host(#[from] HostFault),
}

/// Fault raised by the invoked routine's own logic.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{type_name}: {description}")]
pub struct CalleeFault {
    pub type_name: String,
    /// Message followed by one `   at Namespace.Type.Routine` line per frame,
    /// innermost first.
    pub description: String,
}

impl CalleeFault {
    pub const DIVIDE_BY_ZERO: &'static str = "DivideByZero";
    pub const INDEX_OUT_OF_RANGE: &'static str = "IndexOutOfRange";
    pub const OVERFLOW: &'static str = "ArithmeticOverflow";
    pub const NULL_REFERENCE: &'static str = "NullReference";
    pub const ARGUMENT_OUT_OF_RANGE: &'static str = "ArgumentOutOfRange";
}

/// Fault raised by the invocation mechanism.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {description}")]
pub struct HostFault {
    pub kind: HostFaultKind,
    pub description: String,
}

impl HostFault {
    pub fn new(kind: HostFaultKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostFaultKind {
    #[error("parameter count mismatch")]
    ParameterCount,
    #[error("argument type mismatch")]
    ArgumentType,
    #[error("instance required")]
    InstanceRequired,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("invalid operand")]
    InvalidOperand,
    #[error("invalid jump")]
    InvalidJump,
    #[error("invalid instruction")]
    Decode,
    #[error("unresolved module")]
    UnresolvedModule,
    #[error("unresolved routine")]
    UnresolvedRoutine,
    #[error("call depth exceeded")]
    CallDepthExceeded,
    #[error("module load failed")]
    Load,
    #[error("console I/O failed")]
    Io,
}

impl Fault {
    pub fn host(kind: HostFaultKind, description: impl Into<String>) -> Self {
        Self::Host(HostFault::new(kind, description))
    }

    pub fn is_callee(&self) -> bool {
        matches!(self, Self::Callee(_))
    }

    /// Kind of a host fault, `None` for callee faults.
    pub fn host_kind(&self) -> Option<HostFaultKind> {
        match self {
            Self::Host(h) => Some(h.kind),
            Self::Callee(_) => None,
        }
    }
}
