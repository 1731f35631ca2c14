use crate::bytecode::Opcode;

/// Error during module emission.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("too many strings: {0} (max 65535)")]
    TooManyStrings(usize),
    #[error("too many types: {0} (max 65535)")]
    TooManyTypes(usize),
    #[error("too many routines: {0} (max 65534)")]
    TooManyRoutines(usize),
    #[error("too many parameters: {0} (max 65535)")]
    TooManyParams(usize),
    #[error("routine `{0}` has more than 255 parameters")]
    TooManyRoutineParams(String),
    #[error("too many imports: {0} (max 65535)")]
    TooManyImports(usize),
    #[error("code section too large: {0} bytes")]
    CodeTooLarge(usize),
    #[error("duplicate type `{0}`")]
    DuplicateType(String),
    #[error("type handle {0} does not belong to this builder")]
    UnknownType(usize),
    #[error("duplicate routine `{0}`")]
    DuplicateRoutine(String),
    #[error("parameter `{param}` of `{routine}` cannot be void")]
    VoidParameter { routine: String, param: String },
    #[error("label {label} used in `{routine}` is never placed")]
    UnknownLabel { routine: String, label: u32 },
    #[error("label {label} placed twice in `{routine}`")]
    DuplicateLabel { routine: String, label: u32 },
    #[error("call to unknown routine `{target}` in `{routine}`")]
    UnresolvedRoutine { routine: String, target: String },
    #[error("`{}` requires an operand", .0.mnemonic())]
    OperandRequired(Opcode),
}
