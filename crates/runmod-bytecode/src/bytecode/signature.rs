//! Routine signature formatting.

use std::fmt::Write as _;

use runmod_core::Colors;

use super::descriptor::RoutineDescriptor;

/// Format a routine signature on one line:
/// `public static Boolean Ns.Type.Name(String[] args);`
pub fn format_signature(routine: &RoutineDescriptor, colors: Colors) -> String {
    let c = &colors;
    let mut out = String::new();

    write!(out, "{}{}", c.blue, routine.visibility.keyword()).unwrap();
    if routine.is_static {
        out.push_str(" static");
    }
    write!(
        out,
        "{} {}{}{} {}{}.{}{}{}{}(",
        c.reset,
        c.cyan,
        routine.return_type,
        c.reset,
        c.dim,
        routine.declaring_type(),
        c.reset,
        c.bold,
        routine.name,
        c.reset,
    )
    .unwrap();

    for (i, param) in routine.params.iter().enumerate() {
        if i > 0 {
            write!(out, "{}, {}", c.dim, c.reset).unwrap();
        }
        write!(
            out,
            "{}{}{} {}{}{}",
            c.cyan, param.ty, c.reset, c.bold, param.name, c.reset
        )
        .unwrap();
    }

    out.push_str(");");
    out
}
