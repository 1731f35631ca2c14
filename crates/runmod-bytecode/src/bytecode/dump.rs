//! Human-readable module dump for debugging.

use std::fmt::Write as _;

use runmod_core::Colors;

use super::ids::RoutineId;
use super::instructions::{Instruction, decode_all};
use super::module::Module;

/// Generate a human-readable dump of a module.
pub fn dump(module: &Module, colors: Colors) -> String {
    let mut out = String::new();
    let ctx = DumpContext::new(module, colors);

    dump_module(&mut out, module, &ctx);
    dump_strings(&mut out, module, &ctx);
    dump_types(&mut out, module, &ctx);
    dump_routines(&mut out, module, &ctx);
    dump_imports(&mut out, module, &ctx);
    dump_code(&mut out, module, &ctx);

    out
}

/// Number of decimal digits needed to print indices below `count`.
fn width_for_count(count: usize) -> usize {
    count.saturating_sub(1).max(1).to_string().len()
}

struct DumpContext {
    /// Qualified routine names, by routine id.
    routine_names: Vec<String>,
    str_width: usize,
    type_width: usize,
    routine_width: usize,
    import_width: usize,
    colors: Colors,
}

impl DumpContext {
    fn new(module: &Module, colors: Colors) -> Self {
        Self {
            routine_names: module.routines().iter().map(|r| r.qualified_name()).collect(),
            str_width: width_for_count(module.strings().len()),
            type_width: width_for_count(module.types().len()),
            routine_width: width_for_count(module.routines().len()),
            import_width: width_for_count(module.imports().len()),
            colors,
        }
    }

    fn routine_name(&self, id: RoutineId) -> &str {
        self.routine_names
            .get(id.index())
            .map(String::as_str)
            .unwrap_or("<invalid>")
    }
}

fn dump_module(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    writeln!(out, "{}[module]{}", c.blue, c.reset).unwrap();
    writeln!(out, "name = {}", module.name()).unwrap();
    match module.entry() {
        Some(id) => writeln!(
            out,
            "entry = R{:0w$}  {}; {}{}",
            id.0,
            c.dim,
            ctx.routine_name(id),
            c.reset,
            w = ctx.routine_width
        )
        .unwrap(),
        None => writeln!(out, "entry = none").unwrap(),
    }
    out.push('\n');
}

fn dump_strings(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    let strings = module.strings();
    let w = ctx.str_width;

    writeln!(out, "{}[strings]{}", c.blue, c.reset).unwrap();
    for i in 0..strings.len() {
        let s = strings.get_by_index(i);
        writeln!(out, "S{i:0w$} {}{s:?}{}", c.green, c.reset).unwrap();
    }
    out.push('\n');
}

fn dump_types(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    if module.types().is_empty() {
        return;
    }

    writeln!(out, "{}[types]{}", c.blue, c.reset).unwrap();
    for (t, def) in module.types().iter().zip(module.type_defs()) {
        writeln!(
            out,
            "T{:0tw$} = (R{:0rw$}, {})  {}; {}{}",
            t.id.0,
            def.routine_start,
            def.routine_count,
            c.dim,
            t.full_name(),
            c.reset,
            tw = ctx.type_width,
            rw = ctx.routine_width,
        )
        .unwrap();
    }
    out.push('\n');
}

fn dump_routines(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    if module.routines().is_empty() {
        return;
    }

    writeln!(out, "{}[routines]{}", c.blue, c.reset).unwrap();
    for (r, def) in module.routines().iter().zip(module.routine_defs()) {
        let mut line = format!("R{:0w$} =", r.id.0, w = ctx.routine_width);
        write!(line, " {}", r.visibility.keyword()).unwrap();
        if r.is_static {
            line.push_str(" static");
        }
        write!(line, " {} {}(", r.return_type, r.name).unwrap();
        for (i, p) in r.params.iter().enumerate() {
            if i > 0 {
                line.push_str(", ");
            }
            write!(line, "{} {}", p.ty, p.name).unwrap();
        }
        line.push(')');
        if def.locals > 0 {
            write!(line, "  {}locals={}{}", c.dim, def.locals, c.reset).unwrap();
        }
        writeln!(out, "{line}").unwrap();
    }
    out.push('\n');
}

fn dump_imports(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    if module.imports().is_empty() {
        return;
    }

    let strings = module.strings();
    writeln!(out, "{}[imports]{}", c.blue, c.reset).unwrap();
    for (i, imp) in module.imports().iter().enumerate() {
        writeln!(
            out,
            "I{i:0w$} = {} {}",
            strings.get(imp.module),
            strings.get(imp.routine),
            w = ctx.import_width
        )
        .unwrap();
    }
    out.push('\n');
}

fn dump_code(out: &mut String, module: &Module, ctx: &DumpContext) {
    let c = &ctx.colors;
    if module.routines().is_empty() {
        return;
    }

    writeln!(out, "{}[code]{}", c.blue, c.reset).unwrap();
    for (i, r) in module.routines().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        writeln!(out, "{}{}{}:", c.bold, r.qualified_name(), c.reset).unwrap();
        for (offset, decoded) in decode_all(module.code(r.id)) {
            match decoded {
                Ok(instr) => {
                    let text = format_instruction(module, ctx, &instr);
                    writeln!(out, "  {}{offset:04x}{}  {text}", c.dim, c.reset).unwrap();
                }
                Err(e) => {
                    writeln!(out, "  {}{offset:04x}{}  {}<{e}>{}", c.dim, c.reset, c.red, c.reset)
                        .unwrap();
                }
            }
        }
    }
}

fn format_instruction(module: &Module, ctx: &DumpContext, instr: &Instruction) -> String {
    let strings = module.strings();
    let mnemonic = instr.opcode().mnemonic();
    match *instr {
        Instruction::PushNull => format!("{mnemonic} null"),
        Instruction::PushBool(b) => format!("{mnemonic} {b}"),
        Instruction::PushInt(v) => format!("{mnemonic} {v}"),
        Instruction::PushStr(id) | Instruction::Throw(id) => match strings.try_get(id) {
            Some(text) => format!("{mnemonic} {text:?}"),
            None => format!("{mnemonic} <invalid string S{}>", id.get()),
        },
        Instruction::LoadArg(i) | Instruction::LoadLocal(i) | Instruction::StoreLocal(i) => {
            format!("{mnemonic} {i}")
        }
        Instruction::Jump(t) | Instruction::JumpIfFalse(t) | Instruction::JumpIfTrue(t) => {
            format!("{mnemonic} {t:04x}")
        }
        Instruction::Call(id) => format!("{mnemonic} {}", ctx.routine_name(id)),
        Instruction::CallImport(id) => match module.imports().get(id.index()) {
            Some(imp) => format!(
                "{mnemonic} {} {}",
                strings.get(imp.module),
                strings.get(imp.routine)
            ),
            None => format!("{mnemonic} <invalid import {}>", id.0),
        },
        _ => mnemonic.to_owned(),
    }
}
