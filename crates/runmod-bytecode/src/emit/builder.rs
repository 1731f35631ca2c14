//! Module builder and binary layout.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use runmod_core::names;

use crate::bytecode::{
    HEADER_SIZE, Header, ImportDef, ImportId, Instruction, NO_ENTRY, Opcode, ParamDef,
    RoutineDef, RoutineId, TypeDef, ValueType, Visibility, routine_flags,
};

use super::EmitError;
use super::ir::{InstructionIR, Label, RoutineRef, TypeRef};
use super::string_table::StringTableBuilder;

/// Instruction sequence of one routine, with labels.
#[derive(Clone, Debug, Default)]
pub struct CodeBuilder {
    instrs: Vec<InstructionIR>,
    next_label: u32,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh label. Place it with [`mark`](Self::mark).
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    pub fn mark(&mut self, label: Label) -> &mut Self {
        self.push(InstructionIR::Mark(label))
    }

    /// Append an operand-less instruction.
    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.push(InstructionIR::Op(op))
    }

    pub fn push(&mut self, instr: InstructionIR) -> &mut Self {
        if let InstructionIR::Mark(Label(n)) = instr {
            self.next_label = self.next_label.max(n + 1);
        }
        self.instrs.push(instr);
        self
    }

    pub fn instructions(&self) -> &[InstructionIR] {
        &self.instrs
    }

    /// Code size after layout.
    pub fn size(&self) -> usize {
        self.instrs.iter().map(InstructionIR::size).sum()
    }
}

/// A routine under construction. Defaults to `public static void`.
#[derive(Clone, Debug)]
pub struct RoutineBuilder {
    name: String,
    visibility: Visibility,
    is_static: bool,
    return_type: ValueType,
    params: Vec<(String, ValueType)>,
    locals: u8,
    code: CodeBuilder,
}

impl RoutineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: true,
            return_type: ValueType::Void,
            params: Vec::new(),
            locals: 0,
            code: CodeBuilder::new(),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn returns(mut self, ty: ValueType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    pub fn locals(mut self, locals: u8) -> Self {
        self.locals = locals;
        self
    }

    pub fn code(mut self, code: CodeBuilder) -> Self {
        self.code = code;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.visibility == Visibility::Public {
            flags |= routine_flags::PUBLIC;
        }
        if self.is_static {
            flags |= routine_flags::STATIC;
        }
        flags
    }
}

#[derive(Debug)]
struct TypeEntry {
    namespace: String,
    name: String,
    routines: Vec<usize>,
}

/// Builds a complete module image.
///
/// ```ignore
/// let mut m = ModuleBuilder::new("TestLibrary");
/// let ty = m.add_type("TestLibrary", "ClassTwo")?;
/// let mut code = CodeBuilder::new();
/// code.push(InstructionIR::PushStr("Hello!".into())).op(Opcode::Print).op(Opcode::RetVoid);
/// m.add_routine(ty, RoutineBuilder::new("DisplaySomethingOnScreen").code(code))?;
/// let bytes = m.emit()?;
/// ```
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    /// Keyed by full type name.
    types: IndexMap<String, TypeEntry>,
    routines: Vec<(TypeRef, RoutineBuilder)>,
    /// Qualified routine name to builder index.
    by_name: IndexMap<String, usize>,
    entry: Option<RoutineRef>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: IndexMap::new(),
            routines: Vec::new(),
            by_name: IndexMap::new(),
            entry: None,
        }
    }

    pub fn add_type(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<TypeRef, EmitError> {
        let namespace = namespace.into();
        let name = name.into();
        let full = names::type_full_name(&namespace, &name);
        if self.types.contains_key(&full) {
            return Err(EmitError::DuplicateType(full));
        }
        let (idx, _) = self.types.insert_full(
            full,
            TypeEntry {
                namespace,
                name,
                routines: Vec::new(),
            },
        );
        Ok(TypeRef(idx))
    }

    pub fn add_routine(
        &mut self,
        ty: TypeRef,
        routine: RoutineBuilder,
    ) -> Result<RoutineRef, EmitError> {
        let (_, entry) = self
            .types
            .get_index_mut(ty.0)
            .ok_or(EmitError::UnknownType(ty.0))?;
        let qualified = names::qualified_name(&entry.namespace, &entry.name, &routine.name);
        if self.by_name.contains_key(&qualified) {
            return Err(EmitError::DuplicateRoutine(qualified));
        }
        if routine.params.len() > u8::MAX as usize {
            return Err(EmitError::TooManyRoutineParams(qualified));
        }
        if let Some((param, _)) = routine.params.iter().find(|(_, t)| *t == ValueType::Void) {
            return Err(EmitError::VoidParameter {
                routine: qualified,
                param: param.clone(),
            });
        }

        let idx = self.routines.len();
        entry.routines.push(idx);
        self.by_name.insert(qualified, idx);
        self.routines.push((ty, routine));
        Ok(RoutineRef(idx))
    }

    /// Declare the intrinsic entry routine.
    pub fn set_entry(&mut self, routine: RoutineRef) {
        self.entry = Some(routine);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lay out the module and return its bytes.
    pub fn emit(&self) -> Result<Vec<u8>, EmitError> {
        if self.types.len() > u16::MAX as usize {
            return Err(EmitError::TooManyTypes(self.types.len()));
        }
        if self.routines.len() >= NO_ENTRY as usize {
            return Err(EmitError::TooManyRoutines(self.routines.len()));
        }

        let mut strings = StringTableBuilder::new();
        let module_name = strings.intern(&self.name)?;

        // Routine ids follow type order, so each type owns a contiguous range.
        let mut final_ids = vec![RoutineId(0); self.routines.len()];
        let mut order = Vec::with_capacity(self.routines.len());
        for entry in self.types.values() {
            for &idx in &entry.routines {
                final_ids[idx] = RoutineId(order.len() as u16);
                order.push(idx);
            }
        }

        let mut type_defs = Vec::with_capacity(self.types.len());
        let mut next = 0u16;
        for entry in self.types.values() {
            let count = entry.routines.len() as u16;
            type_defs.push(TypeDef {
                namespace: strings.intern(&entry.namespace)?,
                name: strings.intern(&entry.name)?,
                routine_start: next,
                routine_count: count,
            });
            next += count;
        }

        let mut imports: IndexMap<(String, String), ImportId> = IndexMap::new();
        let mut routine_defs = Vec::with_capacity(order.len());
        let mut param_defs = Vec::new();
        let mut code = Vec::new();

        for &idx in &order {
            let (ty, routine) = &self.routines[idx];
            let qualified = self.qualified(*ty, &routine.name);

            let param_start = param_defs.len();
            if param_start + routine.params.len() > u16::MAX as usize {
                return Err(EmitError::TooManyParams(param_start + routine.params.len()));
            }
            for (name, ty) in &routine.params {
                param_defs.push(ParamDef {
                    name: strings.intern(name)?,
                    ty: *ty,
                });
            }

            let code_start = code.len();
            self.encode_routine(
                &qualified,
                &routine.code,
                &final_ids,
                &mut strings,
                &mut imports,
                &mut code,
            )?;
            if code.len() > u32::MAX as usize {
                return Err(EmitError::CodeTooLarge(code.len()));
            }

            routine_defs.push(RoutineDef {
                name: strings.intern(&routine.name)?,
                flags: routine.flags(),
                return_type: routine.return_type,
                param_start: param_start as u16,
                param_count: routine.params.len() as u8,
                locals: routine.locals,
                code_start: code_start as u32,
                code_len: (code.len() - code_start) as u32,
            });
        }

        let import_defs = imports
            .keys()
            .map(|(module, routine)| {
                Ok(ImportDef {
                    module: strings.intern(module)?,
                    routine: strings.intern(routine)?,
                })
            })
            .collect::<Result<Vec<_>, EmitError>>()?;

        let (str_blob, str_table) = strings.emit();

        let mut output = vec![0u8; HEADER_SIZE];
        let str_blob_offset = append(&mut output, &str_blob);
        let str_table_offset = append(&mut output, &str_table);
        let types_offset = append(&mut output, &records(&type_defs, TypeDef::to_bytes));
        let routines_offset = append(&mut output, &records(&routine_defs, RoutineDef::to_bytes));
        let params_offset = append(&mut output, &records(&param_defs, ParamDef::to_bytes));
        let imports_offset = append(&mut output, &records(&import_defs, ImportDef::to_bytes));
        let code_offset = append(&mut output, &code);

        let mut header = Header {
            total_size: output.len() as u32,
            str_blob_offset,
            str_table_offset,
            types_offset,
            routines_offset,
            params_offset,
            imports_offset,
            code_offset,
            code_size: code.len() as u32,
            str_table_count: strings.len() as u16,
            types_count: type_defs.len() as u16,
            routines_count: routine_defs.len() as u16,
            params_count: param_defs.len() as u16,
            imports_count: import_defs.len() as u16,
            module_name: module_name.get(),
            ..Default::default()
        };
        header.set_entry_routine(self.entry.map(|r| final_ids[r.0]));
        header.checksum = crc32fast::hash(&output[HEADER_SIZE..]);
        output[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

        Ok(output)
    }

    fn qualified(&self, ty: TypeRef, routine: &str) -> String {
        match self.types.get_index(ty.0) {
            Some((_, t)) => names::qualified_name(&t.namespace, &t.name, routine),
            None => routine.to_owned(),
        }
    }

    fn encode_routine(
        &self,
        qualified: &str,
        code: &CodeBuilder,
        final_ids: &[RoutineId],
        strings: &mut StringTableBuilder,
        imports: &mut IndexMap<(String, String), ImportId>,
        out: &mut Vec<u8>,
    ) -> Result<(), EmitError> {
        // Pass 1: label offsets, relative to the routine's first byte.
        let mut labels = BTreeMap::new();
        let mut offset = 0u32;
        for instr in code.instructions() {
            if let InstructionIR::Mark(label) = instr
                && labels.insert(*label, offset).is_some()
            {
                return Err(EmitError::DuplicateLabel {
                    routine: qualified.to_owned(),
                    label: label.0,
                });
            }
            offset += instr.size() as u32;
        }

        let target = |label: &Label| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| EmitError::UnknownLabel {
                    routine: qualified.to_owned(),
                    label: label.0,
                })
        };

        // Pass 2: encode.
        for instr in code.instructions() {
            let resolved = match instr {
                InstructionIR::Mark(_) => continue,
                InstructionIR::Op(op) => {
                    if op.operand_size() != 0 {
                        return Err(EmitError::OperandRequired(*op));
                    }
                    out.push(*op as u8);
                    continue;
                }
                InstructionIR::PushInt(v) => Instruction::PushInt(*v),
                InstructionIR::PushStr(s) => Instruction::PushStr(strings.intern(s)?),
                InstructionIR::LoadArg(i) => Instruction::LoadArg(*i),
                InstructionIR::LoadLocal(i) => Instruction::LoadLocal(*i),
                InstructionIR::StoreLocal(i) => Instruction::StoreLocal(*i),
                InstructionIR::Jump(l) => Instruction::Jump(target(l)?),
                InstructionIR::JumpIfFalse(l) => Instruction::JumpIfFalse(target(l)?),
                InstructionIR::JumpIfTrue(l) => Instruction::JumpIfTrue(target(l)?),
                InstructionIR::Call(name) => {
                    let idx = self.by_name.get(name.as_str()).ok_or_else(|| {
                        EmitError::UnresolvedRoutine {
                            routine: qualified.to_owned(),
                            target: name.clone(),
                        }
                    })?;
                    Instruction::Call(final_ids[*idx])
                }
                InstructionIR::CallImport { module, routine } => {
                    let key = (module.clone(), routine.clone());
                    let next = imports.len();
                    let id = match imports.get(&key) {
                        Some(id) => *id,
                        None => {
                            if next > u16::MAX as usize {
                                return Err(EmitError::TooManyImports(next + 1));
                            }
                            let id = ImportId(next as u16);
                            imports.insert(key, id);
                            id
                        }
                    };
                    Instruction::CallImport(id)
                }
                InstructionIR::Throw(s) => Instruction::Throw(strings.intern(s)?),
            };
            resolved.encode(out);
        }
        Ok(())
    }
}

/// Append a section, returning its absolute offset.
fn append(output: &mut Vec<u8>, data: &[u8]) -> u32 {
    let offset = output.len() as u32;
    output.extend_from_slice(data);
    offset
}

fn records<T, const N: usize>(items: &[T], to_bytes: fn(&T) -> [u8; N]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(items.len() * N);
    for item in items {
        bytes.extend_from_slice(&to_bytes(item));
    }
    bytes
}
