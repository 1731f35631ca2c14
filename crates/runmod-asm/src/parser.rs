//! Statement parser: assembler source to a [`ModuleBuilder`].
//!
//! The format is line-oriented. Each line holds at most one statement: a
//! directive, a label, an instruction, or a label followed by an instruction.
//! Calls and the entry declaration may refer to routines declared later in
//! the file, so they are checked once the whole source has been read.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use runmod_bytecode::{
    CodeBuilder, InstructionIR, Label, ModuleBuilder, Opcode, RoutineBuilder, RoutineRef,
    TypeRef, ValueType, Visibility,
};
use runmod_core::names;

use crate::error::{AsmError, AsmErrorKind};
use crate::lexer::{Token, TokenKind, lex, token_text};

/// Parse assembler source into a module builder, ready to emit.
pub fn parse(source: &str) -> Result<ModuleBuilder, AsmError> {
    Parser::new(source).run()
}

struct OpenType {
    ty: TypeRef,
    full_name: String,
    span: Range<usize>,
}

struct OpenRoutine {
    header: RoutineBuilder,
    qualified: String,
    returns: ValueType,
    params: Vec<String>,
    locals: u8,
    code: CodeBuilder,
    labels: HashMap<String, Label>,
    placed: HashSet<Label>,
    /// Jump operands, checked against placed labels at `.end`.
    label_uses: Vec<(String, Range<usize>)>,
    span: Range<usize>,
}

impl OpenRoutine {
    fn label_for(&mut self, name: &str) -> Label {
        if let Some(&label) = self.labels.get(name) {
            return label;
        }
        let label = self.code.new_label();
        self.labels.insert(name.to_owned(), label);
        label
    }

    fn use_label(&mut self, name: &str, span: Range<usize>) -> Label {
        self.label_uses.push((name.to_owned(), span));
        self.label_for(name)
    }
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    module: Option<ModuleBuilder>,
    ty: Option<OpenType>,
    routine: Option<OpenRoutine>,
    routines: HashMap<String, RoutineRef>,
    calls: Vec<(String, Range<usize>)>,
    entry: Option<(String, Range<usize>)>,
}

fn unexpected(expected: &'static str, found: &'static str, span: Range<usize>) -> AsmError {
    AsmError::new(AsmErrorKind::UnexpectedToken { expected, found }, span)
}

/// Operand-less opcode spelled by `mnemonic`.
fn simple_opcode(mnemonic: &str) -> Option<Opcode> {
    (0..=u8::MAX)
        .filter_map(Opcode::from_u8)
        .find(|op| op.operand_size() == 0 && op.mnemonic() == mnemonic)
}

fn unescape(literal: &str, span: &Range<usize>) -> Result<String, AsmError> {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('"') => '"',
            _ => return Err(AsmError::new(AsmErrorKind::InvalidEscape, span.clone())),
        };
        out.push(escaped);
    }
    Ok(out)
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            tokens: lex(source),
            pos: 0,
            module: None,
            ty: None,
            routine: None,
            routines: HashMap::new(),
            calls: Vec::new(),
            entry: None,
        }
    }

    fn run(mut self) -> Result<ModuleBuilder, AsmError> {
        while let Some(token) = self.tokens.get(self.pos).cloned() {
            match token.kind {
                TokenKind::Newline => self.pos += 1,
                TokenKind::Directive => self.directive()?,
                TokenKind::Ident => self.statement()?,
                other => return Err(unexpected("statement", other.describe(), token.span)),
            }
        }

        if let Some(routine) = &self.routine {
            return Err(AsmError::new(
                AsmErrorKind::UnclosedBlock,
                routine.span.clone(),
            ));
        }
        if let Some(ty) = &self.ty {
            return Err(AsmError::new(AsmErrorKind::UnclosedBlock, ty.span.clone()));
        }
        let Some(mut module) = self.module.take() else {
            return Err(AsmError::unlocated(AsmErrorKind::MissingModule));
        };

        for (target, span) in &self.calls {
            if !self.routines.contains_key(target) {
                return Err(AsmError::new(
                    AsmErrorKind::UnresolvedCall(target.clone()),
                    span.clone(),
                ));
            }
        }

        if let Some((name, span)) = self.entry {
            match self.routines.get(&name) {
                Some(&routine) => module.set_entry(routine),
                None => {
                    return Err(AsmError::new(AsmErrorKind::UnresolvedEntry(name), span));
                }
            }
        }

        Ok(module)
    }

    fn text(&self, token: &Token) -> &'s str {
        token_text(self.source, token)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn next_token(&mut self, expected: &'static str) -> Result<Token, AsmError> {
        match self.tokens.get(self.pos).cloned() {
            Some(token) => {
                self.pos += 1;
                Ok(token)
            }
            None => {
                let end = self.source.len();
                Err(unexpected(expected, "end of input", end..end))
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, AsmError> {
        let token = self.next_token(expected)?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(unexpected(expected, token.kind.describe(), token.span))
        }
    }

    fn end_of_statement(&mut self) -> Result<(), AsmError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(t) if t.kind == TokenKind::Newline => {
                self.pos += 1;
                Ok(())
            }
            Some(t) => Err(unexpected("end of line", t.kind.describe(), t.span.clone())),
        }
    }

    fn open_routine(
        &mut self,
        what: &str,
        span: &Range<usize>,
    ) -> Result<&mut OpenRoutine, AsmError> {
        self.routine.as_mut().ok_or_else(|| {
            AsmError::new(AsmErrorKind::OutsideRoutine(what.to_owned()), span.clone())
        })
    }

    fn forbid_in_routine(&self, directive: &'static str, span: &Range<usize>) -> Result<(), AsmError> {
        if self.routine.is_some() {
            return Err(AsmError::new(
                AsmErrorKind::InsideRoutine(directive),
                span.clone(),
            ));
        }
        Ok(())
    }

    fn directive(&mut self) -> Result<(), AsmError> {
        let token = self.next_token("directive")?;
        match self.text(&token) {
            ".module" => self.module_decl(token.span)?,
            ".type" => self.type_decl(token.span)?,
            ".routine" => self.routine_decl(token.span)?,
            ".locals" => self.locals_decl(token.span)?,
            ".end" => self.end_decl(token.span)?,
            ".entry" => self.entry_decl(token.span)?,
            other => {
                return Err(AsmError::new(
                    AsmErrorKind::UnknownDirective(other.to_owned()),
                    token.span,
                ));
            }
        }
        self.end_of_statement()
    }

    fn module_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        self.forbid_in_routine(".module", &span)?;
        if self.module.is_some() {
            return Err(AsmError::new(AsmErrorKind::DuplicateModule, span));
        }
        let name = self.expect(TokenKind::Ident, "module name")?;
        self.module = Some(ModuleBuilder::new(self.text(&name)));
        Ok(())
    }

    fn type_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        self.forbid_in_routine(".type", &span)?;
        if let Some(open) = &self.ty {
            return Err(AsmError::new(AsmErrorKind::UnclosedBlock, open.span.clone()));
        }
        let path = self.expect(TokenKind::Ident, "type name")?;
        let full_name = self.text(&path);
        let (namespace, name) = names::split_type_path(full_name);

        let Some(module) = self.module.as_mut() else {
            return Err(AsmError::new(AsmErrorKind::MissingModule, span));
        };
        let ty = module
            .add_type(namespace, name)
            .map_err(|e| AsmError::new(e.into(), path.span.clone()))?;

        self.ty = Some(OpenType {
            ty,
            full_name: full_name.to_owned(),
            span,
        });
        Ok(())
    }

    fn parse_type(&mut self) -> Result<ValueType, AsmError> {
        let token = self.expect(TokenKind::Ident, "type")?;
        let mut span = token.span.clone();
        let mut keyword = self.text(&token).to_owned();
        if self.peek_kind() == Some(TokenKind::Brackets) {
            let brackets = self.next_token("`[]`")?;
            keyword.push_str("[]");
            span.end = brackets.span.end;
        }
        match ValueType::from_keyword(&keyword) {
            Some(ty) => Ok(ty),
            None => Err(AsmError::new(AsmErrorKind::UnknownType(keyword), span)),
        }
    }

    fn routine_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        self.forbid_in_routine(".routine", &span)?;
        let Some(type_name) = self.ty.as_ref().map(|t| t.full_name.clone()) else {
            return Err(AsmError::new(AsmErrorKind::OutsideType(".routine"), span));
        };

        let mut visibility = Visibility::Private;
        let mut is_static = false;
        while self.peek_kind() == Some(TokenKind::Ident) {
            let Some(token) = self.tokens.get(self.pos) else {
                break;
            };
            match self.text(token) {
                "public" => visibility = Visibility::Public,
                "private" => visibility = Visibility::Private,
                "static" => is_static = true,
                _ => break,
            }
            self.pos += 1;
        }

        let returns = self.parse_type()?;
        let name_token = self.expect(TokenKind::Ident, "routine name")?;
        let name = self.text(&name_token);
        if name.contains('.') {
            return Err(unexpected("routine name", "dotted path", name_token.span));
        }

        let mut header = RoutineBuilder::new(name)
            .visibility(visibility)
            .is_static(is_static)
            .returns(returns);
        let mut params = Vec::new();

        self.expect(TokenKind::ParenOpen, "`(`")?;
        if self.peek_kind() == Some(TokenKind::ParenClose) {
            self.pos += 1;
        } else {
            loop {
                let ty = self.parse_type()?;
                let param = self.expect(TokenKind::Ident, "parameter name")?;
                let param_name = self.text(&param);
                header = header.param(param_name, ty);
                params.push(param_name.to_owned());

                let sep = self.next_token("`,` or `)`")?;
                match sep.kind {
                    TokenKind::Comma => continue,
                    TokenKind::ParenClose => break,
                    other => return Err(unexpected("`,` or `)`", other.describe(), sep.span)),
                }
            }
        }

        self.routine = Some(OpenRoutine {
            header,
            qualified: format!("{type_name}.{name}"),
            returns,
            params,
            locals: 0,
            code: CodeBuilder::new(),
            labels: HashMap::new(),
            placed: HashSet::new(),
            label_uses: Vec::new(),
            span,
        });
        Ok(())
    }

    fn locals_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        self.open_routine(".locals", &span)?;
        let count = self.u8_operand()?;
        if let Some(routine) = self.routine.as_mut() {
            routine.locals = count;
        }
        Ok(())
    }

    fn end_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        if let Some(routine) = self.routine.take() {
            return self.close_routine(routine);
        }
        if self.ty.take().is_some() {
            return Ok(());
        }
        Err(AsmError::new(AsmErrorKind::UnmatchedEnd, span))
    }

    fn close_routine(&mut self, routine: OpenRoutine) -> Result<(), AsmError> {
        for (name, span) in &routine.label_uses {
            let placed = routine
                .labels
                .get(name)
                .is_some_and(|label| routine.placed.contains(label));
            if !placed {
                return Err(AsmError::new(
                    AsmErrorKind::UndefinedLabel(name.clone()),
                    span.clone(),
                ));
            }
        }

        let (Some(ty), Some(module)) = (self.ty.as_ref(), self.module.as_mut()) else {
            return Err(AsmError::new(
                AsmErrorKind::OutsideType(".routine"),
                routine.span,
            ));
        };
        let builder = routine.header.locals(routine.locals).code(routine.code);
        let id = module
            .add_routine(ty.ty, builder)
            .map_err(|e| AsmError::new(e.into(), routine.span.clone()))?;
        self.routines.insert(routine.qualified, id);
        Ok(())
    }

    fn entry_decl(&mut self, span: Range<usize>) -> Result<(), AsmError> {
        self.forbid_in_routine(".entry", &span)?;
        let name = self.expect(TokenKind::Ident, "routine name")?;
        self.entry = Some((self.text(&name).to_owned(), name.span));
        Ok(())
    }

    /// A label definition, an instruction, or both on one line.
    fn statement(&mut self) -> Result<(), AsmError> {
        let token = self.next_token("instruction")?;
        let text = self.text(&token);

        if self.peek_kind() == Some(TokenKind::Colon) {
            self.pos += 1;
            let routine = self.open_routine(&format!("{text}:"), &token.span)?;
            let label = routine.label_for(text);
            if !routine.placed.insert(label) {
                return Err(AsmError::new(
                    AsmErrorKind::DuplicateLabel(text.to_owned()),
                    token.span,
                ));
            }
            routine.code.mark(label);
            if self.peek_kind() == Some(TokenKind::Ident) {
                return self.statement();
            }
            return self.end_of_statement();
        }

        self.instruction(text, token.span)?;
        self.end_of_statement()
    }

    fn instruction(&mut self, mnemonic: &'s str, span: Range<usize>) -> Result<(), AsmError> {
        let returns = self.open_routine(mnemonic, &span)?.returns;

        let instr = match mnemonic {
            "push" => self.push_operand()?,
            "ldarg" => InstructionIR::LoadArg(self.arg_operand()?),
            "ldloc" => InstructionIR::LoadLocal(self.u8_operand()?),
            "stloc" => InstructionIR::StoreLocal(self.u8_operand()?),
            "jmp" | "jmpf" | "jmpt" => {
                let target = self.expect(TokenKind::Ident, "label")?;
                let name = self.text(&target);
                let label = self.open_routine(mnemonic, &span)?.use_label(name, target.span);
                match mnemonic {
                    "jmp" => InstructionIR::Jump(label),
                    "jmpf" => InstructionIR::JumpIfFalse(label),
                    _ => InstructionIR::JumpIfTrue(label),
                }
            }
            "call" => {
                let target = self.expect(TokenKind::Ident, "routine name")?;
                let name = self.text(&target);
                let qualified = if name.contains('.') {
                    name.to_owned()
                } else {
                    let type_name = self.ty.as_ref().map(|t| t.full_name.as_str());
                    format!("{}.{name}", type_name.unwrap_or_default())
                };
                self.calls.push((qualified.clone(), target.span));
                InstructionIR::Call(qualified)
            }
            "callext" => {
                let module = self.expect(TokenKind::Ident, "module name")?;
                let routine = self.expect(TokenKind::Ident, "routine name")?;
                InstructionIR::CallImport {
                    module: self.text(&module).to_owned(),
                    routine: self.text(&routine).to_owned(),
                }
            }
            "throw" => {
                let literal = self.expect(TokenKind::Str, "fault type string")?;
                InstructionIR::Throw(unescape(self.text(&literal), &literal.span)?)
            }
            "ret" if returns == ValueType::Void => InstructionIR::Op(Opcode::RetVoid),
            "ret" => InstructionIR::Op(Opcode::Ret),
            other => match simple_opcode(other) {
                Some(op) => InstructionIR::Op(op),
                None => {
                    return Err(AsmError::new(
                        AsmErrorKind::UnknownMnemonic(other.to_owned()),
                        span,
                    ));
                }
            },
        };

        self.open_routine(mnemonic, &span)?.code.push(instr);
        Ok(())
    }

    fn push_operand(&mut self) -> Result<InstructionIR, AsmError> {
        const EXPECTED: &str = "`null`, `true`, `false`, integer or string";
        let token = self.next_token(EXPECTED)?;
        let text = self.text(&token);
        match token.kind {
            TokenKind::Int => text
                .parse::<i64>()
                .map(InstructionIR::PushInt)
                .map_err(|_| AsmError::new(AsmErrorKind::InvalidInteger(text.to_owned()), token.span)),
            TokenKind::Str => Ok(InstructionIR::PushStr(unescape(text, &token.span)?)),
            TokenKind::Ident => match text {
                "null" => Ok(InstructionIR::Op(Opcode::PushNull)),
                "true" => Ok(InstructionIR::Op(Opcode::PushTrue)),
                "false" => Ok(InstructionIR::Op(Opcode::PushFalse)),
                _ => Err(unexpected(EXPECTED, "name", token.span)),
            },
            other => Err(unexpected(EXPECTED, other.describe(), token.span)),
        }
    }

    /// Argument slot, by index or by parameter name.
    fn arg_operand(&mut self) -> Result<u8, AsmError> {
        if self.peek_kind() != Some(TokenKind::Ident) {
            return self.u8_operand();
        }
        let token = self.next_token("parameter")?;
        let name = self.text(&token);
        let index = self
            .routine
            .as_ref()
            .and_then(|r| r.params.iter().position(|p| p == name));
        match index {
            Some(i) => Ok(i as u8),
            None => Err(AsmError::new(
                AsmErrorKind::UnknownParam(name.to_owned()),
                token.span,
            )),
        }
    }

    fn u8_operand(&mut self) -> Result<u8, AsmError> {
        let token = self.expect(TokenKind::Int, "integer")?;
        let text = self.text(&token);
        text.parse::<u8>()
            .map_err(|_| AsmError::new(AsmErrorKind::InvalidInteger(text.to_owned()), token.span))
    }
}
