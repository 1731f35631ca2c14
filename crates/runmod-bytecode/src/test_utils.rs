//! Shared fixtures for module tests.

use crate::bytecode::{HEADER_SIZE, Header, Module, Opcode, ValueType};
use crate::emit::{CodeBuilder, InstructionIR, ModuleBuilder, RoutineBuilder};

/// Two types, two static routines, no entry.
pub fn library_builder() -> ModuleBuilder {
    let mut m = ModuleBuilder::new("TestLibrary");

    let one = m.add_type("TestLibrary", "ClassNumberOne").unwrap();
    let mut code = CodeBuilder::new();
    code.push(InstructionIR::LoadArg(0))
        .op(Opcode::Len)
        .push(InstructionIR::PushInt(4))
        .op(Opcode::Gt)
        .op(Opcode::Ret);
    m.add_routine(
        one,
        RoutineBuilder::new("ArgumentMoreThanFour")
            .returns(ValueType::Boolean)
            .param("args", ValueType::StringArray)
            .code(code),
    )
    .unwrap();

    let two = m.add_type("TestLibrary", "ClassTwo").unwrap();
    let mut code = CodeBuilder::new();
    code.push(InstructionIR::PushStr("Hello!".into()))
        .op(Opcode::Print)
        .op(Opcode::RetVoid);
    m.add_routine(two, RoutineBuilder::new("DisplaySomethingOnScreen").code(code))
        .unwrap();

    m
}

pub fn library_bytes() -> Vec<u8> {
    library_builder().emit().unwrap()
}

pub fn library_module() -> Module {
    Module::from_bytes(library_bytes()).unwrap()
}

/// Recompute the checksum after editing bytes past the header.
pub fn reseal(bytes: &mut [u8]) {
    let mut header = Header::from_bytes(&bytes[..HEADER_SIZE]);
    header.checksum = crc32fast::hash(&bytes[HEADER_SIZE..]);
    bytes[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
}
