use runmod_core::Colors;

use crate::emit::{CodeBuilder, InstructionIR, ModuleBuilder, RoutineBuilder};
use crate::test_utils::{library_bytes, library_module, reseal};

use super::dump::dump;
use super::module::Module;
use super::{HEADER_SIZE, Header, Opcode, ValueType};

#[test]
fn dump_library() {
    let module = library_module();

    insta::assert_snapshot!(dump(&module, Colors::OFF), @r#"
    [module]
    name = TestLibrary
    entry = none

    [strings]
    S0 ""
    S1 "TestLibrary"
    S2 "ClassNumberOne"
    S3 "ClassTwo"
    S4 "args"
    S5 "ArgumentMoreThanFour"
    S6 "Hello!"
    S7 "DisplaySomethingOnScreen"

    [types]
    T0 = (R0, 1)  ; TestLibrary.ClassNumberOne
    T1 = (R1, 1)  ; TestLibrary.ClassTwo

    [routines]
    R0 = public static Boolean ArgumentMoreThanFour(String[] args)
    R1 = public static Void DisplaySomethingOnScreen()

    [code]
    TestLibrary.ClassNumberOne.ArgumentMoreThanFour:
      0000  ldarg 0
      0002  len
      0003  push 4
      000c  gt
      000d  ret

    TestLibrary.ClassTwo.DisplaySomethingOnScreen:
      0000  push "Hello!"
      0003  print
      0004  retv
    "#);
}

#[test]
fn dump_program_with_entry_and_imports() {
    let mut m = ModuleBuilder::new("Program");
    let ty = m.add_type("App", "Program").unwrap();
    let mut code = CodeBuilder::new();
    let has_args = code.new_label();
    code.push(InstructionIR::LoadArg(0))
        .op(Opcode::Len)
        .push(InstructionIR::StoreLocal(0))
        .push(InstructionIR::LoadLocal(0))
        .push(InstructionIR::PushInt(0))
        .op(Opcode::Gt)
        .push(InstructionIR::JumpIfTrue(has_args))
        .push(InstructionIR::PushStr("no args".into()))
        .push(InstructionIR::Throw("ArgumentException".into()))
        .mark(has_args)
        .push(InstructionIR::CallImport {
            module: "Helpers".into(),
            routine: "Helpers.Text.Greet".into(),
        })
        .push(InstructionIR::PushInt(0))
        .op(Opcode::Ret);
    let main = m
        .add_routine(
            ty,
            RoutineBuilder::new("Main")
                .returns(ValueType::Int64)
                .param("args", ValueType::StringArray)
                .locals(1)
                .code(code),
        )
        .unwrap();
    m.set_entry(main);
    let module = Module::from_bytes(m.emit().unwrap()).unwrap();

    insta::assert_snapshot!(dump(&module, Colors::OFF), @r#"
    [module]
    name = Program
    entry = R0  ; App.Program.Main

    [strings]
    S0 ""
    S1 "Program"
    S2 "App"
    S3 "args"
    S4 "no args"
    S5 "ArgumentException"
    S6 "Main"
    S7 "Helpers"
    S8 "Helpers.Text.Greet"

    [types]
    T0 = (R0, 1)  ; App.Program

    [routines]
    R0 = public static Int64 Main(String[] args)  locals=1

    [imports]
    I0 = Helpers Helpers.Text.Greet

    [code]
    App.Program.Main:
      0000  ldarg 0
      0002  len
      0003  stloc 0
      0005  ldloc 0
      0007  push 0
      0010  gt
      0011  jmpt 001c
      0016  push "no args"
      0019  throw "ArgumentException"
      001c  callext Helpers Helpers.Text.Greet
      001f  push 0
      0028  ret
    "#);
}

#[test]
fn dump_colored_marks_sections() {
    let module = library_module();
    let out = dump(&module, Colors::ON);
    assert!(out.contains("\x1b[34m[strings]\x1b[0m"));
}

#[test]
fn dump_marks_undeclared_string_operand() {
    let mut bytes = library_bytes();
    // `push "Hello!"` opens the second routine, 14 bytes into the code section.
    let at = Header::from_bytes(&bytes[..HEADER_SIZE]).code_offset as usize + 14 + 1;
    bytes[at..at + 2].copy_from_slice(&0x1234u16.to_le_bytes());
    reseal(&mut bytes);
    let module = Module::from_bytes(bytes).unwrap();

    let text = dump(&module, Colors::OFF);

    assert!(text.contains("0000  push <invalid string S4660>\n"));
}
