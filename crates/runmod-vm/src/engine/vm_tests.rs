use std::time::Duration;

use indoc::indoc;
use runmod_bytecode::Module;

use crate::test_utils::{MapResolver, RecordingConsole, module, routine};
use crate::{CalleeFault, Fault, HostFaultKind, Limits, Value, Vm};

const LIBRARY: &str = include_str!("../../../../demos/test_library.rasm");
const PROGRAM: &str = include_str!("../../../../demos/test_program.rasm");
const GREETER: &str = include_str!("../../../../demos/greeter.rasm");
const HELPERS: &str = include_str!("../../../../demos/helpers.rasm");

const CALC: &str = indoc! {r#"
    .module Calc

    .type Calc.Math
      .routine public static int Run()
        call Divide
        ret
      .end

      .routine static int Divide()
        push 1
        push 0
        div
        ret
      .end

      .routine static int Overflow()
        push 9223372036854775807
        push 1
        add
        ret
      .end

      .routine static string Pick(string[] items, int at)
        ldarg items
        ldarg at
        index
        ret
      .end

      .routine static void Fail()
        push "disk on fire"
        throw "IOFailure"
      .end

      .routine static int Mixed()
        push 1
        push "a"
        add
        ret
      .end

      .routine static int Wrong()
        push "x"
        ret
      .end

      .routine static int Nothing()
        retv
      .end

      .routine static void Loop()
        call Loop
        ret
      .end

      .routine int Instance()
        push 1
        ret
      .end
    .end
"#};

fn strings(items: &[&str]) -> Value {
    Value::StrArray(items.iter().map(|s| s.to_string()).collect())
}

fn invoke(
    module: &Module,
    qualified: &str,
    args: Vec<Value>,
) -> (Result<Value, Fault>, RecordingConsole) {
    let resolver = MapResolver::default();
    let mut vm = Vm::builder(&resolver).build();
    let mut console = RecordingConsole::default();
    let result = vm.invoke(module, routine(module, qualified), args, &mut console);
    (result, console)
}

fn callee_fault(result: Result<Value, Fault>) -> CalleeFault {
    match result {
        Err(Fault::Callee(c)) => c,
        other => panic!("expected callee fault, got {other:?}"),
    }
}

fn host_fault(result: Result<Value, Fault>) -> (HostFaultKind, String) {
    match result {
        Err(Fault::Host(h)) => (h.kind, h.description),
        other => panic!("expected host fault, got {other:?}"),
    }
}

#[test]
fn more_than_four_arguments() {
    let library = module(LIBRARY);
    let name = "TestLibrary.ClassNumberOne.ArgumentMoreThanFour";

    let args = strings(&["one", "two", "three", "four", "five"]);
    let (result, _) = invoke(&library, name, vec![args]);
    assert_eq!(result, Ok(Value::Bool(true)));

    let (result, _) = invoke(&library, name, vec![strings(&["one", "two"])]);
    assert_eq!(result, Ok(Value::Bool(false)));
}

#[test]
fn void_routine_prints_once_and_returns_null() {
    let library = module(LIBRARY);

    let (result, console) = invoke(
        &library,
        "TestLibrary.ClassTwo.DisplaySomethingOnScreen",
        vec![],
    );

    assert_eq!(result, Ok(Value::Null));
    assert_eq!(console.output, "Hello!\n");
}

#[test]
fn program_echoes_arguments_and_sleeps() {
    let program = module(PROGRAM);
    let entry = program.entry().unwrap();
    let resolver = MapResolver::default();
    let mut vm = Vm::builder(&resolver).build();
    let mut console = RecordingConsole::default();

    let result = vm.invoke(&program, entry, vec![strings(&["a", "b c"])], &mut console);

    assert_eq!(result, Ok(Value::Int(0)));
    assert_eq!(console.sleeps, vec![Duration::from_millis(2000)]);
    assert_eq!(
        console.output,
        "Hello World!\n\
         Arguments (2): \"a\" \"b c\" \n\
         Sleeping 2 seconds\n\
         Returning code 0\n"
    );
}

#[test]
fn parameter_count_mismatch() {
    let library = module(LIBRARY);

    let (result, _) = invoke(&library, "TestLibrary.ClassNumberOne.ArgumentMoreThanFour", vec![]);

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::ParameterCount);
    insta::assert_snapshot!(description, @"routine 'TestLibrary.ClassNumberOne.ArgumentMoreThanFour' takes 1 parameter(s) but 0 argument(s) were supplied");
}

#[test]
fn argument_type_mismatch() {
    let library = module(LIBRARY);

    let (result, _) = invoke(
        &library,
        "TestLibrary.ClassNumberOne.ArgumentMoreThanFour",
        vec![Value::Int(5)],
    );

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::ArgumentType);
    insta::assert_snapshot!(description, @"argument 0 ('args') of routine 'TestLibrary.ClassNumberOne.ArgumentMoreThanFour' expects String[], got Int64");
}

#[test]
fn null_string_array_is_accepted() {
    let library = module(LIBRARY);

    let (result, _) = invoke(
        &library,
        "TestLibrary.ClassNumberOne.ArgumentMoreThanFour",
        vec![Value::Null],
    );

    let fault = callee_fault(result);
    assert_eq!(fault.type_name, "NullReference");
}

#[test]
fn divide_by_zero_carries_trace() {
    let calc = module(CALC);

    let (result, _) = invoke(&calc, "Calc.Math.Run", vec![]);

    let Err(fault) = result else {
        panic!("expected fault");
    };
    assert!(fault.is_callee());
    insta::assert_snapshot!(fault, @r"
    DivideByZero: Attempted to divide by zero.
       at Calc.Math.Divide
       at Calc.Math.Run
    ");
}

#[test]
fn overflow_is_callee_fault() {
    let calc = module(CALC);

    let (result, _) = invoke(&calc, "Calc.Math.Overflow", vec![]);

    let fault = callee_fault(result);
    assert_eq!(fault.type_name, "ArithmeticOverflow");
}

#[test]
fn index_in_and_out_of_range() {
    let calc = module(CALC);
    let items = strings(&["x", "y"]);

    let (result, _) = invoke(&calc, "Calc.Math.Pick", vec![items.clone(), Value::Int(1)]);
    assert_eq!(result, Ok(Value::from("y")));

    let (result, _) = invoke(&calc, "Calc.Math.Pick", vec![items, Value::Int(5)]);
    let fault = callee_fault(result);
    assert_eq!(fault.type_name, "IndexOutOfRange");
    insta::assert_snapshot!(fault.description, @r"
    Index was outside the bounds of the array.
       at Calc.Math.Pick
    ");
}

#[test]
fn thrown_fault_keeps_type_and_message() {
    let calc = module(CALC);

    let (result, _) = invoke(&calc, "Calc.Math.Fail", vec![]);

    let fault = callee_fault(result);
    assert_eq!(fault.type_name, "IOFailure");
    assert!(fault.description.starts_with("disk on fire\n   at Calc.Math.Fail"));
}

#[test]
fn operand_type_mismatch_is_host_fault() {
    let calc = module(CALC);

    let (result, _) = invoke(&calc, "Calc.Math.Mixed", vec![]);

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::TypeMismatch);
    insta::assert_snapshot!(description, @"`add` expects Int64 or String operands, got Int64 and String");
}

#[test]
fn return_type_is_checked() {
    let calc = module(CALC);

    let (kind, description) = host_fault(invoke(&calc, "Calc.Math.Wrong", vec![]).0);
    assert_eq!(kind, HostFaultKind::TypeMismatch);
    assert_eq!(description, "routine 'Calc.Math.Wrong' returned String, expected Int64");

    let (kind, description) = host_fault(invoke(&calc, "Calc.Math.Nothing", vec![]).0);
    assert_eq!(kind, HostFaultKind::TypeMismatch);
    assert_eq!(description, "routine 'Calc.Math.Nothing' returned no value, expected Int64");
}

#[test]
fn recursion_limit() {
    let calc = module(CALC);
    let resolver = MapResolver::default();
    let limits = Limits::new().recursion_limit(8);
    assert_eq!(limits.get_recursion_limit(), 8);
    let mut vm = Vm::builder(&resolver).limits(limits).build();
    let mut console = RecordingConsole::default();

    let result = vm.invoke(&calc, routine(&calc, "Calc.Math.Loop"), vec![], &mut console);

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::CallDepthExceeded);
    assert_eq!(description, "call depth limit of 8 exceeded calling 'Calc.Math.Loop'");
}

#[test]
fn builder_recursion_limit_overrides_default() {
    assert_eq!(Limits::default().get_recursion_limit(), 1024);

    let calc = module(CALC);
    let resolver = MapResolver::default();
    let mut vm = Vm::builder(&resolver).recursion_limit(3).build();
    let mut console = RecordingConsole::default();

    let result = vm.invoke(&calc, routine(&calc, "Calc.Math.Loop"), vec![], &mut console);

    let (_, description) = host_fault(result);
    assert_eq!(description, "call depth limit of 3 exceeded calling 'Calc.Math.Loop'");
}

#[test]
fn instance_routine_needs_instance() {
    let calc = module(CALC);

    let (kind, _) = host_fault(invoke(&calc, "Calc.Math.Instance", vec![]).0);

    assert_eq!(kind, HostFaultKind::InstanceRequired);
}

#[test]
fn dependency_loaded_once() {
    let greeter = module(GREETER);
    let resolver = MapResolver::default().with("Helpers", HELPERS);
    let mut vm = Vm::builder(&resolver).build();
    let mut console = RecordingConsole::default();
    let main = greeter.entry().unwrap();

    let first = vm.invoke(&greeter, main, vec![strings(&[])], &mut console);
    let second = vm.invoke(&greeter, main, vec![strings(&[])], &mut console);

    assert_eq!(first, Ok(Value::Null));
    assert_eq!(second, Ok(Value::Null));
    assert_eq!(console.output, "Hello from Greeter!\nHello from Greeter!\n");
    assert_eq!(console.loaded, vec!["Helpers"]);
}

#[test]
fn missing_dependency_is_host_fault() {
    let greeter = module(GREETER);
    let main = greeter.entry().unwrap();
    let resolver = MapResolver::default();
    let mut vm = Vm::builder(&resolver).build();
    let mut console = RecordingConsole::default();

    let result = vm.invoke(&greeter, main, vec![strings(&[])], &mut console);

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::UnresolvedModule);
    insta::assert_snapshot!(description, @"module 'Helpers' not found at 'Helpers.rmod'");
    assert!(console.output.is_empty());
}

#[test]
fn dependency_without_routine() {
    let greeter = module(GREETER);
    let main = greeter.entry().unwrap();
    let other = indoc! {r#"
        .module Helpers
        .type Helpers.Text
          .routine public static string Whisper(string text)
            ldarg text
            ret
          .end
        .end
    "#};
    let resolver = MapResolver::default().with("Helpers", other);
    let mut vm = Vm::builder(&resolver).build();
    let mut console = RecordingConsole::default();

    let result = vm.invoke(&greeter, main, vec![strings(&[])], &mut console);

    let (kind, description) = host_fault(result);
    assert_eq!(kind, HostFaultKind::UnresolvedRoutine);
    assert_eq!(
        description,
        "routine 'Helpers.Text.Shout' not found in module 'Helpers'"
    );
}
