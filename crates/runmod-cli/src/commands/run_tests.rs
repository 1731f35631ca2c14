//! End-to-end runs against modules assembled into a temp directory.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use runmod_core::Colors;
use runmod_vm::{Fault, HostFaultKind, Value};
use tempfile::TempDir;

use super::report::Reporter;
use super::run::{RunArgs, RunOutcome, execute, run_to};
use crate::cli::RunParams;

const LIBRARY: &str = include_str!("../../../../demos/test_library.rasm");
const PROGRAM: &str = include_str!("../../../../demos/test_program.rasm");
const GREETER: &str = include_str!("../../../../demos/greeter.rasm");
const HELPERS: &str = include_str!("../../../../demos/helpers.rasm");

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    /// Assemble `source` into `<dir>/<name>.rmod`.
    fn module(&self, name: &str, source: &str) -> PathBuf {
        let path = self.path(&format!("{name}.rmod"));
        fs::write(&path, runmod_asm::assemble(source).unwrap()).unwrap();
        path
    }

    /// Run with the given command-line tokens after the module path. Returns
    /// the outcome and the report without the host info lines, with the temp
    /// directory replaced by `<dir>`.
    fn run(&self, module_path: PathBuf, tokens: &[&str]) -> (RunOutcome, String) {
        let params = RunParams {
            module_path: Some(module_path),
            rest: tokens.iter().map(|t| t.to_string()).collect(),
        };
        let args = RunArgs::try_from(params).unwrap();
        let mut reporter = Reporter::new(Vec::new(), Colors::OFF).sleep_with(|_| {});

        let outcome = execute(&args, &mut reporter).unwrap();

        let raw = String::from_utf8(reporter.into_inner()).unwrap();
        let dir = self.dir.path().display().to_string();
        let mut lines = raw.lines();
        assert!(lines.next().unwrap().starts_with("[runmod] OS: "));
        assert!(lines.next().unwrap().starts_with("[runmod] Runtime: runmod "));
        let report = lines
            .map(|line| format!("{}\n", line.replace(&dir, "<dir>")))
            .collect();
        (outcome, report)
    }
}

fn returned(outcome: RunOutcome) -> Value {
    match outcome {
        RunOutcome::Invoked(Ok(value)) => value,
        other => panic!("expected a returned value, got {other:?}"),
    }
}

#[test]
fn void_routine_by_bare_name() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &["/e", "DisplaySomethingOnScreen"]);

    assert_eq!(returned(outcome), Value::Null);
    assert_eq!(report.matches("Hello!").count(), 1);
    insta::assert_snapshot!(report, @r"
    [runmod] Base directory: <dir>
    [runmod] + Module TestLibrary (<dir>/TestLibrary.rmod)
    [runmod] Routine: public static Void TestLibrary.ClassTwo.DisplaySomethingOnScreen();
    [runmod] Invoke routine
    Hello!
    [runmod] Routine invoked. Returned: null
    [runmod] Finished
    ");
}

#[test]
fn more_than_four_arguments() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(
        library,
        &["/e", "ArgumentMoreThanFour", "one", "two", "three", "four", "five"],
    );

    assert_eq!(returned(outcome), Value::Bool(true));
    insta::assert_snapshot!(report, @r"
    [runmod] Base directory: <dir>
    [runmod] + Module TestLibrary (<dir>/TestLibrary.rmod)
    [runmod] Routine: public static Boolean TestLibrary.ClassNumberOne.ArgumentMoreThanFour(String[] args);
    [runmod] Putting arguments in parameter 'args'.
    [runmod] Invoke routine
    [runmod] Routine invoked. Returned: (Boolean) true
    [runmod] Finished
    ");
}

#[test]
fn two_arguments_are_not_more_than_four() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &["one", "/e", "argumentmorethanfour", "two"]);

    assert_eq!(returned(outcome), Value::Bool(false));
    assert!(report.contains("[runmod] Routine invoked. Returned: (Boolean) false\n"));
}

#[test]
fn missing_module_stops_early() {
    let fx = Fixture::new();

    let (outcome, report) = fx.run(fx.path("Missing.rmod"), &["/e", "Anything"]);

    assert!(matches!(outcome, RunOutcome::LoadFailed));
    insta::assert_snapshot!(report, @r"
    [runmod] Module '<dir>/Missing.rmod' not found.
    [runmod] Finished
    ");
}

#[test]
fn rejected_module_reports_cause() {
    let fx = Fixture::new();
    let broken = fx.path("Broken.rmod");
    fs::write(&broken, b"RMOD").unwrap();

    let (outcome, report) = fx.run(broken, &[]);

    assert!(matches!(outcome, RunOutcome::LoadFailed));
    insta::assert_snapshot!(report, @r"
    [runmod] Can't load module '<dir>/Broken.rmod': file too small: 4 bytes (minimum 64)
    [runmod] Finished
    ");
}

#[test]
fn unknown_entry_lists_routines() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &["/e", "Nope", "x"]);

    assert!(matches!(outcome, RunOutcome::EntryNotFound));
    insta::assert_snapshot!(report, @r"
    [runmod] Base directory: <dir>
    [runmod] + Module TestLibrary (<dir>/TestLibrary.rmod)
    [runmod] Entry point not found: no static routine matches 'Nope'.
    [runmod] Available routines:
    [runmod]   public static Boolean TestLibrary.ClassNumberOne.ArgumentMoreThanFour(String[] args);
    [runmod]   public static Void TestLibrary.ClassTwo.DisplaySomethingOnScreen();
    [runmod] Finished
    ");
}

#[test]
fn library_without_entry_point() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &[]);

    assert!(matches!(outcome, RunOutcome::EntryNotFound));
    assert!(report.contains(
        "[runmod] Entry point not found: module 'TestLibrary' declares no entry routine.\n"
    ));
}

#[test]
fn show_only_does_not_invoke() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &["/e", "DisplaySomethingOnScreen", "/s"]);

    assert!(matches!(outcome, RunOutcome::Shown));
    assert!(!report.contains("Hello!"));
    insta::assert_snapshot!(report, @r"
    [runmod] Base directory: <dir>
    [runmod] + Module TestLibrary (<dir>/TestLibrary.rmod)
    [runmod] Routine: public static Void TestLibrary.ClassTwo.DisplaySomethingOnScreen();
    [runmod] Finished
    ");
}

#[test]
fn show_only_without_match() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);

    let (outcome, report) = fx.run(library, &["/e", "Nope", "/s"]);

    assert!(matches!(outcome, RunOutcome::Shown));
    assert!(report.contains("[runmod] Routine not found.\n"));
    assert!(!report.contains("Available routines"));
}

#[test]
fn program_entry_point() {
    let fx = Fixture::new();
    let program = fx.module("TestProgram", PROGRAM);

    let (outcome, report) = fx.run(program, &["a", "b c"]);

    assert_eq!(returned(outcome), Value::Int(0));
    assert_eq!(
        report,
        "[runmod] Base directory: <dir>\n\
         [runmod] + Module TestProgram (<dir>/TestProgram.rmod)\n\
         [runmod] Routine: private static Int64 TestProgram.Program.Main(String[] args);\n\
         [runmod] Putting arguments in parameter 'args'.\n\
         [runmod] Invoke routine\n\
         Hello World!\n\
         Arguments (2): \"a\" \"b c\" \n\
         Sleeping 2 seconds\n\
         Returning code 0\n\
         [runmod] Routine invoked. Returned: (Int64) 0\n\
         [runmod] Finished\n"
    );
}

#[test]
fn dependency_found_next_to_module() {
    let fx = Fixture::new();
    fx.module("Helpers", HELPERS);
    let greeter = fx.module("Greeter", GREETER);

    let (outcome, report) = fx.run(greeter, &[]);

    assert_eq!(returned(outcome), Value::Null);
    insta::assert_snapshot!(report, @r"
    [runmod] Base directory: <dir>
    [runmod] + Module Greeter (<dir>/Greeter.rmod)
    [runmod] Routine: public static Void Greeter.Program.Main(String[] args);
    [runmod] Putting arguments in parameter 'args'.
    [runmod] Invoke routine
    [runmod] + Module Helpers (<dir>/Helpers.rmod)
    Hello from Greeter!
    [runmod] Routine invoked. Returned: null
    [runmod] Finished
    ");
}

#[test]
fn missing_dependency_is_host_fault() {
    let fx = Fixture::new();
    let greeter = fx.module("Greeter", GREETER);

    let (outcome, report) = fx.run(greeter, &[]);

    let RunOutcome::Invoked(Err(fault)) = outcome else {
        panic!("expected a fault");
    };
    assert_eq!(fault.host_kind(), Some(HostFaultKind::UnresolvedModule));
    assert!(report.ends_with(
        "[runmod] Host fault:\n\
         [runmod] unresolved module\n\
         [runmod] module 'Helpers' not found at '<dir>/Helpers.rmod'\n\
         [runmod] Finished\n"
    ));
}

#[test]
fn thrown_fault_is_reported() {
    let fx = Fixture::new();
    let greeter = fx.module("Greeter", GREETER);

    let (outcome, report) = fx.run(greeter, &["/e", "Greeter.Program.Fail"]);

    assert!(matches!(outcome, RunOutcome::Invoked(Err(Fault::Callee(_)))));
    assert!(report.ends_with(
        "[runmod] Invocation fault:\n\
         [runmod] InvalidOperation\n\
         [runmod] Something went wrong\n\
         [runmod]    at Greeter.Program.Fail\n\
         [runmod] Finished\n"
    ));
}

#[test]
fn arguments_not_forwarded_to_parameterless_routine() {
    let fx = Fixture::new();
    let greeter = fx.module("Greeter", GREETER);

    let (outcome, report) = fx.run(greeter, &["/e", "Divide", "ignored"]);

    assert!(!report.contains("Putting arguments"));
    let RunOutcome::Invoked(Err(Fault::Callee(fault))) = outcome else {
        panic!("expected a callee fault");
    };
    assert_eq!(fault.type_name, "DivideByZero");
}

#[test]
fn hyphen_arguments_reach_the_routine() {
    let fx = Fixture::new();
    let program = fx.module("TestProgram", PROGRAM);

    let (outcome, report) = fx.run(program, &["-h", "--", "x"]);

    assert_eq!(returned(outcome), Value::Int(0));
    assert!(report.contains("Arguments (3): \"-h\" \"--\" \"x\" \n"));
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::ErrorKind::BrokenPipe.into())
    }
}

#[test]
fn closed_output_ends_run_quietly() {
    let fx = Fixture::new();
    let library = fx.module("TestLibrary", LIBRARY);
    let params = RunParams {
        module_path: Some(library),
        rest: vec!["/e".into(), "DisplaySomethingOnScreen".into()],
    };
    let args = RunArgs::try_from(params).unwrap();

    run_to(&args, ClosedPipe, Colors::OFF);
}
