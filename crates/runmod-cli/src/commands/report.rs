//! Run report written to stdout.
//!
//! Report lines carry a `[runmod]` prefix. Output of the invoked code goes
//! through the same writer unprefixed, via the [`Console`] impl.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use runmod_bytecode::{Module, RoutineDescriptor, VERSION, format_signature};
use runmod_core::Colors;
use runmod_vm::{Console, Fault, Value};

use super::entry::ResolutionFailure;
use super::loader::LoadError;

const PREFIX: &str = "[runmod]";

pub struct Reporter<W: Write> {
    out: W,
    colors: Colors,
    sleep: fn(Duration),
    /// False after invoked code wrote a partial line.
    at_line_start: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, colors: Colors) -> Self {
        Self {
            out,
            colors,
            sleep: std::thread::sleep,
            at_line_start: true,
        }
    }

    /// Replace the sleep used for the invoked code's `sleep`.
    pub fn sleep_with(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, color: &str, text: &str) -> io::Result<()> {
        if !self.at_line_start {
            writeln!(self.out)?;
            self.at_line_start = true;
        }
        let c = self.colors;
        for line in text.lines() {
            writeln!(self.out, "{}{PREFIX}{} {color}{line}{}", c.dim, c.reset, c.reset)?;
        }
        Ok(())
    }

    pub fn host_info(&mut self) -> io::Result<()> {
        self.line(
            "",
            &format!("OS: {} {}", std::env::consts::OS, std::env::consts::ARCH),
        )?;
        self.line(
            "",
            &format!(
                "Runtime: runmod {} (RMOD v{VERSION})",
                env!("CARGO_PKG_VERSION")
            ),
        )
    }

    pub fn load_failed(&mut self, error: &LoadError) -> io::Result<()> {
        self.line(self.colors.red, &error.to_string())
    }

    pub fn base_dir(&mut self, dir: &Path) -> io::Result<()> {
        self.line("", &format!("Base directory: {}", dir.display()))
    }

    pub fn module_loaded(&mut self, module: &Module, path: &Path) -> io::Result<()> {
        self.line(
            self.colors.dim,
            &format!("+ Module {} ({})", module.name(), path.display()),
        )
    }

    /// No routine to invoke: say why and list what could have been.
    pub fn entry_not_found(
        &mut self,
        module: &Module,
        failure: &ResolutionFailure,
    ) -> io::Result<()> {
        self.line(self.colors.red, &format!("Entry point not found: {failure}."))?;
        self.line("", "Available routines:")?;
        for routine in module.static_routines() {
            let signature = format_signature(routine, self.colors);
            self.line("", &format!("  {signature}"))?;
        }
        Ok(())
    }

    /// The routine that would be invoked, or a note that there is none.
    pub fn routine(&mut self, routine: Option<&RoutineDescriptor>) -> io::Result<()> {
        match routine {
            Some(r) => {
                let signature = format_signature(r, self.colors);
                self.line("", &format!("Routine: {signature}"))
            }
            None => self.line(self.colors.red, "Routine not found."),
        }
    }

    pub fn putting_arguments(&mut self, param: &str) -> io::Result<()> {
        self.line("", &format!("Putting arguments in parameter '{param}'."))
    }

    pub fn invoking(&mut self) -> io::Result<()> {
        self.line(self.colors.yellow, "Invoke routine")
    }

    pub fn outcome(&mut self, result: &Result<Value, Fault>) -> io::Result<()> {
        match result {
            Ok(value) => {
                let shown = match value.value_type() {
                    Some(ty) => format!("({ty}) {value}"),
                    None => "null".to_owned(),
                };
                self.line(
                    self.colors.green,
                    &format!("Routine invoked. Returned: {shown}"),
                )
            }
            Err(Fault::Callee(fault)) => {
                self.line(self.colors.red, "Invocation fault:")?;
                self.line("", &fault.type_name)?;
                self.line("", &fault.description)
            }
            Err(Fault::Host(fault)) => {
                self.line(self.colors.red, "Host fault:")?;
                self.line("", &fault.kind.to_string())?;
                self.line("", &fault.description)
            }
        }
    }

    pub fn finished(&mut self) -> io::Result<()> {
        self.line("", "Finished")?;
        self.out.flush()
    }
}

impl<W: Write> Console for Reporter<W> {
    fn print(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.at_line_start = true;
        Ok(())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        if !text.is_empty() {
            self.at_line_start = text.ends_with('\n');
        }
        self.out.flush()
    }

    fn sleep(&mut self, duration: Duration) {
        (self.sleep)(duration);
    }

    fn module_loaded(&mut self, module: &Module, path: &Path) -> io::Result<()> {
        Reporter::module_loaded(self, module, path)
    }
}
