use std::io::{self, Write};
use std::path::PathBuf;

use runmod_core::Colors;
use runmod_vm::{Fault, Value};

use super::entry::resolve_entry;
use super::invoker::{invoke, marshal_arguments};
use super::loader::load;
use super::report::Reporter;

pub struct RunArgs {
    pub module_path: PathBuf,
    pub entry: Option<String>,
    pub show_only: bool,
    pub forwarded: Vec<String>,
    pub color: bool,
}

/// How far a run got.
#[derive(Debug)]
pub enum RunOutcome {
    LoadFailed,
    EntryNotFound,
    Shown,
    Invoked(Result<Value, Fault>),
}

pub fn run(args: RunArgs) {
    run_to(&args, io::stdout().lock(), Colors::new(args.color));
}

/// Run and report to `out`. Write failures end the report early but never
/// change the exit status.
pub fn run_to<W: Write>(args: &RunArgs, out: W, colors: Colors) {
    let mut reporter = Reporter::new(out, colors);
    match execute(args, &mut reporter) {
        Ok(RunOutcome::Invoked(Err(fault))) => tracing::debug!(%fault, "invocation faulted"),
        Ok(outcome) => tracing::debug!(?outcome, "run complete"),
        Err(e) => tracing::debug!(error = %e, "report output failed"),
    }
}

/// Load, resolve, invoke, report. Every outcome ends with "Finished".
pub fn execute<W: Write>(args: &RunArgs, reporter: &mut Reporter<W>) -> io::Result<RunOutcome> {
    reporter.host_info()?;

    let loaded = match load(&args.module_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            reporter.load_failed(&e)?;
            reporter.finished()?;
            return Ok(RunOutcome::LoadFailed);
        }
    };
    reporter.base_dir(&loaded.base_dir)?;
    reporter.module_loaded(&loaded.module, &loaded.path)?;

    let resolved = resolve_entry(&loaded.module, args.entry.as_deref());

    if args.show_only {
        reporter.routine(resolved.ok())?;
        reporter.finished()?;
        return Ok(RunOutcome::Shown);
    }

    let routine = match resolved {
        Ok(routine) => routine,
        Err(failure) => {
            reporter.entry_not_found(&loaded.module, &failure)?;
            reporter.finished()?;
            return Ok(RunOutcome::EntryNotFound);
        }
    };
    reporter.routine(Some(routine))?;

    let request = marshal_arguments(routine, &args.forwarded);
    if let Some(param) = request.args_param {
        reporter.putting_arguments(param)?;
    }
    reporter.invoking()?;
    let result = invoke(&loaded.module, request, &loaded.base_dir, reporter);
    reporter.outcome(&result)?;
    reporter.finished()?;

    Ok(RunOutcome::Invoked(result))
}
