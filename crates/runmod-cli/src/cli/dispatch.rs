//! Dispatch logic: extract params from ArgMatches and scan the slash flags.
//!
//! clap only sees the module path. Everything after it is taken verbatim
//! (`-h`, `--` and the like included) and scanned here for the slash-style,
//! case-insensitive `/e` and `/s`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgMatches, Command};

use crate::commands::run::RunArgs;

pub struct RunParams {
    pub module_path: Option<PathBuf>,
    pub rest: Vec<String>,
}

impl RunParams {
    /// Split a raw command line (program name first) at the module path.
    pub fn parse_from<I, T>(cmd: Command, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut head: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let rest = head.split_off(head.len().min(2));
        let matches = cmd.try_get_matches_from(head)?;
        Ok(Self::from_matches(&matches, rest))
    }

    pub fn from_matches(m: &ArgMatches, rest: Vec<OsString>) -> Self {
        Self {
            module_path: m.get_one::<PathBuf>("module_path").cloned(),
            rest: rest
                .into_iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("missing module path")]
    MissingModulePath,
    #[error("`/e` must be followed by an entry routine name")]
    MissingEntryName,
}

/// The command line after flag scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub module_path: PathBuf,
    pub entry: Option<String>,
    pub show_only: bool,
    pub forwarded: Vec<String>,
}

/// Scan the arguments after the module path.
///
/// `/e <name>` sets the entry search text (the last one wins), `/s` turns on
/// show-only and ends the scan. Everything else is forwarded in order.
pub fn parse_invocation(module_path: PathBuf, rest: &[String]) -> Result<Invocation, UsageError> {
    let mut invocation = Invocation {
        module_path,
        entry: None,
        show_only: false,
        forwarded: Vec::new(),
    };

    let mut tokens = rest.iter();
    while let Some(token) = tokens.next() {
        if token.eq_ignore_ascii_case("/e") {
            let name = tokens.next().ok_or(UsageError::MissingEntryName)?;
            invocation.entry = Some(name.clone());
        } else if token.eq_ignore_ascii_case("/s") {
            invocation.show_only = true;
            break;
        } else {
            invocation.forwarded.push(token.clone());
        }
    }

    tracing::debug!(
        entry = ?invocation.entry,
        show_only = invocation.show_only,
        forwarded = invocation.forwarded.len(),
        "parsed command line"
    );
    Ok(invocation)
}

impl TryFrom<RunParams> for RunArgs {
    type Error = UsageError;

    fn try_from(p: RunParams) -> Result<Self, Self::Error> {
        let module_path = p.module_path.ok_or(UsageError::MissingModulePath)?;
        let invocation = parse_invocation(module_path, &p.rest)?;
        Ok(Self {
            module_path: invocation.module_path,
            entry: invocation.entry,
            show_only: invocation.show_only,
            forwarded: invocation.forwarded,
            color: runmod_core::ColorChoice::Auto.should_colorize(),
        })
    }
}
