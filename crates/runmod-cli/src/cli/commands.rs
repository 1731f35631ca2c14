//! Command definition for the CLI.

use clap::Command;

use super::args::*;

/// Build the `runmod` command.
pub fn build_cli() -> Command {
    Command::new("runmod")
        .about("Load a compiled module, resolve an entry routine and invoke it")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_help_flag(true)
        .disable_version_flag(true)
        .override_usage("runmod <MODULE> [/e <entry-name>] [/s] [arguments...]")
        .arg(module_path_arg())
        .after_help(
            r#"OPTIONS (after MODULE, case-insensitive):
  /e <entry-name>  search a static routine by qualified or bare name and invoke it
  /s               show the resolved routine without invoking it
  arguments        passed to the routine when its first parameter is string[]

EXAMPLES:
  runmod TestProgram.rmod one two           # intrinsic entry routine
  runmod TestLibrary.rmod /e ArgumentMoreThanFour a b c d e
  runmod TestLibrary.rmod /e TestLibrary.ClassTwo.DisplaySomethingOnScreen /s"#,
        )
}
