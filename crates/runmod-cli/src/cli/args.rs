//! Argument builders for the `runmod` command.

use std::path::PathBuf;

use clap::{Arg, value_parser};

/// Module to load (positional).
pub fn module_path_arg() -> Arg {
    Arg::new("module_path")
        .value_name("MODULE")
        .value_parser(value_parser!(PathBuf))
        .allow_hyphen_values(true)
        .help("Compiled module (.rmod)")
}
