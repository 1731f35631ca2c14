use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};
use runmod_bytecode::{Module, dump};
use runmod_core::{ColorChoice, Colors};

fn build_cli() -> Command {
    Command::new("runmod-asm")
        .about("Assemble .rasm source into an RMOD module")
        .arg(
            Arg::new("input")
                .value_name("SOURCE")
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .help("Assembler source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Output module (defaults to SOURCE with the .rmod extension)"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .action(ArgAction::SetTrue)
                .help("Print a dump of the assembled module"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("WHEN")
                .default_value("auto")
                .value_parser(["auto", "always", "never"])
                .help("Colorize output"),
        )
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();
    let Some(input) = matches.get_one::<PathBuf>("input").cloned() else {
        unreachable!("clap should have caught this");
    };
    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| input.with_extension("rmod"));
    let color = matches
        .get_one::<String>("color")
        .and_then(|c| ColorChoice::from_name(c))
        .unwrap_or_default()
        .should_colorize();

    let source = match std::fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}: {}", input.display(), e);
            std::process::exit(1);
        }
    };

    let bytes = match runmod_asm::assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            let path = input.display().to_string();
            eprintln!("{}", e.render(&source, Some(&path), color));
            std::process::exit(1);
        }
    };

    if matches.get_flag("dump") {
        match Module::from_bytes(bytes) {
            Ok(module) => print!("{}", dump(&module, Colors::new(color))),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = std::fs::write(&output, &bytes) {
        eprintln!("error: {}: {}", output.display(), e);
        std::process::exit(1);
    }
    tracing::debug!(path = %output.display(), "module written");
}
