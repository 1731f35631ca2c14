mod cli;
mod commands;

use cli::{RunParams, UsageError, build_cli};
use commands::run::RunArgs;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut cmd = build_cli();
    let params = match RunParams::parse_from(cmd.clone(), std::env::args_os()) {
        Ok(params) => params,
        Err(e) => e.exit(),
    };

    match RunArgs::try_from(params) {
        Ok(args) => commands::run::run(args),
        Err(UsageError::MissingModulePath) => {
            let _ = cmd.print_help();
        }
        Err(e) => {
            let _ = cmd.print_help();
            eprintln!("error: {e}");
        }
    }
}
