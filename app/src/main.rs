mod cli;
mod commands;
mod config;
mod logging;
mod shell;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::Cli;
use crate::commands::App;
use crate::config::AppConfig;

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = App::open(AppConfig::from_args(cli.config)).and_then(|mut app| app.execute(cli.command));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code, retryable = e.retryable, "command failed");
            eprintln!("{}", shell::render_error(&e));
            ExitCode::FAILURE
        }
    }
}
