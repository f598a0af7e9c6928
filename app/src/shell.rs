use std::io::{self, BufRead, Write};

use clap::Parser;
use fibot_core::error::AppError;

use crate::cli::{Command, ShellLine};
use crate::commands::App;

const PROMPT: &str = "fibot> ";

/// Read commands from stdin until `exit` or end of input. One `App` serves the
/// whole session, so the answer on display, the read cache and the advisor
/// throttle carry over between lines.
pub fn run(app: &mut App) -> Result<(), AppError> {
    println!("Fibot shell. Type `help` for commands, `exit` to leave.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{PROMPT}");
        io::stdout().flush().map_err(|e| {
            AppError::new("SHELL_IO_FAILED", "Failed to write prompt").with_details(e.to_string())
        })?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };
        let line = line.map_err(|e| {
            AppError::new("SHELL_IO_FAILED", "Failed to read input").with_details(e.to_string())
        })?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first().copied() {
            None => continue,
            Some("exit" | "quit") => return Ok(()),
            Some(_) => {}
        }

        let parsed = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(p) => p,
            Err(e) => {
                // Help and usage errors print themselves.
                let _ = e.print();
                continue;
            }
        };
        if matches!(parsed.command, Command::Shell) {
            println!("Already in the shell.");
            continue;
        }
        if let Err(e) = app.execute(parsed.command) {
            tracing::debug!(code = %e.code, "shell command failed");
            eprintln!("{}", render_error(&e));
        }
    }
}

pub fn render_error(e: &AppError) -> String {
    match &e.details {
        Some(d) => format!("[{}] {} ({})", e.code, e.message, d),
        None => format!("[{}] {}", e.code, e.message),
    }
}
