//! The thin outer driver: file mode when a path is given on the command
//! line, an interactive read-eval-print loop otherwise. Neither mode
//! carries any pipeline logic of its own — both delegate entirely to
//! `kestrel::ReplSession`.

use std::io::{self, Write};
use std::process::ExitCode;

use kestrel::ReplSession;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1) {
        Some(path) => run_file(path),
        None => run_interactive(),
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: could not read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let session = ReplSession::new();
    match session.execute_file(&source, "<file>") {
        Ok(outcome) => {
            println!("{}", outcome.render());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_interactive() -> ExitCode {
    let session = ReplSession::new();
    loop {
        let Some(line) = read_line("kestrel> ") else {
            return ExitCode::SUCCESS;
        };
        if line.trim().is_empty() {
            continue;
        }
        match session.execute(&line, "<repl>") {
            Ok(outcome) => println!("{}", outcome.render()),
            Err(err) => eprintln!("{err}"),
        }
    }
}

/// Reads one line from stdin, stripping the trailing newline. `None` on
/// EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    io::stdout().flush().ok()?;
    let mut buf = String::new();
    let bytes = io::stdin().read_line(&mut buf).ok()?;
    if bytes == 0 {
        return None;
    }
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Some(buf)
}
