//! Kava CLI entry point.

mod cli;

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command, Options};
use kava::diagnostics::print_diagnostic;
use kava::{Reply, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

/// Script evaluation recurses on the native stack.
const STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    let worker = std::thread::Builder::new()
        .name("kava".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || execute(cli));
    match worker.map(|handle| handle.join()) {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(_)) => ExitCode::from(101),
        Err(e) => {
            eprintln!("Error starting interpreter: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config(options: &Options) -> SessionConfig {
    SessionConfig::default()
        .public_only(options.public_only)
        .strict_exceptions(options.strict_exceptions)
}

fn execute(cli: Cli) -> u8 {
    let config = config(&cli.options);
    match cli.command {
        Command::Run { file } => with_source(&file, |path, source| {
            let mut session = Session::new(config);
            session.run(source).map(|_| ()).map_err(|e| print_diagnostic(&e, path, source))
        }),
        Command::Check { file } => with_source(&file, |path, source| {
            Session::new(config)
                .check(source)
                .map(|_| ())
                .map_err(|e| print_diagnostic(&e, path, source))
        }),
        Command::Ast { file } => with_source(&file, |path, source| {
            let nodes = kava::parse(source).map_err(|e| print_diagnostic(&e, path, source))?;
            print!("{}", kava::outline(source, &nodes));
            Ok(())
        }),
        Command::Repl => repl(config),
    }
}

fn with_source(file: &Path, action: impl FnOnce(&str, &str) -> Result<(), ()>) -> u8 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {}: {e}", file.display());
            return 2;
        }
    };
    let path = file.display().to_string();
    match action(&path, &source) {
        Ok(()) => 0,
        Err(()) => 1,
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

fn repl(config: SessionConfig) -> u8 {
    let mut session = Session::new(config);
    let mut pending = String::new();
    prompt("kava> ");
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                return 2;
            }
        };
        if pending.is_empty() && line.trim() == ":vars" {
            println!("{}", session.variables().join(" "));
            prompt("kava> ");
            continue;
        }
        pending.push_str(&line);
        pending.push('\n');
        match session.run(&pending) {
            Ok(Reply::Value { ty, text }) => println!("{text} ({ty})"),
            Ok(Reply::Nothing) => {}
            Err(e) if e.is_incomplete(&pending) => {
                prompt("  ... ");
                continue;
            }
            Err(e) => print_diagnostic(&e, "<repl>", &pending),
        }
        pending.clear();
        prompt("kava> ");
    }
    println!();
    0
}
