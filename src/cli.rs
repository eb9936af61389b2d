//! Command-line interface for Kava.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kava")]
#[command(about = "Kava scripting language interpreter", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: Options,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Debug)]
pub struct Options {
    /// Hide non-public host members
    #[arg(long, global = true)]
    pub public_only: bool,

    /// Require checked exceptions to be caught at top level
    #[arg(long, global = true)]
    pub strict_exceptions: bool,

    /// Log evaluation details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate a script file
    Run { file: PathBuf },
    /// Type-check a script file without running it
    Check { file: PathBuf },
    /// Print the constructed syntax tree of a script file
    Ast { file: PathBuf },
    /// Read submissions from standard input
    #[command(alias = "shell")]
    Repl,
}
