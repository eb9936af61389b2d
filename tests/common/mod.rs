//! Common test utilities for CLI tests.

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

pub struct Finished {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Write `source` to a temporary script file and run the `kava` binary on it.
pub fn run_kava(subcommand: &str, flags: &[&str], source: &str) -> Finished {
    let mut script = NamedTempFile::with_suffix(".kava").expect("Failed to create temp file");
    script
        .write_all(source.as_bytes())
        .expect("Failed to write script");

    let output = Command::new(env!("CARGO_BIN_EXE_kava"))
        .arg(subcommand)
        .args(flags)
        .arg(script.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute kava");

    Finished {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}
