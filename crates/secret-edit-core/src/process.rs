//! Process management utilities

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of a finished child process
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Stderr as trimmed text, for error messages
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Locate an executable in a `PATH`-style search list
pub fn find_executable_in<P: AsRef<OsStr>>(name: &str, search_path: Option<P>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, search_path, cwd).ok()
}

/// Run `program` to completion, optionally feeding `input` on stdin.
///
/// Blocks until the child exits. Stdout and stderr are captured; a
/// non-zero exit is not an error here, callers inspect `status`.
pub fn run_with_input<I, S>(program: &Path, args: I, input: Option<&[u8]>) -> io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(bytes) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes)?;
            // stdin dropped here so the child sees EOF
        }
    }

    let output = child.wait_with_output()?;
    Ok(CommandOutput {
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
