//! Editor session
//!
//! Hands a buffer to an interactive editor through a temporary file and
//! reads it back once the editor exits. The file is created before the
//! editor starts and is never removed here: its path travels with every
//! result, success or failure, so the user can recover what they typed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Environment variables consulted for the editor, highest priority first
pub const DEFAULT_EDITOR_ENV: &[&str] = &["KUBE_EDITOR", "EDITOR"];

#[cfg(windows)]
pub const PLATFORM_EDITOR: &str = "notepad";
#[cfg(not(windows))]
pub const PLATFORM_EDITOR: &str = "vi";

/// Result of a finished editing session
#[derive(Debug, Clone)]
pub struct Edited {
    pub bytes: Vec<u8>,
    pub artifact: PathBuf,
}

#[derive(Error, Debug)]
pub enum EditorErrorKind {
    #[error("failed to create temporary file: {0}")]
    TempFile(#[source] io::Error),

    #[error("editor {0:?} not found")]
    NotFound(String),

    #[error("failed to launch editor {command:?}: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("editor {command:?} exited with {status}")]
    Exit { command: String, status: ExitStatus },

    #[error("failed to read edited file: {0}")]
    Read(#[source] io::Error),
}

/// Editor failure, with the artifact path if the file was already created
#[derive(Error, Debug)]
#[error("{kind}")]
pub struct EditorError {
    pub artifact: Option<PathBuf>,
    pub kind: EditorErrorKind,
}

impl EditorError {
    fn new(artifact: Option<PathBuf>, kind: EditorErrorKind) -> Self {
        Self { artifact, kind }
    }
}

/// Capability to let the user edit a buffer
pub trait Editor {
    /// Write `initial` to a fresh `<prefix>*<suffix>` file, let the user edit
    /// it, and return the saved contents. Blocks until the editor exits.
    fn launch(&self, prefix: &str, suffix: &str, initial: &[u8]) -> Result<Edited, EditorError>;
}

/// The user's own editor, run as a child process
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
    dir: Option<PathBuf>,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            dir: None,
        }
    }

    /// Pick the editor from the first non-empty variable in `vars`
    pub fn from_env<S: AsRef<str>>(vars: &[S]) -> Self {
        Self::new(resolve_command(vars, |name| std::env::var(name).ok()))
    }

    /// Create edit artifacts in `dir` instead of the system temp dir
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// A command with arguments or spaces goes through the shell, with the
    /// file passed as `$1`.
    fn build(&self, path: &Path) -> Command {
        if self.command.trim().contains(char::is_whitespace) {
            shell_command(&self.command, path)
        } else {
            let mut cmd = Command::new(self.command.trim());
            cmd.arg(path);
            cmd
        }
    }

    fn create_artifact(&self, prefix: &str, suffix: &str, initial: &[u8]) -> Result<PathBuf, EditorError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        let temp = match &self.dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| EditorError::new(None, EditorErrorKind::TempFile(e)))?;
                builder.tempfile_in(dir)
            }
            None => builder.tempfile(),
        }
        .map_err(|e| EditorError::new(None, EditorErrorKind::TempFile(e)))?;

        let (mut file, path) = temp
            .keep()
            .map_err(|e| EditorError::new(None, EditorErrorKind::TempFile(e.error)))?;

        file.write_all(initial)
            .and_then(|_| file.flush())
            .map_err(|e| EditorError::new(Some(path.clone()), EditorErrorKind::TempFile(e)))?;

        Ok(path)
    }
}

impl Default for ExternalEditor {
    fn default() -> Self {
        Self::from_env(DEFAULT_EDITOR_ENV)
    }
}

impl Editor for ExternalEditor {
    fn launch(&self, prefix: &str, suffix: &str, initial: &[u8]) -> Result<Edited, EditorError> {
        let path = self.create_artifact(prefix, suffix, initial)?;
        debug!(editor = %self.command, artifact = %path.display(), "launching editor");

        let status = self.build(&path).status().map_err(|e| {
            let kind = if e.kind() == io::ErrorKind::NotFound {
                EditorErrorKind::NotFound(self.command.clone())
            } else {
                EditorErrorKind::Launch {
                    command: self.command.clone(),
                    source: e,
                }
            };
            EditorError::new(Some(path.clone()), kind)
        })?;

        if !status.success() {
            return Err(EditorError::new(
                Some(path),
                EditorErrorKind::Exit {
                    command: self.command.clone(),
                    status,
                },
            ));
        }

        let bytes = fs::read(&path).map_err(|e| EditorError::new(Some(path.clone()), EditorErrorKind::Read(e)))?;
        debug!(bytes = bytes.len(), "editor exited");
        Ok(Edited { bytes, artifact: path })
    }
}

/// First non-blank value among `vars`, else the platform editor
pub fn resolve_command<S, F>(vars: &[S], lookup: F) -> String
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<String>,
{
    vars.iter()
        .filter_map(|name| lookup(name.as_ref()))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| PLATFORM_EDITOR.to_string())
}

#[cfg(not(windows))]
fn shell_command(editor: &str, path: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(format!("{} \"$1\"", editor)).arg("sh").arg(path);
    cmd
}

#[cfg(windows)]
fn shell_command(editor: &str, path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(format!("{} \"{}\"", editor, path.display()));
    cmd
}
