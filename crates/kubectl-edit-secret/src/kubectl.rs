//! Cluster-backed store that drives the `kubectl` binary
//!
//! `get secret -o json` to read, `replace -f -` to write. Replace sends the
//! resourceVersion we read, so the API server rejects the write if anyone
//! else updated the secret in between.

use secret_edit_core::{find_executable_in, run_with_input, CommandOutput};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

use crate::codec;
use crate::config::{ConnectionFlags, EditConfig};
use crate::resource::Secret;
use crate::store::{SecretStore, StoreError};

pub struct KubectlStore {
    program: PathBuf,
    connection: ConnectionFlags,
}

impl KubectlStore {
    /// Use the configured kubectl, or find one on PATH
    pub fn new(config: &EditConfig) -> Result<Self, StoreError> {
        Self::locate(config, std::env::var_os("PATH"))
    }

    fn locate(config: &EditConfig, search_path: Option<OsString>) -> Result<Self, StoreError> {
        let program = match &config.kubectl {
            Some(path) => path.clone(),
            None => find_executable_in("kubectl", search_path).ok_or(StoreError::KubectlNotFound)?,
        };
        Ok(Self::with_program(program, config.connection.clone()))
    }

    pub fn with_program(program: impl Into<PathBuf>, connection: ConnectionFlags) -> Self {
        Self {
            program: program.into(),
            connection,
        }
    }

    fn get_args(&self, namespace: &str, name: &str) -> Vec<String> {
        let mut args = self.connection.to_args();
        args.extend(
            ["get", "secret", name, "--namespace", namespace, "--output", "json"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    fn replace_args(&self, namespace: &str) -> Vec<String> {
        let mut args = self.connection.to_args();
        args.extend(
            ["replace", "--filename", "-", "--namespace", namespace, "--output", "json"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }

    fn run(&self, args: &[String], input: Option<&[u8]>) -> Result<CommandOutput, StoreError> {
        debug!(program = %self.program.display(), args = ?args, "running kubectl");
        run_with_input(&self.program, args, input).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::KubectlNotFound
            } else {
                StoreError::Io(e)
            }
        })
    }
}

impl SecretStore for KubectlStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        let output = self.run(&self.get_args(namespace, name), None)?;
        if !output.success() {
            return Err(classify_failure("kubectl get", &output.stderr_text(), namespace, name));
        }
        Ok(codec::from_wire(&output.stdout)?)
    }

    fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let body = codec::to_wire(secret)?;
        let output = self.run(&self.replace_args(secret.namespace()), Some(&body))?;
        if !output.success() {
            return Err(classify_failure(
                "kubectl replace",
                &output.stderr_text(),
                secret.namespace(),
                secret.name(),
            ));
        }
        Ok(codec::from_wire(&output.stdout)?)
    }
}

/// Map kubectl's stderr onto the store error taxonomy
fn classify_failure(command: &str, stderr: &str, namespace: &str, name: &str) -> StoreError {
    if stderr.contains("(NotFound)") {
        StoreError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    } else if stderr.contains("(Conflict)") || stderr.contains("the object has been modified") {
        StoreError::Conflict(stderr.to_string())
    } else if stderr.contains("(Forbidden)") {
        StoreError::Forbidden(stderr.to_string())
    } else {
        StoreError::Command {
            command: command.to_string(),
            stderr: stderr.to_string(),
        }
    }
}
