//! Configuration
//!
//! Built once at startup and passed down by reference:
//! defaults <- `~/.config/kubectl-edit-secret/config.yaml` <- command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::editor::DEFAULT_EDITOR_ENV;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditConfig {
    /// Namespace used when none is given on the command line
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Explicit kubectl binary; looked up on PATH when unset
    #[serde(default)]
    pub kubectl: Option<PathBuf>,

    /// Environment variables naming the editor, highest priority first
    #[serde(default = "default_editor_env")]
    pub editor_env: Vec<String>,

    /// Prepend help comments to the edit form
    #[serde(default = "default_header")]
    pub header: bool,

    /// Where edit artifacts are written; system temp dir when unset
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,

    #[serde(default)]
    pub connection: ConnectionFlags,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_editor_env() -> Vec<String> {
    DEFAULT_EDITOR_ENV.iter().map(|s| s.to_string()).collect()
}

fn default_header() -> bool {
    true
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kubectl: None,
            editor_env: default_editor_env(),
            header: default_header(),
            artifact_dir: None,
            connection: ConnectionFlags::default(),
        }
    }
}

/// Cluster connection settings, passed through to kubectl as flags
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionFlags {
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub request_timeout: Option<String>,
}

impl ConnectionFlags {
    /// Render as kubectl global flags
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(path) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", path.display()));
        }
        let named = [
            ("--context", &self.context),
            ("--cluster", &self.cluster),
            ("--user", &self.user),
            ("--server", &self.server),
            ("--request-timeout", &self.request_timeout),
        ];
        for (flag, value) in named {
            if let Some(value) = value {
                args.push(format!("{}={}", flag, value));
            }
        }
        args
    }

    /// Fields set in `other` replace ours
    fn overlay(&mut self, other: ConnectionFlags) {
        if other.kubeconfig.is_some() {
            self.kubeconfig = other.kubeconfig;
        }
        if other.context.is_some() {
            self.context = other.context;
        }
        if other.cluster.is_some() {
            self.cluster = other.cluster;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.request_timeout.is_some() {
            self.request_timeout = other.request_timeout;
        }
    }
}

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub kubectl: Option<PathBuf>,
    pub no_header: bool,
    pub connection: ConnectionFlags,
}

impl EditConfig {
    /// Load configuration from a specific path; a missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        Ok(config)
    }

    /// Apply command line values. An empty namespace means the default.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(namespace) = overrides.namespace {
            self.namespace = namespace;
        }
        if self.namespace.trim().is_empty() {
            self.namespace = default_namespace();
        }
        if overrides.kubectl.is_some() {
            self.kubectl = overrides.kubectl;
        }
        if overrides.no_header {
            self.header = false;
        }
        self.connection.overlay(overrides.connection);
        self
    }
}
