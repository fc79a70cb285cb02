//! kubectl-edit-secret - Edit a secret with its values shown as plain text
//!
//! Usage:
//!   kubectl-edit-secret [OPTIONS] SECRET_NAME
//!   kubectl edit-secret [OPTIONS] SECRET_NAME     (as a kubectl plugin)

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use edit_secret::config::{ConnectionFlags, Overrides};
use edit_secret::outcome::report_fetch_error;
use edit_secret::{run, EditConfig, EditOptions, ExternalEditor, KubectlStore};
use secret_edit_core::Paths;

const DEFAULT_PROGRAM: &str = "kubectl-edit-secret";

#[derive(Parser, Debug)]
#[command(name = "kubectl-edit-secret")]
#[command(about = "Edit a Kubernetes secret in your editor with its values decoded to plain text")]
#[command(version)]
#[command(after_help = r#"EDITOR:
    The editor is taken from KUBE_EDITOR, then EDITOR, then falls back to vi
    (notepad on Windows). Commands with arguments such as "code --wait" are
    run through the shell.

SAFETY:
    - metadata.name, metadata.namespace and metadata.resourceVersion must not
      be changed; such edits are rejected
    - saving without changes makes no update
    - if anything goes wrong after the editor closes, the path of your
      edited copy is printed so nothing you typed is lost

CONFIG:
    ~/.config/kubectl-edit-secret/config.yaml (all fields optional):
      namespace: default
      kubectl: /usr/local/bin/kubectl
      editor_env: [KUBE_EDITOR, EDITOR]
      header: true
      artifact_dir: /tmp
      connection:
        context: my-cluster"#)]
struct Cli {
    /// Name of the secret to edit
    secret_name: String,

    /// Namespace of the secret (default: "default")
    #[arg(short = 'n', long)]
    namespace: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Kubeconfig cluster to use
    #[arg(long)]
    cluster: Option<String>,

    /// Kubeconfig user to use
    #[arg(long)]
    user: Option<String>,

    /// Address and port of the Kubernetes API server
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Time to wait for a single server request (e.g. 10s, 1m)
    #[arg(long)]
    request_timeout: Option<String>,

    /// kubectl binary to use instead of the one on PATH
    #[arg(long)]
    kubectl: Option<PathBuf>,

    /// Config file to read instead of the default one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Don't prepend help comments to the edited file
    #[arg(long)]
    no_header: bool,

    /// Log protocol steps to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            namespace: self.namespace.clone(),
            kubectl: self.kubectl.clone(),
            no_header: self.no_header,
            connection: ConnectionFlags {
                kubeconfig: self.kubeconfig.clone(),
                context: self.context.clone(),
                cluster: self.cluster.clone(),
                user: self.user.clone(),
                server: self.server.clone(),
                request_timeout: self.request_timeout.clone(),
            },
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(usage_exit_code(&e));
        }
    };
    init_logging(cli.verbose);

    let code = match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Help and version requests succeed; every usage error is a plain failure
fn usage_exit_code(e: &clap::Error) -> i32 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: &Cli) -> Result<i32> {
    let paths = Paths::new();
    let config = load_config(&paths, cli.config.as_deref())?.with_overrides(cli.overrides());

    let store = KubectlStore::new(&config).context("Init kubectl client failed.")?;
    let artifact_dir = config.artifact_dir.clone().unwrap_or(paths.scratch);
    let editor = ExternalEditor::from_env(&config.editor_env).in_dir(artifact_dir);
    let options = EditOptions::new(&program_name(), &config);

    match run(&store, &editor, &config.namespace, &cli.secret_name, &options) {
        Ok(outcome) => {
            outcome.report(&mut io::stdout().lock(), &mut io::stderr().lock())?;
            Ok(outcome.exit_code())
        }
        Err(e) => {
            report_fetch_error(&e, &mut io::stderr().lock())?;
            Ok(1)
        }
    }
}

/// An explicit `--config` must exist; the default location is optional
fn load_config(paths: &Paths, explicit: Option<&Path>) -> Result<EditConfig> {
    match explicit {
        Some(path) if !path.exists() => bail!("Config file not found: {}", path.display()),
        Some(path) => EditConfig::load_from(path),
        None => EditConfig::load_from(&paths.config_file()),
    }
}

/// Base name this binary was invoked as, used to name edit artifacts
fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string())
}
