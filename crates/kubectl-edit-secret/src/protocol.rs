//! The edit round trip
//!
//! fetch -> edit form -> editor -> change detection -> parse -> validate ->
//! persist. Every step after the editor keeps hold of the artifact path so a
//! failure can point the user at their work.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{self, ParseError};
use crate::config::EditConfig;
use crate::detect;
use crate::editor::{Editor, EditorErrorKind};
use crate::outcome::Outcome;
use crate::resource::Secret;
use crate::store::{SecretStore, StoreError};
use crate::validate::{self, ValidationError};

pub const ARTIFACT_SUFFIX: &str = ".yaml";

/// Why an edit did not produce an update
#[derive(Error, Debug)]
pub enum EditError {
    #[error("failed to render secret for editing: {0}")]
    Encode(#[source] ParseError),

    #[error(transparent)]
    Editor(#[from] EditorErrorKind),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Identity(#[from] ValidationError),

    #[error(transparent)]
    Persist(#[from] StoreError),
}

/// A failed edit and the file holding what the user typed, if any
#[derive(Error, Debug)]
#[error("{error}")]
pub struct EditFailure {
    pub error: EditError,
    pub artifact: Option<PathBuf>,
}

impl EditFailure {
    fn at(artifact: &Path, error: impl Into<EditError>) -> Self {
        Self {
            error: error.into(),
            artifact: Some(artifact.to_path_buf()),
        }
    }
}

/// Result of a completed edit session
#[derive(Debug)]
pub enum EditOutcome {
    Changed { secret: Secret, artifact: PathBuf },
    Unchanged { artifact: PathBuf },
}

/// Knobs for one edit session
#[derive(Debug, Clone)]
pub struct EditOptions {
    /// Prepend help comments to the edit form
    pub header: bool,
    /// Artifact file name prefix, `<program>-edit-`
    pub artifact_prefix: String,
}

impl EditOptions {
    pub fn new(program: &str, config: &EditConfig) -> Self {
        Self {
            header: config.header,
            artifact_prefix: format!("{}-edit-", program),
        }
    }
}

impl Default for EditOptions {
    fn default() -> Self {
        Self::new("kubectl-edit-secret", &EditConfig::default())
    }
}

/// Let the user edit `original` and return the validated result.
///
/// Does not touch the store.
pub fn edit_secret(original: &Secret, editor: &dyn Editor, options: &EditOptions) -> Result<EditOutcome, EditFailure> {
    let form = codec::to_edit_form(original, options.header).map_err(|e| EditFailure {
        error: EditError::Encode(e),
        artifact: None,
    })?;

    let edited = editor
        .launch(&options.artifact_prefix, ARTIFACT_SUFFIX, &form)
        .map_err(|e| EditFailure {
            error: EditError::Editor(e.kind),
            artifact: e.artifact,
        })?;
    let artifact = edited.artifact;

    if !detect::changed(&form, &edited.bytes) {
        debug!(artifact = %artifact.display(), "no changes detected");
        return Ok(EditOutcome::Unchanged { artifact });
    }

    let secret = codec::from_edit_form(&edited.bytes).map_err(|e| EditFailure::at(&artifact, e))?;
    validate::validate(original, &secret).map_err(|e| {
        info!(field = e.field(), "edit touched identity metadata");
        EditFailure::at(&artifact, e)
    })?;

    debug!(keys = secret.payload.len(), "edit validated");
    Ok(EditOutcome::Changed { secret, artifact })
}

/// Fetch failure; fatal before any editing happens
#[derive(Error, Debug)]
#[error("Fetch {namespace}/{name} failed.")]
pub struct FetchError {
    pub namespace: String,
    pub name: String,
    #[source]
    pub source: StoreError,
}

/// One full invocation: fetch, edit, persist.
///
/// Never retries. Returns `Err` only when the secret could not be fetched;
/// every later failure is an [`Outcome::CancelledInvalid`].
pub fn run(
    store: &dyn SecretStore,
    editor: &dyn Editor,
    namespace: &str,
    name: &str,
    options: &EditOptions,
) -> Result<Outcome, FetchError> {
    let original = store.get(namespace, name).map_err(|source| FetchError {
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    })?;
    info!(secret = %original.qualified_name(), resource_version = original.resource_version(), "fetched");

    let outcome = match edit_secret(&original, editor, options) {
        Ok(EditOutcome::Unchanged { .. }) => Outcome::CancelledNoChange,
        Ok(EditOutcome::Changed { secret, artifact }) => match store.update(&secret) {
            Ok(stored) => {
                info!(secret = %stored.qualified_name(), resource_version = stored.resource_version(), "updated");
                Outcome::Updated {
                    namespace: stored.namespace().to_string(),
                    name: stored.name().to_string(),
                }
            }
            Err(e) => Outcome::CancelledInvalid(EditFailure::at(&artifact, e)),
        },
        Err(failure) => Outcome::CancelledInvalid(failure),
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Edited, EditorError};
    use crate::resource::SecretValue;
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    /// Editor stand-in that applies a text transform to the buffer
    struct ScriptedEditor<F: Fn(&str) -> String> {
        transform: F,
        seen: RefCell<Option<String>>,
    }

    impl<F: Fn(&str) -> String> ScriptedEditor<F> {
        fn new(transform: F) -> Self {
            Self {
                transform,
                seen: RefCell::new(None),
            }
        }
    }

    impl<F: Fn(&str) -> String> Editor for ScriptedEditor<F> {
        fn launch(&self, prefix: &str, suffix: &str, initial: &[u8]) -> Result<Edited, EditorError> {
            let text = String::from_utf8(initial.to_vec()).unwrap();
            *self.seen.borrow_mut() = Some(text.clone());
            Ok(Edited {
                bytes: (self.transform)(&text).into_bytes(),
                artifact: PathBuf::from(format!("/tmp/{}test{}", prefix, suffix)),
            })
        }
    }

    struct BrokenEditor;

    impl Editor for BrokenEditor {
        fn launch(&self, _: &str, _: &str, _: &[u8]) -> Result<Edited, EditorError> {
            Err(EditorError {
                artifact: Some(PathBuf::from("/tmp/kept.yaml")),
                kind: EditorErrorKind::NotFound("nvim".into()),
            })
        }
    }

    fn db_pass() -> Secret {
        Secret::new("default", "db-pass", "v1").with_value("password", "secret123")
    }

    fn store() -> MemoryStore {
        MemoryStore::new().with_secret(db_pass())
    }

    fn run_with<F: Fn(&str) -> String>(store: &MemoryStore, transform: F) -> Outcome {
        let editor = ScriptedEditor::new(transform);
        run(store, &editor, "default", "db-pass", &EditOptions::default()).unwrap()
    }

    #[test]
    fn test_value_change_is_persisted() {
        let store = store();
        let outcome = run_with(&store, |s| s.replace("secret123", "secret456"));

        assert!(matches!(outcome, Outcome::Updated { ref namespace, ref name } if namespace == "default" && name == "db-pass"));
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].resource_version(), "v1");
        assert_eq!(updates[0].payload.get("password"), Some(&SecretValue::from("secret456")));
        assert_eq!(updates[0].payload.len(), 1);
    }

    #[test]
    fn test_untouched_save_is_no_change() {
        let store = store();
        let outcome = run_with(&store, |s| s.to_string());
        assert!(matches!(outcome, Outcome::CancelledNoChange));
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_comments_and_whitespace_are_no_change() {
        let store = store();
        let outcome = run_with(&store, |s| format!("# reviewed\n{}\n\n# still fine\n", s.trim_end()));
        assert!(matches!(outcome, Outcome::CancelledNoChange));
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_name_change_is_rejected() {
        let store = store();
        let outcome = run_with(&store, |s| s.replace("name: db-pass", "name: db-pass-copy"));

        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Identity(ref e) if e.field() == "name"));
                let artifact = failure.artifact.unwrap();
                assert!(!artifact.as_os_str().is_empty());
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_resource_version_change_is_rejected() {
        let store = store();
        let outcome = run_with(&store, |s| s.replace("resourceVersion: v1", "resourceVersion: v2"));
        assert_eq!(outcome.invalid_field(), Some("resourceVersion"));
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_namespace_change_is_rejected() {
        let store = store();
        let outcome = run_with(&store, |s| s.replace("namespace: default", "namespace: kube-system"));
        assert_eq!(outcome.invalid_field(), Some("namespace"));
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_malformed_edit_keeps_artifact() {
        let store = store();
        let outcome = run_with(&store, |s| format!("{}\n  - : [", s));
        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Parse(_)));
                assert!(failure.artifact.is_some());
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
        assert!(store.updates().is_empty());
    }

    #[test]
    fn test_unquoted_number_is_not_persisted() {
        let store = store();
        let outcome = run_with(&store, |s| s.replace("password: secret123", "password: 0x1F"));
        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Parse(ParseError::Yaml(_))));
                assert!(failure.artifact.is_some());
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
        assert!(store.updates().is_empty());
        let stored = store.get("default", "db-pass").unwrap();
        assert_eq!(stored.payload.get("password"), Some(&SecretValue::from("secret123")));
    }

    #[test]
    fn test_emptied_file_is_invalid() {
        let store = store();
        let outcome = run_with(&store, |_| String::new());
        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Parse(ParseError::Empty)));
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
    }

    #[test]
    fn test_added_and_removed_keys() {
        let store = MemoryStore::new().with_secret(db_pass().with_value("legacy", "x"));
        let outcome = run_with(&store, |s| s.replace("  legacy: x\n", "  user: admin\n"));

        assert!(matches!(outcome, Outcome::Updated { .. }));
        let stored = store.get("default", "db-pass").unwrap();
        assert!(stored.payload.get("legacy").is_none());
        assert_eq!(stored.payload.get("user"), Some(&SecretValue::from("admin")));
    }

    #[test]
    fn test_editor_sees_plain_text_and_header() {
        let editor = ScriptedEditor::new(|s| s.to_string());
        let options = EditOptions::new("kubectl-edit-secret", &EditConfig::default());
        edit_secret(&db_pass(), &editor, &options).unwrap();

        let seen = editor.seen.borrow().clone().unwrap();
        assert!(seen.starts_with("#"));
        assert!(seen.contains("password: secret123"));
    }

    #[test]
    fn test_header_can_be_disabled() {
        let editor = ScriptedEditor::new(|s| s.to_string());
        let config = EditConfig {
            header: false,
            ..Default::default()
        };
        edit_secret(&db_pass(), &editor, &EditOptions::new("kes", &config)).unwrap();
        assert!(editor.seen.borrow().as_ref().unwrap().starts_with("apiVersion"));
    }

    #[test]
    fn test_artifact_prefix_uses_program_name() {
        let editor = ScriptedEditor::new(|s| s.to_string());
        let outcome = edit_secret(&db_pass(), &editor, &EditOptions::new("kes", &EditConfig::default())).unwrap();
        match outcome {
            EditOutcome::Unchanged { artifact } => assert_eq!(artifact, PathBuf::from("/tmp/kes-edit-test.yaml")),
            other => panic!("expected Unchanged, got {:?}", other),
        }
    }

    #[test]
    fn test_editor_failure_keeps_artifact() {
        let store = store();
        let outcome = run(&store, &BrokenEditor, "default", "db-pass", &EditOptions::default()).unwrap();
        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Editor(EditorErrorKind::NotFound(_))));
                assert_eq!(failure.artifact, Some(PathBuf::from("/tmp/kept.yaml")));
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
    }

    #[test]
    fn test_persist_conflict_keeps_artifact() {
        let store = store();
        // someone else writes between our fetch and our update
        let editor = ScriptedEditor::new(|s| s.replace("secret123", "mine"));
        let racing = RacingStore { inner: &store };
        let outcome = run(&racing, &editor, "default", "db-pass", &EditOptions::default()).unwrap();

        match outcome {
            Outcome::CancelledInvalid(failure) => {
                assert!(matches!(failure.error, EditError::Persist(StoreError::Conflict(_))));
                assert!(failure.artifact.is_some());
            }
            other => panic!("expected CancelledInvalid, got {:?}", other),
        }
    }

    /// Store whose secret changes on the server right after it is read
    struct RacingStore<'a> {
        inner: &'a MemoryStore,
    }

    impl SecretStore for RacingStore<'_> {
        fn get(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
            let secret = self.inner.get(namespace, name)?;
            let mut theirs = secret.clone();
            theirs.payload.insert("password", "theirs");
            self.inner.update(&theirs)?;
            Ok(secret)
        }

        fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
            self.inner.update(secret)
        }
    }

    #[test]
    fn test_fetch_failure() {
        let store = MemoryStore::new();
        let editor = ScriptedEditor::new(|s| s.to_string());
        let err = run(&store, &editor, "default", "missing", &EditOptions::default()).unwrap_err();

        assert_eq!(err.to_string(), "Fetch default/missing failed.");
        assert!(matches!(err.source, StoreError::NotFound { .. }));
        assert!(editor.seen.borrow().is_none());
    }
}
