//! Error taxonomy for the session upload workflow.
//!
//! Every variant is terminal for a run. Variants that carry diagnostic
//! detail expose it through [`ActionError::context`] so the reporter can
//! render it without matching on each case.

use std::path::PathBuf;

use thiserror::Error;

use crate::context::TriggerKind;

/// Errors that end a session upload run.
#[derive(Error, Debug)]
pub enum ActionError {
    /// A required dbt artifact is absent or unreadable
    #[error("{file} not found in {}: {reason}", dir.display())]
    MissingArtifact {
        file: String,
        dir: PathBuf,
        reason: String,
    },

    /// Artifact content is not valid JSON
    #[error("failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent from the manifest
    #[error("{} is missing required field `{field}`", path.display())]
    MissingField { path: PathBuf, field: String },

    /// The touch-session call did not produce a session
    #[error("failed to create or touch the Recce session for {repository}@{branch}: {reason}")]
    SessionCreationFailed {
        repository: String,
        branch: String,
        trigger: TriggerKind,
        endpoint: String,
        reason: String,
    },

    /// The session response lacks one of its required fields
    #[error("Recce session response is missing {}", missing.join(", "))]
    IncompleteSessionResponse {
        repository: String,
        branch: String,
        trigger: TriggerKind,
        endpoint: String,
        missing: Vec<&'static str>,
    },

    /// A pre-signed upload was not acknowledged
    #[error("failed to upload {file}: {reason}")]
    UploadFailed {
        file: String,
        status: Option<u16>,
        reason: String,
    },

    /// The upload-completed call failed
    #[error("failed to notify upload completion for session {session_id}: {reason}")]
    NotificationFailed {
        session_id: String,
        endpoint: String,
        reason: String,
    },

    /// No API token in the environment or inputs
    #[error("no API token found: set GITHUB_TOKEN or the github_token input")]
    MissingCredential,

    /// A required action input is absent
    #[error("required input `{0}` is not set")]
    MissingInput(&'static str),

    /// The CI platform context is incomplete
    #[error("invalid CI context: {0}")]
    MissingContext(String),

    /// Filesystem failure outside artifact verification
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ActionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ActionError::Io {
            path: path.into(),
            source,
        }
    }

    /// Diagnostic key/value pairs rendered into the failure report.
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            ActionError::MissingArtifact { file, dir, .. } => vec![
                ("File", file.clone()),
                ("Directory", dir.display().to_string()),
            ],
            ActionError::ParseError { path, .. }
            | ActionError::Io { path, .. } => vec![("File", path.display().to_string())],
            ActionError::MissingField { path, field } => vec![
                ("File", path.display().to_string()),
                ("Field", field.clone()),
            ],
            ActionError::SessionCreationFailed {
                repository,
                branch,
                trigger,
                endpoint,
                ..
            }
            | ActionError::IncompleteSessionResponse {
                repository,
                branch,
                trigger,
                endpoint,
                ..
            } => vec![
                ("Repository", repository.clone()),
                ("Branch", branch.clone()),
                ("Event", trigger.to_string()),
                ("Endpoint", endpoint.clone()),
            ],
            ActionError::UploadFailed { file, status, .. } => {
                let mut pairs = vec![("File", file.clone())];
                if let Some(status) = status {
                    pairs.push(("Status", status.to_string()));
                }
                pairs
            }
            ActionError::NotificationFailed {
                session_id,
                endpoint,
                ..
            } => vec![
                ("Session", session_id.clone()),
                ("Endpoint", endpoint.clone()),
            ],
            ActionError::MissingCredential
            | ActionError::MissingInput(_)
            | ActionError::MissingContext(_) => Vec::new(),
        }
    }

    /// Short title used as the heading of the failure report.
    pub fn title(&self) -> &'static str {
        match self {
            ActionError::MissingArtifact { .. } => "Missing dbt artifact",
            ActionError::ParseError { .. } => "Invalid dbt artifact",
            ActionError::MissingField { .. } => "Incomplete dbt manifest",
            ActionError::SessionCreationFailed { .. } => "Failed to create Recce session",
            ActionError::IncompleteSessionResponse { .. } => "Incomplete Recce session response",
            ActionError::UploadFailed { .. } => "Artifact upload failed",
            ActionError::NotificationFailed { .. } => "Upload completion notification failed",
            ActionError::MissingCredential => "Missing API token",
            ActionError::MissingInput(_) => "Missing input",
            ActionError::MissingContext(_) => "Invalid CI context",
            ActionError::Io { .. } => "I/O error",
        }
    }
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, ActionError>;
