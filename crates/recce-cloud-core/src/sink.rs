//! CI platform sinks: job summary, step outputs, error annotations.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EnvSnapshot;
use crate::error::{ActionError, Result};

/// Where the workflow publishes user-facing results.
pub trait ActionSink: Send + Sync {
    /// Append markdown to the job summary.
    fn append_summary(&self, markdown: &str) -> Result<()>;

    /// Expose a named output value to later steps.
    fn set_output(&self, name: &str, value: &str) -> Result<()>;

    /// Surface an error annotation in the CI log.
    fn annotate_error(&self, message: &str);
}

/// GitHub Actions file-command sink.
///
/// Appends to `$GITHUB_STEP_SUMMARY` and `$GITHUB_OUTPUT`. When either
/// variable is unset (local runs) the content goes to stdout instead.
#[derive(Debug, Clone, Default)]
pub struct GithubActionsSink {
    summary_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
}

impl GithubActionsSink {
    pub fn new(summary_path: Option<PathBuf>, output_path: Option<PathBuf>) -> Self {
        GithubActionsSink {
            summary_path,
            output_path,
        }
    }

    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self::new(
            env.get("GITHUB_STEP_SUMMARY").map(PathBuf::from),
            env.get("GITHUB_OUTPUT").map(PathBuf::from),
        )
    }
}

impl ActionSink for GithubActionsSink {
    fn append_summary(&self, markdown: &str) -> Result<()> {
        match &self.summary_path {
            Some(path) => append(path, &format!("{markdown}\n")),
            None => {
                println!("{markdown}");
                Ok(())
            }
        }
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match &self.output_path {
            Some(path) => {
                debug!(name, "Writing step output");
                append(path, &output_command(name, value, &Uuid::new_v4()))
            }
            None => {
                info!(name, value, "Step output (GITHUB_OUTPUT not set)");
                println!("{name}={value}");
                Ok(())
            }
        }
    }

    fn annotate_error(&self, message: &str) {
        println!("::error::{}", escape_command_data(message));
    }
}

fn append(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ActionError::io(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| ActionError::io(path, e))
}

/// Heredoc-style `GITHUB_OUTPUT` entry; safe for values with newlines.
pub fn output_command(name: &str, value: &str, nonce: &Uuid) -> String {
    let delimiter = format!("ghadelimiter_{nonce}");
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Escape a workflow-command message (`%`, CR, LF).
pub fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
