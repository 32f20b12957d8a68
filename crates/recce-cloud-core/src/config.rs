//! Run configuration resolved once from action inputs and the environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ActionError, Result};

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_API_HOST: &str = "https://cloud.datarecce.io";
pub const DEFAULT_WEB_HOST: &str = "https://cloud.datarecce.io";

/// Environment variable consulted before the `github_token` input.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Immutable copy of the process environment.
///
/// Captured once at startup; every later lookup goes through this value
/// instead of `std::env`. Empty and whitespace-only values read as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSnapshot {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Raw action inputs before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    pub dbt_target_path: Option<String>,
    pub base_branch: Option<String>,
    pub api_host: Option<String>,
    pub web_host: Option<String>,
    pub github_token: Option<String>,
}

/// Per-run configuration. Immutable once resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub target_path: PathBuf,
    pub api_host: String,
    pub web_host: String,
    pub base_branch: String,
    pub auth_token: String,
}

impl RunConfig {
    /// Apply defaults and resolve the API token.
    ///
    /// The token comes from `GITHUB_TOKEN` when set, otherwise from the
    /// `github_token` input.
    pub fn resolve(inputs: &ActionInputs, env: &EnvSnapshot) -> Result<Self> {
        let target_path = non_empty(inputs.dbt_target_path.as_deref())
            .ok_or(ActionError::MissingInput("dbt_target_path"))?;

        let auth_token = env
            .get(TOKEN_ENV_VAR)
            .or_else(|| non_empty(inputs.github_token.as_deref()))
            .ok_or(ActionError::MissingCredential)?;

        Ok(RunConfig {
            target_path: PathBuf::from(target_path),
            api_host: host(inputs.api_host.as_deref(), DEFAULT_API_HOST),
            web_host: host(inputs.web_host.as_deref(), DEFAULT_WEB_HOST),
            base_branch: non_empty(inputs.base_branch.as_deref())
                .unwrap_or(DEFAULT_BASE_BRANCH)
                .to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Link to the session in the Recce Cloud web app.
    pub fn launch_url(&self, session_id: &str) -> String {
        format!("{}/launch/{}", self.web_host, session_id)
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("target_path", &self.target_path)
            .field("api_host", &self.api_host)
            .field("web_host", &self.web_host)
            .field("base_branch", &self.base_branch)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn host(value: Option<&str>, default: &str) -> String {
    non_empty(value)
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(target: &str) -> ActionInputs {
        ActionInputs {
            dbt_target_path: Some(target.to_string()),
            github_token: Some("input-token".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = RunConfig::resolve(&inputs("target"), &EnvSnapshot::default()).unwrap();
        assert_eq!(config.target_path, PathBuf::from("target"));
        assert_eq!(config.base_branch, "main");
        assert_eq!(config.api_host, "https://cloud.datarecce.io");
        assert_eq!(config.web_host, "https://cloud.datarecce.io");
        assert_eq!(config.auth_token, "input-token");
    }

    #[test]
    fn test_empty_inputs_fall_back_to_defaults() {
        let mut raw = inputs("target");
        raw.base_branch = Some("  ".to_string());
        raw.api_host = Some(String::new());
        let config = RunConfig::resolve(&raw, &EnvSnapshot::default()).unwrap();
        assert_eq!(config.base_branch, "main");
        assert_eq!(config.api_host, DEFAULT_API_HOST);
    }

    #[test]
    fn test_hosts_trailing_slash_trimmed() {
        let mut raw = inputs("target");
        raw.api_host = Some("http://localhost:8000/".to_string());
        raw.web_host = Some("http://localhost:3000//".to_string());
        let config = RunConfig::resolve(&raw, &EnvSnapshot::default()).unwrap();
        assert_eq!(config.api_host, "http://localhost:8000");
        assert_eq!(config.launch_url("abc"), "http://localhost:3000/launch/abc");
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let env = EnvSnapshot::from_pairs([("GITHUB_TOKEN", "env-token")]);
        let config = RunConfig::resolve(&inputs("target"), &env).unwrap();
        assert_eq!(config.auth_token, "env-token");
    }

    #[test]
    fn test_missing_credential() {
        let mut raw = inputs("target");
        raw.github_token = None;
        let env = EnvSnapshot::from_pairs([("GITHUB_TOKEN", "")]);
        let err = RunConfig::resolve(&raw, &env).unwrap_err();
        assert!(matches!(err, ActionError::MissingCredential));
    }

    #[test]
    fn test_missing_target_path() {
        let mut raw = inputs("target");
        raw.dbt_target_path = None;
        let err = RunConfig::resolve(&raw, &EnvSnapshot::default()).unwrap_err();
        assert!(matches!(err, ActionError::MissingInput("dbt_target_path")));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RunConfig::resolve(&inputs("target"), &EnvSnapshot::default()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("input-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
