//! CI platform context: repository identity and trigger kind.
//!
//! Built once from an [`EnvSnapshot`] and passed by reference to every
//! workflow step.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EnvSnapshot;
use crate::error::{ActionError, Result};

const BRANCH_REF_PREFIX: &str = "refs/heads/";
const PULL_REF_PREFIX: &str = "refs/pull/";

/// Repository identity (`owner/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` slug. Both halves must be non-empty.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(RepoId::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Event category that determines the session shape and output behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PullRequest,
    Push,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::PullRequest => f.write_str("pull_request"),
            TriggerKind::Push => f.write_str("push"),
        }
    }
}

/// What triggered this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerContext {
    PullRequest { branch: String, pr_number: u64 },
    Push { branch: String },
}

impl TriggerContext {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerContext::PullRequest { .. } => TriggerKind::PullRequest,
            TriggerContext::Push { .. } => TriggerKind::Push,
        }
    }

    pub fn branch(&self) -> &str {
        match self {
            TriggerContext::PullRequest { branch, .. } | TriggerContext::Push { branch } => branch,
        }
    }
}

/// Everything the workflow needs to know about the invoking CI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubContext {
    pub repository: RepoId,
    pub event_name: String,
    pub trigger: TriggerContext,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: Option<u64>,
    head: Option<HeadPayload>,
}

#[derive(Debug, Deserialize)]
struct HeadPayload {
    #[serde(rename = "ref")]
    ref_name: Option<String>,
}

impl GithubContext {
    /// Derive the context from `GITHUB_*` variables and the event payload.
    ///
    /// `base_branch` is the fallback branch for non pull-request events whose
    /// ref is not a branch.
    pub fn from_env(env: &EnvSnapshot, base_branch: &str) -> Result<Self> {
        let slug = env
            .get("GITHUB_REPOSITORY")
            .ok_or_else(|| ActionError::MissingContext("GITHUB_REPOSITORY is not set".into()))?;
        let repository = RepoId::parse(slug).ok_or_else(|| {
            ActionError::MissingContext(format!(
                "GITHUB_REPOSITORY must be of the form owner/name, got `{slug}`"
            ))
        })?;

        let event_name = env
            .get("GITHUB_EVENT_NAME")
            .ok_or_else(|| ActionError::MissingContext("GITHUB_EVENT_NAME is not set".into()))?
            .to_string();

        let trigger = if is_pull_request_event(&event_name) {
            let payload = env
                .get("GITHUB_EVENT_PATH")
                .map(|p| load_payload(Path::new(p)))
                .unwrap_or_default();
            pull_request_trigger(env, payload)?
        } else {
            push_trigger(env, base_branch)
        };

        debug!(
            repository = %repository,
            event = %event_name,
            branch = trigger.branch(),
            "Resolved CI context"
        );

        Ok(GithubContext {
            repository,
            event_name,
            trigger,
        })
    }
}

fn is_pull_request_event(event_name: &str) -> bool {
    matches!(event_name, "pull_request" | "pull_request_target")
}

fn load_payload(path: &Path) -> EventPayload {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read event payload");
            return EventPayload::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Cannot parse event payload");
        EventPayload::default()
    })
}

fn pull_request_trigger(env: &EnvSnapshot, payload: EventPayload) -> Result<TriggerContext> {
    let pr = payload.pull_request;

    let branch = env
        .get("GITHUB_HEAD_REF")
        .map(str::to_string)
        .or_else(|| {
            pr.as_ref()
                .and_then(|p| p.head.as_ref())
                .and_then(|h| h.ref_name.clone())
                .filter(|r| !r.is_empty())
        })
        .ok_or_else(|| {
            ActionError::MissingContext("pull request head branch is unknown".into())
        })?;

    let pr_number = pr
        .as_ref()
        .and_then(|p| p.number)
        .or_else(|| env.get("GITHUB_REF").and_then(pr_number_from_ref))
        .ok_or_else(|| ActionError::MissingContext("pull request number is unknown".into()))?;

    Ok(TriggerContext::PullRequest { branch, pr_number })
}

fn push_trigger(env: &EnvSnapshot, base_branch: &str) -> TriggerContext {
    let branch = match env.get("GITHUB_REF").and_then(branch_from_ref) {
        Some(branch) => {
            if branch != base_branch {
                warn!(
                    branch,
                    base_branch, "Run is not on the base branch; updating session for pushed branch"
                );
            }
            branch.to_string()
        }
        None => {
            warn!(
                git_ref = env.get("GITHUB_REF").unwrap_or(""),
                base_branch, "Ref is not a branch; using base branch"
            );
            base_branch.to_string()
        }
    };
    TriggerContext::Push { branch }
}

/// `refs/heads/<branch>` -> `<branch>`
pub fn branch_from_ref(git_ref: &str) -> Option<&str> {
    git_ref
        .strip_prefix(BRANCH_REF_PREFIX)
        .filter(|b| !b.is_empty())
}

/// `refs/pull/<n>/merge` -> `n`
pub fn pr_number_from_ref(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix(PULL_REF_PREFIX)?
        .split('/')
        .next()?
        .parse()
        .ok()
}
