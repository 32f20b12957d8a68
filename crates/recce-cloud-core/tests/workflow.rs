//! Workflow tests against the in-memory session API and sink.

use std::path::Path;

use recce_cloud_core::fakes::{ApiCall, MemorySessionApi, MemorySink};
use recce_cloud_core::{
    execute, run, ActionError, ActionInputs, EnvSnapshot, GithubContext, RepoId, RunConfig,
    SessionRequest, SessionResponse, TriggerContext, TriggerKind, WorkflowStage,
    SESSION_ID_OUTPUT,
};
use tempfile::{tempdir, TempDir};

const MANIFEST: &str = r#"{"metadata": {"adapter_type": "postgres", "dbt_version": "1.7.0"}, "nodes": {}}"#;
const CATALOG: &str = r#"{"metadata": {}, "nodes": {}, "sources": {}}"#;

fn target_dir(manifest: Option<&str>, catalog: Option<&str>) -> TempDir {
    let dir = tempdir().expect("tempdir");
    if let Some(content) = manifest {
        std::fs::write(dir.path().join("manifest.json"), content).expect("write manifest");
    }
    if let Some(content) = catalog {
        std::fs::write(dir.path().join("catalog.json"), content).expect("write catalog");
    }
    dir
}

fn config(target: &Path) -> RunConfig {
    RunConfig::resolve(
        &ActionInputs {
            dbt_target_path: Some(target.to_string_lossy().to_string()),
            web_host: Some("https://web.recce.test".to_string()),
            github_token: Some("token".to_string()),
            ..Default::default()
        },
        &EnvSnapshot::default(),
    )
    .expect("config")
}

fn pr_context() -> GithubContext {
    GithubContext {
        repository: RepoId::new("acme", "shop"),
        event_name: "pull_request".to_string(),
        trigger: TriggerContext::PullRequest {
            branch: "feature-x".to_string(),
            pr_number: 42,
        },
    }
}

fn push_context() -> GithubContext {
    GithubContext {
        repository: RepoId::new("acme", "shop"),
        event_name: "push".to_string(),
        trigger: TriggerContext::Push {
            branch: "main".to_string(),
        },
    }
}

#[tokio::test]
async fn test_pull_request_run_sets_output_and_link() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("sess-123");
    let sink = MemorySink::new();

    let outcome = run(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .expect("run succeeds");

    assert_eq!(outcome.session_id, "sess-123");
    assert_eq!(outcome.trigger, TriggerKind::PullRequest);
    assert_eq!(outcome.stage, WorkflowStage::Reported);
    assert_eq!(
        outcome.launch_url.as_deref(),
        Some("https://web.recce.test/launch/sess-123")
    );
    assert_eq!(sink.output(SESSION_ID_OUTPUT).as_deref(), Some("sess-123"));
    assert!(sink
        .summary()
        .contains("https://web.recce.test/launch/sess-123"));

    let calls = api.calls();
    assert_eq!(
        calls[0],
        ApiCall::TouchSession {
            repo: RepoId::new("acme", "shop"),
            request: SessionRequest::PullRequest {
                branch: "feature-x".to_string(),
                adapter_type: "postgres".to_string(),
                pr_number: 42,
            },
        }
    );
    assert_eq!(api.upload_count(), 2);
    assert_eq!(
        calls.last(),
        Some(&ApiCall::UploadCompleted {
            repo: RepoId::new("acme", "shop"),
            session_id: "sess-123".to_string(),
        })
    );
}

#[tokio::test]
async fn test_uploads_carry_file_contents() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("s");
    let sink = MemorySink::new();

    run(&config(dir.path()), &push_context(), &api, &sink)
        .await
        .expect("run succeeds");

    let uploads: Vec<(String, Vec<u8>)> = api
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ApiCall::UploadArtifact { url, body } => Some((url, body)),
            _ => None,
        })
        .collect();
    assert_eq!(uploads.len(), 2);
    for (url, body) in uploads {
        if url.ends_with("manifest.json") {
            assert_eq!(body, MANIFEST.as_bytes());
        } else {
            assert!(url.ends_with("catalog.json"));
            assert_eq!(body, CATALOG.as_bytes());
        }
    }
}

#[tokio::test]
async fn test_push_run_sets_no_output() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("base-1");
    let sink = MemorySink::new();

    let outcome = run(&config(dir.path()), &push_context(), &api, &sink)
        .await
        .expect("run succeeds");

    assert_eq!(outcome.trigger, TriggerKind::Push);
    assert!(outcome.launch_url.is_none());
    assert!(sink.outputs().is_empty());
    assert!(sink.summary().contains("base session updated"));
    assert!(matches!(
        &api.calls()[0],
        ApiCall::TouchSession { request: SessionRequest::Base { branch, .. }, .. } if branch == "main"
    ));
}

#[tokio::test]
async fn test_missing_catalog_makes_no_network_call() {
    let dir = target_dir(Some(MANIFEST), None);
    let api = MemorySessionApi::new("s");
    let sink = MemorySink::new();

    let err = execute(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::MissingArtifact { ref file, .. } if file == "catalog.json"));
    assert!(api.calls().is_empty());
    assert_eq!(sink.errors().len(), 1);
    assert!(sink.summary().contains("Missing dbt artifact"));
    assert!(sink.outputs().is_empty());
}

#[tokio::test]
async fn test_manifest_without_adapter_type_sends_no_request() {
    let dir = target_dir(Some(r#"{"metadata": {"dbt_version": "1.7.0"}}"#), Some(CATALOG));
    let api = MemorySessionApi::new("s");
    let sink = MemorySink::new();

    let err = run(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::MissingField { ref field, .. } if field == "metadata.adapter_type"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_manifest_is_parse_error() {
    let dir = target_dir(Some("{not json"), Some(CATALOG));
    let api = MemorySessionApi::new("s");
    let sink = MemorySink::new();

    let err = run(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::ParseError { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_incomplete_session_response_skips_uploads() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::with_response(SessionResponse {
        session_id: Some("s".to_string()),
        manifest_upload_url: Some("https://fake/m".to_string()),
        catalog_upload_url: None,
    });
    let sink = MemorySink::new();

    let err = execute(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();

    match err {
        ActionError::IncompleteSessionResponse {
            missing, branch, ..
        } => {
            assert_eq!(missing, vec!["catalog_upload_url"]);
            assert_eq!(branch, "feature-x");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(api.upload_count(), 0);
    assert!(sink.summary().contains("| Repository | `acme/shop` |"));
}

#[tokio::test]
async fn test_session_creation_failure_reports_context() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("s").failing_touch(500);
    let sink = MemorySink::new();

    let err = execute(&config(dir.path()), &push_context(), &api, &sink)
        .await
        .unwrap_err();

    match &err {
        ActionError::SessionCreationFailed {
            repository,
            branch,
            trigger,
            endpoint,
            reason,
        } => {
            assert_eq!(repository, "acme/shop");
            assert_eq!(branch, "main");
            assert_eq!(*trigger, TriggerKind::Push);
            assert!(endpoint.ends_with("/api/v2/github/acme/shop/touch-recce-session"));
            assert!(reason.contains("500"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let summary = sink.summary();
    assert!(summary.contains("| Event | `push` |"));
    assert!(summary.contains("touch-recce-session"));
    assert_eq!(api.upload_count(), 0);
}

#[tokio::test]
async fn test_failed_catalog_upload_skips_notification() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("s").failing_upload("catalog.json", 403);
    let sink = MemorySink::new();

    let err = execute(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();

    match err {
        ActionError::UploadFailed { file, status, .. } => {
            assert_eq!(file, "catalog.json");
            assert_eq!(status, Some(403));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The manifest upload still ran.
    assert_eq!(api.upload_count(), 2);
    assert_eq!(api.completion_count(), 0);
    assert!(sink.output(SESSION_ID_OUTPUT).is_none());
}

#[tokio::test]
async fn test_both_uploads_failing_reports_manifest() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("s")
        .failing_upload("manifest.json", 500)
        .failing_upload("catalog.json", 500);
    let sink = MemorySink::new();

    let err = run(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UploadFailed { ref file, .. } if file == "manifest.json"));
    assert_eq!(api.completion_count(), 0);
}

#[tokio::test]
async fn test_notification_failure_is_fatal_and_emits_no_output() {
    let dir = target_dir(Some(MANIFEST), Some(CATALOG));
    let api = MemorySessionApi::new("s-9").failing_completion(502);
    let sink = MemorySink::new();

    let err = execute(&config(dir.path()), &pr_context(), &api, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::NotificationFailed { ref session_id, .. } if session_id == "s-9"));
    assert_eq!(api.upload_count(), 2);
    assert!(sink.outputs().is_empty());
    assert!(!sink.summary().contains("/launch/"));
    assert!(sink.summary().contains("Upload completion notification failed"));
}
