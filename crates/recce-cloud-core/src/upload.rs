//! Artifact upload and completion notification.

use futures::future::join;
use tracing::{error, info};

use crate::api::SessionApi;
use crate::artifacts::{ArtifactDigest, ArtifactFile, ArtifactSet};
use crate::context::GithubContext;
use crate::error::{ActionError, Result};
use crate::session::Session;

/// Upload manifest and catalog to their pre-signed URLs concurrently.
///
/// Both uploads always run to completion. If either fails the run fails;
/// when both fail the manifest error is returned and the catalog error is
/// only logged. A successful upload is never rolled back.
pub async fn upload_artifacts(
    api: &dyn SessionApi,
    artifacts: &ArtifactSet,
    session: &Session,
) -> Result<()> {
    let (manifest, catalog) = join(
        upload_one(api, &artifacts.manifest, &session.manifest_upload_url),
        upload_one(api, &artifacts.catalog, &session.catalog_upload_url),
    )
    .await;

    match (manifest, catalog) {
        (Ok(()), Ok(())) => {
            info!(session_id = %session.session_id, "Uploaded manifest.json and catalog.json");
            Ok(())
        }
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(manifest_err), Err(catalog_err)) => {
            error!(error = %catalog_err, "catalog.json upload also failed");
            Err(manifest_err)
        }
    }
}

async fn upload_one(api: &dyn SessionApi, file: &ArtifactFile, url: &str) -> Result<()> {
    let body = file.read().await?;
    let digest = ArtifactDigest::from_bytes(&body);
    info!(
        file = file.name,
        bytes = body.len(),
        sha256 = digest.short(),
        "Uploading artifact"
    );

    api.upload_artifact(url, body)
        .await
        .map_err(|e| ActionError::UploadFailed {
            file: file.name.to_string(),
            status: e.status(),
            reason: e.to_string(),
        })
}

/// Tell Recce Cloud the session's artifacts are in place.
pub async fn notify_completion(
    api: &dyn SessionApi,
    ctx: &GithubContext,
    session_id: &str,
) -> Result<()> {
    api.upload_completed(&ctx.repository, session_id)
        .await
        .map_err(|e| ActionError::NotificationFailed {
            session_id: session_id.to_string(),
            endpoint: api.upload_completed_url(&ctx.repository),
            reason: e.to_string(),
        })?;

    info!(session_id, "Upload completion acknowledged");
    Ok(())
}
