//! dbt artifact verification.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ActionError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CATALOG_FILE: &str = "catalog.json";

/// SHA-256 digest of an artifact's bytes (lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ArtifactDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A verified artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub name: &'static str,
    pub path: PathBuf,
}

impl ArtifactFile {
    /// Read the full file for upload.
    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ActionError::io(&self.path, e))
    }
}

/// The manifest/catalog pair found in a dbt target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub dir: PathBuf,
    pub manifest: ArtifactFile,
    pub catalog: ArtifactFile,
}

impl ArtifactSet {
    /// Confirm both artifacts exist and are readable.
    ///
    /// The manifest is checked first, so when both are absent the error
    /// names `manifest.json`.
    pub fn verify(dir: &Path) -> Result<Self> {
        debug!(dir = %dir.display(), "Verifying dbt artifacts");

        let manifest = check_file(dir, MANIFEST_FILE)?;
        let catalog = check_file(dir, CATALOG_FILE)?;

        info!(dir = %dir.display(), "Found manifest.json and catalog.json");
        Ok(ArtifactSet {
            dir: dir.to_path_buf(),
            manifest,
            catalog,
        })
    }
}

fn check_file(dir: &Path, name: &'static str) -> Result<ArtifactFile> {
    let path = dir.join(name);
    let missing = |reason: String| ActionError::MissingArtifact {
        file: name.to_string(),
        dir: dir.to_path_buf(),
        reason,
    };

    let meta = std::fs::metadata(&path).map_err(|e| missing(e.to_string()))?;
    if !meta.is_file() {
        return Err(missing("not a regular file".to_string()));
    }
    File::open(&path).map_err(|e| missing(e.to_string()))?;

    Ok(ArtifactFile { name, path })
}
