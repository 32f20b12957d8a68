//! Extraction of adapter metadata from `manifest.json`.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{ActionError, Result};

/// The parts of `manifest.json`'s `metadata` object this workflow reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMetadata {
    pub adapter_type: String,
    pub dbt_version: Option<String>,
    pub invocation_id: Option<String>,
}

/// Read and parse a manifest file.
pub fn read_manifest_metadata(path: &Path) -> Result<ManifestMetadata> {
    let content = std::fs::read(path).map_err(|e| ActionError::io(path, e))?;
    let metadata = parse_manifest_metadata(path, &content)?;
    debug!(
        adapter_type = %metadata.adapter_type,
        dbt_version = metadata.dbt_version.as_deref().unwrap_or("unknown"),
        "Parsed manifest metadata"
    );
    Ok(metadata)
}

/// Parse manifest content. `path` only labels errors.
pub fn parse_manifest_metadata(path: &Path, content: &[u8]) -> Result<ManifestMetadata> {
    let doc: Value = serde_json::from_slice(content).map_err(|source| ActionError::ParseError {
        path: path.to_path_buf(),
        source,
    })?;

    let missing = |field: &str| ActionError::MissingField {
        path: path.to_path_buf(),
        field: field.to_string(),
    };

    let metadata = doc
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| missing("metadata"))?;

    let adapter_type = metadata
        .get("adapter_type")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing("metadata.adapter_type"))?;

    let optional = |key: &str| metadata.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(ManifestMetadata {
        adapter_type: adapter_type.to_string(),
        dbt_version: optional("dbt_version"),
        invocation_id: optional("invocation_id"),
    })
}
