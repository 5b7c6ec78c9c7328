use ducks_registry::{MetadataDocument, Snapshot, SnapshotVersion};
use serde::Serialize;

/// The serializable answer to a resolve request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    pub versions: Vec<String>,
    pub last_updated: Option<String>,
    /// `last_updated` in RFC 3339 form, when upstream used the standard layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshot_versions: Vec<SnapshotVersion>,
    /// Set when a refresh failed and an expired document was served instead.
    pub stale: bool,
}

impl MetadataView {
    pub fn from_document(document: &MetadataDocument, stale: bool) -> Self {
        let coordinate = &document.coordinate;
        Self {
            group_id: coordinate.group_id().to_string(),
            artifact_id: coordinate.artifact_id().to_string(),
            version: coordinate.version().map(str::to_string),
            latest: document.latest_version.clone(),
            release: document.release_version.clone(),
            versions: document.versions.clone(),
            last_updated: document.last_updated.clone(),
            last_updated_at: document
                .last_updated_at()
                .map(|at| at.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            snapshot: document.snapshot.clone(),
            snapshot_versions: document.snapshot_versions.clone(),
            stale,
        }
    }
}
