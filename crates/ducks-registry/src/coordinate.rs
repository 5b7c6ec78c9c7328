use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::CoordinateError;

/// File name of the metadata descriptor under an artifact (or version) path.
pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";

static GROUP_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid regex"));
static ARTIFACT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid regex"));
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.+\-]+$").expect("valid regex"));

/// Identifies one metadata document in a Maven repository.
///
/// Without a version this is the artifact-level document listing every
/// published version. With a version it is the version-level document, which
/// is where snapshot builds are described.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
}

impl Coordinate {
    pub fn new(group_id: &str, artifact_id: &str) -> Result<Self, CoordinateError> {
        let group_id = group_id.trim();
        let artifact_id = artifact_id.trim();

        if group_id.is_empty() || !group_id.split('.').all(|s| GROUP_SEGMENT.is_match(s)) {
            return Err(CoordinateError::InvalidGroupId(group_id.to_string()));
        }
        if !is_path_segment(artifact_id, &ARTIFACT_ID) {
            return Err(CoordinateError::InvalidArtifactId(artifact_id.to_string()));
        }

        Ok(Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: None,
        })
    }

    /// Narrows this coordinate to the metadata of a single version.
    pub fn with_version(self, version: &str) -> Result<Self, CoordinateError> {
        let version = version.trim();
        if !is_path_segment(version, &VERSION) {
            return Err(CoordinateError::InvalidVersion(version.to_string()));
        }
        Ok(Self {
            version: Some(version.to_string()),
            ..self
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Path of the metadata document relative to the repository root, e.g.
    /// `org/example/widget/maven-metadata.xml`.
    pub fn metadata_path(&self) -> String {
        let mut path = self.group_id.replace('.', "/");
        path.push('/');
        path.push_str(&self.artifact_id);
        path.push('/');
        if let Some(version) = &self.version {
            path.push_str(version);
            path.push('/');
        }
        path.push_str(METADATA_FILE_NAME);
        path
    }
}

fn is_path_segment(value: &str, pattern: &Regex) -> bool {
    value != "." && value != ".." && pattern.is_match(value)
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [group_id, artifact_id] => Coordinate::new(group_id, artifact_id),
            [group_id, artifact_id, version] => {
                Coordinate::new(group_id, artifact_id)?.with_version(version)
            }
            _ => Err(CoordinateError::InvalidNotation(s.to_string())),
        }
    }
}
