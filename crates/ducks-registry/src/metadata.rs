//! The `maven-metadata.xml` document model and its parser.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use roxmltree::{Document, Node};
use serde::Serialize;
use tracing::{trace, warn};

use crate::{coordinate::Coordinate, error::ParseError};

const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";
const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// A parsed repository metadata document.
///
/// Optional upstream elements stay `None` when absent (or blank) so that
/// "not published" is never confused with "published but empty".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDocument {
    /// The coordinate the document was requested under.
    pub coordinate: Coordinate,
    /// `modelVersion` attribute of the root element.
    pub model_version: Option<String>,
    /// `groupId` as written upstream.
    pub group_id: Option<String>,
    /// `artifactId` as written upstream.
    pub artifact_id: Option<String>,
    /// `version`, only present in version-level documents.
    pub version: Option<String>,
    pub latest_version: Option<String>,
    pub release_version: Option<String>,
    /// Published versions in upstream order.
    pub versions: Vec<String>,
    /// Opaque upstream timestamp, usually `yyyyMMddHHmmss`.
    pub last_updated: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// The `versioning/snapshot` block of a version-level document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: Option<String>,
    pub build_number: Option<u32>,
    pub local_copy: Option<bool>,
}

/// One `versioning/snapshotVersions/snapshotVersion` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: Option<String>,
    pub value: Option<String>,
    pub updated: Option<String>,
}

impl MetadataDocument {
    /// `last_updated` interpreted as a UTC timestamp, when it has the usual form.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated
            .as_deref()
            .and_then(|value| NaiveDateTime::parse_from_str(value, LAST_UPDATED_FORMAT).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }
}

impl Snapshot {
    /// The snapshot `timestamp` (`yyyyMMdd.HHmmss`) as a UTC timestamp.
    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|value| NaiveDateTime::parse_from_str(value, SNAPSHOT_TIMESTAMP_FORMAT).ok())
            .map(|naive| naive.and_utc())
    }
}

/// Parses a raw `maven-metadata.xml` document.
///
/// Never performs I/O. Missing optional elements yield `None` or empty lists;
/// only a document that cannot be read as metadata at all is an error.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] if the bytes are not UTF-8, not XML, the
/// root element is not `metadata`, or `buildNumber` is not a number.
pub fn parse(raw: &[u8], coordinate: &Coordinate) -> Result<MetadataDocument, ParseError> {
    let text = std::str::from_utf8(raw)
        .map_err(|err| ParseError::Malformed(format!("document is not UTF-8: {err}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let doc = Document::parse(text).map_err(|err| ParseError::Malformed(err.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "metadata" {
        return Err(ParseError::Malformed(format!(
            "expected root element `metadata`, found `{}`",
            root.tag_name().name()
        )));
    }

    let mut document = MetadataDocument {
        coordinate: coordinate.clone(),
        model_version: root.attribute("modelVersion").map(str::to_string),
        group_id: child_text(&root, "groupId"),
        artifact_id: child_text(&root, "artifactId"),
        version: child_text(&root, "version"),
        latest_version: None,
        release_version: None,
        versions: Vec::new(),
        last_updated: None,
        snapshot: None,
        snapshot_versions: Vec::new(),
    };

    if let Some(versioning) = child_element(&root, "versioning") {
        document.latest_version = child_text(&versioning, "latest");
        document.release_version = child_text(&versioning, "release");
        document.last_updated = child_text(&versioning, "lastUpdated");

        if let Some(versions) = child_element(&versioning, "versions") {
            document.versions = parse_versions(&versions, coordinate);
        }
        if let Some(snapshot) = child_element(&versioning, "snapshot") {
            document.snapshot = Some(parse_snapshot(&snapshot)?);
        }
        if let Some(snapshot_versions) = child_element(&versioning, "snapshotVersions") {
            document.snapshot_versions = snapshot_versions
                .children()
                .filter(|n| n.is_element() && n.has_tag_name("snapshotVersion"))
                .map(|n| {
                    SnapshotVersion {
                        classifier: child_text(&n, "classifier"),
                        extension: child_text(&n, "extension"),
                        value: child_text(&n, "value"),
                        updated: child_text(&n, "updated"),
                    }
                })
                .collect();
        }
    }

    check_consistency(&document);

    trace!(
        coordinate = %coordinate,
        versions = document.versions.len(),
        "parsed maven metadata"
    );

    Ok(document)
}

fn parse_versions(versions: &Node<'_, '_>, coordinate: &Coordinate) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for node in versions
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("version"))
    {
        let Some(version) = node_text(&node) else {
            continue;
        };
        if seen.insert(version.clone()) {
            out.push(version);
        } else {
            warn!(coordinate = %coordinate, version, "dropping duplicate version in upstream metadata");
        }
    }

    out
}

fn parse_snapshot(snapshot: &Node<'_, '_>) -> Result<Snapshot, ParseError> {
    let build_number = child_text(snapshot, "buildNumber")
        .map(|value| {
            value.parse::<u32>().map_err(|_| {
                ParseError::Malformed(format!("snapshot buildNumber `{value}` is not a number"))
            })
        })
        .transpose()?;

    Ok(Snapshot {
        timestamp: child_text(snapshot, "timestamp"),
        build_number,
        local_copy: child_text(snapshot, "localCopy").map(|value| value == "true"),
    })
}

fn check_consistency(document: &MetadataDocument) {
    let coordinate = &document.coordinate;

    if let Some(group_id) = &document.group_id {
        if group_id != coordinate.group_id() {
            warn!(coordinate = %coordinate, upstream = group_id, "upstream groupId does not match request");
        }
    }
    if let Some(artifact_id) = &document.artifact_id {
        if artifact_id != coordinate.artifact_id() {
            warn!(coordinate = %coordinate, upstream = artifact_id, "upstream artifactId does not match request");
        }
    }
    if let Some(release) = &document.release_version {
        if !document.contains_version(release) {
            warn!(coordinate = %coordinate, release, "release version is not listed in versions");
        }
    }
}

fn child_element<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: &Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name).and_then(|n| node_text(&n))
}

fn node_text(node: &Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn widget() -> Coordinate {
        Coordinate::new("org.example", "widget").unwrap()
    }

    const WIDGET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata modelVersion="1.1.0">
  <groupId>org.example</groupId>
  <artifactId>widget</artifactId>
  <versioning>
    <latest>2.0</latest>
    <release>2.0</release>
    <versions>
      <version>1.0</version>
      <version>1.1</version>
      <version>2.0</version>
    </versions>
    <lastUpdated>20240102030405</lastUpdated>
  </versioning>
</metadata>
"#;

    #[test]
    fn test_parse_full_document() {
        let doc = parse(WIDGET.as_bytes(), &widget()).unwrap();

        assert_eq!(doc.coordinate, widget());
        assert_eq!(doc.model_version.as_deref(), Some("1.1.0"));
        assert_eq!(doc.group_id.as_deref(), Some("org.example"));
        assert_eq!(doc.artifact_id.as_deref(), Some("widget"));
        assert_eq!(doc.latest_version.as_deref(), Some("2.0"));
        assert_eq!(doc.release_version.as_deref(), Some("2.0"));
        assert_eq!(doc.versions, vec!["1.0", "1.1", "2.0"]);
        assert_eq!(doc.last_updated.as_deref(), Some("20240102030405"));
        assert!(doc.snapshot.is_none());
        assert!(doc.snapshot_versions.is_empty());

        let updated = doc.last_updated_at().unwrap();
        assert_eq!((updated.year(), updated.month(), updated.day()), (2024, 1, 2));
        assert_eq!((updated.hour(), updated.minute(), updated.second()), (3, 4, 5));
    }

    #[test]
    fn test_missing_optional_elements() {
        let raw = r#"<metadata>
  <groupId>org.example</groupId>
  <artifactId>widget</artifactId>
  <versioning>
    <versions>
      <version>1.0</version>
    </versions>
  </versioning>
</metadata>"#;
        let doc = parse(raw.as_bytes(), &widget()).unwrap();
        assert_eq!(doc.latest_version, None);
        assert_eq!(doc.release_version, None);
        assert_eq!(doc.last_updated, None);
        assert_eq!(doc.last_updated_at(), None);
        assert_eq!(doc.versions, vec!["1.0"]);
    }

    #[test]
    fn test_missing_or_empty_versions() {
        let no_versioning = "<metadata><groupId>org.example</groupId></metadata>";
        let doc = parse(no_versioning.as_bytes(), &widget()).unwrap();
        assert!(doc.versions.is_empty());

        let empty_versions = "<metadata><versioning><versions/></versioning></metadata>";
        let doc = parse(empty_versions.as_bytes(), &widget()).unwrap();
        assert!(doc.versions.is_empty());

        let blank = "<metadata><versioning><latest>  </latest></versioning></metadata>";
        let doc = parse(blank.as_bytes(), &widget()).unwrap();
        assert_eq!(doc.latest_version, None);
    }

    #[test]
    fn test_upstream_order_is_kept_and_duplicates_dropped() {
        let raw = r#"<metadata><versioning><versions>
  <version>2.0</version>
  <version>1.0</version>
  <version>2.0</version>
  <version>1.5</version>
</versions></versioning></metadata>"#;
        let doc = parse(raw.as_bytes(), &widget()).unwrap();
        assert_eq!(doc.versions, vec!["2.0", "1.0", "1.5"]);
    }

    #[test]
    fn test_release_outside_versions_is_tolerated() {
        let raw = r#"<metadata><versioning>
  <release>3.0</release>
  <versions><version>1.0</version></versions>
</versioning></metadata>"#;
        let doc = parse(raw.as_bytes(), &widget()).unwrap();
        assert_eq!(doc.release_version.as_deref(), Some("3.0"));
        assert_eq!(doc.versions, vec!["1.0"]);
    }

    #[test]
    fn test_namespaced_document() {
        let raw = r#"<metadata xmlns="http://maven.apache.org/METADATA/1.1.0">
  <versioning><versions><version>1.0</version></versions></versioning>
</metadata>"#;
        let doc = parse(raw.as_bytes(), &widget()).unwrap();
        assert_eq!(doc.versions, vec!["1.0"]);
    }

    #[test]
    fn test_snapshot_document() {
        let coordinate = widget().with_version("1.1-SNAPSHOT").unwrap();
        let raw = r#"<metadata modelVersion="1.1.0">
  <groupId>org.example</groupId>
  <artifactId>widget</artifactId>
  <version>1.1-SNAPSHOT</version>
  <versioning>
    <snapshot>
      <timestamp>20240315.101112</timestamp>
      <buildNumber>7</buildNumber>
    </snapshot>
    <lastUpdated>20240315101112</lastUpdated>
    <snapshotVersions>
      <snapshotVersion>
        <extension>jar</extension>
        <value>1.1-20240315.101112-7</value>
        <updated>20240315101112</updated>
      </snapshotVersion>
      <snapshotVersion>
        <classifier>javadoc</classifier>
        <extension>jar</extension>
        <value>1.1-20240315.101112-7</value>
        <updated>20240315101112</updated>
      </snapshotVersion>
    </snapshotVersions>
  </versioning>
</metadata>"#;
        let doc = parse(raw.as_bytes(), &coordinate).unwrap();
        assert_eq!(doc.version.as_deref(), Some("1.1-SNAPSHOT"));

        let snapshot = doc.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.timestamp.as_deref(), Some("20240315.101112"));
        assert_eq!(snapshot.build_number, Some(7));
        assert_eq!(snapshot.local_copy, None);
        assert_eq!(snapshot.timestamp_at().unwrap().day(), 15);

        assert_eq!(doc.snapshot_versions.len(), 2);
        assert_eq!(doc.snapshot_versions[0].classifier, None);
        assert_eq!(
            doc.snapshot_versions[1].classifier.as_deref(),
            Some("javadoc")
        );
        assert!(doc.versions.is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        let cases: [&[u8]; 5] = [
            b"",
            b"not xml at all",
            b"<metadata><versioning></metadata>",
            b"<html><body>404</body></html>",
            b"\xff\xfe<metadata/>",
        ];
        for raw in cases {
            assert!(
                matches!(parse(raw, &widget()), Err(ParseError::Malformed(_))),
                "accepted {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_bad_build_number_is_malformed() {
        let raw = "<metadata><versioning><snapshot><buildNumber>seven</buildNumber></snapshot></versioning></metadata>";
        assert!(matches!(
            parse(raw.as_bytes(), &widget()),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let mut raw = "\u{feff}".as_bytes().to_vec();
        raw.extend_from_slice(WIDGET.as_bytes());
        assert_eq!(parse(&raw, &widget()).unwrap().versions.len(), 3);
    }
}
