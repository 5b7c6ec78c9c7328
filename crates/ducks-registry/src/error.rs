//! Error types for the registry crate.
//!
//! The lookup-path errors ([`ParseError`], [`FetchError`]) are `Clone` because
//! a single upstream outcome is handed to every caller waiting on it, so they
//! carry rendered messages instead of foreign error values.

use miette::Diagnostic;
use thiserror::Error;

/// A coordinate could not be built from user input.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Invalid group id `{0}`")]
    #[diagnostic(
        code(ducks_registry::invalid_group_id),
        help("Group ids are dot separated segments of letters, digits, `_` and `-`")
    )]
    InvalidGroupId(String),

    #[error("Invalid artifact id `{0}`")]
    #[diagnostic(
        code(ducks_registry::invalid_artifact_id),
        help("Artifact ids may contain letters, digits, `.`, `_` and `-`")
    )]
    InvalidArtifactId(String),

    #[error("Invalid version `{0}`")]
    #[diagnostic(code(ducks_registry::invalid_version))]
    InvalidVersion(String),

    #[error("Invalid coordinate `{0}`")]
    #[diagnostic(
        code(ducks_registry::invalid_coordinate),
        help("Expected `group:artifact` or `group:artifact:version`")
    )]
    InvalidNotation(String),
}

/// The upstream document could not be read as Maven metadata.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed maven metadata: {0}")]
    #[diagnostic(
        code(ducks_registry::malformed),
        help("The upstream repository returned a document that is not maven-metadata.xml")
    )]
    Malformed(String),
}

/// Outcome of a failed upstream retrieval.
///
/// The kinds are kept apart because the caller decides differently on each:
/// [`FetchError::Transport`] and [`FetchError::UpstreamServer`] are transient,
/// everything else is a definite answer.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Not found upstream: {url}")]
    #[diagnostic(code(ducks_registry::not_found))]
    NotFound { url: String },

    #[error("Transport failure for {url}: {reason}")]
    #[diagnostic(
        code(ducks_registry::transport),
        help("Check your network connection and the repository URL")
    )]
    Transport { url: String, reason: String },

    #[error("Upstream server error {status} for {url}")]
    #[diagnostic(code(ducks_registry::upstream_server))]
    UpstreamServer { url: String, status: u16 },

    #[error("Upstream rejected the request with {status} for {url}")]
    #[diagnostic(
        code(ducks_registry::rejected),
        help("The repository may require credentials or may not allow this path")
    )]
    Rejected { url: String, status: u16 },

    #[error("Could not build upstream URL: {reason}")]
    #[diagnostic(code(ducks_registry::invalid_url))]
    InvalidUrl { reason: String },
}

impl FetchError {
    /// Whether the failure says nothing about the coordinate itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. } | FetchError::UpstreamServer { .. }
        )
    }
}

/// Errors raised while setting up registry components.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Invalid repository URL `{url}`: {reason}")]
    #[diagnostic(
        code(ducks_registry::invalid_repository_url),
        help("Ensure the URL is absolute, e.g. https://repo.maven.apache.org/maven2/")
    )]
    InvalidUrl { url: String, reason: String },

    #[error("A fallback fetcher needs at least one repository")]
    #[diagnostic(code(ducks_registry::no_repositories))]
    NoRepositories,
}

/// A specialized Result type for registry setup.
pub type Result<T> = std::result::Result<T, RegistryError>;
