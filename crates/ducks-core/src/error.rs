use ducks_registry::{CoordinateError, FetchError, ParseError, RegistryError};
use miette::Diagnostic;
use thiserror::Error;

use crate::coalesce::Aborted;

/// A lookup that produced no document.
///
/// Cloned to every caller that waited on the same upstream fetch.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("No metadata published for {0}")]
    #[diagnostic(
        code(ducks_core::not_found),
        help("Check the group and artifact ids; the repository has no maven-metadata.xml for them")
    )]
    NotFound(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("The upstream fetch was aborted before it completed")]
    #[diagnostic(code(ducks_core::aborted))]
    Aborted,
}

impl LookupError {
    /// Whether a stale document may stand in for this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Fetch(err) if err.is_transient())
    }
}

impl From<Aborted> for LookupError {
    fn from(_: Aborted) -> Self {
        LookupError::Aborted
    }
}

/// Errors raised while wiring an engine together.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
