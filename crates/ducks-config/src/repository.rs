use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};

/// A Maven repository consulted when the primary one does not have a document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Repository {
    /// Unique name of the repository, used in logs.
    pub name: String,

    /// Base URL of the repository, e.g. https://repo.example.com/releases/
    pub url: String,

    /// Whether the repository is consulted.
    /// Default: true
    pub enabled: Option<bool>,
}

impl Repository {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}
