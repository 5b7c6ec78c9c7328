use ducks_utils::error::{DurationError, PathError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(ducks_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(ducks_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(ducks_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid URL `{url}` for {field}: {reason}")]
    #[diagnostic(
        code(ducks_config::invalid_url),
        help("Use an absolute http(s) URL, e.g. https://repo.maven.apache.org/maven2/")
    )]
    InvalidUrl {
        field: String,
        url: String,
        reason: String,
    },

    #[error("Invalid duration for {field}: {source}")]
    #[diagnostic(
        code(ducks_config::invalid_duration),
        help("Durations look like `30s`, `5m` or `1h30m`")
    )]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: DurationError,
    },

    #[error("{field} must not exceed {limit}")]
    #[diagnostic(
        code(ducks_config::duration_too_long),
        help("Use `ttl = \"always\"` to refresh on every lookup, or a shorter window")
    )]
    DurationTooLong { field: &'static str, limit: String },

    #[error("{field} must be greater than zero")]
    #[diagnostic(code(ducks_config::zero_value))]
    ZeroValue { field: &'static str },

    #[error("Duplicate repository name: {0}")]
    #[diagnostic(
        code(ducks_config::duplicate_repo),
        help("Each repository must have a unique name")
    )]
    DuplicateRepositoryName(String),

    #[error("Repository name cannot be empty")]
    #[diagnostic(code(ducks_config::empty_repo_name))]
    EmptyRepositoryName,

    #[error("IO error: {0}")]
    #[diagnostic(code(ducks_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(ducks_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(ducks_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),

    #[error("Failed to annotate first table in array: {0}")]
    #[diagnostic(code(ducks_config::annotate_first_table))]
    AnnotateFirstTable(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
