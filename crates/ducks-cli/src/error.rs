use ducks_config::error::ConfigError;
use ducks_core::{CoreError, LookupError};
use ducks_utils::error::PathError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("IO error while {action}: {source}")]
    #[diagnostic(code(ducks_cli::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    #[diagnostic(code(ducks_cli::json))]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    #[diagnostic(code(ducks_cli::toml))]
    Toml(#[from] toml::ser::Error),

    #[error("{failed} of {total} coordinates could not be resolved")]
    #[diagnostic(
        code(ducks_cli::resolve_failed),
        help("Run with -v to see why each lookup failed")
    )]
    ResolveFailed { failed: usize, total: usize },
}

pub type CliResult<T> = std::result::Result<T, CliError>;
