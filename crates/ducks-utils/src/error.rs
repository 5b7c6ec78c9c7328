use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Failed to get current directory: {source}")]
    #[diagnostic(code(ducks_utils::path::current_dir))]
    CurrentDir { source: std::io::Error },

    #[error("Path is empty")]
    #[diagnostic(code(ducks_utils::path::empty))]
    Empty,

    #[error("Environment variable `{var}` not set in `{input}`")]
    #[diagnostic(
        code(ducks_utils::path::missing_env_var),
        help("Export `{var}` or use an absolute path")
    )]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{input}`")]
    #[diagnostic(code(ducks_utils::path::unclosed_variable))]
    UnclosedVariable { input: String },
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("Invalid duration `{input}`")]
    #[diagnostic(
        code(ducks_utils::time::invalid_duration),
        help("Use a combination of <number><unit> where unit is one of s, m, h, d (e.g. `1h30m`)")
    )]
    Invalid { input: String },
}

pub type PathResult<T> = std::result::Result<T, PathError>;
