use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use ducks_utils::{
    path::xdg_config_home,
    time::{format_duration, parse_duration},
};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};
use url::Url;

use crate::{
    annotations::{annotate_toml_array_of_tables, annotate_toml_table},
    error::{ConfigError, Result},
    repository::Repository,
};

pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://repo.maven.apache.org/maven2/";
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
pub const DEFAULT_TTL: &str = "5m";
pub const DEFAULT_FETCH_TIMEOUT: &str = "30s";
pub const DEFAULT_CACHE_SHARDS: usize = 16;
pub const DEFAULT_USER_AGENT: &str = concat!("ducks/", env!("CARGO_PKG_VERSION"));

/// Upper bound for `ttl` and `fetch_timeout`. Larger values overflow
/// `Instant` arithmetic on some platforms.
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Ducks configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Base URL of the primary Maven repository.
    /// Can be overridden with the DUCKS_UPSTREAM environment variable.
    /// Default: https://repo.maven.apache.org/maven2/
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Maximum number of metadata documents kept in memory.
    /// Default: 10000
    pub cache_max_entries: Option<usize>,

    /// How long a fetched document is served without asking upstream again,
    /// e.g. "30s", "5m", "1h". Use "always" to revalidate on every lookup.
    /// Default: "5m"
    pub ttl: Option<String>,

    /// Upper bound for one upstream request, including reading the body.
    /// Default: "30s"
    pub fetch_timeout: Option<String>,

    /// Number of lock shards in the cache store.
    /// Default: 16
    pub cache_shards: Option<usize>,

    /// User-Agent header sent upstream.
    /// Default: ducks/<version>
    pub user_agent: Option<String>,

    /// Repositories tried in order when the primary one does not have a document.
    #[serde(default)]
    pub fallback_repositories: Vec<Repository>,
}

fn default_upstream_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("DUCKS_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("ducks").join("config.toml"),
    })
});

/// Points subsequent [`Config::new`] and [`generate_default_config`] calls at `path`.
pub fn set_config_path(path: impl Into<PathBuf>) {
    let mut config_path = CONFIG_PATH.write().unwrap();
    *config_path = path.into();
}

pub fn config_path() -> PathBuf {
    CONFIG_PATH.read().unwrap().to_path_buf()
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            upstream_base_url: default_upstream_base_url(),
            cache_max_entries: Some(DEFAULT_CACHE_MAX_ENTRIES),
            ttl: Some(DEFAULT_TTL.to_string()),
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT.to_string()),
            cache_shards: Some(DEFAULT_CACHE_SHARDS),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            fallback_repositories: Vec::new(),
        }
    }

    /// Loads the configuration from [`CONFIG_PATH`], falling back to the
    /// defaults when the file does not exist.
    pub fn new() -> Result<Self> {
        Self::load(&config_path())
    }

    /// Loads and resolves the configuration stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Loading configuration from {}", path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No configuration at {}, using defaults",
                    path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        if let Ok(upstream) = std::env::var("DUCKS_UPSTREAM") {
            config.upstream_base_url = upstream;
        }

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset values with their defaults and validates the result.
    pub fn resolve(&mut self) -> Result<()> {
        validate_url("upstream_base_url", &self.upstream_base_url)?;

        if *self.cache_max_entries.get_or_insert(DEFAULT_CACHE_MAX_ENTRIES) == 0 {
            return Err(ConfigError::ZeroValue {
                field: "cache_max_entries",
            });
        }
        if *self.cache_shards.get_or_insert(DEFAULT_CACHE_SHARDS) == 0 {
            return Err(ConfigError::ZeroValue {
                field: "cache_shards",
            });
        }

        let ttl = self.ttl.get_or_insert_with(|| DEFAULT_TTL.to_string());
        check_limit("ttl", parse_ttl(ttl)?)?;

        let fetch_timeout = self
            .fetch_timeout
            .get_or_insert_with(|| DEFAULT_FETCH_TIMEOUT.to_string());
        let timeout = parse_duration(fetch_timeout).map_err(|source| {
            ConfigError::InvalidDuration {
                field: "fetch_timeout",
                source,
            }
        })?;
        if timeout.is_zero() {
            return Err(ConfigError::ZeroValue {
                field: "fetch_timeout",
            });
        }
        check_limit("fetch_timeout", timeout)?;

        self.user_agent
            .get_or_insert_with(|| DEFAULT_USER_AGENT.to_string());

        let mut seen_repos = HashSet::new();
        for repo in &mut self.fallback_repositories {
            if repo.name.trim().is_empty() {
                return Err(ConfigError::EmptyRepositoryName);
            }
            if !seen_repos.insert(repo.name.clone()) {
                return Err(ConfigError::DuplicateRepositoryName(repo.name.clone()));
            }
            validate_url(&format!("repository `{}`", repo.name), &repo.url)?;
            repo.enabled.get_or_insert(true);
        }

        Ok(())
    }

    pub fn cache_max_entries(&self) -> usize {
        self.cache_max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES)
    }

    pub fn cache_shards(&self) -> usize {
        self.cache_shards.unwrap_or(DEFAULT_CACHE_SHARDS)
    }

    /// The freshness window; zero when `ttl = "always"`.
    pub fn ttl(&self) -> Duration {
        self.ttl
            .as_deref()
            .and_then(|value| parse_ttl(value).ok())
            .unwrap_or(Duration::from_secs(5 * 60))
            .min(MAX_DURATION)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
            .as_deref()
            .and_then(|value| parse_duration(value).ok())
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or(Duration::from_secs(30))
            .min(MAX_DURATION)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Fallback repositories that are switched on, in configured order.
    pub fn enabled_fallbacks(&self) -> impl Iterator<Item = &Repository> {
        self.fallback_repositories
            .iter()
            .filter(|repo| repo.is_enabled())
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(repositories_item) = doc.get_mut("fallback_repositories") {
            if let Some(repositories_array) = repositories_item.as_array_of_tables_mut() {
                annotate_toml_array_of_tables::<Repository>(repositories_array)?;
            }
        }

        Ok(doc)
    }
}

fn parse_ttl(value: &str) -> Result<Duration> {
    match value {
        "always" => Ok(Duration::ZERO),
        value => {
            parse_duration(value).map_err(|source| {
                ConfigError::InvalidDuration {
                    field: "ttl",
                    source,
                }
            })
        }
    }
}

fn check_limit(field: &'static str, value: Duration) -> Result<()> {
    if value > MAX_DURATION {
        return Err(ConfigError::DurationTooLong {
            field,
            limit: format_duration(MAX_DURATION),
        });
    }
    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let invalid = |reason: String| {
        ConfigError::InvalidUrl {
            field: field.to_string(),
            url: value.to_string(),
            reason,
        }
    };

    let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    Ok(())
}

/// Writes the annotated default configuration to [`CONFIG_PATH`].
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
