//! Upstream retrieval of raw metadata documents.

use std::sync::Arc;

use tracing::{debug, trace};
use ureq::{
    http::{header::ACCEPT, HeaderMap},
    Agent,
};
use url::Url;

use crate::{
    coordinate::Coordinate,
    error::{FetchError, RegistryError, Result},
    http_client::{apply_headers, ClientConfig},
};

/// Retrieves the raw metadata document for a coordinate.
///
/// Implementations perform blocking I/O and never consult a cache. Each call
/// is a single idempotent request; retries are the caller's business.
pub trait UpstreamFetcher: Send + Sync {
    fn fetch(&self, coordinate: &Coordinate) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Fetches `maven-metadata.xml` from one HTTP repository.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    name: String,
    base_url: Url,
    agent: Agent,
    headers: Option<HeaderMap>,
}

impl HttpFetcher {
    /// Creates a fetcher for the repository rooted at `base_url`.
    ///
    /// A trailing slash is added to the base URL when missing so that the
    /// metadata path resolves beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(name: impl Into<String>, base_url: &str, config: &ClientConfig) -> Result<Self> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base_url = Url::parse(&normalized).map_err(|err| {
            RegistryError::InvalidUrl {
                url: base_url.to_string(),
                reason: err.to_string(),
            }
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme `{}`", base_url.scheme()),
            });
        }

        Ok(Self {
            name: name.into(),
            base_url,
            agent: config.build(),
            headers: config.headers.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of the metadata document for `coordinate`.
    pub fn metadata_url(&self, coordinate: &Coordinate) -> std::result::Result<Url, FetchError> {
        self.base_url
            .join(&coordinate.metadata_path())
            .map_err(|err| {
                FetchError::InvalidUrl {
                    reason: err.to_string(),
                }
            })
    }
}

impl UpstreamFetcher for HttpFetcher {
    fn fetch(&self, coordinate: &Coordinate) -> std::result::Result<Vec<u8>, FetchError> {
        let url = self.metadata_url(coordinate)?;
        debug!(repository = %self.name, %url, "fetching maven metadata");

        let req = apply_headers(
            self.agent
                .get(url.as_str())
                .header(ACCEPT, "application/xml"),
            &self.headers,
        );

        let resp = req.call().map_err(|err| {
            FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        })?;

        let status = resp.status().as_u16();
        trace!(repository = %self.name, %url, status, "upstream responded");
        if let Some(err) = classify_status(url.as_str(), status) {
            return Err(err);
        }

        resp.into_body().read_to_vec().map_err(|err| {
            FetchError::Transport {
                url: url.to_string(),
                reason: format!("reading response body: {err}"),
            }
        })
    }
}

/// Maps a non-success HTTP status onto the fetch error taxonomy.
///
/// Returns `None` for 2xx.
pub fn classify_status(url: &str, status: u16) -> Option<FetchError> {
    let url = url.to_string();
    match status {
        200..=299 => None,
        404 | 410 => Some(FetchError::NotFound { url }),
        500..=599 => Some(FetchError::UpstreamServer { url, status }),
        _ => Some(FetchError::Rejected { url, status }),
    }
}

/// Tries an ordered list of repositories until one has the document.
///
/// The first success wins. If every member fails, a transient failure is
/// reported ahead of a definite one, and `NotFound` only when all members
/// agree the coordinate does not exist.
pub struct FallbackFetcher {
    members: Vec<Arc<dyn UpstreamFetcher>>,
}

impl FallbackFetcher {
    pub fn new(members: Vec<Arc<dyn UpstreamFetcher>>) -> Result<Self> {
        if members.is_empty() {
            return Err(RegistryError::NoRepositories);
        }
        Ok(Self { members })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl UpstreamFetcher for FallbackFetcher {
    fn fetch(&self, coordinate: &Coordinate) -> std::result::Result<Vec<u8>, FetchError> {
        let mut reported: Option<FetchError> = None;

        for (index, member) in self.members.iter().enumerate() {
            match member.fetch(coordinate) {
                Ok(raw) => return Ok(raw),
                Err(err) => {
                    debug!(%coordinate, member = index, error = %err, "repository could not serve metadata");
                    let replace = match &reported {
                        Some(current) => severity(&err) > severity(current),
                        None => true,
                    };
                    if replace {
                        reported = Some(err);
                    }
                }
            }
        }

        Err(reported.unwrap_or_else(|| {
            FetchError::NotFound {
                url: coordinate.metadata_path(),
            }
        }))
    }
}

fn severity(err: &FetchError) -> u8 {
    match err {
        FetchError::NotFound { .. } => 0,
        FetchError::Rejected { .. } | FetchError::InvalidUrl { .. } => 1,
        FetchError::Transport { .. } | FetchError::UpstreamServer { .. } => 2,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use httpmock::prelude::*;

    use super::*;

    const BODY: &str = "<metadata><versioning><versions><version>1.0</version></versions></versioning></metadata>";

    fn widget() -> Coordinate {
        Coordinate::new("org.example", "widget").unwrap()
    }

    fn fetcher(base: &str) -> HttpFetcher {
        let config = ClientConfig {
            timeout: Some(Duration::from_secs(5)),
            ..ClientConfig::default()
        };
        HttpFetcher::new("test", base, &config).unwrap()
    }

    #[test]
    fn test_metadata_url_joins_under_base_path() {
        let fetcher = fetcher("https://repo.example.com/maven2");
        assert_eq!(
            fetcher.metadata_url(&widget()).unwrap().as_str(),
            "https://repo.example.com/maven2/org/example/widget/maven-metadata.xml"
        );
    }

    #[test]
    fn test_rejects_invalid_base_urls() {
        for base in ["not a url", "ftp://repo.example.com/", "/relative/path"] {
            assert!(matches!(
                HttpFetcher::new("bad", base, &ClientConfig::default()),
                Err(RegistryError::InvalidUrl { .. })
            ));
        }
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status("u", 200), None);
        assert_eq!(classify_status("u", 204), None);
        assert!(matches!(
            classify_status("u", 404),
            Some(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            classify_status("u", 410),
            Some(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            classify_status("u", 503),
            Some(FetchError::UpstreamServer { status: 503, .. })
        ));
        assert!(matches!(
            classify_status("u", 401),
            Some(FetchError::Rejected { status: 401, .. })
        ));
    }

    #[test]
    fn test_fetch_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/maven2/org/example/widget/maven-metadata.xml")
                .header_exists("user-agent");
            then.status(200)
                .header("content-type", "application/xml")
                .body(BODY);
        });

        let raw = fetcher(&server.url("/maven2/")).fetch(&widget()).unwrap();
        assert_eq!(raw, BODY.as_bytes());
        mock.assert_hits(1);
    }

    #[test]
    fn test_fetch_version_level_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/org/example/widget/1.0-SNAPSHOT/maven-metadata.xml");
            then.status(200).body(BODY);
        });

        let coordinate = widget().with_version("1.0-SNAPSHOT").unwrap();
        assert!(fetcher(&server.base_url()).fetch(&coordinate).is_ok());
        mock.assert_hits(1);
    }

    #[test]
    fn test_fetch_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(404);
        });

        assert!(matches!(
            fetcher(&server.base_url()).fetch(&widget()),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_fetch_server_error_and_rejection() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("/widget/");
            then.status(502);
        });
        server.mock(|when, then| {
            when.method(GET).path_contains("/secret/");
            then.status(403);
        });

        let fetcher = fetcher(&server.base_url());
        assert!(matches!(
            fetcher.fetch(&widget()),
            Err(FetchError::UpstreamServer { status: 502, .. })
        ));
        assert!(matches!(
            fetcher.fetch(&Coordinate::new("org.example", "secret").unwrap()),
            Err(FetchError::Rejected { status: 403, .. })
        ));
    }

    #[test]
    fn test_fetch_connection_refused_is_transport() {
        // Nothing listens on the discard port.
        let fetcher = fetcher("http://127.0.0.1:9/");
        assert!(matches!(
            fetcher.fetch(&widget()),
            Err(FetchError::Transport { .. })
        ));
    }

    #[test]
    fn test_fetch_exceeding_timeout_is_transport() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).body(BODY).delay(Duration::from_secs(3));
        });

        let config = ClientConfig {
            timeout: Some(Duration::from_millis(300)),
            ..ClientConfig::default()
        };
        let fetcher = HttpFetcher::new("slow", &server.base_url(), &config).unwrap();

        match fetcher.fetch(&widget()) {
            Err(err @ FetchError::Transport { .. }) => assert!(err.is_transient()),
            other => panic!("expected a transport error, got {other:?}"),
        }
    }

    struct Scripted {
        outcome: std::result::Result<Vec<u8>, FetchError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(outcome: std::result::Result<Vec<u8>, FetchError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl UpstreamFetcher for Scripted {
        fn fetch(&self, _: &Coordinate) -> std::result::Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn not_found() -> FetchError {
        FetchError::NotFound { url: "u".into() }
    }

    #[test]
    fn test_fallback_requires_members() {
        assert!(matches!(
            FallbackFetcher::new(Vec::new()),
            Err(RegistryError::NoRepositories)
        ));
    }

    #[test]
    fn test_fallback_first_success_wins() {
        let first = Scripted::new(Err(not_found()));
        let second = Scripted::new(Ok(b"second".to_vec()));
        let third = Scripted::new(Ok(b"third".to_vec()));

        let members: Vec<Arc<dyn UpstreamFetcher>> = vec![first.clone(), second.clone(), third.clone()];
        let fallback = FallbackFetcher::new(members).unwrap();
        assert_eq!(fallback.fetch(&widget()).unwrap(), b"second");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fallback.len(), 3);
    }

    #[test]
    fn test_fallback_prefers_transient_failure() {
        let members: Vec<Arc<dyn UpstreamFetcher>> = vec![
            Scripted::new(Err(not_found())),
            Scripted::new(Err(FetchError::Transport {
                url: "u".into(),
                reason: "connection reset".into(),
            })),
            Scripted::new(Err(not_found())),
        ];
        let fallback = FallbackFetcher::new(members).unwrap();

        assert!(matches!(
            fallback.fetch(&widget()),
            Err(FetchError::Transport { .. })
        ));
    }

    #[test]
    fn test_fallback_not_found_everywhere() {
        let members: Vec<Arc<dyn UpstreamFetcher>> = vec![
            Scripted::new(Err(not_found())),
            Scripted::new(Err(not_found())),
        ];
        let fallback = FallbackFetcher::new(members).unwrap();

        assert!(matches!(
            fallback.fetch(&widget()),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_fallback_over_http() {
        let empty = MockServer::start();
        let empty_mock = empty.mock(|when, then| {
            when.method(GET);
            then.status(404);
        });
        let full = MockServer::start();
        full.mock(|when, then| {
            when.method(GET).path("/org/example/widget/maven-metadata.xml");
            then.status(200).body(BODY);
        });

        let members: Vec<Arc<dyn UpstreamFetcher>> = vec![
            Arc::new(fetcher(&empty.base_url())),
            Arc::new(fetcher(&full.base_url())),
        ];
        let fallback = FallbackFetcher::new(members).unwrap();

        assert_eq!(fallback.fetch(&widget()).unwrap(), BODY.as_bytes());
        empty_mock.assert_hits(1);
    }
}
