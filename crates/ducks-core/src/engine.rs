//! Lookup orchestration: cache first, then one shared refresh per coordinate.

use std::sync::Arc;

use ducks_config::config::Config;
use ducks_events::{CacheEvent, EventSinkHandle, NullSink};
use ducks_registry::{
    http_client::ClientConfig, parse, Coordinate, FallbackFetcher, FetchError, HttpFetcher,
    MetadataDocument, UpstreamFetcher,
};
use tracing::{debug, trace, warn};

use crate::{
    cache::{CacheSettings, CacheStore},
    clock::{Clock, SystemClock},
    coalesce::{Coalescer, Role},
    error::{LookupError, Result},
    policy::{self, Decision},
    view::MetadataView,
};

/// Where the document of a successful lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A fresh cache entry; no upstream request was made.
    Cache,
    /// A refresh that this lookup started or joined.
    Upstream,
    /// An expired entry, served because the refresh failed transiently.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Lookup {
    pub document: Arc<MetadataDocument>,
    pub origin: Origin,
}

/// Answers metadata lookups from the cache, refreshing through upstream.
///
/// Cheap to share behind an `Arc`; all state lives in the [`CacheStore`] and
/// the in-flight registry.
pub struct ResolutionEngine {
    store: Arc<CacheStore>,
    fetcher: Arc<dyn UpstreamFetcher>,
    coalescer: Coalescer<Coordinate, Arc<MetadataDocument>, LookupError>,
    events: EventSinkHandle,
}

pub struct ResolutionEngineBuilder {
    fetcher: Arc<dyn UpstreamFetcher>,
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
    events: EventSinkHandle,
    store: Option<Arc<CacheStore>>,
}

impl ResolutionEngineBuilder {
    pub fn new(fetcher: Arc<dyn UpstreamFetcher>) -> Self {
        Self {
            fetcher,
            settings: CacheSettings::default(),
            clock: Arc::new(SystemClock),
            events: Arc::new(NullSink),
            store: None,
        }
    }

    /// Wires the HTTP fetchers and cache settings described by `config`.
    ///
    /// The primary repository is always consulted first; enabled fallback
    /// repositories follow in configured order.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ClientConfig {
            user_agent: Some(config.user_agent().to_string()),
            timeout: Some(config.fetch_timeout()),
            ..ClientConfig::default()
        };

        let primary: Arc<dyn UpstreamFetcher> = Arc::new(HttpFetcher::new(
            "upstream",
            &config.upstream_base_url,
            &client,
        )?);

        let mut members = vec![primary];
        for repo in config.enabled_fallbacks() {
            members.push(Arc::new(HttpFetcher::new(&repo.name, &repo.url, &client)?));
        }

        let fetcher: Arc<dyn UpstreamFetcher> = if members.len() == 1 {
            members.remove(0)
        } else {
            debug!("using {} repositories with fallback", members.len());
            Arc::new(FallbackFetcher::new(members)?)
        };

        Ok(Self::new(fetcher).settings(CacheSettings {
            max_entries: config.cache_max_entries(),
            ttl: config.ttl(),
            shards: config.cache_shards(),
        }))
    }

    pub fn settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn events(mut self, events: EventSinkHandle) -> Self {
        self.events = events;
        self
    }

    /// Uses an existing store instead of creating one from the settings.
    pub fn store(mut self, store: Arc<CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> ResolutionEngine {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(CacheStore::with_clock(self.settings, self.clock)));

        ResolutionEngine {
            store,
            fetcher: self.fetcher,
            coalescer: Coalescer::new(self.settings.shards),
            events: self.events,
        }
    }
}

impl ResolutionEngine {
    pub fn builder(fetcher: Arc<dyn UpstreamFetcher>) -> ResolutionEngineBuilder {
        ResolutionEngineBuilder::new(fetcher)
    }

    /// Resolves the artifact-level metadata of `group_id:artifact_id`.
    pub async fn resolve(
        &self,
        group_id: &str,
        artifact_id: &str,
    ) -> std::result::Result<MetadataView, LookupError> {
        let coordinate = Coordinate::new(group_id, artifact_id)?;
        self.resolve_coordinate(&coordinate).await
    }

    /// Resolves the version-level metadata, where snapshot builds are listed.
    pub async fn resolve_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> std::result::Result<MetadataView, LookupError> {
        let coordinate = Coordinate::new(group_id, artifact_id)?.with_version(version)?;
        self.resolve_coordinate(&coordinate).await
    }

    pub async fn resolve_coordinate(
        &self,
        coordinate: &Coordinate,
    ) -> std::result::Result<MetadataView, LookupError> {
        let lookup = self.lookup(coordinate).await?;
        Ok(MetadataView::from_document(
            &lookup.document,
            lookup.origin == Origin::Stale,
        ))
    }

    /// Returns the document for `coordinate`, fetching it when the cache has
    /// nothing fresh.
    ///
    /// Concurrent lookups for one coordinate share a single upstream fetch and
    /// all observe its outcome. A transient failure is answered with the
    /// expired document when there is one.
    pub async fn lookup(&self, coordinate: &Coordinate) -> std::result::Result<Lookup, LookupError> {
        let key = coordinate.to_string();
        let cached = self.store.get(coordinate);

        match &cached {
            Some(entry) if self.store.is_fresh(entry) => {
                trace!(coordinate = %key, "fresh cache hit");
                self.events.emit(CacheEvent::Hit { coordinate: key });
                return Ok(Lookup {
                    document: Arc::clone(&entry.document),
                    origin: Origin::Cache,
                });
            }
            Some(_) => {
                self.events.emit(CacheEvent::Stale {
                    coordinate: key.clone(),
                })
            }
            None => {
                self.events.emit(CacheEvent::Miss {
                    coordinate: key.clone(),
                })
            }
        }

        let flight = self
            .coalescer
            .fetch_once(coordinate.clone(), || {
                refresh(
                    coordinate.clone(),
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.store),
                    Arc::clone(&self.events),
                )
            })
            .await;

        if flight.role == Role::Follower {
            trace!(coordinate = %key, "joined in-flight fetch");
            self.events.emit(CacheEvent::Coalesced {
                coordinate: key.clone(),
            });
        }

        let error = match flight.outcome {
            Ok(document) => {
                return Ok(Lookup {
                    document,
                    origin: Origin::Upstream,
                })
            }
            Err(error) => error,
        };

        let stale = self.store.peek(coordinate).or(cached);
        match (policy::on_refresh_failure(&error, stale.as_ref()), stale) {
            (Decision::ServeStale, Some(entry)) => {
                warn!(coordinate = %key, error = %error, "refresh failed, serving stale metadata");
                self.events.emit(CacheEvent::ServedStale {
                    coordinate: key,
                    reason: error.to_string(),
                });
                Ok(Lookup {
                    document: entry.document,
                    origin: Origin::Stale,
                })
            }
            _ => Err(error),
        }
    }

    /// Drops the cached document for `coordinate`. Returns whether one existed.
    pub fn invalidate(&self, coordinate: &Coordinate) -> bool {
        let removed = self.store.remove(coordinate).is_some();
        if removed {
            debug!(%coordinate, "invalidated cached metadata");
        }
        removed
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}

/// One upstream refresh: fetch on a blocking thread, parse, store.
///
/// Runs at most once per coordinate at a time, so its side effects (the
/// store write and the fetch events) happen once per refresh.
async fn refresh(
    coordinate: Coordinate,
    fetcher: Arc<dyn UpstreamFetcher>,
    store: Arc<CacheStore>,
    events: EventSinkHandle,
) -> std::result::Result<Arc<MetadataDocument>, LookupError> {
    let key = coordinate.to_string();

    // A flight that finished between the caller's cache read and this one
    // starting has already stored a fresh copy.
    if let Some(entry) = store.get(&coordinate) {
        if store.is_fresh(&entry) {
            trace!(coordinate = %key, "refreshed by an earlier flight");
            return Ok(entry.document);
        }
    }

    events.emit(CacheEvent::FetchStarted {
        coordinate: key.clone(),
    });

    match fetch_and_parse(&coordinate, fetcher).await {
        Ok(document) => {
            let document = Arc::new(document);
            let versions = document.versions.len();
            if let Some(evicted) = store.put(coordinate, Arc::clone(&document)) {
                events.emit(CacheEvent::Evicted {
                    coordinate: evicted.to_string(),
                });
            }
            debug!(coordinate = %key, versions, "stored fresh metadata");
            events.emit(CacheEvent::FetchSucceeded {
                coordinate: key,
                versions,
            });
            Ok(document)
        }
        Err(error) => {
            // Gone upstream: an old copy must not outlive it.
            if matches!(error, LookupError::NotFound(_)) && store.remove(&coordinate).is_some() {
                debug!(coordinate = %key, "dropped cached metadata for coordinate missing upstream");
            }
            debug!(coordinate = %key, %error, "refresh failed");
            events.emit(CacheEvent::FetchFailed {
                coordinate: key,
                reason: error.to_string(),
            });
            Err(error)
        }
    }
}

async fn fetch_and_parse(
    coordinate: &Coordinate,
    fetcher: Arc<dyn UpstreamFetcher>,
) -> std::result::Result<MetadataDocument, LookupError> {
    let target = coordinate.clone();
    let raw = tokio::task::spawn_blocking(move || fetcher.fetch(&target))
        .await
        .map_err(|_| LookupError::Aborted)?
        .map_err(|err| {
            match err {
                FetchError::NotFound { .. } => LookupError::NotFound(coordinate.to_string()),
                err => LookupError::Fetch(err),
            }
        })?;

    Ok(parse(&raw, coordinate)?)
}
