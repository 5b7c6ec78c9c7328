/// Everything observable that happens inside the metadata cache.
///
/// Coordinates are carried in their textual `group:artifact[:version]` form so
/// that consumers do not need the registry types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fresh entry answered the lookup.
    Hit { coordinate: String },
    /// No entry existed for the coordinate.
    Miss { coordinate: String },
    /// An entry existed but its freshness window had passed.
    Stale { coordinate: String },
    /// This lookup started the upstream fetch.
    FetchStarted { coordinate: String },
    /// This lookup joined a fetch that was already in flight.
    Coalesced { coordinate: String },
    /// The upstream fetch and parse succeeded and the entry was stored.
    FetchSucceeded { coordinate: String, versions: usize },
    /// The upstream fetch or parse failed.
    FetchFailed { coordinate: String, reason: String },
    /// A refresh failed and the previous (expired) document was returned.
    ServedStale { coordinate: String, reason: String },
    /// An entry was dropped to make room for a new coordinate.
    Evicted { coordinate: String },
}

impl CacheEvent {
    pub fn coordinate(&self) -> &str {
        match self {
            CacheEvent::Hit { coordinate }
            | CacheEvent::Miss { coordinate }
            | CacheEvent::Stale { coordinate }
            | CacheEvent::FetchStarted { coordinate }
            | CacheEvent::Coalesced { coordinate }
            | CacheEvent::FetchSucceeded { coordinate, .. }
            | CacheEvent::FetchFailed { coordinate, .. }
            | CacheEvent::ServedStale { coordinate, .. }
            | CacheEvent::Evicted { coordinate } => coordinate,
        }
    }
}
