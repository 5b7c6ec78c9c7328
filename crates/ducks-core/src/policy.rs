//! What to answer when refreshing an entry failed.

use crate::{cache::CacheEntry, error::LookupError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Answer with the expired document; the entry is left as it is.
    ServeStale,
    /// Surface the failure to the caller.
    Fail,
}

/// Decides between the stale document and the failure.
///
/// | failure                          | stale entry | decision   |
/// |----------------------------------|-------------|------------|
/// | transport / upstream 5xx         | yes         | serve stale|
/// | transport / upstream 5xx         | no          | fail       |
/// | not found                        | any         | fail       |
/// | rejected / malformed / aborted   | any         | fail       |
///
/// Only transient failures are masked. A `NotFound` means the coordinate is
/// gone upstream, so old data must not stand in for it.
pub fn on_refresh_failure(error: &LookupError, stale: Option<&CacheEntry>) -> Decision {
    match (error.is_transient(), stale) {
        (true, Some(_)) => Decision::ServeStale,
        _ => Decision::Fail,
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Instant};

    use ducks_registry::{Coordinate, FetchError, MetadataDocument, ParseError};

    use super::*;

    fn stale_entry() -> CacheEntry {
        let coordinate = Coordinate::new("org.example", "widget").unwrap();
        let now = Instant::now();
        CacheEntry {
            document: Arc::new(MetadataDocument {
                coordinate,
                model_version: None,
                group_id: None,
                artifact_id: None,
                version: None,
                latest_version: None,
                release_version: None,
                versions: Vec::new(),
                last_updated: None,
                snapshot: None,
                snapshot_versions: Vec::new(),
            }),
            fetched_at: now,
            expires_at: Some(now),
        }
    }

    #[test]
    fn test_decision_table() {
        let entry = stale_entry();
        let transport = LookupError::Fetch(FetchError::Transport {
            url: "u".into(),
            reason: "timed out".into(),
        });
        let server = LookupError::Fetch(FetchError::UpstreamServer {
            url: "u".into(),
            status: 503,
        });
        let rejected = LookupError::Fetch(FetchError::Rejected {
            url: "u".into(),
            status: 403,
        });
        let not_found = LookupError::NotFound("org.example:widget".into());
        let malformed = LookupError::Parse(ParseError::Malformed("bad".into()));

        let cases = [
            (&transport, Some(&entry), Decision::ServeStale),
            (&server, Some(&entry), Decision::ServeStale),
            (&transport, None, Decision::Fail),
            (&server, None, Decision::Fail),
            (&not_found, Some(&entry), Decision::Fail),
            (&not_found, None, Decision::Fail),
            (&rejected, Some(&entry), Decision::Fail),
            (&malformed, Some(&entry), Decision::Fail),
            (&LookupError::Aborted, Some(&entry), Decision::Fail),
        ];

        for (error, stale, expected) in cases {
            assert_eq!(
                on_refresh_failure(error, stale),
                expected,
                "{error} with stale={}",
                stale.is_some()
            );
        }
    }
}
