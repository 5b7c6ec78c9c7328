//! Bounded in-memory store of parsed metadata documents.
//!
//! Entries carry their own expiry; the store never refreshes anything. Reads
//! take a shard read lock and bump a per-entry access tick drawn from one
//! global counter, so recency is comparable across shards. Inserting a key
//! that is not yet present goes through a single admission lock, which keeps
//! the capacity bound exact and lets eviction pick the globally least recently
//! used entry.

use std::{
    collections::HashMap,
    hash::{BuildHasher, RandomState},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
    time::{Duration, Instant},
};

use ducks_registry::{Coordinate, MetadataDocument};
use tracing::trace;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl: Duration,
    pub shards: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(5 * 60),
            shards: 16,
        }
    }
}

/// A stored document and its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub document: Arc<MetadataDocument>,
    pub fetched_at: Instant,
    /// `None` when the TTL reaches past what `Instant` can represent.
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    last_access: AtomicU64,
}

type Shard = RwLock<HashMap<Coordinate, Slot>>;

#[derive(Debug)]
pub struct CacheStore {
    settings: CacheSettings,
    shards: Box<[Shard]>,
    hasher: RandomState,
    admission: Mutex<()>,
    len: AtomicUsize,
    tick: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let settings = CacheSettings {
            max_entries: settings.max_entries.max(1),
            ttl: settings.ttl,
            shards: settings.shards.max(1),
        };
        let shards = (0..settings.shards)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            settings,
            shards,
            hasher: RandomState::new(),
            admission: Mutex::new(()),
            len: AtomicUsize::new(0),
            tick: AtomicU64::new(0),
            clock,
        }
    }

    /// Returns the entry for `coordinate`, fresh or not, and marks it as
    /// recently used.
    pub fn get(&self, coordinate: &Coordinate) -> Option<CacheEntry> {
        let shard = self.shard(coordinate).read().unwrap();
        let slot = shard.get(coordinate)?;
        slot.last_access.store(self.next_tick(), Ordering::Relaxed);
        Some(slot.entry.clone())
    }

    /// Like [`CacheStore::get`] without touching recency.
    pub fn peek(&self, coordinate: &Coordinate) -> Option<CacheEntry> {
        let shard = self.shard(coordinate).read().unwrap();
        shard.get(coordinate).map(|slot| slot.entry.clone())
    }

    /// Stores `document` under `coordinate` with a new freshness window.
    ///
    /// Returns the coordinate evicted to make room, if any.
    pub fn put(&self, coordinate: Coordinate, document: Arc<MetadataDocument>) -> Option<Coordinate> {
        let fetched_at = self.clock.now();
        let entry = CacheEntry {
            document,
            fetched_at,
            expires_at: fetched_at.checked_add(self.settings.ttl),
        };

        let entry = match self.replace(&coordinate, entry) {
            Ok(()) => return None,
            Err(entry) => entry,
        };

        let _admission = self.admission.lock().unwrap();

        // Another put may have admitted the key while we waited.
        let entry = match self.replace(&coordinate, entry) {
            Ok(()) => return None,
            Err(entry) => entry,
        };

        let mut evicted = None;
        while self.len.load(Ordering::Acquire) >= self.settings.max_entries {
            match self.evict_lru() {
                Some(victim) => evicted = Some(victim),
                None => break,
            }
        }

        let mut shard = self.shard(&coordinate).write().unwrap();
        shard.insert(
            coordinate,
            Slot {
                entry,
                last_access: AtomicU64::new(self.next_tick()),
            },
        );
        self.len.fetch_add(1, Ordering::AcqRel);

        evicted
    }

    /// Whether `entry` is still inside its freshness window.
    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.is_fresh_at(self.clock.now())
    }

    pub fn remove(&self, coordinate: &Coordinate) -> Option<CacheEntry> {
        let mut shard = self.shard(coordinate).write().unwrap();
        let slot = shard.remove(coordinate)?;
        self.len.fetch_sub(1, Ordering::AcqRel);
        Some(slot.entry)
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut shard = shard.write().unwrap();
            self.len.fetch_sub(shard.len(), Ordering::AcqRel);
            shard.clear();
        }
    }

    pub fn capacity(&self) -> usize {
        self.settings.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.settings.ttl
    }

    fn shard(&self, coordinate: &Coordinate) -> &Shard {
        let index = self.hasher.hash_one(coordinate) as usize % self.shards.len();
        &self.shards[index]
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn replace(&self, coordinate: &Coordinate, entry: CacheEntry) -> Result<(), CacheEntry> {
        let mut shard = self.shard(coordinate).write().unwrap();
        match shard.get_mut(coordinate) {
            Some(slot) => {
                slot.entry = entry;
                slot.last_access.store(self.next_tick(), Ordering::Relaxed);
                Ok(())
            }
            None => Err(entry),
        }
    }

    /// Removes the least recently used entry. Caller holds the admission lock.
    fn evict_lru(&self) -> Option<Coordinate> {
        loop {
            let (coordinate, tick) = self
                .shards
                .iter()
                .filter_map(|shard| {
                    let shard = shard.read().unwrap();
                    shard
                        .iter()
                        .map(|(k, slot)| (k.clone(), slot.last_access.load(Ordering::Relaxed)))
                        .min_by_key(|(_, tick)| *tick)
                })
                .min_by_key(|(_, tick)| *tick)?;

            let mut shard = self.shard(&coordinate).write().unwrap();
            // Skip the victim if it was read or removed since the scan.
            let unchanged = shard
                .get(&coordinate)
                .is_some_and(|slot| slot.last_access.load(Ordering::Relaxed) == tick);
            if unchanged {
                shard.remove(&coordinate);
                self.len.fetch_sub(1, Ordering::AcqRel);
                trace!(%coordinate, "evicted least recently used entry");
                return Some(coordinate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::clock::ManualClock;

    fn coordinate(artifact: &str) -> Coordinate {
        Coordinate::new("org.example", artifact).unwrap()
    }

    fn document(artifact: &str) -> Arc<MetadataDocument> {
        Arc::new(MetadataDocument {
            coordinate: coordinate(artifact),
            model_version: None,
            group_id: Some("org.example".into()),
            artifact_id: Some(artifact.into()),
            version: None,
            latest_version: Some("1.0".into()),
            release_version: Some("1.0".into()),
            versions: vec!["1.0".into()],
            last_updated: None,
            snapshot: None,
            snapshot_versions: Vec::new(),
        })
    }

    fn store(max_entries: usize, ttl: Duration) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(
            CacheSettings {
                max_entries,
                ttl,
                shards: 4,
            },
            clock.clone(),
        );
        (store, clock)
    }

    #[test]
    fn test_put_and_get() {
        let (store, _) = store(4, Duration::from_secs(60));
        assert!(store.get(&coordinate("widget")).is_none());

        store.put(coordinate("widget"), document("widget"));
        let entry = store.get(&coordinate("widget")).unwrap();
        assert_eq!(entry.document.versions, vec!["1.0"]);
        assert_eq!(
            entry.expires_at.unwrap() - entry.fetched_at,
            Duration::from_secs(60)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_freshness_window() {
        let (store, clock) = store(4, Duration::from_secs(60));
        store.put(coordinate("widget"), document("widget"));

        clock.advance(Duration::from_secs(59));
        assert!(store.is_fresh(&store.peek(&coordinate("widget")).unwrap()));

        clock.advance(Duration::from_secs(1));
        assert!(!store.is_fresh(&store.peek(&coordinate("widget")).unwrap()));
    }

    #[test]
    fn test_zero_ttl_is_always_stale_but_kept() {
        let (store, _) = store(4, Duration::ZERO);
        store.put(coordinate("widget"), document("widget"));

        let entry = store.get(&coordinate("widget")).unwrap();
        assert!(!store.is_fresh(&entry));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let (store, clock) = store(4, Duration::MAX);
        store.put(coordinate("widget"), document("widget"));

        let entry = store.get(&coordinate("widget")).unwrap();
        assert_eq!(entry.expires_at, None);

        clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
        assert!(store.is_fresh(&entry));
    }

    #[test]
    fn test_replace_renews_window_without_growing() {
        let (store, clock) = store(2, Duration::from_secs(60));
        store.put(coordinate("widget"), document("widget"));
        let first = store.peek(&coordinate("widget")).unwrap();

        clock.advance(Duration::from_secs(30));
        assert_eq!(store.put(coordinate("widget"), document("widget")), None);
        let second = store.peek(&coordinate("widget")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(second.fetched_at - first.fetched_at, Duration::from_secs(30));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let (store, _) = store(3, Duration::from_secs(60));
        for name in ["a", "b", "c"] {
            assert_eq!(store.put(coordinate(name), document(name)), None);
        }

        // `a` becomes the most recent; `b` is now the oldest.
        store.get(&coordinate("a"));

        assert_eq!(
            store.put(coordinate("d"), document("d")),
            Some(coordinate("b"))
        );
        assert_eq!(store.len(), 3);
        assert!(store.peek(&coordinate("b")).is_none());
        for name in ["a", "c", "d"] {
            assert!(store.peek(&coordinate(name)).is_some(), "{name} was evicted");
        }
    }

    #[test]
    fn test_peek_does_not_touch_recency() {
        let (store, _) = store(2, Duration::from_secs(60));
        store.put(coordinate("a"), document("a"));
        store.put(coordinate("b"), document("b"));

        store.peek(&coordinate("a"));

        assert_eq!(
            store.put(coordinate("c"), document("c")),
            Some(coordinate("a"))
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let (store, _) = store(4, Duration::from_secs(60));
        store.put(coordinate("a"), document("a"));
        store.put(coordinate("b"), document("b"));

        assert!(store.remove(&coordinate("a")).is_some());
        assert!(store.remove(&coordinate("a")).is_none());
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 4);
        assert_eq!(store.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (store, _) = store(0, Duration::from_secs(60));
        assert_eq!(store.capacity(), 1);
        store.put(coordinate("a"), document("a"));
        assert_eq!(
            store.put(coordinate("b"), document("b")),
            Some(coordinate("a"))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let (store, _) = store(16, Duration::from_secs(60));
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let name = format!("artifact-{t}-{i}");
                        store.put(coordinate(&name), document(&name));
                        store.get(&coordinate(&name));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        let stored: usize = store
            .shards
            .iter()
            .map(|shard| shard.read().unwrap().len())
            .sum();
        assert_eq!(stored, 16);
    }
}
