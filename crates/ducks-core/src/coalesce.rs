//! Single-flight execution keyed by an arbitrary hashable key.
//!
//! The first caller for a key spawns the producer and registers a watch
//! channel; callers arriving while it runs subscribe to the same channel. When
//! the producer finishes, its registration is removed under the shard lock and
//! only then is the outcome published, so a caller that misses the
//! registration always starts a new producer instead of seeing an old result.

use std::{
    collections::HashMap,
    future::Future,
    hash::{BuildHasher, Hash, RandomState},
    sync::{Arc, Mutex},
};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{trace, warn};

/// The producer panicked or its task was cancelled before it published.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("in-flight producer aborted")]
pub struct Aborted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// This call started the producer.
    Leader,
    /// This call waited on a producer somebody else started.
    Follower,
}

/// Outcome of [`Coalescer::fetch_once`], as seen by one caller.
#[derive(Debug, Clone)]
pub struct Flight<T, E> {
    pub outcome: Result<T, E>,
    pub role: Role,
}

type Outcome<T, E> = watch::Receiver<Option<Result<T, E>>>;

struct Registry<K, T, E> {
    shards: Box<[Mutex<HashMap<K, Outcome<T, E>>>]>,
    hasher: RandomState,
}

impl<K: Hash + Eq, T, E> Registry<K, T, E> {
    fn shard(&self, key: &K) -> &Mutex<HashMap<K, Outcome<T, E>>> {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }
}

pub struct Coalescer<K, T, E> {
    registry: Arc<Registry<K, T, E>>,
}

impl<K, T, E> Coalescer<K, T, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<Aborted> + 'static,
{
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            registry: Arc::new(Registry {
                shards,
                hasher: RandomState::new(),
            }),
        }
    }

    /// Runs `producer` for `key` unless a run for the same key is already in
    /// flight, in which case its outcome is awaited instead.
    ///
    /// The producer is spawned on the current tokio runtime and keeps running
    /// if every caller goes away. Failures are shared with the waiters of that
    /// run and are not remembered afterwards.
    pub async fn fetch_once<F, Fut>(&self, key: K, producer: F) -> Flight<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (mut receiver, role) = {
            let mut in_flight = self.registry.shard(&key).lock().unwrap();
            match in_flight.get(&key) {
                Some(receiver) => (receiver.clone(), Role::Follower),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    in_flight.insert(key.clone(), receiver.clone());
                    self.spawn(key, sender, producer());
                    (receiver, Role::Leader)
                }
            }
        };

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(published) => {
                match published.as_ref() {
                    Some(outcome) => outcome.clone(),
                    None => Err(E::from(Aborted)),
                }
            }
            Err(_) => Err(E::from(Aborted)),
        };

        Flight { outcome, role }
    }

    /// Number of keys with a producer currently running.
    pub fn in_flight(&self) -> usize {
        self.registry
            .shards
            .iter()
            .map(|shard| shard.lock().unwrap().len())
            .sum()
    }

    fn spawn<Fut>(&self, key: K, sender: watch::Sender<Option<Result<T, E>>>, producer: Fut)
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let outcome = match tokio::spawn(producer).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("in-flight producer did not complete: {err}");
                    Err(E::from(Aborted))
                }
            };

            registry.shard(&key).lock().unwrap().remove(&key);
            trace!("publishing in-flight outcome");
            sender.send_replace(Some(outcome));
        });
    }
}

impl<K, T, E> Default for Coalescer<K, T, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<Aborted> + 'static,
{
    fn default() -> Self {
        Self::new(16)
    }
}
