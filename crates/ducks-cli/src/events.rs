use std::{sync::mpsc::Receiver, thread::JoinHandle};

use ducks_events::CacheEvent;
use tracing::{debug, trace};

/// Handle to the background thread that logs cache events.
///
/// Drop every sender (the engine) before calling [`EventLogGuard::finish`],
/// otherwise the thread keeps waiting for more events.
pub struct EventLogGuard {
    handle: Option<JoinHandle<()>>,
}

impl EventLogGuard {
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

pub fn spawn_event_logger(receiver: Receiver<CacheEvent>) -> EventLogGuard {
    let handle = std::thread::spawn(move || {
        while let Ok(event) = receiver.recv() {
            match event {
                CacheEvent::Hit { coordinate } => trace!("{coordinate}: fresh in cache"),
                CacheEvent::Miss { coordinate } => trace!("{coordinate}: not cached"),
                CacheEvent::Stale { coordinate } => debug!("{coordinate}: cached copy expired"),
                CacheEvent::FetchStarted { coordinate } => {
                    debug!("{coordinate}: fetching from upstream")
                }
                CacheEvent::Coalesced { coordinate } => {
                    debug!("{coordinate}: joined an in-flight fetch")
                }
                CacheEvent::FetchSucceeded {
                    coordinate,
                    versions,
                } => debug!("{coordinate}: fetched {versions} versions"),
                CacheEvent::FetchFailed { coordinate, reason } => {
                    debug!("{coordinate}: fetch failed: {reason}")
                }
                CacheEvent::ServedStale { coordinate, reason } => {
                    debug!("{coordinate}: serving stale copy ({reason})")
                }
                CacheEvent::Evicted { coordinate } => trace!("{coordinate}: evicted"),
            }
        }
    });

    EventLogGuard {
        handle: Some(handle),
    }
}
