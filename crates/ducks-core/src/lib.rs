//! The ducks metadata cache.
//!
//! [`ResolutionEngine`] answers coordinate lookups from an in-memory
//! [`CacheStore`], refreshing expired or missing documents through a
//! [`Coalescer`] so that concurrent lookups for the same coordinate share a
//! single upstream fetch. When a refresh fails for a transient reason, the
//! previous document is served instead ([`policy`]).

pub mod cache;
pub mod clock;
pub mod coalesce;
pub mod engine;
pub mod error;
pub mod policy;
pub mod view;

pub use cache::{CacheEntry, CacheSettings, CacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coalesce::{Aborted, Coalescer, Flight, Role};
pub use engine::{Lookup, Origin, ResolutionEngine, ResolutionEngineBuilder};
pub use error::{CoreError, LookupError, Result};
pub use view::MetadataView;
