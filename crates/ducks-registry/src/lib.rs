//! Maven repository metadata for the ducks cache.
//!
//! This crate knows how to talk to a remote Maven-style repository and how to
//! read what it sends back. It has no notion of caching.
//!
//! # Overview
//!
//! - [`Coordinate`]: a validated `group:artifact[:version]` key
//! - [`parse`]: turns a raw `maven-metadata.xml` into a [`MetadataDocument`]
//! - [`UpstreamFetcher`]: retrieves the raw document for a coordinate, with an
//!   HTTP implementation ([`HttpFetcher`]) and an ordered fallback over several
//!   repositories ([`FallbackFetcher`])
//!
//! # Example
//!
//! ```no_run
//! use ducks_registry::{parse, Coordinate, HttpFetcher, UpstreamFetcher};
//! use ducks_registry::http_client::ClientConfig;
//!
//! fn versions() -> Result<Vec<String>, Box<dyn std::error::Error>> {
//!     let fetcher = HttpFetcher::new(
//!         "central",
//!         "https://repo.maven.apache.org/maven2/",
//!         &ClientConfig::default(),
//!     )?;
//!     let coordinate = Coordinate::new("org.slf4j", "slf4j-api")?;
//!     let raw = fetcher.fetch(&coordinate)?;
//!     Ok(parse(&raw, &coordinate)?.versions)
//! }
//! ```

pub mod coordinate;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod metadata;

pub use coordinate::{Coordinate, METADATA_FILE_NAME};
pub use error::{CoordinateError, FetchError, ParseError, RegistryError, Result};
pub use fetch::{FallbackFetcher, HttpFetcher, UpstreamFetcher};
pub use metadata::{parse, MetadataDocument, Snapshot, SnapshotVersion};
