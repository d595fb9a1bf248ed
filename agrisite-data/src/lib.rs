//! Data access for the agrisite engine.
//!
//! Responsibilities:
//! - Fetch water sources from OpenStreetMap through the Overpass API.
//! - Cache fetched sources per region in a durable JSON file with a TTL.
//! - Load candidate sites from CSV exports.
//!
//! Boundaries:
//! - Do not encode scoring rules (live in `agrisite-core` and
//!   `agrisite-scorer`).
//! - Network I/O happens once per region, never per candidate.
//!
//! Invariants:
//! - Cache entries are swapped whole; readers never see a partial refresh.
//! - No global mutable state; the cache is an explicit object.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
mod candidates;
pub mod overpass;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub use cache::ManualClock;
pub use cache::{
    CacheCatalogue, CacheError, Clock, ExternalSourceCache, RegionCacheEntry, SystemClock,
};
pub use candidates::{CandidateLoadError, load_candidates, read_candidates};
pub use overpass::{FetcherBuildError, OverpassConfig, OverpassWaterSourceFetcher};
