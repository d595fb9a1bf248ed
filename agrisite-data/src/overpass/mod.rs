//! Water-source retrieval from OpenStreetMap via the Overpass API.
//!
//! [`OverpassWaterSourceFetcher`] implements
//! [`agrisite_core::WaterSourceFetcher`]: it builds an Overpass QL query for
//! the region's bounding box, POSTs it to the interpreter and maps the
//! tagged elements onto [`agrisite_core::WaterSource`] values. It is usually
//! wrapped by [`crate::cache::ExternalSourceCache`] rather than called
//! directly, so that repeated runs reuse the same snapshot.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use agrisite_core::{Region, WaterSourceFetcher};
//! use agrisite_data::overpass::{OverpassConfig, OverpassWaterSourceFetcher};
//!
//! let config = OverpassConfig::default().with_timeout(Duration::from_secs(120));
//! let fetcher = OverpassWaterSourceFetcher::with_config(config)?;
//! let sources = fetcher.fetch(&Region::turkey())?;
//! assert!(!sources.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod provider;
mod query;
mod response;

pub use provider::{
    DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, FetcherBuildError, OverpassConfig,
    OverpassWaterSourceFetcher,
};
pub use query::{bbox_filter, build_query};
pub use response::{Center, Element, OverpassResponse};
