//! Seams for obtaining water-source data.
//!
//! [`WaterSourceFetcher`] is the raw, slow and fallible upstream call (an
//! Overpass query, a file import). [`WaterSourceCatalogue`] is what a batch
//! run consumes: it may serve cached data and reports whether that data is
//! stale. Both are synchronous so the scoring core stays embeddable in
//! synchronous callers.

use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

use crate::{Region, WaterSource};

/// Errors from [`WaterSourceFetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not reach the service.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Endpoint that was contacted.
        url: String,
        /// Description of the transport failure.
        message: String,
    },
    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint that was contacted.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}: {message}")]
    HttpError {
        /// Endpoint that was contacted.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response or client message.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse water-source response: {message}")]
    ParseError {
        /// Decoder message.
        message: String,
    },
    /// The service reported a failure in its payload.
    #[error("water-source service error: {message}")]
    ServiceError {
        /// Message reported by the service.
        message: String,
    },
}

/// Retrieve the water sources inside a region from an upstream system.
///
/// Implementations may block on network I/O. Callers invoke them once per
/// region, never per candidate.
pub trait WaterSourceFetcher: Send + Sync {
    /// Fetch every known water source inside `region`, in a stable order.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the upstream system fails or times out.
    fn fetch(&self, region: &Region) -> Result<Vec<WaterSource>, FetchError>;
}

/// Water sources served for a region together with their freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    /// Sources in the order they were fetched.
    pub sources: Arc<Vec<WaterSource>>,
    /// `true` when the data outlived its TTL and a refresh failed.
    pub stale: bool,
    /// When the data was fetched.
    pub fetched_at: SystemTime,
}

/// No fresh data could be fetched and nothing was cached to fall back on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("water sources for region '{region}' are unavailable")]
pub struct SourceUnavailable {
    /// Region that was requested.
    pub region: String,
    /// Failure reported by the fetcher.
    #[source]
    pub cause: FetchError,
}

/// Supplies water sources for a region, typically through a cache.
pub trait WaterSourceCatalogue {
    /// Return the water sources for `region`.
    ///
    /// # Errors
    /// Returns [`SourceUnavailable`] when no usable data exists.
    fn water_sources(&self, region: &Region) -> Result<SourceSnapshot, SourceUnavailable>;
}
