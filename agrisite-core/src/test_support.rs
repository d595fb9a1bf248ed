//! Test doubles for the water-source seams.
//!
//! Available to this crate's tests and, through the `test-support`
//! feature, to downstream crates.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use crate::{
    FetchError, Region, SourceSnapshot, SourceUnavailable, WaterSource, WaterSourceCatalogue,
    WaterSourceFetcher,
};

/// Fetcher returning a fixed response and counting invocations.
#[derive(Debug)]
pub struct StubFetcher {
    response: Result<Vec<WaterSource>, FetchError>,
    calls: AtomicUsize,
}

impl StubFetcher {
    /// Succeed with `sources` on every call.
    #[must_use]
    pub const fn with_sources(sources: Vec<WaterSource>) -> Self {
        Self {
            response: Ok(sources),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail with `error` on every call.
    #[must_use]
    pub const fn with_error(error: FetchError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail with a generic network error on every call.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::with_error(FetchError::NetworkError {
            url: "http://overpass.invalid/api/interpreter".to_owned(),
            message: "connection refused".to_owned(),
        })
    }

    /// Number of `fetch` invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WaterSourceFetcher for StubFetcher {
    fn fetch(&self, _region: &Region) -> Result<Vec<WaterSource>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Catalogue serving a fixed snapshot or a fixed failure.
#[derive(Debug, Clone)]
pub struct StaticCatalogue {
    response: Result<SourceSnapshot, FetchError>,
}

impl StaticCatalogue {
    /// Serve `sources` as fresh data.
    #[must_use]
    pub fn fresh(sources: Vec<WaterSource>) -> Self {
        Self {
            response: Ok(SourceSnapshot {
                sources: Arc::new(sources),
                stale: false,
                fetched_at: SystemTime::UNIX_EPOCH,
            }),
        }
    }

    /// Serve `sources` flagged as stale.
    #[must_use]
    pub fn stale(sources: Vec<WaterSource>) -> Self {
        Self {
            response: Ok(SourceSnapshot {
                sources: Arc::new(sources),
                stale: true,
                fetched_at: SystemTime::UNIX_EPOCH,
            }),
        }
    }

    /// Always report [`SourceUnavailable`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            response: Err(FetchError::ServiceError {
                message: "upstream offline".to_owned(),
            }),
        }
    }
}

impl WaterSourceCatalogue for StaticCatalogue {
    fn water_sources(&self, region: &Region) -> Result<SourceSnapshot, SourceUnavailable> {
        self.response.clone().map_err(|cause| SourceUnavailable {
            region: region.key().to_owned(),
            cause,
        })
    }
}
