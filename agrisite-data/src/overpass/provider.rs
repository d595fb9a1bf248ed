//! Blocking [`WaterSourceFetcher`] backed by the Overpass API.
//!
//! The fetcher trait is synchronous so that the cache and batch stay free of
//! async plumbing. This module bridges to `reqwest` by blocking on a Tokio
//! runtime it owns.

use std::time::Duration;

use agrisite_core::{FetchError, Region, WaterSource, WaterSourceFetcher};
use log::{debug, info};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::query::build_query;
use super::response::OverpassResponse;

/// Public Overpass interpreter endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "agrisite/0.1";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default server-side query timeout in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 180;

/// Errors raised while constructing an [`OverpassWaterSourceFetcher`].
#[derive(Debug, Error)]
pub enum FetcherBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`OverpassWaterSourceFetcher`].
#[derive(Debug, Clone)]
pub struct OverpassConfig {
    /// Interpreter URL receiving the POSTed query.
    pub endpoint: String,
    /// HTTP connect and request timeout.
    pub timeout: Duration,
    /// Timeout embedded in the query for the server to enforce.
    pub query_timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OverpassConfig {
    /// Configuration targeting `endpoint` with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the server-side query timeout.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches water sources for a region from an Overpass interpreter.
///
/// When called inside a multi-threaded Tokio runtime the request runs on
/// that runtime via [`tokio::task::block_in_place`]. Otherwise, including
/// inside a `current_thread` runtime, the fetcher's own runtime is used.
pub struct OverpassWaterSourceFetcher {
    client: Client,
    config: OverpassConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for OverpassWaterSourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassWaterSourceFetcher")
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl OverpassWaterSourceFetcher {
    /// Fetcher for `endpoint` with default timeouts.
    ///
    /// # Errors
    /// Returns [`FetcherBuildError`] if the HTTP client or runtime fails to
    /// build.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetcherBuildError> {
        Self::with_config(OverpassConfig::new(endpoint))
    }

    /// Fetcher with explicit configuration.
    ///
    /// # Errors
    /// Returns [`FetcherBuildError`] if the HTTP client or runtime fails to
    /// build.
    pub fn with_config(config: OverpassConfig) -> Result<Self, FetcherBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(FetcherBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(FetcherBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }

    async fn fetch_async(&self, region: &Region) -> Result<Vec<WaterSource>, FetchError> {
        let url = self.config.endpoint.as_str();
        let query = build_query(region, self.config.query_timeout.as_secs());
        debug!("overpass query for region '{}':\n{query}", region.key());

        let response = self
            .client
            .post(url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;

        let body: OverpassResponse =
            response
                .json()
                .await
                .map_err(|err| FetchError::ParseError {
                    message: err.to_string(),
                })?;
        let sources = body.into_sources()?;
        info!(
            "fetched {} water sources for region '{}'",
            sources.len(),
            region.key()
        );
        Ok(sources)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return FetchError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        FetchError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl WaterSourceFetcher for OverpassWaterSourceFetcher {
    fn fetch(&self, region: &Region) -> Result<Vec<WaterSource>, FetchError> {
        let future = self.fetch_async(region);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
