//! Error types emitted by the agrisite CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use agrisite_core::{ConfigError, RegionError, SourceUnavailable};
use agrisite_data::{CacheError, CandidateLoadError, FetcherBuildError};
use agrisite_scorer::BatchError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the agrisite CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass {usage} or set {env})")]
    MissingArgument {
        field: &'static str,
        usage: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The region preset or bounding box was rejected.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// Opening the scoring configuration file failed.
    #[error("failed to open scoring config at {path:?}: {source}")]
    OpenScoringConfig {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Scoring configuration JSON could not be decoded.
    #[error("failed to parse scoring config JSON at {path:?}: {source}")]
    ParseScoringConfig {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The merged analysis configuration failed validation.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// Reading the candidate file failed.
    #[error(transparent)]
    LoadCandidates(#[from] CandidateLoadError),
    /// Persisting the water-source cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Constructing the Overpass fetcher failed.
    #[error("failed to build Overpass fetcher for {endpoint:?}: {source}")]
    BuildFetcher {
        endpoint: String,
        #[source]
        source: FetcherBuildError,
    },
    /// The batch could not start.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// Water sources could not be listed.
    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailable),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
