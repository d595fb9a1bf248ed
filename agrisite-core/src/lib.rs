//! Core domain types for the agrisite land productivity engine.
//!
//! The crate defines the vocabulary shared by every other crate: validated
//! coordinates and regions, water sources and the spatial index over them,
//! candidate measurements, the per-factor evaluators and the configuration
//! that weights them. It performs no I/O; fetching and caching live behind
//! the [`WaterSourceFetcher`] and [`WaterSourceCatalogue`] traits.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod candidate;
mod config;
mod coordinate;
mod factor;
mod geo_index;
mod source;
mod water;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use candidate::{
    Candidate, CandidateAttributes, CandidateInput, Landcover, MalformedCandidate,
    dedup_by_coordinate,
};
pub use config::{
    AnalysisConfig, ConfigError, DEFAULT_CACHE_TTL_SECS, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_THRESHOLD, DEFAULT_TOP_N, ElevationBounds, FactorWeights, NormalizationBounds,
    SaturationBounds, ScoringConfig, SlopeBounds, SoilPhBounds, WaterBounds,
};
pub use coordinate::{COORDINATE_EPSILON, Coordinate, CoordinateError, Region, RegionError};
pub use factor::{
    Capability, ElevationEvaluator, EvaluationInput, Factor, FactorError, FactorEvaluator,
    FactorReading, LandcoverEvaluator, RawValue, SaturatingEvaluator, SlopeEvaluator,
    SoilPhEvaluator, WaterProximityEvaluator, linear_decay, plateau_then_decay, saturating,
    standard_evaluators, triangular,
};
pub use geo_index::{GeoIndex, NearestWater, NoWaterSources};
pub use source::{
    FetchError, SourceSnapshot, SourceUnavailable, WaterSourceCatalogue, WaterSourceFetcher,
};
pub use water::{WaterSource, WaterSourceKind};
