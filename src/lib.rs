//! Facade crate for the agrisite land productivity engine.
//!
//! This crate re-exports the core domain types and the scorer, and exposes
//! the cache, Overpass fetcher and CSV loader behind the `data` feature.

#![forbid(unsafe_code)]

pub use agrisite_core::{
    AnalysisConfig, Candidate, CandidateAttributes, CandidateInput, ConfigError, Coordinate,
    Factor, FactorError, GeoIndex, Landcover, NearestWater, Region, ScoringConfig,
    SourceSnapshot, SourceUnavailable, WaterSource, WaterSourceCatalogue, WaterSourceFetcher,
    WaterSourceKind,
};
pub use agrisite_scorer::{
    AnalysisReport, AnalysisSummary, BatchAnalysisRunner, BatchError, CancellationToken,
    Classification, ProductivityResult, ProductivityScorer, ProductivityTier,
};

#[cfg(feature = "data")]
pub use agrisite_data::{
    CacheCatalogue, ExternalSourceCache, OverpassConfig, OverpassWaterSourceFetcher,
    load_candidates,
};
