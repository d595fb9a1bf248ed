//! Productivity scoring and batch analysis for agrisite.
//!
//! The crate provides three layers on top of `agrisite-core`:
//! - [`ProductivityScorer`] turns one candidate's factor readings into an
//!   explainable 0-100 score and classification, excluding factors whose
//!   data is missing.
//! - [`BatchAnalysisRunner`] resolves water data once per region, scores a
//!   batch sequentially or on worker threads, and keeps only the best
//!   results in bounded memory.
//! - [`AnalysisReport`] renders an [`AnalysisSummary`] as JSON or text.
//!
//! # Examples
//!
//! ```
//! use agrisite_core::test_support::StaticCatalogue;
//! use agrisite_core::{
//!     AnalysisConfig, Candidate, CandidateAttributes, Coordinate, Region, WaterSource,
//!     WaterSourceKind,
//! };
//! use agrisite_scorer::{BatchAnalysisRunner, CancellationToken};
//!
//! let field = Coordinate::new(38.62, 27.43).unwrap();
//! let catalogue = StaticCatalogue::fresh(vec![WaterSource::new(field, WaterSourceKind::Well)]);
//! let attributes = CandidateAttributes {
//!     slope_deg: Some(2.0),
//!     landcover: Some("cropland".into()),
//!     ..CandidateAttributes::default()
//! };
//! let candidates = vec![Ok(Candidate::new(field, attributes))];
//!
//! let runner = BatchAnalysisRunner::new(AnalysisConfig::default()).unwrap();
//! let summary = runner
//!     .run(&candidates, &Region::turkey(), &catalogue, &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(summary.total_analyzed, 1);
//! assert_eq!(summary.productive_count, 1);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod batch;
mod report;
mod scorer;
mod summary;

pub use batch::{BatchAnalysisRunner, BatchError, CancellationToken};
pub use report::{AnalysisReport, FactorBreakdown, ReportEntry, TEXT_REPORT_TOP, TextReport};
pub use scorer::{
    Classification, ExcludedFactor, FactorScore, ProductivityResult, ProductivityScorer,
    ProductivityTier, ScoreError,
};
pub use summary::{AnalysisSummary, WaterSourceStatus};
