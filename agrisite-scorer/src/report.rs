//! Serialisable report model and plain-text rendering.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use agrisite_core::{Factor, NearestWater, RawValue};
use serde::Serialize;

use crate::{
    AnalysisSummary, Classification, ExcludedFactor, ProductivityResult, ProductivityTier,
    WaterSourceStatus,
};

/// Number of results included in the text rendering.
pub const TEXT_REPORT_TOP: usize = 3;

/// One factor in a report entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorBreakdown {
    /// Suitability in `0.0..=1.0`.
    pub normalized: f64,
    /// Measured value.
    pub raw: RawValue,
    /// Applied weight.
    pub weight: f64,
}

/// One ranked area in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// One-based rank.
    pub rank: usize,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Composite score.
    pub score: f64,
    /// Threshold classification.
    pub classification: Classification,
    /// Report band.
    pub category: ProductivityTier,
    /// Contributing factors keyed by name.
    pub factor_breakdown: BTreeMap<Factor, FactorBreakdown>,
    /// Factors left out and why.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_factors: Vec<ExcludedFactor>,
    /// Closest water source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_water: Option<NearestWater>,
}

impl ReportEntry {
    fn new(rank: usize, result: &ProductivityResult) -> Self {
        let factor_breakdown = result
            .factors
            .iter()
            .map(|f| {
                (
                    f.factor,
                    FactorBreakdown {
                        normalized: f.normalized,
                        raw: f.raw.clone(),
                        weight: f.weight,
                    },
                )
            })
            .collect();
        Self {
            rank,
            lat: result.coordinate.lat(),
            lon: result.coordinate.lon(),
            score: result.score,
            classification: result.classification,
            category: result.tier,
            factor_breakdown,
            excluded_factors: result.excluded.clone(),
            nearest_water: result.nearest_water.clone(),
        }
    }
}

/// Structured form of an [`AnalysisSummary`] for JSON output.
///
/// Serialisation is deterministic: identical summaries produce identical
/// bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Candidates processed.
    pub total_analyzed: usize,
    /// Candidates classed as productive.
    pub productive_count: usize,
    /// Candidates classed as not productive.
    pub not_productive_count: usize,
    /// Candidates that could not be scored.
    pub errored_count: usize,
    /// Fraction of processed candidates that were productive.
    pub success_rate: f64,
    /// Water data used.
    pub water_sources: WaterSourceStatus,
    /// Whether the run was cut short.
    pub cancelled: bool,
    /// Best areas, best first.
    pub top_results: Vec<ReportEntry>,
}

impl From<&AnalysisSummary> for AnalysisReport {
    fn from(summary: &AnalysisSummary) -> Self {
        Self {
            total_analyzed: summary.total_analyzed,
            productive_count: summary.productive_count,
            not_productive_count: summary.not_productive_count,
            errored_count: summary.errored_count,
            success_rate: summary.success_rate,
            water_sources: summary.water_sources,
            cancelled: summary.cancelled,
            top_results: summary
                .top_results
                .iter()
                .enumerate()
                .map(|(i, result)| ReportEntry::new(i.saturating_add(1), result))
                .collect(),
        }
    }
}

impl AnalysisReport {
    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns the `serde_json` error if serialisation fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Borrow a plain-text view of the report.
    #[must_use]
    pub const fn text(&self) -> TextReport<'_> {
        TextReport(self)
    }
}

/// Plain-text rendering listing totals and the best areas.
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a>(&'a AnalysisReport);

impl fmt::Display for TextReport<'_> {
    #[expect(
        clippy::float_arithmetic,
        reason = "success rate is shown as a percentage"
    )]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "Land productivity analysis")?;
        writeln!(f, "  analysed:      {}", report.total_analyzed)?;
        writeln!(f, "  productive:    {}", report.productive_count)?;
        writeln!(f, "  not productive: {}", report.not_productive_count)?;
        writeln!(f, "  errored:       {}", report.errored_count)?;
        writeln!(f, "  success rate:  {:.1}%", report.success_rate * 100.0)?;
        write!(f, "  water sources: {}", report.water_sources.count)?;
        if report.water_sources.stale {
            write!(f, " (stale)")?;
        }
        writeln!(f)?;
        if report.cancelled {
            writeln!(f, "  run was cancelled before every candidate was analysed")?;
        }
        if report.top_results.is_empty() {
            return writeln!(f, "No areas could be scored.");
        }
        writeln!(f, "Top areas:")?;
        for entry in report.top_results.iter().take(TEXT_REPORT_TOP) {
            writeln!(
                f,
                "  {}. ({:.5}, {:.5}) score {:.1} [{}]",
                entry.rank, entry.lat, entry.lon, entry.score, entry.category
            )?;
            for (factor, breakdown) in &entry.factor_breakdown {
                writeln!(
                    f,
                    "     {factor}: {:.2} (raw {}, weight {})",
                    breakdown.normalized, breakdown.raw, breakdown.weight
                )?;
            }
            for excluded in &entry.excluded_factors {
                writeln!(f, "     {}: excluded, {}", excluded.factor, excluded.reason)?;
            }
            if let Some(water) = &entry.nearest_water {
                write!(f, "     nearest water: {:.1} km ({}", water.distance_km, water.kind)?;
                if let Some(name) = &water.name {
                    write!(f, ", {name}")?;
                }
                writeln!(f, ")")?;
            }
        }
        Ok(())
    }
}
