//! Weighted aggregation of factor readings into a composite score.
#![forbid(unsafe_code)]

use std::fmt;

use agrisite_core::{
    CandidateAttributes, ConfigError, Coordinate, EvaluationInput, Factor, FactorError,
    FactorEvaluator, GeoIndex, NearestWater, RawValue, ScoringConfig, standard_evaluators,
};
use serde::Serialize;
use thiserror::Error;

/// Binary outcome of comparing a score against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Score at or above the threshold.
    Productive,
    /// Score below the threshold.
    NotProductive,
}

impl Classification {
    /// Classify `score` against an inclusive `threshold`.
    #[must_use]
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Self::Productive
        } else {
            Self::NotProductive
        }
    }

    /// Return the classification as a `snake_case` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Productive => "productive",
            Self::NotProductive => "not_productive",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse productivity band used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityTier {
    /// Score of 80 or more.
    HighlyProductive,
    /// Score of 70 up to 80.
    Productive,
    /// Score of 60 up to 70.
    ModeratelyProductive,
    /// Anything lower.
    LowProductivity,
}

impl ProductivityTier {
    /// Band a composite score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::HighlyProductive
        } else if score >= 70.0 {
            Self::Productive
        } else if score >= 60.0 {
            Self::ModeratelyProductive
        } else {
            Self::LowProductivity
        }
    }

    /// Return the tier as a `snake_case` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighlyProductive => "highly_productive",
            Self::Productive => "productive",
            Self::ModeratelyProductive => "moderately_productive",
            Self::LowProductivity => "low_productivity",
        }
    }
}

impl fmt::Display for ProductivityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One factor's contribution to a composite score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorScore {
    /// Factor evaluated.
    pub factor: Factor,
    /// Suitability in `0.0..=1.0`.
    pub normalized: f64,
    /// Measurement the suitability came from.
    pub raw: RawValue,
    /// Weight applied in the aggregate.
    pub weight: f64,
}

/// A factor left out of the aggregate and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedFactor {
    /// Factor that was excluded.
    pub factor: Factor,
    /// Human-readable reason.
    pub reason: String,
}

/// Explainable score for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityResult {
    /// Scored position.
    pub coordinate: Coordinate,
    /// Composite score in `0.0..=100.0`.
    pub score: f64,
    /// Threshold classification.
    pub classification: Classification,
    /// Report band.
    pub tier: ProductivityTier,
    /// Contributing factors in evaluation order.
    pub factors: Vec<FactorScore>,
    /// Factors dropped because their data was unavailable.
    pub excluded: Vec<ExcludedFactor>,
    /// Closest water source, when an index was supplied and non-empty.
    pub nearest_water: Option<NearestWater>,
}

/// Reasons a candidate could not be scored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// An evaluator rejected the candidate's data.
    #[error("{factor} could not be evaluated")]
    Factor {
        /// Factor whose evaluator failed.
        factor: Factor,
        /// Evaluator failure.
        #[source]
        source: FactorError,
    },
    /// Every weighted factor was excluded.
    #[error("no factor could be evaluated")]
    NoUsableFactors,
}

/// Combines factor evaluators into a composite 0-100 score.
///
/// Factors with a zero weight are not evaluated. Factors whose evaluator
/// reports missing data are excluded from both sides of the weighted mean;
/// any other evaluator failure rejects the candidate.
///
/// # Examples
///
/// ```
/// use agrisite_core::{CandidateAttributes, Coordinate, Factor, FactorWeights, ScoringConfig};
/// use agrisite_scorer::{Classification, ProductivityScorer};
///
/// let config = ScoringConfig {
///     weights: FactorWeights::zero().with(Factor::Landcover, 1.0),
///     ..ScoringConfig::default()
/// };
/// let scorer = ProductivityScorer::new(config).unwrap();
/// let attributes = CandidateAttributes {
///     landcover: Some("cropland".into()),
///     ..CandidateAttributes::default()
/// };
/// let result = scorer
///     .score(Coordinate::new(38.4, 27.1).unwrap(), &attributes, None)
///     .unwrap();
/// assert_eq!(result.score, 100.0);
/// assert_eq!(result.classification, Classification::Productive);
/// ```
pub struct ProductivityScorer {
    config: ScoringConfig,
    evaluators: Vec<Box<dyn FactorEvaluator>>,
}

impl ProductivityScorer {
    /// Build a scorer with the built-in evaluators.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        let valid = config.validate()?;
        Ok(Self {
            evaluators: standard_evaluators(&valid.bounds),
            config: valid,
        })
    }

    /// Build a scorer with caller-supplied evaluators.
    ///
    /// Evaluators run in the order given; weights are still looked up per
    /// [`Factor`].
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn with_evaluators(
        config: ScoringConfig,
        evaluators: Vec<Box<dyn FactorEvaluator>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            config: config.validate()?,
            evaluators,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one candidate.
    ///
    /// # Errors
    /// Returns [`ScoreError::Factor`] for invalid or unknown attribute
    /// values and [`ScoreError::NoUsableFactors`] when nothing could be
    /// evaluated.
    pub fn score(
        &self,
        coordinate: Coordinate,
        attributes: &CandidateAttributes,
        geo_index: Option<&GeoIndex>,
    ) -> Result<ProductivityResult, ScoreError> {
        let input = EvaluationInput {
            coordinate,
            attributes,
            geo_index,
        };
        let mut factors = Vec::with_capacity(self.evaluators.len());
        let mut excluded = Vec::new();
        for evaluator in &self.evaluators {
            let factor = evaluator.factor();
            let weight = self.config.weights.weight(factor);
            if weight <= 0.0 {
                continue;
            }
            match evaluator.evaluate(&input) {
                Ok(reading) => factors.push(FactorScore {
                    factor,
                    normalized: unit(reading.normalized),
                    raw: reading.raw,
                    weight,
                }),
                Err(err) if err.is_recoverable() => excluded.push(ExcludedFactor {
                    factor,
                    reason: err.to_string(),
                }),
                Err(source) => return Err(ScoreError::Factor { factor, source }),
            }
        }
        let score = composite(&factors).ok_or(ScoreError::NoUsableFactors)?;
        Ok(ProductivityResult {
            coordinate,
            score,
            classification: Classification::from_score(score, self.config.threshold),
            tier: ProductivityTier::from_score(score),
            factors,
            excluded,
            nearest_water: geo_index.and_then(|index| index.nearest(coordinate).ok()),
        })
    }
}

impl fmt::Debug for ProductivityScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factors: Vec<Factor> = self.evaluators.iter().map(|e| e.factor()).collect();
        f.debug_struct("ProductivityScorer")
            .field("config", &self.config)
            .field("factors", &factors)
            .finish()
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted mean of the readings scaled to 0-100, or `None` when nothing
/// carries weight.
#[expect(
    clippy::float_arithmetic,
    reason = "the composite score is a weighted mean"
)]
fn composite(factors: &[FactorScore]) -> Option<f64> {
    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    if factors.is_empty() || total_weight <= 0.0 {
        return None;
    }
    let weighted: f64 = factors.iter().map(|f| f.weight * f.normalized).sum();
    Some((100.0 * weighted / total_weight).clamp(0.0, 100.0))
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "tests compare scores within a tolerance"
)]
mod tests {
    use super::*;
    use agrisite_core::{FactorWeights, WaterSource, WaterSourceKind};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn config(weights: FactorWeights, threshold: f64) -> ScoringConfig {
        ScoringConfig {
            weights,
            threshold,
            ..ScoringConfig::default()
        }
    }

    #[fixture]
    fn full_attributes() -> CandidateAttributes {
        CandidateAttributes {
            elevation_m: Some(400.0),
            slope_deg: Some(3.0),
            soil_ph: Some(6.5),
            annual_precipitation_mm: Some(650.0),
            sunshine_hours: Some(2600.0),
            landcover: Some("cropland".to_owned()),
        }
    }

    #[rstest]
    fn perfect_candidate_scores_near_full(full_attributes: CandidateAttributes) {
        let index = GeoIndex::build(&[WaterSource::new(at(38.0, 27.0), WaterSourceKind::River)]);
        let scorer = ProductivityScorer::new(ScoringConfig::default()).expect("valid config");
        let result = scorer
            .score(at(38.0, 27.0), &full_attributes, Some(&index))
            .expect("scored");
        assert!(result.score > 95.0, "score {}", result.score);
        assert_eq!(result.tier, ProductivityTier::HighlyProductive);
        assert_eq!(result.factors.len(), Factor::ALL.len());
        assert!(result.excluded.is_empty());
        assert_eq!(
            result.nearest_water.map(|n| n.kind),
            Some(WaterSourceKind::River)
        );
    }

    #[rstest]
    fn missing_index_excludes_water(full_attributes: CandidateAttributes) {
        let scorer = ProductivityScorer::new(ScoringConfig::default()).expect("valid config");
        let result = scorer
            .score(at(38.0, 27.0), &full_attributes, None)
            .expect("scored");
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(
            result.excluded.first().map(|e| e.factor),
            Some(Factor::WaterProximity)
        );
        assert!(
            result
                .factors
                .iter()
                .all(|f| f.factor != Factor::WaterProximity)
        );
        assert!(result.nearest_water.is_none());
    }

    #[rstest]
    fn excluded_weight_leaves_denominator() {
        let weights = FactorWeights::zero()
            .with(Factor::Landcover, 1.0)
            .with(Factor::SoilPh, 3.0);
        let scorer = ProductivityScorer::new(config(weights, 50.0)).expect("valid config");
        let attributes = CandidateAttributes {
            landcover: Some("grassland".to_owned()),
            ..CandidateAttributes::default()
        };
        let result = scorer
            .score(at(39.0, 32.0), &attributes, None)
            .expect("scored");
        assert!((result.score - 70.0).abs() < 1.0e-9, "score {}", result.score);
        assert_eq!(
            result.excluded.first().map(|e| e.factor),
            Some(Factor::SoilPh)
        );
    }

    #[rstest]
    fn zero_weight_factors_are_skipped() {
        let weights = FactorWeights::zero().with(Factor::Slope, 1.0);
        let scorer = ProductivityScorer::new(config(weights, 50.0)).expect("valid config");
        let attributes = CandidateAttributes {
            slope_deg: Some(0.0),
            landcover: Some("lava field".to_owned()),
            ..CandidateAttributes::default()
        };
        let result = scorer
            .score(at(39.0, 32.0), &attributes, None)
            .expect("landcover is not weighted");
        assert_eq!(result.factors.len(), 1);
        assert!(result.excluded.is_empty());
    }

    #[rstest]
    fn unknown_landcover_rejects_candidate(mut full_attributes: CandidateAttributes) {
        full_attributes.landcover = Some("lava field".to_owned());
        let scorer = ProductivityScorer::new(ScoringConfig::default()).expect("valid config");
        let err = scorer
            .score(at(38.0, 27.0), &full_attributes, None)
            .expect_err("unknown class");
        assert!(matches!(
            err,
            ScoreError::Factor {
                factor: Factor::Landcover,
                source: FactorError::UnknownLandcover { .. },
            }
        ));
    }

    #[rstest]
    fn nothing_evaluable_is_an_error() {
        let scorer = ProductivityScorer::new(ScoringConfig::default()).expect("valid config");
        let err = scorer
            .score(at(38.0, 27.0), &CandidateAttributes::default(), None)
            .expect_err("no data");
        assert_eq!(err, ScoreError::NoUsableFactors);
    }

    #[rstest]
    #[case(50.0, 50.0, Classification::Productive)]
    #[case(49.999, 50.0, Classification::NotProductive)]
    #[case(0.0, 0.0, Classification::Productive)]
    fn threshold_is_inclusive(
        #[case] score: f64,
        #[case] threshold: f64,
        #[case] expected: Classification,
    ) {
        assert_eq!(Classification::from_score(score, threshold), expected);
    }

    #[rstest]
    #[case(95.0, ProductivityTier::HighlyProductive)]
    #[case(80.0, ProductivityTier::HighlyProductive)]
    #[case(72.5, ProductivityTier::Productive)]
    #[case(60.0, ProductivityTier::ModeratelyProductive)]
    #[case(12.0, ProductivityTier::LowProductivity)]
    fn tiers_band_scores(#[case] score: f64, #[case] expected: ProductivityTier) {
        assert_eq!(ProductivityTier::from_score(score), expected);
    }

    #[rstest]
    fn rejects_invalid_config() {
        let err = ProductivityScorer::new(config(FactorWeights::default(), 120.0))
            .expect_err("threshold out of range");
        assert!(matches!(err, ConfigError::ThresholdOutOfRange { .. }));
    }

    proptest! {
        #[test]
        fn composite_is_bounded_and_classified(
            slope in 0.0_f64..90.0,
            ph in 0.0_f64..14.0,
            precipitation in 0.0_f64..3000.0,
            sunshine in 0.0_f64..4000.0,
            elevation in -400.0_f64..5000.0,
            threshold in 0.0_f64..=100.0,
        ) {
            let scorer = ProductivityScorer::new(config(FactorWeights::default(), threshold))
                .expect("valid config");
            let attributes = CandidateAttributes {
                elevation_m: Some(elevation),
                slope_deg: Some(slope),
                soil_ph: Some(ph),
                annual_precipitation_mm: Some(precipitation),
                sunshine_hours: Some(sunshine),
                landcover: Some("forest".to_owned()),
            };
            let result = scorer.score(at(38.0, 27.0), &attributes, None).expect("scored");
            prop_assert!((0.0..=100.0).contains(&result.score));
            prop_assert_eq!(
                result.classification == Classification::Productive,
                result.score >= threshold
            );
        }
    }
}
