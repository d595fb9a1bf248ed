//! Scoring and analysis configuration with validated defaults.
//!
//! Configuration is plain data: callers build it (usually by
//! deserialising JSON), call `validate` once at load time, and pass it by
//! reference from then on. Every field has a documented default so a
//! partial document is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Factor;

/// Invalid configuration detected at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A factor weight was negative or not finite.
    #[error("weight for {factor} must be finite and non-negative, got {value}")]
    InvalidWeight {
        /// Factor carrying the bad weight.
        factor: Factor,
        /// Weight supplied.
        value: f64,
    },
    /// Every weight was zero.
    #[error("at least one factor weight must be positive")]
    ZeroTotalWeight,
    /// The classification threshold fell outside `[0, 100]`.
    #[error("classification threshold {value} is outside [0, 100]")]
    ThresholdOutOfRange {
        /// Threshold supplied.
        value: f64,
    },
    /// A normalisation bound was not finite or out of order.
    #[error("normalisation bounds for {factor} are invalid: {reason}")]
    InvalidBounds {
        /// Factor whose curve is misconfigured.
        factor: Factor,
        /// Which constraint failed.
        reason: &'static str,
    },
    /// A count or duration that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroValue {
        /// Name of the offending option.
        field: &'static str,
    },
}

/// Relative importance of each factor.
///
/// Defaults use a 93-point agronomic allocation:
/// water 25, slope 20, elevation 15, soil 10, precipitation 8, sunshine 7
/// and landcover 8. Only ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorWeights {
    /// Weight of [`Factor::WaterProximity`].
    pub water_proximity: f64,
    /// Weight of [`Factor::Slope`].
    pub slope: f64,
    /// Weight of [`Factor::Elevation`].
    pub elevation: f64,
    /// Weight of [`Factor::SoilPh`].
    pub soil_ph: f64,
    /// Weight of [`Factor::Precipitation`].
    pub precipitation: f64,
    /// Weight of [`Factor::Sunshine`].
    pub sunshine: f64,
    /// Weight of [`Factor::Landcover`].
    pub landcover: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            water_proximity: 25.0,
            slope: 20.0,
            elevation: 15.0,
            soil_ph: 10.0,
            precipitation: 8.0,
            sunshine: 7.0,
            landcover: 8.0,
        }
    }
}

impl FactorWeights {
    /// All weights zero; a starting point for sparse configurations.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            water_proximity: 0.0,
            slope: 0.0,
            elevation: 0.0,
            soil_ph: 0.0,
            precipitation: 0.0,
            sunshine: 0.0,
            landcover: 0.0,
        }
    }

    /// Weight configured for `factor`.
    #[must_use]
    pub const fn weight(&self, factor: Factor) -> f64 {
        match factor {
            Factor::WaterProximity => self.water_proximity,
            Factor::Slope => self.slope,
            Factor::Elevation => self.elevation,
            Factor::SoilPh => self.soil_ph,
            Factor::Precipitation => self.precipitation,
            Factor::Sunshine => self.sunshine,
            Factor::Landcover => self.landcover,
        }
    }

    /// Return a copy with `factor` set to `value`.
    #[must_use]
    pub const fn with(mut self, factor: Factor, value: f64) -> Self {
        match factor {
            Factor::WaterProximity => self.water_proximity = value,
            Factor::Slope => self.slope = value,
            Factor::Elevation => self.elevation = value,
            Factor::SoilPh => self.soil_ph = value,
            Factor::Precipitation => self.precipitation = value,
            Factor::Sunshine => self.sunshine = value,
            Factor::Landcover => self.landcover = value,
        }
        self
    }

    /// Check every weight is finite and non-negative with a positive total.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidWeight`] or
    /// [`ConfigError::ZeroTotalWeight`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for factor in Factor::ALL {
            let value = self.weight(factor);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { factor, value });
            }
        }
        if Factor::ALL.iter().all(|factor| self.weight(*factor) == 0.0) {
            return Err(ConfigError::ZeroTotalWeight);
        }
        Ok(())
    }
}

/// Cut-off for [`Factor::WaterProximity`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaterBounds {
    /// Distance in kilometres at and beyond which proximity scores zero.
    pub max_distance_km: f64,
}

impl Default for WaterBounds {
    fn default() -> Self {
        Self {
            max_distance_km: 10.0,
        }
    }
}

/// Cut-off for [`Factor::Slope`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlopeBounds {
    /// Slope in degrees at and beyond which land is unusable.
    pub max_usable_deg: f64,
}

impl Default for SlopeBounds {
    fn default() -> Self {
        Self {
            max_usable_deg: 15.0,
        }
    }
}

/// Plateau and cut-off for [`Factor::Elevation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElevationBounds {
    /// Elevation up to which suitability stays at one.
    pub optimal_max_m: f64,
    /// Elevation at and beyond which suitability is zero.
    pub max_m: f64,
}

impl Default for ElevationBounds {
    fn default() -> Self {
        Self {
            optimal_max_m: 800.0,
            max_m: 2000.0,
        }
    }
}

/// Triangle parameters for [`Factor::SoilPh`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoilPhBounds {
    /// pH at and below which suitability is zero.
    pub lower: f64,
    /// pH of peak suitability.
    pub optimal: f64,
    /// pH at and above which suitability is zero.
    pub upper: f64,
}

impl Default for SoilPhBounds {
    fn default() -> Self {
        Self {
            lower: 4.5,
            optimal: 6.5,
            upper: 8.5,
        }
    }
}

/// Ramp for monotonically beneficial factors such as rainfall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaturationBounds {
    /// Value at and below which suitability is zero.
    pub floor: f64,
    /// Value at and above which suitability is one.
    pub saturation: f64,
}

/// Curve parameters for every factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationBounds {
    /// Water proximity cut-off.
    pub water: WaterBounds,
    /// Slope cut-off.
    pub slope: SlopeBounds,
    /// Elevation plateau.
    pub elevation: ElevationBounds,
    /// Soil pH triangle.
    pub soil_ph: SoilPhBounds,
    /// Precipitation ramp in millimetres per year.
    pub precipitation: SaturationBounds,
    /// Sunshine ramp in hours per year.
    pub sunshine: SaturationBounds,
}

impl Default for NormalizationBounds {
    fn default() -> Self {
        Self {
            water: WaterBounds::default(),
            slope: SlopeBounds::default(),
            elevation: ElevationBounds::default(),
            soil_ph: SoilPhBounds::default(),
            precipitation: SaturationBounds {
                floor: 200.0,
                saturation: 600.0,
            },
            sunshine: SaturationBounds {
                floor: 1200.0,
                saturation: 2400.0,
            },
        }
    }
}

impl NormalizationBounds {
    /// Check every curve is finite and well ordered.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidBounds`] naming the first bad curve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |factor, reason| Err(ConfigError::InvalidBounds { factor, reason });
        if !finite_positive(self.water.max_distance_km) {
            return invalid(Factor::WaterProximity, "max_distance_km must be positive");
        }
        if !finite_positive(self.slope.max_usable_deg) {
            return invalid(Factor::Slope, "max_usable_deg must be positive");
        }
        if !ordered(&[self.elevation.optimal_max_m, self.elevation.max_m]) {
            return invalid(Factor::Elevation, "optimal_max_m must be below max_m");
        }
        let ph = self.soil_ph;
        if !ordered(&[ph.lower, ph.optimal, ph.upper]) {
            return invalid(Factor::SoilPh, "expected lower < optimal < upper");
        }
        if !(0.0..=14.0).contains(&ph.lower) || !(0.0..=14.0).contains(&ph.upper) {
            return invalid(Factor::SoilPh, "bounds must lie on the 0-14 scale");
        }
        for (factor, ramp) in [
            (Factor::Precipitation, self.precipitation),
            (Factor::Sunshine, self.sunshine),
        ] {
            if !ordered(&[ramp.floor, ramp.saturation]) || ramp.floor < 0.0 {
                return invalid(factor, "expected 0 <= floor < saturation");
            }
        }
        Ok(())
    }
}

fn finite_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn ordered(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite())
        && values
            .windows(2)
            .all(|pair| matches!(pair, [low, high] if low < high))
}

/// Default classification threshold on the 0-100 scale.
pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// Weights, curves and threshold used by the productivity scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Per-factor weights.
    pub weights: FactorWeights,
    /// Per-factor normalisation curves.
    pub bounds: NormalizationBounds,
    /// Minimum composite score, inclusive, classed as productive.
    pub threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            bounds: NormalizationBounds::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    /// Validate and return a copy.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.weights.validate()?;
        self.bounds.validate()?;
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.threshold,
            });
        }
        Ok(self)
    }
}

/// Default size of the ranked result list.
pub const DEFAULT_TOP_N: usize = 10;
/// Default water-source cache lifetime: seven days.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Default number of candidates between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;

/// Options for a whole batch analysis.
///
/// # Examples
///
/// ```
/// use agrisite_core::AnalysisConfig;
///
/// let config: AnalysisConfig = serde_json::from_str(r#"{"top_n": 3}"#).unwrap();
/// let config = config.validate().unwrap();
/// assert_eq!(config.top_n, 3);
/// assert_eq!(config.scoring.threshold, 70.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Scoring weights, curves and threshold.
    pub scoring: ScoringConfig,
    /// Number of best results retained in the summary.
    pub top_n: usize,
    /// Analyse at most this many candidates, in input order.
    pub candidate_cap: Option<usize>,
    /// Lifetime of cached water-source data in seconds.
    pub cache_ttl_secs: u64,
    /// Worker threads used to score candidates.
    pub workers: usize,
    /// Candidates processed between progress log lines.
    pub progress_interval: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            top_n: DEFAULT_TOP_N,
            candidate_cap: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            workers: 1,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl AnalysisConfig {
    /// Validate and return a copy.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.scoring.validate()?;
        let zero = |field| Err(ConfigError::ZeroValue { field });
        if self.top_n == 0 {
            return zero("top_n");
        }
        if self.candidate_cap == Some(0) {
            return zero("candidate_cap");
        }
        if self.cache_ttl_secs == 0 {
            return zero("cache_ttl_secs");
        }
        if self.workers == 0 {
            return zero("workers");
        }
        if self.progress_interval == 0 {
            return zero("progress_interval");
        }
        Ok(self)
    }

    /// Cache lifetime as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_bad_weights(#[case] value: f64) {
        let weights = FactorWeights::default().with(Factor::Slope, value);
        let err = weights.validate().expect_err("invalid weight");
        assert!(matches!(
            err,
            ConfigError::InvalidWeight {
                factor: Factor::Slope,
                ..
            }
        ));
    }

    #[rstest]
    fn rejects_all_zero_weights() {
        assert_eq!(
            FactorWeights::zero().validate(),
            Err(ConfigError::ZeroTotalWeight)
        );
    }

    #[rstest]
    #[case(-0.1)]
    #[case(100.5)]
    fn rejects_threshold_out_of_range(#[case] threshold: f64) {
        let config = ScoringConfig {
            threshold,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
    }

    #[rstest]
    #[case(0.0)]
    #[case(100.0)]
    fn accepts_boundary_thresholds(#[case] threshold: f64) {
        let config = ScoringConfig {
            threshold,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[rstest]
    fn rejects_inverted_ph_triangle() {
        let mut bounds = NormalizationBounds::default();
        bounds.soil_ph.optimal = 9.0;
        assert!(matches!(
            bounds.validate(),
            Err(ConfigError::InvalidBounds {
                factor: Factor::SoilPh,
                ..
            })
        ));
    }

    #[rstest]
    fn rejects_flat_saturation_ramp() {
        let mut bounds = NormalizationBounds::default();
        bounds.sunshine.saturation = bounds.sunshine.floor;
        assert!(bounds.validate().is_err());
    }

    #[rstest]
    #[case::top_n(AnalysisConfig { top_n: 0, ..AnalysisConfig::default() }, "top_n")]
    #[case::cap(AnalysisConfig { candidate_cap: Some(0), ..AnalysisConfig::default() }, "candidate_cap")]
    #[case::ttl(AnalysisConfig { cache_ttl_secs: 0, ..AnalysisConfig::default() }, "cache_ttl_secs")]
    #[case::workers(AnalysisConfig { workers: 0, ..AnalysisConfig::default() }, "workers")]
    fn rejects_zero_counts(#[case] config: AnalysisConfig, #[case] expected: &str) {
        match config.validate() {
            Err(ConfigError::ZeroValue { field }) => assert_eq!(field, expected),
            other => panic!("expected ZeroValue, got {other:?}"),
        }
    }

    #[rstest]
    fn partial_documents_fill_defaults() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"weights": {"water_proximity": 1.0}, "threshold": 50}"#)
                .expect("partial scoring config");
        assert_eq!(config.weights.water_proximity, 1.0);
        assert_eq!(config.weights.slope, 20.0);
        assert_eq!(config.threshold, 50.0);
        assert_eq!(config.bounds, NormalizationBounds::default());
    }

    #[rstest]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<ScoringConfig>(r#"{"treshold": 50}"#);
        assert!(parsed.is_err());
    }
}
