//! Environmental factors and the evaluators that normalise them.
//!
//! Each [`FactorEvaluator`] maps one raw measurement onto `0.0..=1.0`
//! suitability. Evaluators are pure: the same input always produces the
//! same reading, and a failure is reported as a [`FactorError`] that the
//! scorer either recovers from (by excluding the factor) or treats as a
//! defect of the candidate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CandidateAttributes, Coordinate, GeoIndex, NoWaterSources};

mod curves;
mod evaluators;

pub use curves::{linear_decay, plateau_then_decay, saturating, triangular};
pub use evaluators::{
    ElevationEvaluator, LandcoverEvaluator, SaturatingEvaluator, SlopeEvaluator,
    SoilPhEvaluator, WaterProximityEvaluator, standard_evaluators,
};

/// One environmental signal contributing to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Distance to the nearest water source.
    WaterProximity,
    /// Terrain slope.
    Slope,
    /// Elevation above sea level.
    Elevation,
    /// Soil acidity.
    SoilPh,
    /// Annual precipitation.
    Precipitation,
    /// Annual sunshine hours.
    Sunshine,
    /// Landcover class.
    Landcover,
}

impl Factor {
    /// Every factor in evaluation order.
    pub const ALL: [Self; 7] = [
        Self::WaterProximity,
        Self::Slope,
        Self::Elevation,
        Self::SoilPh,
        Self::Precipitation,
        Self::Sunshine,
        Self::Landcover,
    ];

    /// Return the factor as a `snake_case` name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaterProximity => "water_proximity",
            Self::Slope => "slope",
            Self::Elevation => "elevation",
            Self::SoilPh => "soil_ph",
            Self::Precipitation => "precipitation",
            Self::Sunshine => "sunshine",
            Self::Landcover => "landcover",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The measurement an evaluator normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A numeric measurement (distance, degrees, millimetres, ...).
    Number(f64),
    /// A categorical label.
    Label(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Output of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorReading {
    /// Suitability in `0.0..=1.0`.
    pub normalized: f64,
    /// Measurement the suitability was derived from.
    pub raw: RawValue,
}

/// What an evaluator needs besides the candidate's attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Reads only [`CandidateAttributes`].
    AttributesOnly,
    /// Queries the [`GeoIndex`] as well.
    RequiresGeoIndex,
}

/// Everything an evaluator may look at for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    /// Candidate position.
    pub coordinate: Coordinate,
    /// Candidate measurements.
    pub attributes: &'a CandidateAttributes,
    /// Water-source index, when one was built.
    pub geo_index: Option<&'a GeoIndex>,
}

/// Reasons an evaluator could not produce a reading.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// The water-source index is empty or absent.
    #[error(transparent)]
    NoWaterSources(#[from] NoWaterSources),
    /// The candidate lacks the measurement this factor needs.
    #[error("{factor} needs {attribute}, which is missing")]
    MissingAttribute {
        /// Factor that was skipped.
        factor: Factor,
        /// Attribute that was absent.
        attribute: &'static str,
    },
    /// The measurement is present but physically impossible.
    #[error("{attribute} value {value} is invalid")]
    InvalidAttribute {
        /// Offending attribute.
        attribute: &'static str,
        /// Value supplied.
        value: f64,
    },
    /// The landcover label is not a known class.
    #[error("unknown landcover class '{label}'")]
    UnknownLandcover {
        /// Label supplied.
        label: String,
    },
}

impl FactorError {
    /// Report whether the scorer may drop the factor and carry on.
    ///
    /// Missing data degrades a score; bad data disqualifies the candidate.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoWaterSources(_) | Self::MissingAttribute { .. })
    }
}

/// Normalise one environmental factor for a candidate.
///
/// Implementations must be thread-safe so a batch can share them across
/// worker threads, and must return finite values in `0.0..=1.0`. Use
/// [`FactorEvaluator::sanitise`] to enforce the range.
///
/// # Examples
///
/// ```
/// use agrisite_core::{
///     CandidateAttributes, Coordinate, EvaluationInput, Factor, FactorError, FactorEvaluator,
///     FactorReading, RawValue,
/// };
///
/// struct Flat;
///
/// impl FactorEvaluator for Flat {
///     fn factor(&self) -> Factor {
///         Factor::Slope
///     }
///
///     fn evaluate(&self, _input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
///         Ok(FactorReading { normalized: 1.0, raw: RawValue::Number(0.0) })
///     }
/// }
///
/// let attributes = CandidateAttributes::default();
/// let input = EvaluationInput {
///     coordinate: Coordinate::new(38.0, 27.0).unwrap(),
///     attributes: &attributes,
///     geo_index: None,
/// };
/// assert_eq!(Flat.evaluate(&input).unwrap().normalized, 1.0);
/// ```
pub trait FactorEvaluator: Send + Sync {
    /// Factor this evaluator produces.
    fn factor(&self) -> Factor;

    /// Inputs the evaluator depends on.
    fn capability(&self) -> Capability {
        Capability::AttributesOnly
    }

    /// Normalise the factor for one candidate.
    ///
    /// # Errors
    /// Returns [`FactorError`] when the required input is missing, invalid
    /// or unknown.
    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError>;

    /// Clamp a raw suitability into `0.0..=1.0`, mapping non-finite values
    /// to `0.0`.
    fn sanitise(value: f64) -> f64
    where
        Self: Sized,
    {
        if !value.is_finite() {
            return 0.0;
        }
        value.clamp(0.0, 1.0)
    }
}
