//! Built-in evaluators for every [`Factor`].

use crate::{
    CandidateAttributes, ElevationBounds, Landcover, NoWaterSources, NormalizationBounds,
    SaturationBounds, SlopeBounds, SoilPhBounds, WaterBounds,
};

use super::curves::{linear_decay, plateau_then_decay, saturating, triangular};
use super::{Capability, EvaluationInput, Factor, FactorError, FactorEvaluator, FactorReading, RawValue};

/// Steepest slope accepted as a physical measurement.
const MAX_SLOPE_DEG: f64 = 90.0;
/// Lowest elevation accepted as a physical measurement (below the Dead Sea
/// shore).
const MIN_ELEVATION_M: f64 = -500.0;

fn required(
    value: Option<f64>,
    factor: Factor,
    attribute: &'static str,
) -> Result<f64, FactorError> {
    let present = value.ok_or(FactorError::MissingAttribute { factor, attribute })?;
    if present.is_finite() {
        Ok(present)
    } else {
        Err(FactorError::InvalidAttribute {
            attribute,
            value: present,
        })
    }
}

fn within(value: f64, min: f64, max: f64, attribute: &'static str) -> Result<f64, FactorError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(FactorError::InvalidAttribute { attribute, value })
    }
}

/// Linear decay of suitability with distance to the nearest water source.
#[derive(Debug, Clone, Copy)]
pub struct WaterProximityEvaluator {
    bounds: WaterBounds,
}

impl WaterProximityEvaluator {
    /// Build the evaluator with the given cut-off.
    #[must_use]
    pub const fn new(bounds: WaterBounds) -> Self {
        Self { bounds }
    }
}

impl FactorEvaluator for WaterProximityEvaluator {
    fn factor(&self) -> Factor {
        Factor::WaterProximity
    }

    fn capability(&self) -> Capability {
        Capability::RequiresGeoIndex
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let index = input.geo_index.ok_or(NoWaterSources)?;
        let distance_km = index.nearest_distance(input.coordinate)?;
        Ok(FactorReading {
            normalized: Self::sanitise(linear_decay(distance_km, self.bounds.max_distance_km)),
            raw: RawValue::Number(distance_km),
        })
    }
}

/// Near-flat land is best; suitability falls linearly to the usable limit.
#[derive(Debug, Clone, Copy)]
pub struct SlopeEvaluator {
    bounds: SlopeBounds,
}

impl SlopeEvaluator {
    /// Build the evaluator with the given usable limit.
    #[must_use]
    pub const fn new(bounds: SlopeBounds) -> Self {
        Self { bounds }
    }
}

impl FactorEvaluator for SlopeEvaluator {
    fn factor(&self) -> Factor {
        Factor::Slope
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let measured = required(input.attributes.slope_deg, Factor::Slope, "slope_deg")?;
        let slope = within(measured, 0.0, MAX_SLOPE_DEG, "slope_deg")?;
        Ok(FactorReading {
            normalized: Self::sanitise(linear_decay(slope, self.bounds.max_usable_deg)),
            raw: RawValue::Number(slope),
        })
    }
}

/// Lowland plateau followed by a linear decline with altitude.
#[derive(Debug, Clone, Copy)]
pub struct ElevationEvaluator {
    bounds: ElevationBounds,
}

impl ElevationEvaluator {
    /// Build the evaluator with the given plateau and cut-off.
    #[must_use]
    pub const fn new(bounds: ElevationBounds) -> Self {
        Self { bounds }
    }
}

impl FactorEvaluator for ElevationEvaluator {
    fn factor(&self) -> Factor {
        Factor::Elevation
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let measured = required(input.attributes.elevation_m, Factor::Elevation, "elevation_m")?;
        let elevation = within(measured, MIN_ELEVATION_M, f64::MAX, "elevation_m")?;
        let ElevationBounds {
            optimal_max_m,
            max_m,
        } = self.bounds;
        Ok(FactorReading {
            normalized: Self::sanitise(plateau_then_decay(elevation, optimal_max_m, max_m)),
            raw: RawValue::Number(elevation),
        })
    }
}

/// Triangular suitability peaking at the optimal soil pH.
#[derive(Debug, Clone, Copy)]
pub struct SoilPhEvaluator {
    bounds: SoilPhBounds,
}

impl SoilPhEvaluator {
    /// Build the evaluator with the given triangle.
    #[must_use]
    pub const fn new(bounds: SoilPhBounds) -> Self {
        Self { bounds }
    }
}

impl FactorEvaluator for SoilPhEvaluator {
    fn factor(&self) -> Factor {
        Factor::SoilPh
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let measured = required(input.attributes.soil_ph, Factor::SoilPh, "soil_ph")?;
        let ph = within(measured, 0.0, 14.0, "soil_ph")?;
        let SoilPhBounds {
            lower,
            optimal,
            upper,
        } = self.bounds;
        Ok(FactorReading {
            normalized: Self::sanitise(triangular(ph, lower, optimal, upper)),
            raw: RawValue::Number(ph),
        })
    }
}

/// Linear ramp to a saturation point, flat beyond it.
///
/// Used for precipitation and sunshine, where more is better up to a point
/// and abundance is never penalised.
#[derive(Debug, Clone, Copy)]
pub struct SaturatingEvaluator {
    factor: Factor,
    attribute: &'static str,
    read: fn(&CandidateAttributes) -> Option<f64>,
    bounds: SaturationBounds,
}

impl SaturatingEvaluator {
    /// Precipitation in millimetres per year.
    #[must_use]
    pub const fn precipitation(bounds: SaturationBounds) -> Self {
        Self {
            factor: Factor::Precipitation,
            attribute: "annual_precipitation_mm",
            read: read_precipitation,
            bounds,
        }
    }

    /// Sunshine in hours per year.
    #[must_use]
    pub const fn sunshine(bounds: SaturationBounds) -> Self {
        Self {
            factor: Factor::Sunshine,
            attribute: "sunshine_hours",
            read: read_sunshine,
            bounds,
        }
    }
}

const fn read_precipitation(attributes: &CandidateAttributes) -> Option<f64> {
    attributes.annual_precipitation_mm
}

const fn read_sunshine(attributes: &CandidateAttributes) -> Option<f64> {
    attributes.sunshine_hours
}

impl FactorEvaluator for SaturatingEvaluator {
    fn factor(&self) -> Factor {
        self.factor
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let measured = required((self.read)(input.attributes), self.factor, self.attribute)?;
        let value = within(measured, 0.0, f64::MAX, self.attribute)?;
        Ok(FactorReading {
            normalized: Self::sanitise(saturating(
                value,
                self.bounds.floor,
                self.bounds.saturation,
            )),
            raw: RawValue::Number(value),
        })
    }
}

/// Fixed lookup from landcover class to suitability.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandcoverEvaluator;

impl FactorEvaluator for LandcoverEvaluator {
    fn factor(&self) -> Factor {
        Factor::Landcover
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Result<FactorReading, FactorError> {
        let label = input
            .attributes
            .landcover
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .ok_or(FactorError::MissingAttribute {
                factor: Factor::Landcover,
                attribute: "landcover",
            })?;
        let class: Landcover = label.parse()?;
        Ok(FactorReading {
            normalized: class.suitability(),
            raw: RawValue::Label(label.to_owned()),
        })
    }
}

/// One evaluator per [`Factor`], in [`Factor::ALL`] order.
#[must_use]
pub fn standard_evaluators(bounds: &NormalizationBounds) -> Vec<Box<dyn FactorEvaluator>> {
    vec![
        Box::new(WaterProximityEvaluator::new(bounds.water)),
        Box::new(SlopeEvaluator::new(bounds.slope)),
        Box::new(ElevationEvaluator::new(bounds.elevation)),
        Box::new(SoilPhEvaluator::new(bounds.soil_ph)),
        Box::new(SaturatingEvaluator::precipitation(bounds.precipitation)),
        Box::new(SaturatingEvaluator::sunshine(bounds.sunshine)),
        Box::new(LandcoverEvaluator),
    ]
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "tests compare readings within a tolerance"
)]
mod tests {
    use super::*;
    use crate::{Coordinate, GeoIndex, WaterSource, WaterSourceKind};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn site() -> Coordinate {
        Coordinate::new(38.0, 27.0).expect("valid")
    }

    fn evaluate(
        evaluator: &dyn FactorEvaluator,
        attributes: &CandidateAttributes,
        index: Option<&GeoIndex>,
    ) -> Result<FactorReading, FactorError> {
        let input = EvaluationInput {
            coordinate: Coordinate::new(38.0, 27.0).expect("valid"),
            attributes,
            geo_index: index,
        };
        evaluator.evaluate(&input)
    }

    #[rstest]
    fn water_without_index_is_recoverable() {
        let err = evaluate(
            &WaterProximityEvaluator::new(WaterBounds::default()),
            &CandidateAttributes::default(),
            None,
        )
        .expect_err("no index");
        assert!(err.is_recoverable());
        assert_eq!(err, FactorError::NoWaterSources(NoWaterSources));
    }

    #[rstest]
    fn water_on_top_of_a_source_scores_one(site: Coordinate) {
        let index = GeoIndex::build(&[WaterSource::new(site, WaterSourceKind::Well)]);
        let reading = evaluate(
            &WaterProximityEvaluator::new(WaterBounds::default()),
            &CandidateAttributes::default(),
            Some(&index),
        )
        .expect("reading");
        assert!((reading.normalized - 1.0).abs() < 1.0e-9);
    }

    #[rstest]
    fn water_beyond_cutoff_scores_zero() {
        let far = Coordinate::new(39.0, 27.0).expect("valid");
        let index = GeoIndex::build(&[WaterSource::new(far, WaterSourceKind::River)]);
        let reading = evaluate(
            &WaterProximityEvaluator::new(WaterBounds::default()),
            &CandidateAttributes::default(),
            Some(&index),
        )
        .expect("reading");
        assert_eq!(reading.normalized, 0.0);
        assert!(matches!(reading.raw, RawValue::Number(km) if km > 100.0));
    }

    #[rstest]
    #[case::missing(None, true)]
    #[case::negative(Some(-1.0), false)]
    #[case::vertical(Some(95.0), false)]
    #[case::nan(Some(f64::NAN), false)]
    fn slope_input_errors(#[case] slope: Option<f64>, #[case] recoverable: bool) {
        let attributes = CandidateAttributes {
            slope_deg: slope,
            ..CandidateAttributes::default()
        };
        let err = evaluate(&SlopeEvaluator::new(SlopeBounds::default()), &attributes, None)
            .expect_err("bad slope");
        assert_eq!(err.is_recoverable(), recoverable);
    }

    #[rstest]
    fn ph_peaks_at_optimum() {
        let attributes = CandidateAttributes {
            soil_ph: Some(6.5),
            ..CandidateAttributes::default()
        };
        let reading = evaluate(&SoilPhEvaluator::new(SoilPhBounds::default()), &attributes, None)
            .expect("reading");
        assert_eq!(reading.normalized, 1.0);
    }

    #[rstest]
    fn ph_outside_scale_is_invalid() {
        let attributes = CandidateAttributes {
            soil_ph: Some(15.0),
            ..CandidateAttributes::default()
        };
        let err = evaluate(&SoilPhEvaluator::new(SoilPhBounds::default()), &attributes, None)
            .expect_err("invalid pH");
        assert!(matches!(err, FactorError::InvalidAttribute { attribute: "soil_ph", .. }));
    }

    #[rstest]
    fn landcover_reports_unknown_classes() {
        let attributes = CandidateAttributes {
            landcover: Some("tundra".to_owned()),
            ..CandidateAttributes::default()
        };
        let err = evaluate(&LandcoverEvaluator, &attributes, None).expect_err("unknown");
        assert!(!err.is_recoverable());
    }

    #[rstest]
    fn blank_landcover_is_missing() {
        let attributes = CandidateAttributes {
            landcover: Some("   ".to_owned()),
            ..CandidateAttributes::default()
        };
        let err = evaluate(&LandcoverEvaluator, &attributes, None).expect_err("blank");
        assert!(err.is_recoverable());
    }

    #[rstest]
    fn standard_set_covers_every_factor() {
        let factors: Vec<Factor> = standard_evaluators(&NormalizationBounds::default())
            .iter()
            .map(|evaluator| evaluator.factor())
            .collect();
        assert_eq!(factors, Factor::ALL.to_vec());
    }

    proptest! {
        #[test]
        fn attribute_evaluators_are_bounded(
            slope in 0.0f64..90.0,
            elevation in -400.0f64..6000.0,
            ph in 0.0f64..14.0,
            rain in 0.0f64..5000.0,
            sun in 0.0f64..4500.0,
        ) {
            let attributes = CandidateAttributes {
                elevation_m: Some(elevation),
                slope_deg: Some(slope),
                soil_ph: Some(ph),
                annual_precipitation_mm: Some(rain),
                sunshine_hours: Some(sun),
                landcover: Some("grassland".to_owned()),
            };
            for evaluator in standard_evaluators(&NormalizationBounds::default()) {
                if evaluator.capability() == Capability::RequiresGeoIndex {
                    continue;
                }
                let reading = evaluate(evaluator.as_ref(), &attributes, None)
                    .expect("valid attributes");
                prop_assert!((0.0..=1.0).contains(&reading.normalized));
            }
        }

        #[test]
        fn landcover_ignores_other_attributes(ph in 0.0f64..14.0, slope in 0.0f64..90.0) {
            let noisy = CandidateAttributes {
                soil_ph: Some(ph),
                slope_deg: Some(slope),
                landcover: Some("forest".to_owned()),
                ..CandidateAttributes::default()
            };
            let plain = CandidateAttributes {
                landcover: Some("forest".to_owned()),
                ..CandidateAttributes::default()
            };
            let a = evaluate(&LandcoverEvaluator, &noisy, None).expect("forest");
            let b = evaluate(&LandcoverEvaluator, &plain, None).expect("forest");
            prop_assert_eq!(a.normalized, b.normalized);
        }
    }
}
