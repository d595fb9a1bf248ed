//! Validated WGS84 coordinates and region bounding boxes.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance, in degrees, under which two coordinates are the same site.
pub const COORDINATE_EPSILON: f64 = 1.0e-6;

/// An immutable latitude/longitude pair in decimal degrees.
///
/// Construction rejects non-finite values and values outside
/// `[-90, 90]` × `[-180, 180]`. Deserialisation goes through the same
/// validation.
///
/// # Examples
///
/// ```
/// use agrisite_core::Coordinate;
///
/// # fn main() -> Result<(), agrisite_core::CoordinateError> {
/// let ankara = Coordinate::new(39.93, 32.85)?;
/// assert_eq!(ankara.lat(), 39.93);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatLon", into = "LatLon")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// Errors returned by [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// Either component was NaN or infinite.
    #[error("coordinate ({lat}, {lon}) is not finite")]
    NonFinite {
        /// Supplied latitude.
        lat: f64,
        /// Supplied longitude.
        lon: f64,
    },
    /// Latitude fell outside `[-90, 90]`.
    #[error("latitude {lat} is outside [-90, 90]")]
    LatitudeOutOfRange {
        /// Supplied latitude.
        lat: f64,
    },
    /// Longitude fell outside `[-180, 180]`.
    #[error("longitude {lon} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// Supplied longitude.
        lon: f64,
    },
}

impl Coordinate {
    /// Validate and construct a coordinate.
    ///
    /// # Errors
    /// Returns [`CoordinateError`] for non-finite or out-of-range input.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite { lat, lon });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange { lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange { lon });
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    /// Report whether two coordinates lie within [`COORDINATE_EPSILON`].
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "identity compares component deltas against a tolerance"
    )]
    pub fn approx_eq(self, other: Self) -> bool {
        (self.lat - other.lat).abs() <= COORDINATE_EPSILON
            && (self.lon - other.lon).abs() <= COORDINATE_EPSILON
    }

    /// Convert to a `geo` point using (x = longitude, y = latitude).
    #[must_use]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

impl TryFrom<LatLon> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: LatLon) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

impl From<Coordinate> for LatLon {
    fn from(value: Coordinate) -> Self {
        Self {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// A named geographic area used to partition cached water-source data.
///
/// The bounds use WGS84 with `x = longitude` and `y = latitude`. Regions
/// crossing the antimeridian are not modelled.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    key: String,
    bounds: Rect<f64>,
}

/// Errors raised while building a [`Region`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    /// The region key was blank.
    #[error("region key must not be empty")]
    EmptyKey,
    /// A corner was not a valid coordinate.
    #[error("region corner is invalid: {0}")]
    InvalidCorner(#[from] CoordinateError),
    /// South/west were not strictly below north/east.
    #[error("region bounds are degenerate: south/west must be below north/east")]
    Degenerate,
    /// The bounding box text did not hold four comma-separated numbers.
    #[error("bounding box '{text}' must be 'south,west,north,east'")]
    MalformedBoundingBox {
        /// Text supplied by the caller.
        text: String,
    },
    /// No preset matched the requested name.
    #[error("unknown region '{name}'")]
    UnknownPreset {
        /// Requested preset name.
        name: String,
    },
}

impl Region {
    /// Key of the built-in Turkey preset.
    pub const TURKEY: &'static str = "turkey";

    /// Validate and construct a region from its corners.
    ///
    /// # Errors
    /// Returns [`RegionError`] for an empty key, invalid corners, or a box
    /// with no area.
    pub fn new(
        key: impl Into<String>,
        south_west: Coordinate,
        north_east: Coordinate,
    ) -> Result<Self, RegionError> {
        let name: String = key.into();
        if name.trim().is_empty() {
            return Err(RegionError::EmptyKey);
        }
        if south_west.lat >= north_east.lat || south_west.lon >= north_east.lon {
            return Err(RegionError::Degenerate);
        }
        let bounds = Rect::new(
            Coord {
                x: south_west.lon,
                y: south_west.lat,
            },
            Coord {
                x: north_east.lon,
                y: north_east.lat,
            },
        );
        Ok(Self { key: name, bounds })
    }

    /// Build a region from `south,west,north,east` text.
    ///
    /// # Errors
    /// Returns [`RegionError::MalformedBoundingBox`] when the text does not
    /// parse, or the errors of [`Region::new`].
    pub fn from_bbox(key: impl Into<String>, text: &str) -> Result<Self, RegionError> {
        let malformed = || RegionError::MalformedBoundingBox {
            text: text.to_owned(),
        };
        let parts = text
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed())?;
        let [south, west, north, east] = parts.as_slice() else {
            return Err(malformed());
        };
        Self::new(
            key,
            Coordinate::new(*south, *west)?,
            Coordinate::new(*north, *east)?,
        )
    }

    /// The Turkey preset: longitude 26..45, latitude 36..42.
    #[must_use]
    pub fn turkey() -> Self {
        Self {
            key: Self::TURKEY.to_owned(),
            bounds: Rect::new(Coord { x: 26.0, y: 36.0 }, Coord { x: 45.0, y: 42.0 }),
        }
    }

    /// Cache key identifying this region.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bounding box in (longitude, latitude) order.
    #[must_use]
    pub const fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Report whether `coordinate` lies inside the bounds (edges included).
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.bounds.intersects(&coordinate.to_point())
    }
}

impl FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "turkey" | "turkiye" => Ok(Self::turkey()),
            _ => Err(RegionError::UnknownPreset { name: s.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(0.0, 0.0)]
    fn accepts_boundary_coordinates(#[case] lat: f64, #[case] lon: f64) {
        assert!(Coordinate::new(lat, lon).is_ok());
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(0.0, -180.5)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_invalid_coordinates(#[case] lat: f64, #[case] lon: f64) {
        assert!(Coordinate::new(lat, lon).is_err());
    }

    #[rstest]
    fn deserialisation_validates_ranges() {
        let err = serde_json::from_str::<Coordinate>(r#"{"lat": 120.0, "lon": 10.0}"#);
        assert!(err.is_err());
        let ok: Coordinate =
            serde_json::from_str(r#"{"lat": 38.5, "lon": 27.1}"#).expect("valid coordinate");
        assert_eq!(ok.lon(), 27.1);
    }

    #[rstest]
    fn approx_eq_uses_tolerance() {
        let a = Coordinate::new(38.0, 27.0).expect("valid");
        let b = Coordinate::new(38.000_000_5, 27.0).expect("valid");
        let c = Coordinate::new(38.001, 27.0).expect("valid");
        assert!(a.approx_eq(b));
        assert!(!a.approx_eq(c));
    }

    #[rstest]
    fn turkey_preset_contains_ankara() {
        let region: Region = "Turkiye".parse().expect("preset");
        assert_eq!(region.key(), Region::TURKEY);
        assert!(region.contains(Coordinate::new(39.93, 32.85).expect("valid")));
        assert!(!region.contains(Coordinate::new(48.85, 2.35).expect("valid")));
    }

    #[rstest]
    fn bbox_text_round_trips_into_bounds() {
        let region = Region::from_bbox("aegean", "37.0, 26.0, 39.5, 28.5").expect("bbox");
        assert_eq!(region.bounds().min(), Coord { x: 26.0, y: 37.0 });
        assert_eq!(region.bounds().max(), Coord { x: 28.5, y: 39.5 });
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("a,b,c,d")]
    fn bbox_text_must_have_four_numbers(#[case] text: &str) {
        let err = Region::from_bbox("x", text).expect_err("malformed");
        assert!(matches!(err, RegionError::MalformedBoundingBox { .. }));
    }

    #[rstest]
    fn degenerate_boxes_are_rejected() {
        let err = Region::from_bbox("x", "40,30,40,31").expect_err("zero height");
        assert_eq!(err, RegionError::Degenerate);
    }
}
