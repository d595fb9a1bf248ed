//! Candidate sites and their raw environmental measurements.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{COORDINATE_EPSILON, Coordinate, FactorError};

/// Raw per-site measurements supplied by the caller.
///
/// Every field is optional. A missing value makes the dependent factor
/// unavailable for that site instead of failing the site. The landcover
/// label is kept verbatim and resolved by the landcover evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateAttributes {
    /// Elevation above sea level in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_m: Option<f64>,
    /// Terrain slope in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope_deg: Option<f64>,
    /// Soil pH on the 0-14 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
    /// Annual precipitation in millimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_precipitation_mm: Option<f64>,
    /// Sunshine hours per year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunshine_hours: Option<f64>,
    /// Landcover class label, e.g. `cropland`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landcover: Option<String>,
}

/// A coordinate awaiting scoring together with its measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Site position.
    pub coordinate: Coordinate,
    /// Raw measurements for the site.
    pub attributes: CandidateAttributes,
}

impl Candidate {
    /// Pair a coordinate with its measurements.
    #[must_use]
    pub const fn new(coordinate: Coordinate, attributes: CandidateAttributes) -> Self {
        Self {
            coordinate,
            attributes,
        }
    }
}

/// A source record that could not be turned into a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("candidate record {record} is malformed: {reason}")]
pub struct MalformedCandidate {
    /// One-based record number in the source.
    pub record: u64,
    /// Human readable description of the defect.
    pub reason: String,
}

/// One entry of a batch: a usable candidate or a record that failed to parse.
pub type CandidateInput = Result<Candidate, MalformedCandidate>;

/// Closed set of landcover classes with fixed suitability.
///
/// # Examples
/// ```
/// use agrisite_core::Landcover;
///
/// let class: Landcover = "Orchard".parse()?;
/// assert_eq!(class, Landcover::Cropland);
/// assert_eq!(class.suitability(), 1.0);
/// # Ok::<(), agrisite_core::FactorError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landcover {
    /// Arable land, orchards and vineyards.
    Cropland,
    /// Meadow and pasture.
    Grassland,
    /// Scrub and heath.
    Shrubland,
    /// Woodland.
    Forest,
    /// Rock, sand and other bare ground.
    Barren,
    /// Built-up land.
    Urban,
    /// Open water and wetland.
    Water,
}

impl Landcover {
    /// Suitability of the class for cultivation in `0.0..=1.0`.
    #[must_use]
    pub const fn suitability(self) -> f64 {
        match self {
            Self::Cropland => 1.0,
            Self::Grassland => 0.7,
            Self::Shrubland => 0.5,
            Self::Forest => 0.3,
            Self::Barren => 0.1,
            Self::Urban | Self::Water => 0.0,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cropland => "cropland",
            Self::Grassland => "grassland",
            Self::Shrubland => "shrubland",
            Self::Forest => "forest",
            Self::Barren => "barren",
            Self::Urban => "urban",
            Self::Water => "water",
        }
    }
}

impl fmt::Display for Landcover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Landcover {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalised.as_str() {
            "cropland" | "farmland" | "farm" | "agricultural" | "agriculture" | "arable"
            | "orchard" | "vineyard" => Ok(Self::Cropland),
            "grassland" | "meadow" | "pasture" => Ok(Self::Grassland),
            "shrubland" | "scrub" | "heath" => Ok(Self::Shrubland),
            "forest" | "wood" | "woodland" => Ok(Self::Forest),
            "barren" | "bare_rock" | "sand" | "scree" => Ok(Self::Barren),
            "urban" | "residential" | "industrial" | "commercial" | "built_up" => Ok(Self::Urban),
            "water" | "wetland" => Ok(Self::Water),
            _ => Err(FactorError::UnknownLandcover {
                label: s.to_owned(),
            }),
        }
    }
}

/// Drop items whose coordinate matches an earlier item within
/// [`COORDINATE_EPSILON`]. Items without a coordinate are always kept.
///
/// Coordinates are bucketed on an epsilon grid so each item only compares
/// against its neighbouring cells.
#[must_use]
pub fn dedup_by_coordinate<T>(
    items: Vec<T>,
    coordinate: impl Fn(&T) -> Option<Coordinate>,
) -> Vec<T> {
    let mut buckets: HashMap<(i64, i64), Vec<Coordinate>> = HashMap::new();
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let Some(at) = coordinate(&item) else {
            kept.push(item);
            continue;
        };
        let (row, col) = grid_cell(at);
        let duplicate = (-1..=1).any(|dr| {
            (-1..=1).any(|dc| {
                buckets
                    .get(&(row + dr, col + dc))
                    .is_some_and(|seen| seen.iter().any(|other| other.approx_eq(at)))
            })
        });
        if duplicate {
            continue;
        }
        buckets.entry((row, col)).or_default().push(at);
        kept.push(item);
    }
    kept
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "grid cells are coordinate degrees divided by a small tolerance"
)]
fn grid_cell(at: Coordinate) -> (i64, i64) {
    (
        (at.lat() / COORDINATE_EPSILON).floor() as i64,
        (at.lon() / COORDINATE_EPSILON).floor() as i64,
    )
}
