//! Nearest-water lookups over a fixed set of water sources.
//!
//! Sources are stored in an R\*-tree keyed by their position on the unit
//! sphere. Straight-line (chord) distance between unit vectors grows
//! monotonically with great-circle distance, so the tree's nearest
//! neighbour is also the haversine nearest neighbour. Reported distances
//! are computed with the haversine formula.

use geo::{Distance, Haversine};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::Serialize;
use thiserror::Error;

use crate::{Coordinate, WaterSource, WaterSourceKind};

type IndexedSource = GeomWithData<[f64; 3], usize>;

/// Raised when querying an index built from no sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no water sources are available for proximity lookups")]
pub struct NoWaterSources;

/// The nearest water source to a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestWater {
    /// Source category.
    pub kind: WaterSourceKind,
    /// Source name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source position.
    pub location: Coordinate,
    /// Great-circle distance from the query point in kilometres.
    pub distance_km: f64,
}

/// Spatial index answering nearest-water queries.
///
/// # Examples
///
/// ```
/// use agrisite_core::{Coordinate, GeoIndex, WaterSource, WaterSourceKind};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let lake = WaterSource::new(Coordinate::new(38.0, 27.0)?, WaterSourceKind::Lake);
/// let index = GeoIndex::build(&[lake]);
/// let km = index.nearest_distance(Coordinate::new(38.1, 27.0)?)?;
/// assert!((km - 11.1).abs() < 0.1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeoIndex {
    tree: RTree<IndexedSource>,
    sources: Vec<WaterSource>,
}

impl GeoIndex {
    /// Build an index over `sources`. An empty slice yields an index whose
    /// queries fail with [`NoWaterSources`].
    #[must_use]
    pub fn build(sources: &[WaterSource]) -> Self {
        let entries = sources
            .iter()
            .enumerate()
            .map(|(position, source)| GeomWithData::new(unit_vector(source.location), position))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            sources: sources.to_vec(),
        }
    }

    /// Number of indexed sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Report whether the index holds no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Distance in kilometres to the nearest source.
    ///
    /// # Errors
    /// Returns [`NoWaterSources`] when the index is empty.
    pub fn nearest_distance(&self, at: Coordinate) -> Result<f64, NoWaterSources> {
        self.nearest(at).map(|found| found.distance_km)
    }

    /// Nearest source with its distance.
    ///
    /// # Errors
    /// Returns [`NoWaterSources`] when the index is empty.
    pub fn nearest(&self, at: Coordinate) -> Result<NearestWater, NoWaterSources> {
        let entry = self
            .tree
            .nearest_neighbor(&unit_vector(at))
            .ok_or(NoWaterSources)?;
        self.describe(at, entry.data).ok_or(NoWaterSources)
    }

    /// Up to `k` nearest sources ordered by increasing distance.
    #[must_use]
    pub fn k_nearest(&self, at: Coordinate, k: usize) -> Vec<NearestWater> {
        self.tree
            .nearest_neighbor_iter(&unit_vector(at))
            .take(k)
            .filter_map(|entry| self.describe(at, entry.data))
            .collect()
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "haversine returns metres; reports use kilometres"
    )]
    fn describe(&self, at: Coordinate, position: usize) -> Option<NearestWater> {
        let source = self.sources.get(position)?;
        let metres = Haversine.distance(at.to_point(), source.location.to_point());
        Some(NearestWater {
            kind: source.kind,
            name: source.name.clone(),
            location: source.location,
            distance_km: metres / 1000.0,
        })
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "projecting onto the unit sphere needs trigonometry"
)]
fn unit_vector(at: Coordinate) -> [f64; 3] {
    let lat = at.lat().to_radians();
    let lon = at.lon().to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "tests compare against a brute-force haversine scan"
)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    #[fixture]
    fn aegean_sources() -> Vec<WaterSource> {
        vec![
            WaterSource::new(at(38.42, 27.14), WaterSourceKind::River).with_name("Gediz"),
            WaterSource::new(at(37.50, 27.50), WaterSourceKind::Lake).with_name("Bafa"),
            WaterSource::new(at(39.00, 28.00), WaterSourceKind::Reservoir),
        ]
    }

    #[rstest]
    fn empty_index_reports_no_sources() {
        let index = GeoIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.nearest_distance(at(38.0, 27.0)), Err(NoWaterSources));
        assert!(index.k_nearest(at(38.0, 27.0), 3).is_empty());
    }

    #[rstest]
    fn nearest_returns_closest_source(aegean_sources: Vec<WaterSource>) {
        let index = GeoIndex::build(&aegean_sources);
        let found = index.nearest(at(38.40, 27.10)).expect("non-empty index");
        assert_eq!(found.name.as_deref(), Some("Gediz"));
        assert!(found.distance_km < 5.0, "{}", found.distance_km);
    }

    #[rstest]
    fn distance_to_a_source_itself_is_zero(aegean_sources: Vec<WaterSource>) {
        let index = GeoIndex::build(&aegean_sources);
        let km = index.nearest_distance(at(37.50, 27.50)).expect("distance");
        assert!(km.abs() < 1.0e-9);
    }

    #[rstest]
    fn k_nearest_is_sorted_and_bounded(aegean_sources: Vec<WaterSource>) {
        let index = GeoIndex::build(&aegean_sources);
        let found = index.k_nearest(at(38.0, 27.3), 2);
        assert_eq!(found.len(), 2);
        assert!(found[0].distance_km <= found[1].distance_km);
    }

    fn linear_scan(sources: &[WaterSource], query: Coordinate) -> f64 {
        sources
            .iter()
            .map(|source| Haversine.distance(query.to_point(), source.location.to_point()) / 1000.0)
            .fold(f64::INFINITY, f64::min)
    }

    proptest! {
        #[test]
        fn matches_linear_scan(
            points in prop::collection::vec((36.0f64..42.0, 26.0f64..45.0), 1..40),
            query in (36.0f64..42.0, 26.0f64..45.0),
        ) {
            let sources: Vec<WaterSource> = points
                .iter()
                .map(|&(lat, lon)| WaterSource::new(at(lat, lon), WaterSourceKind::Stream))
                .collect();
            let index = GeoIndex::build(&sources);
            let target = at(query.0, query.1);
            let expected = linear_scan(&sources, target);
            let actual = index.nearest_distance(target).expect("non-empty");
            prop_assert!((actual - expected).abs() < 1.0e-6, "{actual} vs {expected}");
        }
    }
}
