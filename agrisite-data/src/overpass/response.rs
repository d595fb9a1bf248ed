//! Overpass API response types and tag classification.
//!
//! Only the parts of the `[out:json]` format requested with `out center;`
//! are modelled: nodes carry `lat`/`lon` directly, ways and relations carry
//! a `center` object.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Output_Formats>

use std::collections::BTreeMap;

use agrisite_core::{Coordinate, FetchError, WaterSource, WaterSourceKind};
use log::warn;
use serde::Deserialize;

/// Top-level Overpass response.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Matched elements in server order.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Server remark, present when the query hit a runtime error.
    pub remark: Option<String>,
}

/// One OSM element.
#[derive(Debug, Deserialize)]
pub struct Element {
    /// `node`, `way` or `relation`.
    #[serde(rename = "type")]
    pub element_type: String,
    /// OSM identifier.
    pub id: u64,
    /// Node latitude.
    pub lat: Option<f64>,
    /// Node longitude.
    pub lon: Option<f64>,
    /// Centre of a way or relation.
    pub center: Option<Center>,
    /// OSM tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Centre point emitted by `out center;`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Element {
    fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Some((lat, lon)),
            (_, _, Some(center)) => Some((center.lat, center.lon)),
            _ => None,
        }
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Map the element's tags onto a water-source category.
    #[must_use]
    pub fn classify(&self) -> Option<WaterSourceKind> {
        match self.tag("waterway") {
            Some("river") => return Some(WaterSourceKind::River),
            Some("stream") => return Some(WaterSourceKind::Stream),
            Some("dam") => return Some(WaterSourceKind::Dam),
            _ => {}
        }
        match (self.tag("natural"), self.tag("water")) {
            (_, Some("reservoir")) => return Some(WaterSourceKind::Reservoir),
            (Some("water"), _) | (_, Some("lake")) => return Some(WaterSourceKind::Lake),
            _ => {}
        }
        (self.tag("man_made") == Some("water_well")).then_some(WaterSourceKind::Well)
    }

    fn into_source(self) -> Result<WaterSource, String> {
        let kind = self.classify().ok_or("no recognised water tag")?;
        let (lat, lon) = self.position().ok_or("no coordinate")?;
        let location = Coordinate::new(lat, lon).map_err(|err| err.to_string())?;
        let source = WaterSource::new(location, kind);
        Ok(match self.tags.get("name") {
            Some(name) => source.with_name(name.as_str()),
            None => source,
        })
    }
}

impl OverpassResponse {
    /// Convert the response into water sources, skipping unusable elements.
    ///
    /// # Errors
    /// Returns [`FetchError::ServiceError`] when the server reports a
    /// runtime error, since the element list is then incomplete.
    pub fn into_sources(self) -> Result<Vec<WaterSource>, FetchError> {
        if let Some(remark) = self.remark.filter(|r| r.contains("error")) {
            return Err(FetchError::ServiceError { message: remark });
        }
        let mut sources = Vec::with_capacity(self.elements.len());
        for element in self.elements {
            let label = format!("{} {}", element.element_type, element.id);
            match element.into_source() {
                Ok(source) => sources.push(source),
                Err(reason) => warn!("skipping overpass element {label}: {reason}"),
            }
        }
        Ok(sources)
    }
}
