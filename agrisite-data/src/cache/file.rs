//! On-disk representation of the water-source cache.
//!
//! The file is a JSON array with one object per region:
//!
//! ```json
//! [
//!   {
//!     "region": "turkey",
//!     "fetched_at": 1760000000,
//!     "ttl_seconds": 604800,
//!     "sources": [{ "lat": 38.6, "lon": 27.4, "tag": "river", "name": "Gediz" }]
//!   }
//! ]
//! ```
//!
//! `fetched_at` is whole seconds since the Unix epoch.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use agrisite_core::{Coordinate, CoordinateError, WaterSource, WaterSourceKind};
use serde::{Deserialize, Serialize};

use super::RegionCacheEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(super) struct CacheRecord {
    region: String,
    fetched_at: u64,
    ttl_seconds: u64,
    sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SourceRecord {
    lat: f64,
    lon: f64,
    tag: WaterSourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

pub(super) fn epoch_secs(at: SystemTime) -> u64 {
    at.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |since| since.as_secs())
}

impl CacheRecord {
    pub(super) fn region(&self) -> &str {
        &self.region
    }

    pub(super) fn into_entry(self) -> Result<RegionCacheEntry, CoordinateError> {
        let sources = self
            .sources
            .into_iter()
            .map(|record| {
                // Names are kept verbatim, blanks included, so a reload
                // writes back the same record.
                Ok(WaterSource {
                    location: Coordinate::new(record.lat, record.lon)?,
                    kind: record.tag,
                    name: record.name,
                })
            })
            .collect::<Result<Vec<_>, CoordinateError>>()?;
        Ok(RegionCacheEntry {
            region: self.region,
            sources: Arc::new(sources),
            fetched_at: SystemTime::UNIX_EPOCH + Duration::from_secs(self.fetched_at),
            ttl: Duration::from_secs(self.ttl_seconds),
        })
    }
}

impl From<&RegionCacheEntry> for CacheRecord {
    fn from(entry: &RegionCacheEntry) -> Self {
        Self {
            region: entry.region.clone(),
            fetched_at: epoch_secs(entry.fetched_at),
            ttl_seconds: entry.ttl.as_secs(),
            sources: entry
                .sources
                .iter()
                .map(|source| SourceRecord {
                    lat: source.location.lat(),
                    lon: source.location.lon(),
                    tag: source.kind,
                    name: source.name.clone(),
                })
                .collect(),
        }
    }
}
