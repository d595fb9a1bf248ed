//! Durable, TTL-governed cache of water sources keyed by region.
//!
//! [`ExternalSourceCache`] is an explicit object rather than process-wide
//! state: construct it at start-up (optionally from a JSON file), pass it to
//! the batch through [`CacheCatalogue`], and [`flush`](ExternalSourceCache::flush)
//! it on shutdown.
//!
//! Entries are replaced wholesale on refresh. Readers hold an
//! `Arc<RegionCacheEntry>`, so a concurrent refresh swaps the region slot
//! without ever exposing a half-written entry. Refreshes are serialised by a
//! separate mutex so that concurrent misses for a region trigger a single
//! upstream fetch.

use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use agrisite_core::{
    CoordinateError, Region, SourceSnapshot, SourceUnavailable, WaterSource,
    WaterSourceCatalogue, WaterSourceFetcher,
};
use agrisite_fs::{read_utf8_if_present, write_atomic};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use thiserror::Error;

mod clock;
mod file;

#[cfg(any(test, feature = "test-support"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};

use file::{CacheRecord, epoch_secs};

/// Errors raised while loading or persisting the cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read.
    #[error("failed to read cache file {path}")]
    Read {
        /// Cache file path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: io::Error,
    },
    /// The cache file is not valid cache JSON.
    #[error("failed to decode cache file {path}")]
    Decode {
        /// Cache file path.
        path: Utf8PathBuf,
        /// Source error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A cached source has an impossible coordinate.
    #[error("cache file {path} holds an invalid source for region '{region}'")]
    InvalidEntry {
        /// Cache file path.
        path: Utf8PathBuf,
        /// Region whose entry is invalid.
        region: String,
        /// Coordinate validation failure.
        #[source]
        source: CoordinateError,
    },
    /// The cache file lists the same region more than once.
    #[error("cache file {path} lists region '{region}' more than once")]
    DuplicateRegion {
        /// Cache file path.
        path: Utf8PathBuf,
        /// Repeated region key.
        region: String,
    },
    /// Serialising the cache failed.
    #[error("failed to encode water-source cache")]
    Encode {
        /// Source error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the cache file failed.
    #[error("failed to write cache file {path}")]
    Write {
        /// Cache file path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: io::Error,
    },
}

/// Water sources fetched for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionCacheEntry {
    region: String,
    sources: Arc<Vec<WaterSource>>,
    fetched_at: SystemTime,
    ttl: Duration,
}

impl RegionCacheEntry {
    /// Region key.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sources in fetch order.
    #[must_use]
    pub fn sources(&self) -> &Arc<Vec<WaterSource>> {
        &self.sources
    }

    /// When the sources were fetched.
    #[must_use]
    pub const fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// Lifetime recorded when the entry was fetched.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Report whether the entry is younger than `ttl` at `now`.
    ///
    /// An entry stamped after `now` is treated as expired so that a skewed
    /// clock or an edited file cannot pin it forever.
    #[must_use]
    pub fn is_fresh(&self, now: SystemTime, ttl: Duration) -> bool {
        match now.duration_since(self.fetched_at) {
            Ok(age) => age < ttl,
            Err(ahead) => {
                warn!(
                    "cache entry for region '{}' is stamped {}s in the future; treating it as expired",
                    self.region,
                    ahead.duration().as_secs()
                );
                false
            }
        }
    }

    fn snapshot(&self, stale: bool) -> SourceSnapshot {
        SourceSnapshot {
            sources: Arc::clone(&self.sources),
            stale,
            fetched_at: self.fetched_at,
        }
    }
}

/// Region-keyed water-source cache with TTL, stale fallback and optional
/// file persistence.
///
/// Regions keep the order they were loaded or first fetched in, so a load
/// followed by a flush rewrites the file unchanged.
#[derive(Debug)]
pub struct ExternalSourceCache {
    entries: RwLock<Vec<Arc<RegionCacheEntry>>>,
    refresh: Mutex<()>,
    clock: Arc<dyn Clock>,
    path: Option<Utf8PathBuf>,
}

impl Default for ExternalSourceCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ExternalSourceCache {
    /// Create an empty cache that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            refresh: Mutex::new(()),
            clock: Arc::new(SystemClock),
            path: None,
        }
    }

    /// Load the cache from `path`, starting empty when the file is absent.
    ///
    /// The cache is written back to the same path after every refresh.
    ///
    /// # Errors
    /// Returns [`CacheError`] when the file cannot be read or decoded, or
    /// when it lists a region twice.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self, CacheError> {
        let file_path = path.into();
        let entries = read_entries(&file_path)?;
        info!(
            "loaded water-source cache {file_path} with {} region(s)",
            entries.len()
        );
        Ok(Self {
            entries: RwLock::new(entries),
            path: Some(file_path),
            ..Self::in_memory()
        })
    }

    /// Load the cache from `path`, discarding an unreadable file.
    ///
    /// Use this at start-up where a corrupt cache should cost a refetch
    /// rather than abort the process. The file is overwritten on the next
    /// refresh.
    #[must_use]
    pub fn open(path: impl Into<Utf8PathBuf>) -> Self {
        let file_path = path.into();
        match Self::load(file_path.clone()) {
            Ok(cache) => cache,
            Err(err) => {
                warn!("ignoring unreadable water-source cache: {err}");
                Self {
                    path: Some(file_path),
                    ..Self::in_memory()
                }
            }
        }
    }

    /// Replace the clock used to judge freshness.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Path the cache persists to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Current entry for `region`, fresh or not.
    #[must_use]
    pub fn entry(&self, region: &str) -> Option<Arc<RegionCacheEntry>> {
        self.read_entries()
            .iter()
            .find(|entry| entry.region == region)
            .cloned()
    }

    /// Keys of every cached region in file order.
    #[must_use]
    pub fn regions(&self) -> Vec<String> {
        self.read_entries()
            .iter()
            .map(|entry| entry.region.clone())
            .collect()
    }

    /// Return the sources for `region`, fetching them when the cached entry
    /// is missing or at least `ttl` old.
    ///
    /// When the fetch fails but an expired entry exists, the expired data is
    /// returned with [`SourceSnapshot::stale`] set. Concurrent callers
    /// missing the same region share one fetch.
    ///
    /// # Errors
    /// Returns [`SourceUnavailable`] when the fetch fails and nothing is
    /// cached for the region.
    pub fn get_or_fetch(
        &self,
        region: &Region,
        fetcher: &dyn WaterSourceFetcher,
        ttl: Duration,
    ) -> Result<SourceSnapshot, SourceUnavailable> {
        if let Some(entry) = self.fresh_entry(region.key(), ttl) {
            debug!("water-source cache hit for region '{}'", region.key());
            return Ok(entry.snapshot(false));
        }

        let _guard = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have refreshed while we waited.
        if let Some(entry) = self.fresh_entry(region.key(), ttl) {
            return Ok(entry.snapshot(false));
        }

        self.fetch_and_store(region, fetcher, ttl)
    }

    /// Fetch `region` regardless of the cached entry's age.
    ///
    /// The new entry records `ttl`. A failed fetch still falls back to the
    /// cached entry, marked stale.
    ///
    /// # Errors
    /// Returns [`SourceUnavailable`] when the fetch fails and nothing is
    /// cached for the region.
    pub fn refresh(
        &self,
        region: &Region,
        fetcher: &dyn WaterSourceFetcher,
        ttl: Duration,
    ) -> Result<SourceSnapshot, SourceUnavailable> {
        let _guard = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        self.fetch_and_store(region, fetcher, ttl)
    }

    /// Drop the entry for `region`, returning whether one existed.
    #[must_use]
    pub fn evict(&self, region: &str) -> bool {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|entry| entry.region != region);
        entries.len() < before
    }

    /// Drop every entry older than its recorded TTL, returning how many
    /// were removed.
    #[must_use]
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|entry| entry.is_fresh(now, entry.ttl));
        before.saturating_sub(entries.len())
    }

    /// Write the cache to its file. A no-op for in-memory caches.
    ///
    /// # Errors
    /// Returns [`CacheError`] when encoding or the atomic write fails.
    pub fn flush(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = self.to_json()?;
        write_atomic(path, bytes.as_bytes()).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })
    }

    /// Render the cache file contents.
    ///
    /// # Errors
    /// Returns [`CacheError::Encode`] when serialisation fails.
    pub fn to_json(&self) -> Result<String, CacheError> {
        let records: Vec<CacheRecord> = self
            .read_entries()
            .iter()
            .map(|entry| CacheRecord::from(entry.as_ref()))
            .collect();
        serde_json::to_string_pretty(&records).map_err(|source| CacheError::Encode { source })
    }

    fn fetch_and_store(
        &self,
        region: &Region,
        fetcher: &dyn WaterSourceFetcher,
        ttl: Duration,
    ) -> Result<SourceSnapshot, SourceUnavailable> {
        match fetcher.fetch(region) {
            Ok(sources) => {
                let entry = Arc::new(RegionCacheEntry {
                    region: region.key().to_owned(),
                    sources: Arc::new(sources),
                    fetched_at: whole_seconds(self.clock.now()),
                    ttl,
                });
                upsert(&mut self.write_entries(), Arc::clone(&entry));
                info!(
                    "refreshed water sources for region '{}': {} source(s)",
                    region.key(),
                    entry.sources.len()
                );
                if let Err(err) = self.flush() {
                    warn!("water-source cache not persisted: {err}");
                }
                Ok(entry.snapshot(false))
            }
            Err(cause) => match self.entry(region.key()) {
                Some(stale) => {
                    warn!(
                        "refresh for region '{}' failed, serving stale data: {cause}",
                        region.key()
                    );
                    Ok(stale.snapshot(true))
                }
                None => Err(SourceUnavailable {
                    region: region.key().to_owned(),
                    cause,
                }),
            },
        }
    }

    fn fresh_entry(&self, region: &str, ttl: Duration) -> Option<Arc<RegionCacheEntry>> {
        let now = self.clock.now();
        self.entry(region).filter(|entry| entry.is_fresh(now, ttl))
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Vec<Arc<RegionCacheEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<Arc<RegionCacheEntry>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Replace the entry for the same region in place, or append a new one.
fn upsert(entries: &mut Vec<Arc<RegionCacheEntry>>, entry: Arc<RegionCacheEntry>) {
    match entries.iter_mut().find(|slot| slot.region == entry.region) {
        Some(slot) => *slot = entry,
        None => entries.push(entry),
    }
}

fn read_entries(path: &Utf8Path) -> Result<Vec<Arc<RegionCacheEntry>>, CacheError> {
    let Some(text) = read_utf8_if_present(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })?
    else {
        return Ok(Vec::new());
    };
    let records: Vec<CacheRecord> =
        serde_json::from_str(&text).map_err(|source| CacheError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    let mut entries: Vec<Arc<RegionCacheEntry>> = Vec::with_capacity(records.len());
    for record in records {
        let region = record.region().to_owned();
        if entries.iter().any(|entry| entry.region == region) {
            return Err(CacheError::DuplicateRegion {
                path: path.to_path_buf(),
                region,
            });
        }
        let entry = record
            .into_entry()
            .map_err(|source| CacheError::InvalidEntry {
                path: path.to_path_buf(),
                region: region.clone(),
                source,
            })?;
        entries.push(Arc::new(entry));
    }
    Ok(entries)
}

/// Truncate to whole seconds so the in-memory entry equals its file form.
fn whole_seconds(at: SystemTime) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(epoch_secs(at))
}

/// [`WaterSourceCatalogue`] serving a region through an
/// [`ExternalSourceCache`] and a fetcher.
#[derive(Clone, Copy)]
pub struct CacheCatalogue<'a> {
    cache: &'a ExternalSourceCache,
    fetcher: &'a dyn WaterSourceFetcher,
    ttl: Duration,
}

impl<'a> CacheCatalogue<'a> {
    /// Pair a cache with the fetcher used on a miss.
    #[must_use]
    pub const fn new(
        cache: &'a ExternalSourceCache,
        fetcher: &'a dyn WaterSourceFetcher,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            ttl,
        }
    }
}

impl WaterSourceCatalogue for CacheCatalogue<'_> {
    fn water_sources(&self, region: &Region) -> Result<SourceSnapshot, SourceUnavailable> {
        self.cache.get_or_fetch(region, self.fetcher, self.ttl)
    }
}

#[cfg(test)]
mod tests;
