//! Unit coverage for the water-source cache.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agrisite_core::test_support::StubFetcher;
use agrisite_core::{Coordinate, FetchError, Region, WaterSource, WaterSourceKind};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

const TTL: Duration = Duration::from_secs(3_600);

fn sources() -> Vec<WaterSource> {
    vec![
        WaterSource::new(
            Coordinate::new(38.6, 27.4).expect("valid coordinate"),
            WaterSourceKind::River,
        )
        .with_name("Gediz"),
        WaterSource::new(
            Coordinate::new(39.9, 32.8).expect("valid coordinate"),
            WaterSourceKind::Well,
        ),
    ]
}

#[fixture]
fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_epoch_secs(1_760_000_000))
}

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("create temporary directory")
}

fn cache_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("cache/water.json")).expect("utf8 path")
}

#[rstest]
fn fetches_once_within_ttl(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock.clone());
    let fetcher = StubFetcher::with_sources(sources());
    let region = Region::turkey();

    let first = cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
    clock.advance(Duration::from_secs(3_599));
    let second = cache.get_or_fetch(&region, &fetcher, TTL).expect("cached");

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(first, second);
    assert!(!second.stale);
    assert_eq!(second.sources.len(), 2);
}

#[rstest]
fn refetches_after_expiry(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock.clone());
    let fetcher = StubFetcher::with_sources(sources());
    let region = Region::turkey();

    cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
    clock.advance(TTL);
    cache.get_or_fetch(&region, &fetcher, TTL).expect("refetched");

    assert_eq!(fetcher.calls(), 2);
}

#[rstest]
fn stale_entry_serves_failed_refresh(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock.clone());
    let region = Region::turkey();
    cache
        .get_or_fetch(&region, &StubFetcher::with_sources(sources()), TTL)
        .expect("fetched");
    clock.advance(TTL + Duration::from_secs(1));

    let snapshot = cache
        .get_or_fetch(&region, &StubFetcher::unreachable(), TTL)
        .expect("stale fallback");

    assert!(snapshot.stale);
    assert_eq!(snapshot.sources.len(), 2);
}

#[rstest]
fn missing_entry_and_failed_fetch_is_unavailable() {
    let cache = ExternalSourceCache::in_memory();
    let fetcher = StubFetcher::with_error(FetchError::Timeout {
        url: "https://overpass.example/api/interpreter".to_owned(),
        timeout_secs: 5,
    });

    let err = cache
        .get_or_fetch(&Region::turkey(), &fetcher, TTL)
        .expect_err("nothing to fall back on");

    assert_eq!(err.region, Region::TURKEY);
    assert!(matches!(err.cause, FetchError::Timeout { .. }));
}

#[rstest]
fn empty_fetch_is_cached(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock);
    let fetcher = StubFetcher::with_sources(Vec::new());
    let region = Region::turkey();

    cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
    let snapshot = cache.get_or_fetch(&region, &fetcher, TTL).expect("cached");

    assert!(snapshot.sources.is_empty());
    assert_eq!(fetcher.calls(), 1);
}

#[rstest]
fn concurrent_misses_share_one_fetch(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock);
    let fetcher = StubFetcher::with_sources(sources());
    let region = Region::turkey();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
            });
        }
    });

    assert_eq!(fetcher.calls(), 1);
}

#[rstest]
fn evict_and_purge(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock.clone());
    let fetcher = StubFetcher::with_sources(sources());
    let ankara = Region::from_bbox("ankara", "39.5,32.3,40.2,33.3").expect("valid bbox");

    cache.get_or_fetch(&Region::turkey(), &fetcher, TTL).expect("fetched");
    cache
        .get_or_fetch(&ankara, &fetcher, TTL * 10)
        .expect("fetched");
    assert_eq!(cache.regions(), vec!["turkey".to_owned(), "ankara".to_owned()]);

    clock.advance(TTL * 2);
    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.regions(), vec!["ankara".to_owned()]);

    assert!(cache.evict("ankara"));
    assert!(!cache.evict("ankara"));
    assert!(cache.regions().is_empty());
}

#[rstest]
fn refresh_persists_and_reloads(clock: Arc<ManualClock>, temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    let cache = ExternalSourceCache::load(path.clone())
        .expect("absent file loads empty")
        .with_clock(clock.clone());
    cache
        .get_or_fetch(&Region::turkey(), &StubFetcher::with_sources(sources()), TTL)
        .expect("fetched");

    let reloaded = ExternalSourceCache::load(path)
        .expect("reload")
        .with_clock(clock);
    let fetcher = StubFetcher::unreachable();
    let snapshot = reloaded
        .get_or_fetch(&Region::turkey(), &fetcher, TTL)
        .expect("served from disk");

    assert_eq!(fetcher.calls(), 0);
    assert_eq!(snapshot.sources.as_ref(), &sources());
    assert_eq!(
        reloaded.entry(Region::TURKEY),
        cache.entry(Region::TURKEY)
    );
}

#[rstest]
fn file_round_trips_exactly(temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    let original = r#"[
  {
    "region": "turkey",
    "fetched_at": 1760000000,
    "ttl_seconds": 604800,
    "sources": [
      {
        "lat": 38.6,
        "lon": 27.4,
        "tag": "river",
        "name": "Gediz"
      },
      {
        "lat": 39.9,
        "lon": 32.8,
        "tag": "well"
      }
    ]
  }
]"#;
    agrisite_fs::write_atomic(&path, original.as_bytes()).expect("seed cache file");

    let cache = ExternalSourceCache::load(path.clone()).expect("load");
    cache.flush().expect("flush");

    let written = std::fs::read_to_string(path.as_std_path()).expect("read back");
    assert_eq!(written, original);
}

#[rstest]
fn file_round_trip_keeps_region_order(temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    let original = r#"[
  {
    "region": "turkey",
    "fetched_at": 1760000000,
    "ttl_seconds": 604800,
    "sources": [
      {
        "lat": 38.6,
        "lon": 27.4,
        "tag": "river",
        "name": ""
      }
    ]
  },
  {
    "region": "ankara",
    "fetched_at": 1760003600,
    "ttl_seconds": 3600,
    "sources": []
  }
]"#;
    agrisite_fs::write_atomic(&path, original.as_bytes()).expect("seed cache file");

    let cache = ExternalSourceCache::load(path.clone()).expect("load");
    assert_eq!(cache.regions(), vec!["turkey".to_owned(), "ankara".to_owned()]);
    cache.flush().expect("flush");

    let written = std::fs::read_to_string(path.as_std_path()).expect("read back");
    assert_eq!(written, original);
}

#[rstest]
fn refetched_region_keeps_its_slot(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock);
    let fetcher = StubFetcher::with_sources(sources());
    let ankara = Region::from_bbox("ankara", "39.5,32.3,40.2,33.3").expect("valid bbox");

    cache.get_or_fetch(&Region::turkey(), &fetcher, TTL).expect("fetched");
    cache.get_or_fetch(&ankara, &fetcher, TTL).expect("fetched");
    cache.refresh(&Region::turkey(), &fetcher, TTL).expect("refreshed");

    assert_eq!(cache.regions(), vec!["turkey".to_owned(), "ankara".to_owned()]);
}

#[rstest]
fn load_rejects_duplicate_regions(temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    let text = r#"[
        {"region":"turkey","fetched_at":0,"ttl_seconds":1,"sources":[]},
        {"region":"turkey","fetched_at":5,"ttl_seconds":1,"sources":[]}
    ]"#;
    agrisite_fs::write_atomic(&path, text.as_bytes()).expect("seed cache file");

    let err = ExternalSourceCache::load(path).expect_err("region listed twice");
    assert!(matches!(err, CacheError::DuplicateRegion { ref region, .. } if region == "turkey"));
}

#[rstest]
fn future_stamped_entry_is_refetched(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock.clone());
    let fetcher = StubFetcher::with_sources(sources());
    let region = Region::turkey();

    cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
    clock.rewind(Duration::from_secs(60));
    let entry = cache.entry(Region::TURKEY).expect("cached");
    assert!(!entry.is_fresh(clock.now(), TTL));

    cache.get_or_fetch(&region, &fetcher, TTL).expect("refetched");
    assert_eq!(fetcher.calls(), 2);
}

#[rstest]
fn load_rejects_garbage(temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    agrisite_fs::write_atomic(&path, b"{not json").expect("seed cache file");

    let err = ExternalSourceCache::load(path.clone()).expect_err("garbage");
    assert!(matches!(err, CacheError::Decode { .. }));

    let opened = ExternalSourceCache::open(path.clone());
    assert!(opened.regions().is_empty());
    assert_eq!(opened.path(), Some(path.as_path()));
}

#[rstest]
fn load_rejects_invalid_coordinates(temp_dir: TempDir) {
    let path = cache_path(&temp_dir);
    let text = r#"[{"region":"x","fetched_at":0,"ttl_seconds":1,
        "sources":[{"lat":123.0,"lon":0.0,"tag":"lake"}]}]"#;
    agrisite_fs::write_atomic(&path, text.as_bytes()).expect("seed cache file");

    let err = ExternalSourceCache::load(path).expect_err("latitude out of range");
    assert!(matches!(err, CacheError::InvalidEntry { ref region, .. } if region == "x"));
}

#[rstest]
fn refresh_ignores_a_fresh_entry(clock: Arc<ManualClock>) {
    let cache = ExternalSourceCache::in_memory().with_clock(clock);
    let fetcher = StubFetcher::with_sources(sources());
    let region = Region::turkey();

    cache.get_or_fetch(&region, &fetcher, TTL).expect("fetched");
    cache.refresh(&region, &fetcher, TTL).expect("refreshed");
    assert_eq!(fetcher.calls(), 2);

    let snapshot = cache
        .refresh(&region, &StubFetcher::unreachable(), TTL)
        .expect("falls back to the cached entry");
    assert!(snapshot.stale);
}
