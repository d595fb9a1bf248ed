//! Behavioural coverage for the durable water-source cache.
#![expect(
    clippy::expect_used,
    reason = "behaviour steps fail fast when fixtures cannot be prepared"
)]
#![expect(
    clippy::float_arithmetic,
    reason = "fixture sources are spaced one degree apart"
)]

use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use agrisite_core::test_support::StubFetcher;
use agrisite_core::{
    Coordinate, Region, SourceSnapshot, SourceUnavailable, WaterSource, WaterSourceKind,
};
use agrisite_data::{Clock, ExternalSourceCache};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const WEEK: Duration = Duration::from_secs(7 * 24 * 3_600);

/// Clock the steps move forward by hand.
#[derive(Debug)]
struct SteppedClock(Mutex<SystemTime>);

impl SteppedClock {
    fn starting_at(secs: u64) -> Self {
        Self(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> SystemTime {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct CacheWorld {
    dir: TempDir,
    clock: Arc<SteppedClock>,
    cache: RefCell<Option<ExternalSourceCache>>,
    upstream: RefCell<StubFetcher>,
    outcome: RefCell<Option<Result<SourceSnapshot, SourceUnavailable>>>,
}

#[fixture]
fn world() -> CacheWorld {
    CacheWorld {
        dir: TempDir::new().expect("create temporary directory"),
        clock: Arc::new(SteppedClock::starting_at(1_760_000_000)),
        cache: RefCell::new(None),
        upstream: RefCell::new(StubFetcher::with_sources(Vec::new())),
        outcome: RefCell::new(None),
    }
}

impl CacheWorld {
    fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("water-sources.json")).expect("utf8 path")
    }

    fn request(&self) {
        let cache = self.cache.borrow();
        let outcome = cache.as_ref().expect("cache opened").get_or_fetch(
            &Region::turkey(),
            &*self.upstream.borrow(),
            WEEK,
        );
        *self.outcome.borrow_mut() = Some(outcome);
    }

    fn snapshot(&self) -> SourceSnapshot {
        self.outcome
            .borrow()
            .as_ref()
            .expect("request made")
            .clone()
            .expect("sources served")
    }
}

#[given("an empty cache file")]
fn given_empty_cache(#[from(world)] world: &CacheWorld) {
    let cache = ExternalSourceCache::load(world.path())
        .expect("absent file loads empty")
        .with_clock(world.clock.clone());
    *world.cache.borrow_mut() = Some(cache);
}

#[given("an upstream with {count} water sources")]
fn given_upstream(#[from(world)] world: &CacheWorld, count: usize) {
    let sources = (0..count)
        .map(|step| {
            let offset = f64::from(u32::try_from(step).expect("small count"));
            WaterSource::new(
                Coordinate::new(38.0, 27.0 + offset).expect("valid coordinate"),
                WaterSourceKind::Stream,
            )
        })
        .collect();
    *world.upstream.borrow_mut() = StubFetcher::with_sources(sources);
}

#[given("an unreachable upstream")]
fn given_unreachable(#[from(world)] world: &CacheWorld) {
    *world.upstream.borrow_mut() = StubFetcher::unreachable();
}

#[when("I request water sources for Turkey")]
fn when_request(#[from(world)] world: &CacheWorld) {
    world.request();
}

#[when("I request water sources for Turkey twice")]
fn when_request_twice(#[from(world)] world: &CacheWorld) {
    world.request();
    world.request();
}

#[when("eight days pass")]
fn when_days_pass(#[from(world)] world: &CacheWorld) {
    world.clock.advance(WEEK + Duration::from_secs(24 * 3_600));
}

#[when("the upstream becomes unreachable")]
fn when_upstream_down(#[from(world)] world: &CacheWorld) {
    *world.upstream.borrow_mut() = StubFetcher::unreachable();
}

#[then("the upstream was called {count} time")]
fn then_calls(#[from(world)] world: &CacheWorld, count: usize) {
    assert_eq!(world.upstream.borrow().calls(), count);
}

#[then("{count} fresh sources are served")]
fn then_fresh(#[from(world)] world: &CacheWorld, count: usize) {
    let snapshot = world.snapshot();
    assert!(!snapshot.stale);
    assert_eq!(snapshot.sources.len(), count);
}

#[then("{count} stale sources are served")]
fn then_stale(#[from(world)] world: &CacheWorld, count: usize) {
    let snapshot = world.snapshot();
    assert!(snapshot.stale);
    assert_eq!(snapshot.sources.len(), count);
}

#[then("the cache file lists the region \"{region}\"")]
fn then_file_lists(#[from(world)] world: &CacheWorld, region: String) {
    let reloaded = ExternalSourceCache::load(world.path()).expect("cache file reloads");
    assert_eq!(reloaded.regions(), vec![region]);
}

#[then("the request fails because sources are unavailable")]
fn then_unavailable(#[from(world)] world: &CacheWorld) {
    let outcome = world.outcome.borrow();
    let err = outcome
        .as_ref()
        .expect("request made")
        .as_ref()
        .expect_err("no data to serve");
    assert_eq!(err.region, Region::TURKEY);
}

#[scenario(path = "tests/features/source_cache.feature", index = 0)]
fn fresh_entry_reused(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/source_cache.feature", index = 1)]
fn expired_entry_served_stale(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/source_cache.feature", index = 2)]
fn cold_cache_unavailable(world: CacheWorld) {
    let _ = world;
}
