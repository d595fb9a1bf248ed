//! Behavioural coverage for CSV candidate loading.
#![expect(
    clippy::expect_used,
    reason = "behaviour steps fail fast when fixtures cannot be prepared"
)]

use std::cell::RefCell;

use agrisite_core::CandidateInput;
use agrisite_data::{CandidateLoadError, load_candidates};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

struct InputWorld {
    dir: TempDir,
    outcome: RefCell<Option<Result<Vec<CandidateInput>, CandidateLoadError>>>,
}

#[fixture]
fn world() -> InputWorld {
    InputWorld {
        dir: TempDir::new().expect("create temporary directory"),
        outcome: RefCell::new(None),
    }
}

impl InputWorld {
    fn path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("candidates.csv")).expect("utf8 path")
    }

    fn write(&self, text: &str) {
        std::fs::write(self.path().as_std_path(), text).expect("write candidate file");
    }

    fn count(&self, usable: bool) -> usize {
        let outcome = self.outcome.borrow();
        let rows = outcome
            .as_ref()
            .expect("file loaded")
            .as_ref()
            .expect("load succeeded");
        rows.iter().filter(|row| row.is_ok() == usable).count()
    }
}

#[given("a candidate file with one good row and one bad row")]
fn given_mixed_file(#[from(world)] world: &InputWorld) {
    world.write("latitude,longitude,soil_ph,landcover\n38.4,27.1,6.5,cropland\n38.5,27.2,acidic,\n");
}

#[given("a candidate file without a longitude column")]
fn given_no_longitude(#[from(world)] world: &InputWorld) {
    world.write("lat,elevation\n38.4,120\n");
}

#[when("I load the candidate file")]
fn when_load(#[from(world)] world: &InputWorld) {
    *world.outcome.borrow_mut() = Some(load_candidates(&world.path()));
}

#[then("{count} candidate is usable")]
fn then_usable(#[from(world)] world: &InputWorld, count: usize) {
    assert_eq!(world.count(true), count);
}

#[then("{count} candidate is malformed")]
fn then_malformed(#[from(world)] world: &InputWorld, count: usize) {
    assert_eq!(world.count(false), count);
}

#[then("loading fails for missing coordinate columns")]
fn then_missing_columns(#[from(world)] world: &InputWorld) {
    let outcome = world.outcome.borrow();
    let err = outcome
        .as_ref()
        .expect("file loaded")
        .as_ref()
        .expect_err("no longitude column");
    assert!(matches!(err, CandidateLoadError::MissingCoordinateColumns { .. }));
}

#[scenario(path = "tests/features/candidate_input.feature", index = 0)]
fn good_and_bad_rows(world: InputWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/candidate_input.feature", index = 1)]
fn missing_coordinates_rejected(world: InputWorld) {
    let _ = world;
}
