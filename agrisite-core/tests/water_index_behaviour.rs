//! Behavioural tests for the nearest-water index.
#![expect(
    clippy::expect_used,
    reason = "behaviour tests fail fast when fixtures are malformed"
)]

use std::cell::RefCell;

use agrisite_core::{
    CandidateAttributes, Coordinate, EvaluationInput, FactorError, FactorEvaluator, GeoIndex,
    NearestWater, NoWaterSources, WaterBounds, WaterProximityEvaluator, WaterSource,
    WaterSourceKind,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

fn manisa_field() -> Coordinate {
    Coordinate::new(38.62, 27.43).expect("valid coordinate")
}

#[derive(Default)]
struct IndexWorld {
    sources: RefCell<Vec<WaterSource>>,
    index: RefCell<Option<GeoIndex>>,
    nearest: RefCell<Option<Result<NearestWater, NoWaterSources>>>,
    evaluation: RefCell<Option<FactorError>>,
}

#[fixture]
fn world() -> IndexWorld {
    IndexWorld::default()
}

#[given("water sources on the Gediz river and Lake Marmara")]
fn given_sources(#[from(world)] world: &IndexWorld) {
    let gediz = WaterSource::new(
        Coordinate::new(38.60, 27.45).expect("valid coordinate"),
        WaterSourceKind::River,
    )
    .with_name("Gediz");
    let marmara = WaterSource::new(
        Coordinate::new(38.62, 28.03).expect("valid coordinate"),
        WaterSourceKind::Lake,
    )
    .with_name("Marmara Gölü");
    *world.sources.borrow_mut() = vec![marmara, gediz];
}

#[given("no water sources")]
fn given_no_sources(#[from(world)] world: &IndexWorld) {
    world.sources.borrow_mut().clear();
}

#[when("I build the water index")]
fn when_build(#[from(world)] world: &IndexWorld) {
    let index = GeoIndex::build(&world.sources.borrow());
    *world.index.borrow_mut() = Some(index);
}

#[when("I query the nearest source to a field near Manisa")]
fn when_query(#[from(world)] world: &IndexWorld) {
    let index = world.index.borrow();
    let nearest = index.as_ref().expect("index built").nearest(manisa_field());
    *world.nearest.borrow_mut() = Some(nearest);
}

#[when("I evaluate water proximity for a field near Manisa")]
fn when_evaluate(#[from(world)] world: &IndexWorld) {
    let index = world.index.borrow();
    let attributes = CandidateAttributes::default();
    let input = EvaluationInput {
        coordinate: manisa_field(),
        attributes: &attributes,
        geo_index: index.as_ref(),
    };
    let err = WaterProximityEvaluator::new(WaterBounds::default())
        .evaluate(&input)
        .expect_err("empty index cannot answer");
    *world.evaluation.borrow_mut() = Some(err);
}

#[then("the Gediz river is reported as nearest")]
fn then_gediz(#[from(world)] world: &IndexWorld) {
    let nearest = world.nearest.borrow();
    let found = nearest
        .as_ref()
        .expect("query ran")
        .as_ref()
        .expect("a source was found");
    assert_eq!(found.kind, WaterSourceKind::River);
    assert_eq!(found.name.as_deref(), Some("Gediz"));
}

#[then("the distance is under 5 kilometres")]
fn then_distance(#[from(world)] world: &IndexWorld) {
    let nearest = world.nearest.borrow();
    let found = nearest
        .as_ref()
        .expect("query ran")
        .as_ref()
        .expect("a source was found");
    assert!(found.distance_km < 5.0, "got {}", found.distance_km);
}

#[then("no nearest source is available")]
fn then_none(#[from(world)] world: &IndexWorld) {
    let nearest = world.nearest.borrow();
    assert_eq!(nearest.as_ref().expect("query ran"), &Err(NoWaterSources));
}

#[then("the factor is reported as recoverable")]
fn then_recoverable(#[from(world)] world: &IndexWorld) {
    let evaluation = world.evaluation.borrow();
    let err = evaluation.as_ref().expect("evaluation ran");
    assert!(err.is_recoverable(), "{err} should be recoverable");
}

#[scenario(path = "tests/features/water_index.feature", index = 0)]
fn nearest_source_reported(world: IndexWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/water_index.feature", index = 1)]
fn empty_index_has_no_nearest(world: IndexWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/water_index.feature", index = 2)]
fn empty_index_is_recoverable(world: IndexWorld) {
    let _ = world;
}
