//! Focused unit tests covering CLI configuration resolution.

use super::helpers::{StubFetcherBuilder, Workspace, streams, write_utf8};
use crate::analyze::{AnalyzeArgs, AnalyzeConfig, ReportFormat, execute_analyze, load_scoring_config};
use crate::common::{emit, resolve_region};
use crate::water_sources::{DEFAULT_LIMIT, WaterSourcesArgs, WaterSourcesConfig};
use crate::{ARG_ANALYZE_CANDIDATES, CliError, ENV_ANALYZE_CANDIDATES};
use agrisite_core::{ConfigError, DEFAULT_TOP_N, Region, RegionError};
use rstest::rstest;

fn args_for(candidates: &str) -> AnalyzeArgs {
    AnalyzeArgs {
        candidates: Some(candidates.into()),
        ..AnalyzeArgs::default()
    }
}

#[rstest]
fn converting_without_candidates_errors() {
    let err = AnalyzeConfig::try_from(AnalyzeArgs::default()).expect_err("missing candidates");
    assert_eq!(
        err.to_string(),
        "missing candidates (pass the candidate CSV path as the first argument or set \
         AGRISITE_CMDS_ANALYZE_CANDIDATES)"
    );
    match err {
        CliError::MissingArgument { field, env, .. } => {
            assert_eq!(field, ARG_ANALYZE_CANDIDATES);
            assert_eq!(env, ENV_ANALYZE_CANDIDATES);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn defaults_fill_unset_options() {
    let config = AnalyzeConfig::try_from(args_for("sites.csv")).expect("valid config");

    assert_eq!(config.region.key(), Region::TURKEY);
    assert_eq!(config.cache_path.as_str(), "water_sources_cache.json");
    assert_eq!(config.analysis.top_n, DEFAULT_TOP_N);
    assert_eq!(config.analysis.candidate_cap, None);
    assert_eq!(config.format, ReportFormat::Json);
    assert!(!config.dedup);
}

#[rstest]
fn cli_threshold_overrides_scoring_file() {
    let workspace = Workspace::new();
    let scoring = workspace.path("scoring.json");
    write_utf8(&scoring, br#"{"threshold": 40.0, "weights": {"water_proximity": 50.0}}"#);
    let args = AnalyzeArgs {
        scoring_config: Some(scoring.clone()),
        threshold: Some(65.0),
        ..args_for("sites.csv")
    };

    let config = AnalyzeConfig::try_from(args).expect("valid config");

    let from_file = load_scoring_config(&scoring).expect("scoring file");
    assert_eq!(config.analysis.scoring.weights, from_file.weights);
    assert_eq!(config.analysis.scoring.threshold, 65.0);
}

#[rstest]
fn malformed_scoring_file_is_reported() {
    let workspace = Workspace::new();
    let scoring = workspace.path("scoring.json");
    write_utf8(&scoring, b"{ weights: nope");

    let err = load_scoring_config(&scoring).expect_err("invalid JSON");

    assert!(matches!(err, CliError::ParseScoringConfig { .. }));
}

#[rstest]
#[case(AnalyzeArgs { threshold: Some(150.0), ..args_for("sites.csv") })]
#[case(AnalyzeArgs { top_n: Some(0), ..args_for("sites.csv") })]
#[case(AnalyzeArgs { workers: Some(0), ..args_for("sites.csv") })]
#[case(AnalyzeArgs { candidate_cap: Some(0), ..args_for("sites.csv") })]
fn invalid_values_fail_fast(#[case] args: AnalyzeArgs) {
    let err = AnalyzeConfig::try_from(args).expect_err("invalid configuration");
    assert!(matches!(err, CliError::InvalidConfig(_)), "got {err:?}");
}

#[rstest]
#[case(None, None, "turkey")]
#[case(Some("Turkiye"), None, "turkey")]
#[case(Some("ankara"), Some("39.5,32.3,40.2,33.3"), "ankara")]
#[case(None, Some("39.5,32.3,40.2,33.3"), "custom")]
fn regions_resolve(#[case] name: Option<&str>, #[case] bbox: Option<&str>, #[case] key: &str) {
    let region = resolve_region(name.map(str::to_owned), bbox).expect("valid region");
    assert_eq!(region.key(), key);
}

#[rstest]
fn unknown_region_is_rejected() {
    let err = resolve_region(Some("atlantis".to_owned()), None).expect_err("unknown preset");
    assert!(matches!(
        err,
        CliError::Region(RegionError::UnknownPreset { .. })
    ));
}

#[rstest]
fn water_sources_defaults_and_zero_ttl() {
    let config = WaterSourcesConfig::try_from(WaterSourcesArgs::default()).expect("defaults");
    assert_eq!(config.limit, DEFAULT_LIMIT);
    assert!(!config.refresh);

    let err = WaterSourcesConfig::try_from(WaterSourcesArgs {
        cache_ttl_secs: Some(0),
        ..WaterSourcesArgs::default()
    })
    .expect_err("zero ttl");
    assert!(matches!(
        err,
        CliError::InvalidConfig(ConfigError::ZeroValue { .. })
    ));
}

#[rstest]
fn emit_terminates_output_with_newline() {
    let mut buffer = Vec::new();
    emit(&mut buffer, None, "{}").expect("write to buffer");
    assert_eq!(buffer, b"{}\n");

    let workspace = Workspace::new();
    let target = workspace.path("reports/out.txt");
    emit(&mut Vec::new(), Some(&target), "done").expect("write to file");
    let written = std::fs::read_to_string(target.as_std_path()).expect("read report");
    assert_eq!(written, "done\n");
}

#[rstest]
fn dedup_drops_repeated_coordinates() {
    let workspace = Workspace::new();
    let candidates = workspace.path("sites.csv");
    write_utf8(
        &candidates,
        b"lat,lon,soil_ph\n38.62,27.43,6.5\n38.62,27.43,6.5\n38.70,27.50,6.0\n",
    );
    let mut config = AnalyzeConfig::try_from(AnalyzeArgs {
        cache_path: Some(workspace.path("cache.json")),
        ..args_for(candidates.as_str())
    })
    .expect("valid config");
    let builder = StubFetcherBuilder::Serving(streams(1));

    let all = execute_analyze(&config, &builder).expect("analysis runs");
    config.dedup = true;
    let unique = execute_analyze(&config, &builder).expect("analysis runs");

    assert_eq!(all.total_analyzed, 3);
    assert_eq!(unique.total_analyzed, 2);
}
