//! Analyze command implementation for the agrisite CLI.

use std::io::{BufReader, Write};

use agrisite_core::{AnalysisConfig, Region, ScoringConfig, dedup_by_coordinate};
use agrisite_data::{CacheCatalogue, ExternalSourceCache, OverpassConfig, load_candidates};
use agrisite_fs::open_utf8_file;
use agrisite_scorer::{AnalysisReport, BatchAnalysisRunner, CancellationToken};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::common::{
    DefaultFetcherBuilder, FetcherBuilder, cache_path, emit, overpass_config, require_existing,
    resolve_region,
};
use crate::{
    ARG_ANALYZE_CANDIDATES, ARG_CACHE_PATH, ARG_CACHE_TTL_SECS, ARG_CANDIDATE_CAP, ARG_DEDUP,
    ARG_FORMAT, ARG_OUTPUT, ARG_OVERPASS_URL, ARG_REGION, ARG_REGION_BBOX, ARG_SCORING_CONFIG,
    ARG_THRESHOLD, ARG_TOP_N, ARG_WORKERS, CliError, ENV_ANALYZE_CANDIDATES,
};

/// Rendering of the analysis report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReportFormat {
    /// Pretty-printed JSON report.
    #[default]
    Json,
    /// Plain-text summary of the best areas.
    Text,
}

/// CLI arguments for the `analyze` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Score every candidate site in a CSV file against water \
                 proximity, terrain, soil and climate, then report the best \
                 areas. Water sources come from the cache file and are \
                 fetched from Overpass once per region when missing or \
                 expired.",
    about = "Score candidate sites for agricultural productivity"
)]
#[ortho_config(prefix = "AGRISITE")]
pub(crate) struct AnalyzeArgs {
    /// Path to the candidate CSV file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) candidates: Option<Utf8PathBuf>,
    /// Region preset (`turkey`) or label for `--region-bbox`.
    #[arg(long = ARG_REGION, value_name = "name")]
    #[serde(default)]
    pub(crate) region: Option<String>,
    /// Custom region as `south,west,north,east`.
    #[arg(long = ARG_REGION_BBOX, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) region_bbox: Option<String>,
    /// Water-source cache file.
    #[arg(long = ARG_CACHE_PATH, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_path: Option<Utf8PathBuf>,
    /// Overpass interpreter endpoint.
    #[arg(long = ARG_OVERPASS_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_url: Option<String>,
    /// JSON file with weights, curves and threshold.
    #[arg(long = ARG_SCORING_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) scoring_config: Option<Utf8PathBuf>,
    /// Minimum score, inclusive, classed as productive.
    #[arg(long = ARG_THRESHOLD, value_name = "score")]
    #[serde(default)]
    pub(crate) threshold: Option<f64>,
    /// Number of best results to report.
    #[arg(long = ARG_TOP_N, value_name = "count")]
    #[serde(default)]
    pub(crate) top_n: Option<usize>,
    /// Analyse at most this many candidates, in file order.
    #[arg(long = ARG_CANDIDATE_CAP, value_name = "count")]
    #[serde(default)]
    pub(crate) candidate_cap: Option<usize>,
    /// Lifetime of cached water sources in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
    /// Worker threads used for scoring.
    #[arg(long = ARG_WORKERS, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<usize>,
    /// Drop candidates repeating an earlier coordinate.
    #[arg(
        long = ARG_DEDUP,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) dedup: Option<bool>,
    /// Report format.
    #[arg(long = ARG_FORMAT, value_enum)]
    #[serde(default)]
    pub(crate) format: Option<ReportFormat>,
    /// Write the report here instead of standard output.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl AnalyzeArgs {
    pub(crate) fn into_config(self) -> Result<AnalyzeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AnalyzeConfig::try_from(merged)
    }
}

/// Resolved `analyze` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct AnalyzeConfig {
    pub(crate) candidates: Utf8PathBuf,
    pub(crate) region: Region,
    pub(crate) cache_path: Utf8PathBuf,
    pub(crate) overpass: OverpassConfig,
    pub(crate) analysis: AnalysisConfig,
    pub(crate) dedup: bool,
    pub(crate) format: ReportFormat,
    pub(crate) output: Option<Utf8PathBuf>,
}

impl TryFrom<AnalyzeArgs> for AnalyzeConfig {
    type Error = CliError;

    fn try_from(args: AnalyzeArgs) -> Result<Self, Self::Error> {
        let candidates = args.candidates.ok_or(CliError::MissingArgument {
            field: ARG_ANALYZE_CANDIDATES,
            usage: "the candidate CSV path as the first argument",
            env: ENV_ANALYZE_CANDIDATES,
        })?;
        let region = resolve_region(args.region, args.region_bbox.as_deref())?;

        let mut scoring = match &args.scoring_config {
            Some(path) => load_scoring_config(path)?,
            None => ScoringConfig::default(),
        };
        if let Some(threshold) = args.threshold {
            scoring.threshold = threshold;
        }
        let defaults = AnalysisConfig::default();
        let analysis = AnalysisConfig {
            scoring,
            top_n: args.top_n.unwrap_or(defaults.top_n),
            candidate_cap: args.candidate_cap,
            cache_ttl_secs: args.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs),
            workers: args.workers.unwrap_or(defaults.workers),
            ..defaults
        }
        .validate()?;

        Ok(Self {
            candidates,
            region,
            cache_path: cache_path(args.cache_path),
            overpass: overpass_config(args.overpass_url),
            analysis,
            dedup: args.dedup.unwrap_or(false),
            format: args.format.unwrap_or_default(),
            output: args.output,
        })
    }
}

/// Loads a JSON-encoded [`ScoringConfig`] from disk.
pub(crate) fn load_scoring_config(path: &Utf8Path) -> Result<ScoringConfig, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenScoringConfig {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        CliError::ParseScoringConfig {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_analyze_with(args, &DefaultFetcherBuilder, &mut stdout)
}

pub(crate) fn run_analyze_with(
    args: AnalyzeArgs,
    builder: &dyn FetcherBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    require_existing(&config.candidates, ARG_ANALYZE_CANDIDATES)?;
    let report = execute_analyze(&config, builder)?;
    let payload = match config.format {
        ReportFormat::Json => report.to_json_pretty().map_err(CliError::SerialiseOutput)?,
        ReportFormat::Text => report.text().to_string(),
    };
    emit(writer, config.output.as_deref(), &payload)
}

pub(crate) fn execute_analyze(
    config: &AnalyzeConfig,
    builder: &dyn FetcherBuilder,
) -> Result<AnalysisReport, CliError> {
    let loaded = load_candidates(&config.candidates)?;
    let candidates = if config.dedup {
        let before = loaded.len();
        let kept = dedup_by_coordinate(loaded, |input| {
            input.as_ref().ok().map(|candidate| candidate.coordinate)
        });
        info!(
            "dropped {} duplicate candidate(s)",
            before.saturating_sub(kept.len())
        );
        kept
    } else {
        loaded
    };

    let cache = ExternalSourceCache::open(config.cache_path.clone());
    let fetcher = builder.build(&config.overpass)?;
    let catalogue = CacheCatalogue::new(&cache, fetcher.as_ref(), config.analysis.cache_ttl());
    let runner = BatchAnalysisRunner::new(config.analysis)?;
    let summary = runner.run(
        &candidates,
        &config.region,
        &catalogue,
        &CancellationToken::new(),
    )?;
    Ok(AnalysisReport::from(&summary))
}
