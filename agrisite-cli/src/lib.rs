//! Command-line interface for agrisite land productivity analysis.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod analyze;
mod common;
mod error;
mod water_sources;

pub use error::CliError;

use analyze::{AnalyzeArgs, run_analyze};
use water_sources::{WaterSourcesArgs, run_water_sources};

const ARG_ANALYZE_CANDIDATES: &str = "candidates";
const ENV_ANALYZE_CANDIDATES: &str = "AGRISITE_CMDS_ANALYZE_CANDIDATES";
const ARG_REGION: &str = "region";
const ARG_REGION_BBOX: &str = "region-bbox";
const ARG_CACHE_PATH: &str = "cache-path";
const ARG_CACHE_TTL_SECS: &str = "cache-ttl-secs";
const ARG_OVERPASS_URL: &str = "overpass-url";
const ARG_SCORING_CONFIG: &str = "scoring-config";
const ARG_THRESHOLD: &str = "threshold";
const ARG_TOP_N: &str = "top-n";
const ARG_CANDIDATE_CAP: &str = "candidate-cap";
const ARG_WORKERS: &str = "workers";
const ARG_DEDUP: &str = "dedup";
const ARG_FORMAT: &str = "format";
const ARG_OUTPUT: &str = "output";
const ARG_REFRESH: &str = "refresh";
const ARG_LIMIT: &str = "limit";

/// Run the agrisite CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::WaterSources(args) => run_water_sources(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "agrisite",
    about = "Estimate agricultural productivity of candidate land parcels",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score candidate sites and report the most productive areas.
    Analyze(AnalyzeArgs),
    /// Show the cached water sources for a region.
    WaterSources(WaterSourcesArgs),
}

#[cfg(test)]
mod tests;
