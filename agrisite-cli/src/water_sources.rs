//! Water-sources command implementation for the agrisite CLI.

use std::io::Write;
use std::time::{Duration, SystemTime};

use agrisite_core::{ConfigError, DEFAULT_CACHE_TTL_SECS, Region, SourceSnapshot, WaterSource};
use agrisite_data::{ExternalSourceCache, OverpassConfig};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::common::{
    DefaultFetcherBuilder, FetcherBuilder, cache_path, emit, overpass_config, resolve_region,
};
use crate::{
    ARG_CACHE_PATH, ARG_CACHE_TTL_SECS, ARG_LIMIT, ARG_OVERPASS_URL, ARG_REFRESH, ARG_REGION,
    ARG_REGION_BBOX, CliError,
};

/// Sources listed when `--limit` is not given.
pub(crate) const DEFAULT_LIMIT: usize = 100;

/// CLI arguments for the `water-sources` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Show the cached water sources for a region, fetching them \
                 from Overpass when the cache is missing or expired. Use \
                 --refresh to fetch even when the cache is fresh.",
    about = "List cached water sources for a region"
)]
#[ortho_config(prefix = "AGRISITE")]
pub(crate) struct WaterSourcesArgs {
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
    /// Lifetime of cached water sources in seconds.
    #[arg(long = ARG_CACHE_TTL_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_ttl_secs: Option<u64>,
    /// Fetch from Overpass even when the cache is fresh.
    #[arg(
        long = ARG_REFRESH,
        value_name = "bool",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    #[serde(default)]
    pub(crate) refresh: Option<bool>,
    /// Maximum number of sources printed.
    #[arg(long = ARG_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

impl WaterSourcesArgs {
    pub(crate) fn into_config(self) -> Result<WaterSourcesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        WaterSourcesConfig::try_from(merged)
    }
}

/// Resolved `water-sources` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct WaterSourcesConfig {
    pub(crate) region: Region,
    pub(crate) cache_path: Utf8PathBuf,
    pub(crate) overpass: OverpassConfig,
    pub(crate) ttl: Duration,
    pub(crate) refresh: bool,
    pub(crate) limit: usize,
}

impl TryFrom<WaterSourcesArgs> for WaterSourcesConfig {
    type Error = CliError;

    fn try_from(args: WaterSourcesArgs) -> Result<Self, Self::Error> {
        let ttl_secs = args.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS);
        if ttl_secs == 0 {
            return Err(ConfigError::ZeroValue {
                field: "cache_ttl_secs",
            }
            .into());
        }
        Ok(Self {
            region: resolve_region(args.region, args.region_bbox.as_deref())?,
            cache_path: cache_path(args.cache_path),
            overpass: overpass_config(args.overpass_url),
            ttl: Duration::from_secs(ttl_secs),
            refresh: args.refresh.unwrap_or(false),
            limit: args.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// JSON payload printed by `water-sources`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WaterSourceListing {
    pub(crate) region: String,
    pub(crate) count: usize,
    pub(crate) stale: bool,
    pub(crate) fetched_at: u64,
    pub(crate) sources: Vec<ListedSource>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ListedSource {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
}

impl From<&WaterSource> for ListedSource {
    fn from(source: &WaterSource) -> Self {
        Self {
            lat: source.location.lat(),
            lon: source.location.lon(),
            tag: source.kind.to_string(),
            name: source.name.clone(),
        }
    }
}

impl WaterSourceListing {
    fn new(region: &Region, snapshot: &SourceSnapshot, limit: usize) -> Self {
        Self {
            region: region.key().to_owned(),
            count: snapshot.sources.len(),
            stale: snapshot.stale,
            fetched_at: snapshot
                .fetched_at
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_or(0, |since| since.as_secs()),
            sources: snapshot
                .sources
                .iter()
                .take(limit)
                .map(ListedSource::from)
                .collect(),
        }
    }
}

pub(crate) fn run_water_sources(args: WaterSourcesArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_water_sources_with(args, &DefaultFetcherBuilder, &mut stdout)
}

pub(crate) fn run_water_sources_with(
    args: WaterSourcesArgs,
    builder: &dyn FetcherBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let cache = ExternalSourceCache::open(config.cache_path.clone());
    let fetcher = builder.build(&config.overpass)?;
    let snapshot = if config.refresh {
        cache.refresh(&config.region, fetcher.as_ref(), config.ttl)?
    } else {
        cache.get_or_fetch(&config.region, fetcher.as_ref(), config.ttl)?
    };
    let listing = WaterSourceListing::new(&config.region, &snapshot, config.limit);
    let payload = serde_json::to_string_pretty(&listing).map_err(CliError::SerialiseOutput)?;
    emit(writer, None, &payload)
}
