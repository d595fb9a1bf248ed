//! Option resolution and output helpers shared by the subcommands.

use std::io::Write;

use agrisite_core::{Region, WaterSourceFetcher};
use agrisite_data::{OverpassConfig, OverpassWaterSourceFetcher};
use camino::{Utf8Path, Utf8PathBuf};

use crate::CliError;

/// Cache file used when `--cache-path` is not given.
pub(crate) const DEFAULT_CACHE_PATH: &str = "water_sources_cache.json";

/// Key given to a `--region-bbox` region when `--region` is not set.
const CUSTOM_REGION: &str = "custom";

/// Resolve the analysed region from a preset name or a bounding box.
///
/// A bounding box wins over a preset; the name then only labels the cache
/// entry.
pub(crate) fn resolve_region(
    name: Option<String>,
    bbox: Option<&str>,
) -> Result<Region, CliError> {
    let region = match bbox {
        Some(text) => Region::from_bbox(name.unwrap_or_else(|| CUSTOM_REGION.to_owned()), text)?,
        None => name.as_deref().unwrap_or(Region::TURKEY).parse()?,
    };
    Ok(region)
}

/// Overpass settings for an optional endpoint override.
pub(crate) fn overpass_config(endpoint: Option<String>) -> OverpassConfig {
    endpoint.map_or_else(OverpassConfig::default, OverpassConfig::new)
}

pub(crate) fn cache_path(path: Option<Utf8PathBuf>) -> Utf8PathBuf {
    path.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_PATH))
}

/// Builds the water-source fetcher for the current invocation.
pub(crate) trait FetcherBuilder {
    fn build(&self, config: &OverpassConfig) -> Result<Box<dyn WaterSourceFetcher>, CliError>;
}

pub(crate) struct DefaultFetcherBuilder;

impl FetcherBuilder for DefaultFetcherBuilder {
    fn build(&self, config: &OverpassConfig) -> Result<Box<dyn WaterSourceFetcher>, CliError> {
        let fetcher = OverpassWaterSourceFetcher::with_config(config.clone()).map_err(|source| {
            CliError::BuildFetcher {
                endpoint: config.endpoint.clone(),
                source,
            }
        })?;
        Ok(Box::new(fetcher))
    }
}

pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match agrisite_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `payload` to `output` when set, otherwise to `writer`.
pub(crate) fn emit(
    writer: &mut dyn Write,
    output: Option<&Utf8Path>,
    payload: &str,
) -> Result<(), CliError> {
    let mut text = payload.to_owned();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    match output {
        Some(path) => {
            agrisite_fs::write_atomic(path, text.as_bytes()).map_err(CliError::WriteOutput)
        }
        None => writer
            .write_all(text.as_bytes())
            .map_err(CliError::WriteOutput),
    }
}
