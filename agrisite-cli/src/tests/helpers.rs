//! Test helpers for staging CLI inputs and stubbing the Overpass fetcher.

use agrisite_core::test_support::StubFetcher;
use agrisite_core::{Coordinate, FetchError, WaterSource, WaterSourceFetcher, WaterSourceKind};
use agrisite_data::OverpassConfig;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::CliError;
use crate::common::FetcherBuilder;

/// Field beside the fixture river, inside the Turkey preset.
pub(super) const FIELD: (f64, f64) = (38.62, 27.43);

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture file");
}

/// Temporary directory exposed as UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

/// `n` named streams spread eastward from the fixture field.
pub(super) fn streams(n: u32) -> Vec<WaterSource> {
    (0..n)
        .map(|i| {
            let lon = FIELD.1 + f64::from(i) * 0.01;
            WaterSource::new(
                Coordinate::new(FIELD.0, lon).expect("valid coordinate"),
                WaterSourceKind::Stream,
            )
            .with_name(format!("stream {i}"))
        })
        .collect()
}

/// Builds stub fetchers that either serve fixed sources or fail.
#[derive(Debug, Clone)]
pub(super) enum StubFetcherBuilder {
    Serving(Vec<WaterSource>),
    Failing,
}

impl FetcherBuilder for StubFetcherBuilder {
    fn build(&self, _config: &OverpassConfig) -> Result<Box<dyn WaterSourceFetcher>, CliError> {
        let fetcher = match self {
            Self::Serving(sources) => StubFetcher::with_sources(sources.clone()),
            Self::Failing => StubFetcher::with_error(FetchError::NetworkError {
                url: "http://overpass.invalid/api/interpreter".to_owned(),
                message: "connection refused".to_owned(),
            }),
        };
        Ok(Box::new(fetcher))
    }
}
