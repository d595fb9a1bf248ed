//! CSV loading of candidate sites.
//!
//! Headers are matched case-insensitively against a fixed alias table, so
//! exports from different tools (`lat` or `latitude`, `ph` or `soil_ph`)
//! load without renaming. Only the coordinate columns are mandatory. A row
//! that cannot become a [`Candidate`] is returned as a [`MalformedCandidate`]
//! so the batch can count it instead of aborting.

use std::io::Read;

use agrisite_core::{
    Candidate, CandidateAttributes, CandidateInput, Coordinate, MalformedCandidate,
};
use agrisite_fs::open_utf8_file;
use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::info;
use thiserror::Error;

/// Errors that prevent the candidate file from being read at all.
#[derive(Debug, Error)]
pub enum CandidateLoadError {
    /// The file could not be opened.
    #[error("failed to open candidate file {path}")]
    Io {
        /// Candidate file path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: std::io::Error,
    },
    /// The CSV stream failed below the record level.
    #[error("failed to read candidate CSV")]
    Csv {
        /// Source error from the `csv` crate.
        #[source]
        source: csv::Error,
    },
    /// No latitude or longitude column was found.
    #[error("candidate CSV needs latitude and longitude columns; found [{}]", found.join(", "))]
    MissingCoordinateColumns {
        /// Header names present in the file.
        found: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Lat,
    Lon,
    Elevation,
    Slope,
    SoilPh,
    Precipitation,
    Sunshine,
    Landcover,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().as_str() {
            "lat" | "latitude" => Some(Self::Lat),
            "lon" | "lng" | "longitude" => Some(Self::Lon),
            "elevation" | "elevation_m" => Some(Self::Elevation),
            "slope" | "slope_deg" => Some(Self::Slope),
            "soil_ph" | "ph" => Some(Self::SoilPh),
            "precipitation" | "annual_precipitation_mm" => Some(Self::Precipitation),
            "sunshine" | "sunshine_hours" => Some(Self::Sunshine),
            "landcover" | "landcover_type" | "type" => Some(Self::Landcover),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Lat => "lat",
            Self::Lon => "lon",
            Self::Elevation => "elevation",
            Self::Slope => "slope",
            Self::SoilPh => "soil_ph",
            Self::Precipitation => "precipitation",
            Self::Sunshine => "sunshine",
            Self::Landcover => "landcover",
        }
    }
}

/// Header positions resolved once per file. The first matching header wins.
#[derive(Debug, Default)]
struct Layout {
    columns: Vec<(Column, usize)>,
}

impl Layout {
    fn from_headers(headers: &StringRecord) -> Result<Self, CandidateLoadError> {
        let mut layout = Self::default();
        for (position, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header)
                && layout.position(column).is_none()
            {
                layout.columns.push((column, position));
            }
        }
        if layout.position(Column::Lat).is_none() || layout.position(Column::Lon).is_none() {
            return Err(CandidateLoadError::MissingCoordinateColumns {
                found: headers.iter().map(str::to_owned).collect(),
            });
        }
        Ok(layout)
    }

    fn position(&self, column: Column) -> Option<usize> {
        self.columns
            .iter()
            .find(|(known, _)| *known == column)
            .map(|(_, position)| *position)
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.position(column)
            .and_then(|position| record.get(position))
            .filter(|value| !value.is_empty())
    }

    fn number(&self, record: &StringRecord, column: Column) -> Result<Option<f64>, String> {
        let Some(text) = self.cell(record, column) else {
            return Ok(None);
        };
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(format!(
                "column '{}' value '{text}' is not a finite number",
                column.name()
            )),
        }
    }

    fn candidate(&self, record: &StringRecord) -> Result<Candidate, String> {
        let lat = self.number(record, Column::Lat)?.ok_or("latitude is missing")?;
        let lon = self.number(record, Column::Lon)?.ok_or("longitude is missing")?;
        let coordinate = Coordinate::new(lat, lon).map_err(|err| err.to_string())?;
        let attributes = CandidateAttributes {
            elevation_m: self.number(record, Column::Elevation)?,
            slope_deg: self.number(record, Column::Slope)?,
            soil_ph: self.number(record, Column::SoilPh)?,
            annual_precipitation_mm: self.number(record, Column::Precipitation)?,
            sunshine_hours: self.number(record, Column::Sunshine)?,
            landcover: self.cell(record, Column::Landcover).map(str::to_owned),
        };
        Ok(Candidate::new(coordinate, attributes))
    }
}

/// Read candidates from CSV text with a header row.
///
/// Rows are numbered from one, excluding the header.
///
/// # Errors
/// Returns [`CandidateLoadError::MissingCoordinateColumns`] when the header
/// lacks a coordinate column and [`CandidateLoadError::Csv`] when the
/// underlying reader fails.
pub fn read_candidates<R: Read>(input: R) -> Result<Vec<CandidateInput>, CandidateLoadError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);
    let headers = reader
        .headers()
        .map_err(|source| CandidateLoadError::Csv { source })?
        .clone();
    let layout = Layout::from_headers(&headers)?;

    let mut candidates = Vec::new();
    let mut record = StringRecord::new();
    let mut number = 0_u64;
    loop {
        number += 1;
        let parsed = match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => layout.candidate(&record),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                return Err(CandidateLoadError::Csv { source: err });
            }
            Err(err) => Err(err.to_string()),
        };
        candidates.push(parsed.map_err(|reason| MalformedCandidate {
            record: number,
            reason,
        }));
    }
    Ok(candidates)
}

/// Open `path` and read its candidates.
///
/// # Errors
/// Returns [`CandidateLoadError::Io`] when the file cannot be opened, or
/// any error of [`read_candidates`].
pub fn load_candidates(path: &Utf8Path) -> Result<Vec<CandidateInput>, CandidateLoadError> {
    let file = open_utf8_file(path).map_err(|source| CandidateLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candidates = read_candidates(file)?;
    let malformed = candidates.iter().filter(|input| input.is_err()).count();
    info!(
        "loaded {} candidate rows from {path} ({malformed} malformed)",
        candidates.len()
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn parse(text: &str) -> Vec<CandidateInput> {
        read_candidates(text.as_bytes()).expect("csv should load")
    }

    #[rstest]
    fn reads_aliased_columns() {
        let rows = parse(
            "Latitude,LNG,elevation_m,Slope,pH,precipitation,sunshine_hours,type\n\
             38.5, 27.1, 120, 2.5, 6.8, 550, 2600, Orchard\n",
        );

        let [Ok(candidate)] = rows.as_slice() else {
            panic!("expected one candidate, got {rows:?}");
        };
        assert_eq!(candidate.coordinate, Coordinate::new(38.5, 27.1).expect("valid"));
        assert_eq!(candidate.attributes.elevation_m, Some(120.0));
        assert_eq!(candidate.attributes.slope_deg, Some(2.5));
        assert_eq!(candidate.attributes.soil_ph, Some(6.8));
        assert_eq!(candidate.attributes.annual_precipitation_mm, Some(550.0));
        assert_eq!(candidate.attributes.sunshine_hours, Some(2600.0));
        assert_eq!(candidate.attributes.landcover.as_deref(), Some("Orchard"));
    }

    #[rstest]
    fn empty_and_missing_cells_are_absent() {
        let rows = parse("lat,lon,soil_ph,landcover\n38.5,27.1,,\n39.0,28.0\n");

        assert_eq!(rows.len(), 2);
        for row in &rows {
            let candidate = row.as_ref().expect("coordinates are present");
            assert_eq!(candidate.attributes, CandidateAttributes::default());
        }
    }

    #[rstest]
    #[case("lat,lon\n,27.1\n", "latitude is missing")]
    #[case("lat,lon\n95.0,27.1\n", "latitude")]
    #[case("lat,lon,slope\n38.0,27.1,steep\n", "column 'slope' value 'steep'")]
    #[case("lat,lon,ph\n38.0,27.1,NaN\n", "column 'soil_ph'")]
    fn bad_rows_are_malformed(#[case] text: &str, #[case] fragment: &str) {
        let rows = parse(text);

        let [Err(malformed)] = rows.as_slice() else {
            panic!("expected one malformed row, got {rows:?}");
        };
        assert_eq!(malformed.record, 1);
        assert!(
            malformed.reason.contains(fragment),
            "reason '{}' should mention '{fragment}'",
            malformed.reason
        );
    }

    #[rstest]
    fn malformed_rows_keep_their_position() {
        let rows = parse("lat,lon\n38.0,27.0\nx,27.0\n39.0,28.0\n");

        assert_eq!(rows.len(), 3);
        assert!(rows.first().is_some_and(Result::is_ok));
        assert!(matches!(rows.get(1), Some(Err(MalformedCandidate { record: 2, .. }))));
        assert!(rows.get(2).is_some_and(Result::is_ok));
    }

    #[rstest]
    fn missing_coordinate_columns_fail_the_load() {
        let err = read_candidates("latitude,elevation\n38.0,100\n".as_bytes())
            .expect_err("no longitude column");

        let CandidateLoadError::MissingCoordinateColumns { found } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(found, vec!["latitude".to_owned(), "elevation".to_owned()]);
    }

    #[rstest]
    fn loads_from_disk() {
        let dir = TempDir::new().expect("create temporary directory");
        let path =
            Utf8PathBuf::from_path_buf(dir.path().join("sites.csv")).expect("utf8 path");
        std::fs::write(path.as_std_path(), "lat,lon\n38.0,27.0\n").expect("write csv");

        let rows = load_candidates(&path).expect("load");

        assert_eq!(rows.len(), 1);
    }

    #[rstest]
    fn missing_file_is_io_error() {
        let err = load_candidates(Utf8Path::new("/nonexistent/agrisite/sites.csv"))
            .expect_err("absent file");

        assert!(matches!(err, CandidateLoadError::Io { .. }));
    }
}
