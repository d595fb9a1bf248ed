//! Water sources collected for a region.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// Category of a water source.
///
/// # Examples
/// ```
/// use agrisite_core::WaterSourceKind;
///
/// assert_eq!(WaterSourceKind::Reservoir.as_str(), "reservoir");
/// assert_eq!("Lake".parse::<WaterSourceKind>(), Ok(WaterSourceKind::Lake));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterSourceKind {
    /// Flowing river.
    River,
    /// Smaller watercourse.
    Stream,
    /// Natural lake or generic standing water.
    Lake,
    /// Artificial reservoir.
    Reservoir,
    /// Dam structure.
    Dam,
    /// Ground water well.
    Well,
}

impl WaterSourceKind {
    /// Return the tag as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::River => "river",
            Self::Stream => "stream",
            Self::Lake => "lake",
            Self::Reservoir => "reservoir",
            Self::Dam => "dam",
            Self::Well => "well",
        }
    }
}

impl fmt::Display for WaterSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaterSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "river" => Ok(Self::River),
            "stream" => Ok(Self::Stream),
            "lake" => Ok(Self::Lake),
            "reservoir" => Ok(Self::Reservoir),
            "dam" => Ok(Self::Dam),
            "well" => Ok(Self::Well),
            _ => Err(format!("unknown water source tag '{s}'")),
        }
    }
}

/// A located water source with its tag and optional display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterSource {
    /// Representative position (element centre for areas and lines).
    pub location: Coordinate,
    /// Source category.
    pub kind: WaterSourceKind,
    /// Name reported by the upstream data set, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WaterSource {
    /// Construct an unnamed source.
    #[must_use]
    pub const fn new(location: Coordinate, kind: WaterSourceKind) -> Self {
        Self {
            location,
            kind,
            name: None,
        }
    }

    /// Attach a display name, ignoring blank values.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let label = name.into();
        self.name = if label.trim().is_empty() {
            None
        } else {
            Some(label)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(WaterSourceKind::River)]
    #[case(WaterSourceKind::Well)]
    #[case(WaterSourceKind::Dam)]
    fn display_parses_back(#[case] kind: WaterSourceKind) {
        assert_eq!(kind.to_string().parse::<WaterSourceKind>(), Ok(kind));
    }

    #[rstest]
    fn parsing_rejects_unknown_tags() {
        assert!("puddle".parse::<WaterSourceKind>().is_err());
    }

    #[rstest]
    fn blank_names_are_dropped() {
        let at = Coordinate::new(38.0, 27.0).expect("valid");
        let source = WaterSource::new(at, WaterSourceKind::Lake).with_name("  ");
        assert!(source.name.is_none());
        let named = WaterSource::new(at, WaterSourceKind::Lake).with_name("Bafa");
        assert_eq!(named.name.as_deref(), Some("Bafa"));
    }
}
