//! Overpass QL generation for water-source lookups.

use agrisite_core::Region;

/// Element selectors for every tag combination that maps to a water source.
const SELECTORS: [&str; 9] = [
    r#"way["waterway"="river"]"#,
    r#"way["waterway"="stream"]"#,
    r#"relation["waterway"="river"]"#,
    r#"way["natural"="water"]"#,
    r#"way["water"="lake"]"#,
    r#"way["water"="reservoir"]"#,
    r#"relation["natural"="water"]"#,
    r#"way["waterway"="dam"]"#,
    r#"node["man_made"="water_well"]"#,
];

/// Render the Overpass `(south,west,north,east)` filter for `region`.
#[must_use]
pub fn bbox_filter(region: &Region) -> String {
    let bounds = region.bounds();
    format!(
        "({},{},{},{})",
        bounds.min().y,
        bounds.min().x,
        bounds.max().y,
        bounds.max().x
    )
}

/// Build the query for all water features inside `region`.
///
/// `out center;` asks the server to emit a centre point for ways and
/// relations so every element carries one coordinate.
#[must_use]
pub fn build_query(region: &Region, query_timeout_secs: u64) -> String {
    let bbox = bbox_filter(region);
    let mut query = format!("[out:json][timeout:{query_timeout_secs}];\n(\n");
    for selector in SELECTORS {
        query.push_str(&format!("  {selector}{bbox};\n"));
    }
    query.push_str(");\nout center;\n");
    query
}
