use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::RosterEntry;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("failed to open roster {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed roster CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One spreadsheet row as exported; `year` may list several years.
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(alias = "Name", alias = "name", alias = "full_name")]
    name: String,
    #[serde(alias = "Review panel", alias = "panel")]
    review_panel: String,
    #[serde(alias = "Year", alias = "years")]
    year: String,
    #[serde(alias = "Funding scheme", alias = "scheme", default)]
    funding_scheme: String,
}

/// Load a roster CSV export and explode multi-year cells.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    let file = std::fs::File::open(path).map_err(|source| RosterError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let entries = read_roster(file)?;
    info!(path = %path.display(), rows = entries.len(), "roster loaded");
    Ok(entries)
}

pub fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for row in csv_reader.deserialize::<RosterRow>() {
        entries.extend(explode_row(row?));
    }
    Ok(entries)
}

/// One entry per valid 4-digit year in the row's year cell.
fn explode_row(row: RosterRow) -> Vec<RosterEntry> {
    let years = parse_years(&row.year);
    if years.is_empty() {
        debug!(name = row.name.as_str(), cell = row.year.as_str(), "roster row without a valid year");
    }
    years
        .into_iter()
        .map(|year| RosterEntry {
            full_name: row.name.trim().to_string(),
            review_panel_label: row.review_panel.trim().to_string(),
            year,
            funding_scheme: row.funding_scheme.trim().to_string(),
        })
        .collect()
}

/// "2021, 2022, 2023" → [2021, 2022, 2023]; anything not 4 digits is dropped.
pub fn parse_years(cell: &str) -> Vec<i32> {
    cell.split(',')
        .map(str::trim)
        .filter(|y| YEAR_RE.is_match(y))
        .filter_map(|y| y.parse().ok())
        .collect()
}

/// Roster rows for a single call year.
pub fn for_year(entries: &[RosterEntry], year: i32) -> Vec<&RosterEntry> {
    entries.iter().filter(|e| e.year == year).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
Name,review_panel,year,funding_scheme
 Jane Doe ,PE1 Mathematics,\"2021, 2022, 2023\",AdG
John Roe,PE2 Physics,2022,AdG
Ann Lee,LS1 Molecular Biology,n/a,StG
";

    #[test]
    fn multi_year_cells_are_exploded() {
        let entries = read_roster(ROSTER.as_bytes()).unwrap();
        let jane: Vec<i32> = entries
            .iter()
            .filter(|e| e.full_name == "Jane Doe")
            .map(|e| e.year)
            .collect();
        assert_eq!(jane, vec![2021, 2022, 2023]);
        // Ann's year cell has no valid year.
        assert!(entries.iter().all(|e| e.full_name != "Ann Lee"));
    }

    #[test]
    fn year_filter_keeps_exactly_one_exploded_row() {
        let entries = read_roster(ROSTER.as_bytes()).unwrap();
        let rows = for_year(&entries, 2022);
        let jane: Vec<_> = rows.iter().filter(|e| e.full_name == "Jane Doe").collect();
        assert_eq!(jane.len(), 1);
        assert_eq!(jane[0].review_panel_label, "PE1 Mathematics");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn parse_years_rejects_partial_values() {
        assert_eq!(parse_years("2019,20, 2020 ,abcd,12345"), vec![2019, 2020]);
        assert!(parse_years("").is_empty());
    }

    #[test]
    fn load_roster_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        std::fs::write(&path, ROSTER).unwrap();
        let entries = load_roster(&path).unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_roster(Path::new("/nonexistent/roster.csv")).unwrap_err();
        assert!(matches!(err, RosterError::Open { .. }));
    }
}
