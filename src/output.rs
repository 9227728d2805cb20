use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

/// Write rows to `output`, or to stdout when no path is given.
pub fn emit<T: Serialize>(
    rows: &[T],
    format: OutputFormat,
    pretty: bool,
    output: Option<&Path>,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            write_rows(rows, format, pretty, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            write_rows(rows, format, pretty, &mut stdout.lock())?;
        }
    }
    Ok(())
}

pub fn write_rows<T: Serialize, W: Write>(
    rows: &[T],
    format: OutputFormat,
    pretty: bool,
    writer: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = if pretty {
                serde_json::to_string_pretty(rows)?
            } else {
                serde_json::to_string(rows)?
            };
            writeln!(writer, "{json}")?;
        }
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for row in rows {
                csv_writer.serialize(row).context("Failed to write CSV row")?;
            }
            csv_writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MergedRow, Role};

    fn rows() -> Vec<MergedRow> {
        vec![MergedRow {
            year: 2024,
            panel_code: "LS1".into(),
            role: Role::Chair,
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            name: "Jane Doe".into(),
            panel: "LS1 Molecular Biology".into(),
            domain: "LS".into(),
            funding_scheme: Some("StG".into()),
            call: Some("StG 2024".into()),
            roster_match: true,
            continuous_member: false,
            topics: vec!["Proteomics".into(), "Cell Biology".into()],
            affiliation: None,
        }]
    }

    #[test]
    fn csv_has_header_and_flat_topics() {
        let mut buf = Vec::new();
        write_rows(&rows(), OutputFormat::Csv, false, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("year,panel_code,role,last_name"));
        let row = lines.next().unwrap();
        assert!(row.contains("chair"));
        assert!(row.contains("Proteomics; Cell Biology"));
        assert!(row.ends_with(','));
    }

    #[test]
    fn json_is_a_single_line_unless_pretty() {
        let mut compact = Vec::new();
        write_rows(&rows(), OutputFormat::Json, false, &mut compact).unwrap();
        assert_eq!(String::from_utf8(compact).unwrap().lines().count(), 1);

        let mut pretty = Vec::new();
        write_rows(&rows(), OutputFormat::Json, true, &mut pretty).unwrap();
        assert!(String::from_utf8(pretty).unwrap().lines().count() > 1);
    }

    #[test]
    fn emit_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        emit(&rows(), OutputFormat::Csv, false, Some(&path)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
