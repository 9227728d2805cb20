use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::names::{self, NameParts};
use crate::roster;
use crate::types::{MergedRow, PersonRecord, Role, RosterEntry};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("chair \"{name}\" has no roster entry for {year}")]
    ChairNotInRoster { name: String, year: i32 },
    #[error("chair \"{name}\" matches several roster panels for {year}: {}", labels.join(", "))]
    AmbiguousChair {
        name: String,
        year: i32,
        labels: Vec<String>,
    },
    #[error("chairs of panel {panel_code} map to different roster panels for {year}: {}", labels.join(", "))]
    PanelLabelConflict {
        panel_code: String,
        year: i32,
        labels: Vec<String>,
    },
}

/// Join key for names coming from different sources.
pub fn normalize_name(name: &str) -> String {
    names::clean(name).to_lowercase()
}

/// Merge PDF-derived records with the roster rows of `call_year`.
///
/// Each chair's roster panel label is looked up once and applied to every
/// record on that chair's panel. Rows are joined to the roster by normalized
/// name, unmatched rows are kept and flagged, and the result is deduplicated
/// and sorted so repeated runs produce the same table.
pub fn reconcile(
    records: &[PersonRecord],
    roster_entries: &[RosterEntry],
    call_year: i32,
) -> Result<Vec<MergedRow>, ReconcileError> {
    let year_rows = roster::for_year(roster_entries, call_year);
    let mut by_name: HashMap<String, Vec<&RosterEntry>> = HashMap::new();
    for entry in year_rows {
        by_name
            .entry(normalize_name(&entry.full_name))
            .or_default()
            .push(entry);
    }

    let panel_labels = chair_panel_labels(records, &by_name, call_year)?;

    let mut rows = BTreeSet::new();
    for record in records {
        let parts = NameParts {
            given_name: record.given_name.clone(),
            family_name: record.family_name.clone(),
        };
        let name = parts.display();
        let label = panel_labels
            .get(record.panel.code.as_str())
            .cloned()
            .unwrap_or_else(|| record.panel.display_name.clone());
        let panel_code = panel_code_from_label(&label).unwrap_or_else(|| record.panel.code.clone());
        let base = MergedRow {
            year: call_year,
            domain: domain_prefix(&panel_code),
            panel_code,
            role: record.role,
            last_name: parts.family_name,
            first_name: parts.given_name,
            name,
            panel: label,
            funding_scheme: None,
            call: None,
            roster_match: false,
            continuous_member: false,
            topics: Vec::new(),
            affiliation: None,
        };

        match by_name.get(&normalize_name(&base.name)) {
            Some(matches) => {
                for entry in matches {
                    rows.insert(MergedRow {
                        funding_scheme: non_empty(&entry.funding_scheme),
                        roster_match: true,
                        ..base.clone()
                    });
                }
            }
            None => {
                rows.insert(base);
            }
        }
    }

    let mut rows: Vec<MergedRow> = rows.into_iter().collect();
    fill_funding_scheme(&mut rows);
    for row in &mut rows {
        split_combined_name(row);
        row.call = row
            .funding_scheme
            .as_ref()
            .map(|scheme| format!("{scheme} {}", row.year));
    }
    // Filling may make formerly distinct rows identical.
    rows.sort();
    rows.dedup();

    let unmatched = rows.iter().filter(|r| !r.roster_match).count();
    if unmatched > 0 {
        warn!(year = call_year, count = unmatched, "rows without a roster match");
    }
    debug!(year = call_year, rows = rows.len(), "reconciled");
    Ok(rows)
}

/// Panel code → roster label, looked up once per distinct chair.
fn chair_panel_labels(
    records: &[PersonRecord],
    by_name: &HashMap<String, Vec<&RosterEntry>>,
    call_year: i32,
) -> Result<HashMap<String, String>, ReconcileError> {
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut looked_up: HashMap<String, String> = HashMap::new();

    for chair in records.iter().filter(|r| r.role == Role::Chair) {
        let display = NameParts {
            given_name: chair.given_name.clone(),
            family_name: chair.family_name.clone(),
        }
        .display();
        let key = normalize_name(&display);
        let label = match looked_up.get(&key) {
            Some(label) => label.clone(),
            None => {
                let label = lookup_chair(&display, by_name.get(&key), call_year)?;
                looked_up.insert(key, label.clone());
                label
            }
        };
        match labels.get(&chair.panel.code) {
            Some(existing) if *existing != label => {
                return Err(ReconcileError::PanelLabelConflict {
                    panel_code: chair.panel.code.clone(),
                    year: call_year,
                    labels: vec![existing.clone(), label],
                });
            }
            Some(_) => {}
            None => {
                labels.insert(chair.panel.code.clone(), label);
            }
        }
    }
    Ok(labels)
}

fn lookup_chair(
    display: &str,
    matches: Option<&Vec<&RosterEntry>>,
    call_year: i32,
) -> Result<String, ReconcileError> {
    let distinct: BTreeSet<&str> = matches
        .into_iter()
        .flatten()
        .map(|e| e.review_panel_label.as_str())
        .collect();
    let mut iter = distinct.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(ReconcileError::ChairNotInRoster {
            name: display.to_string(),
            year: call_year,
        }),
        (Some(label), None) => Ok(label.to_string()),
        (Some(_), Some(_)) => Err(ReconcileError::AmbiguousChair {
            name: display.to_string(),
            year: call_year,
            labels: distinct.iter().map(|l| l.to_string()).collect(),
        }),
    }
}

/// Unmatched rows take the call's scheme when all matched rows agree on one.
fn fill_funding_scheme(rows: &mut [MergedRow]) {
    let schemes: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.funding_scheme.clone())
        .collect();
    if schemes.len() != 1 {
        return;
    }
    let scheme = schemes.into_iter().next();
    for row in rows.iter_mut().filter(|r| r.funding_scheme.is_none()) {
        row.funding_scheme = scheme.clone();
    }
}

/// "PE1 Mathematics" → "PE1"; "Mathematics (PE1)" → "PE1".
fn panel_code_from_label(label: &str) -> Option<String> {
    let first = label.split_whitespace().next()?;
    if is_panel_code(first) {
        return Some(first.to_string());
    }
    let inner = label.trim_end().strip_suffix(')')?.rsplit_once('(')?.1;
    is_panel_code(inner).then(|| inner.to_string())
}

fn is_panel_code(token: &str) -> bool {
    let letters = token.chars().take_while(|c| c.is_ascii_uppercase()).count();
    letters > 0
        && letters < token.len()
        && token[letters..].chars().all(|c| c.is_ascii_digit())
}

/// Leading non-digit prefix of a panel code: "PE10" → "PE".
pub fn domain_prefix(panel_code: &str) -> String {
    panel_code
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_string()
}

fn split_combined_name(row: &mut MergedRow) {
    if !row.first_name.is_empty() || !row.last_name.is_empty() {
        return;
    }
    match row.name.rsplit_once(' ') {
        Some((first, last)) => {
            row.first_name = first.to_string();
            row.last_name = last.to_string();
        }
        None => row.last_name = row.name.clone(),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
