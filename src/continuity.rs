use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::info;

use crate::reconcile::normalize_name;
use crate::types::MergedRow;

/// Consecutive years on a panel before a person counts as a continuous member.
pub const DEFAULT_RUN_LEN: usize = 4;

/// Flag rows whose person has served `run_len` or more consecutive years up to
/// and including the row's year. A missing year resets the run.
pub fn mark_continuous_members(rows: &mut [MergedRow], run_len: usize) {
    let mut years: HashMap<String, BTreeSet<i32>> = HashMap::new();
    for row in rows.iter() {
        years.entry(normalize_name(&row.name)).or_default().insert(row.year);
    }

    let mut flagged: HashSet<(String, i32)> = HashSet::new();
    for (name, served) in &years {
        let mut run = 0;
        let mut prev: Option<i32> = None;
        for &year in served {
            run = match prev {
                Some(p) if p + 1 == year => run + 1,
                _ => 1,
            };
            if run >= run_len {
                flagged.insert((name.clone(), year));
            }
            prev = Some(year);
        }
    }

    for row in rows.iter_mut() {
        row.continuous_member = flagged.contains(&(normalize_name(&row.name), row.year));
    }
    let people: HashSet<&String> = flagged.iter().map(|(n, _)| n).collect();
    info!(people = people.len(), rows = flagged.len(), "continuous members marked");
}
