use chrono::NaiveDate;
use once_cell::unsync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{self, ChairMarker, LineKind, MetadataLine, PAGE_LOCATOR_RE};
use crate::kb;
use crate::names::{self, NameOrder};
use crate::registry::PanelRegistry;
use crate::types::{DocumentMetadata, Layout, PanelDescriptor, PersonRecord, Role};

const CHAIR_SUFFIX: &str = "(Panel Chair)";

/// Everything recovered from one document.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<PersonRecord>,
    pub metadata: DocumentMetadata,
    pub report: ExtractionReport,
}

/// Counts of what the parser kept, dropped and skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub layout: Option<Layout>,
    pub domains_seen: usize,
    pub panels_declared: usize,
    pub records_emitted: usize,
    /// Person lines with no panel left to assign.
    pub dropped_unassigned: usize,
    /// Page furniture and title fragments removed after emission.
    pub filtered_artifacts: usize,
    /// Member lines ignored by the chair-list strategy.
    pub skipped_lines: usize,
}

/// Set-if-absent cells: the first value written to each field sticks.
#[derive(Default)]
struct MetadataCells {
    call_year: OnceCell<i32>,
    release_date: OnceCell<NaiveDate>,
    funding_scheme: OnceCell<String>,
}

impl MetadataCells {
    fn absorb(&self, line: &MetadataLine) {
        if let Some(year) = line.call_year {
            let _ = self.call_year.set(year);
        }
        if let Some(date) = line.release_date {
            let _ = self.release_date.set(date);
        }
        if let Some(scheme) = &line.funding_scheme {
            let _ = self.funding_scheme.set(scheme.clone());
        }
    }

    fn into_metadata(self) -> DocumentMetadata {
        DocumentMetadata {
            call_year: self.call_year.into_inner(),
            release_date: self.release_date.into_inner(),
            funding_scheme: self.funding_scheme.into_inner(),
        }
    }
}

/// Output of the declaration scan.
struct Declarations {
    registry: PanelRegistry,
    metadata: DocumentMetadata,
    domains_seen: usize,
}

/// Parse a document's text lines into person records.
///
/// `layout` of `None` detects the layout from the chair marker in use.
pub fn extract(lines: &[String], layout: Option<Layout>) -> Extraction {
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let classified: Vec<LineKind> = lines.iter().map(|l| classify::classify_line(l)).collect();
    let layout = layout.unwrap_or_else(|| detect_layout(&lines));

    let decl = scan_declarations(&classified);
    let mut report = ExtractionReport {
        layout: Some(layout),
        domains_seen: decl.domains_seen,
        panels_declared: decl.registry.len(),
        ..ExtractionReport::default()
    };

    if decl.domains_seen == 0 {
        warn!("no domain headers found; document has no usable structure");
        return Extraction { report, ..Extraction::default() };
    }
    if decl.registry.is_empty() {
        warn!("domain headers found but no panel headers; no records can be assigned");
    }
    debug!(
        panels = decl.registry.len(),
        call_year = ?decl.metadata.call_year,
        release_date = ?decl.metadata.release_date,
        "declarations scanned"
    );

    let records = match layout {
        Layout::ChairList => assign_by_position(&classified, &decl, &mut report),
        Layout::MemberList => assign_by_queue(&classified, &decl, &mut report),
    };
    let records = post_filter(records, layout, &mut report);
    report.records_emitted = records.len();
    log_report(&report);

    Extraction {
        records,
        metadata: decl.metadata,
        report,
    }
}

/// Member lists mark chairs with a trailing "(Panel Chair)".
pub fn detect_layout(lines: &[&str]) -> Layout {
    if lines.iter().any(|l| l.trim_end().ends_with(CHAIR_SUFFIX)) {
        Layout::MemberList
    } else {
        Layout::ChairList
    }
}

/// First pass: panels, metadata and domain count. Emits no records.
fn scan_declarations(classified: &[LineKind]) -> Declarations {
    let mut registry = PanelRegistry::new();
    let cells = MetadataCells::default();
    let mut in_domain = false;
    let mut domains_seen = 0;

    for (idx, kind) in classified.iter().enumerate() {
        match kind {
            LineKind::DomainHeader(_) => {
                in_domain = true;
                domains_seen += 1;
            }
            LineKind::PanelHeader(headings) if in_domain => {
                for heading in headings {
                    registry.register(heading.clone(), idx);
                }
            }
            LineKind::Metadata(meta) => cells.absorb(meta),
            _ => {}
        }
    }

    Declarations {
        registry,
        metadata: cells.into_metadata(),
        domains_seen,
    }
}

/// Chair lists: the i-th chair line takes the i-th declared panel.
fn assign_by_position(
    classified: &[LineKind],
    decl: &Declarations,
    report: &mut ExtractionReport,
) -> Vec<PersonRecord> {
    let mut cursor = decl.registry.cursor();
    let mut in_domain = false;
    let mut records = Vec::new();

    for kind in classified {
        match kind {
            LineKind::DomainHeader(_) => in_domain = true,
            LineKind::Chair(raw, _) if in_domain => match cursor.claim_next() {
                Some(panel) => records.push(make_record(
                    raw,
                    panel,
                    Role::Chair,
                    NameOrder::SurnameFirst,
                    &decl.metadata,
                )),
                None => {
                    debug!(name = raw.as_str(), "chair line with no panel left");
                    report.dropped_unassigned += 1;
                }
            },
            LineKind::Member(_) if in_domain => report.skipped_lines += 1,
            _ => {}
        }
    }
    if cursor.remaining() > 0 {
        debug!(unclaimed = cursor.remaining(), "panels left without a chair line");
    }
    records
}

/// Member lists: chair lines dequeue the oldest declared subdomain; member
/// lines join the subdomain most recently claimed.
fn assign_by_queue(
    classified: &[LineKind],
    decl: &Declarations,
    report: &mut ExtractionReport,
) -> Vec<PersonRecord> {
    let chairless = !classified
        .iter()
        .any(|k| matches!(k, LineKind::Chair(_, ChairMarker::Suffix)));
    let mut queue = decl.registry.queue();
    let mut in_domain = false;
    let mut records = Vec::new();

    for (idx, kind) in classified.iter().enumerate() {
        let (raw, role) = match kind {
            LineKind::DomainHeader(_) => {
                in_domain = true;
                continue;
            }
            LineKind::Chair(raw, ChairMarker::Suffix) if in_domain => (raw, Role::Chair),
            // Only the suffix marks chairs here; "Prof." is a title.
            LineKind::Chair(raw, ChairMarker::Prefix) | LineKind::Member(raw) if in_domain => {
                (raw, Role::Member)
            }
            _ => continue,
        };

        let panel = match role {
            Role::Chair => {
                let claimed = queue.dequeue_declared_before(idx);
                if claimed.is_none() {
                    queue.reset_current();
                }
                claimed
            }
            Role::Member if chairless || queue.current().is_none() => queue.catch_up(idx),
            Role::Member => queue.current(),
        };

        match panel {
            Some(panel) => records.push(make_record(
                raw,
                panel,
                role,
                NameOrder::GivenFirst,
                &decl.metadata,
            )),
            None => {
                debug!(name = raw.as_str(), ?role, "person line with no subdomain");
                report.dropped_unassigned += 1;
            }
        }
    }
    if queue.remaining() > 0 {
        debug!(unclaimed = queue.remaining(), "subdomains never claimed");
    }
    records
}

fn make_record(
    raw: &str,
    panel: &PanelDescriptor,
    role: Role,
    order: NameOrder,
    metadata: &DocumentMetadata,
) -> PersonRecord {
    let parts = names::split(raw, order);
    PersonRecord {
        given_name: parts.given_name,
        family_name: parts.family_name,
        full_name: raw.trim().to_string(),
        panel: panel.clone(),
        role,
        call_year: metadata.call_year,
    }
}

/// Drop records that are page furniture caught between page breaks.
fn post_filter(
    records: Vec<PersonRecord>,
    layout: Layout,
    report: &mut ExtractionReport,
) -> Vec<PersonRecord> {
    let before = records.len();
    let kept: Vec<PersonRecord> = records
        .into_iter()
        .filter(|r| !is_artifact(r, layout))
        .collect();
    report.filtered_artifacts += before - kept.len();
    kept
}

fn is_artifact(record: &PersonRecord, layout: Layout) -> bool {
    let name = record.full_name.as_str();
    if name.to_uppercase().contains("ERC-") || PAGE_LOCATOR_RE.is_match(name) {
        return true;
    }
    // Wrapped subdomain titles spill into member lists as pseudo-names.
    layout == Layout::MemberList
        && record.role == Role::Member
        && (name.ends_with(')') || kb::contains_title_fragment(name))
}

fn log_report(report: &ExtractionReport) {
    info!(
        layout = ?report.layout,
        panels = report.panels_declared,
        records = report.records_emitted,
        "extraction finished"
    );
    if report.dropped_unassigned > 0 {
        warn!(count = report.dropped_unassigned, "person lines dropped without a panel");
    }
    if report.filtered_artifacts > 0 {
        warn!(count = report.filtered_artifacts, "page artifacts removed from names");
    }
}
