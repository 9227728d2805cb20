use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::kb;
use crate::types::Domain;

/// Chair-list panel header: "PE1 Mathematics".
static PANEL_CODE_FIRST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(PE|LS|SH)(\d+)\s+(.+)$").unwrap());

/// Member-list subdomain label: "Mathematics (PE1)". Several may share a line.
static PANEL_CODE_LAST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z ,:'\-&]+?\(((?:PE|LS|SH)\d+)\))").unwrap());

static RELEASE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Release date:\s*(\d{2}/\d{2}/\d{4})").unwrap());

/// "ERC-2024" with an optional scheme suffix: "ERC-2024-AdG".
static ERC_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ERC-(\d{4})(?:-([A-Za-z]{2,4})\b)?").unwrap());

/// Banner form: "ERC Starting Grant 2026".
static CALL_BANNER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Starting|Consolidator|Advanced|Synergy|Proof of Concept)\s+Grants?\s+((?:19|20)\d{2})\b")
        .unwrap()
});

/// Page locator footer: "p.8/8", "p. 3/12".
pub static PAGE_LOCATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)p\.\s*\d+/\d+").unwrap());

const CHAIR_SUFFIX: &str = "(Panel Chair)";
const CHAIR_PREFIX: &str = "Prof.";

/// A panel declared by a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelHeading {
    pub code: String,
    pub display_name: String,
    pub domain: Domain,
}

/// Metadata found on a single line. Any subset of fields may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataLine {
    pub call_year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub funding_scheme: Option<String>,
}

impl MetadataLine {
    fn is_empty(&self) -> bool {
        self.call_year.is_none() && self.release_date.is_none() && self.funding_scheme.is_none()
    }
}

/// Classification of one extracted text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    DomainHeader(Domain),
    PanelHeader(Vec<PanelHeading>),
    Metadata(MetadataLine),
    Noise,
    Chair(String, ChairMarker),
    Member(String),
}

/// How a chair line was marked. Only member lists use the suffix; a "Prof."
/// prefix there is just a title on a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChairMarker {
    /// "Sara van de Geer (Panel Chair)"
    Suffix,
    /// "Prof. Jane Doe"
    Prefix,
}

/// Classify a trimmed, non-empty line. Rules apply in precedence order.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if let Some(domain) = kb::match_domain(line) {
        return LineKind::DomainHeader(domain);
    }
    if let Some(heading) = match_code_first_header(line) {
        return LineKind::PanelHeader(vec![heading]);
    }
    let headings = match_code_last_headers(line);
    if !headings.is_empty() {
        return LineKind::PanelHeader(headings);
    }
    let meta = match_metadata(line);
    if !meta.is_empty() {
        return LineKind::Metadata(meta);
    }
    if is_noise(line) {
        return LineKind::Noise;
    }
    if let Some(name) = line.strip_suffix(CHAIR_SUFFIX) {
        return LineKind::Chair(name.trim().to_string(), ChairMarker::Suffix);
    }
    if let Some(name) = line.strip_prefix(CHAIR_PREFIX) {
        return LineKind::Chair(name.trim().to_string(), ChairMarker::Prefix);
    }
    LineKind::Member(line.to_string())
}

fn match_code_first_header(line: &str) -> Option<PanelHeading> {
    let caps = PANEL_CODE_FIRST_RE.captures(line)?;
    let code = format!("{}{}", &caps[1], &caps[2]);
    let name = caps[3].trim();
    Some(PanelHeading {
        domain: Domain::from_code(&code)?,
        display_name: format!("{name} ({code})"),
        code,
    })
}

fn match_code_last_headers(line: &str) -> Vec<PanelHeading> {
    PANEL_CODE_LAST_RE
        .captures_iter(line)
        .filter_map(|caps| {
            let label = caps[1].trim().trim_start_matches([',', ':', '-', '&', ' ']);
            let code = caps[2].to_string();
            // "(PE1)" alone carries no title.
            if label.len() <= code.len() + 2 {
                return None;
            }
            Some(PanelHeading {
                domain: Domain::from_code(&code)?,
                display_name: label.to_string(),
                code,
            })
        })
        .collect()
}

fn match_metadata(line: &str) -> MetadataLine {
    let mut meta = MetadataLine {
        release_date: RELEASE_DATE_RE
            .captures(line)
            .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y").ok()),
        ..MetadataLine::default()
    };
    if let Some(caps) = ERC_CALL_RE.captures(line) {
        meta.call_year = caps[1].parse().ok();
        meta.funding_scheme = caps.get(2).map(|m| m.as_str().to_string());
    } else if let Some(caps) = CALL_BANNER_RE.captures(line) {
        meta.call_year = caps[2].parse().ok();
        meta.funding_scheme = scheme_abbreviation(&caps[1]).map(str::to_string);
    }
    meta
}

fn scheme_abbreviation(kind: &str) -> Option<&'static str> {
    match kind.to_lowercase().as_str() {
        "starting" => Some("StG"),
        "consolidator" => Some("CoG"),
        "advanced" => Some("AdG"),
        "synergy" => Some("SyG"),
        "proof of concept" => Some("PoC"),
        _ => None,
    }
}

fn is_noise(line: &str) -> bool {
    if kb::is_boilerplate(line) {
        return true;
    }
    if PAGE_LOCATOR_RE.find(line).is_some_and(|m| m.as_str().len() == line.len()) {
        return true;
    }
    // Bare page numbers
    line.chars().all(|c| c.is_ascii_digit() || c == '/' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_phrase_inside_a_panel_title_is_not_a_banner() {
        let LineKind::PanelHeader(headings) = classify_line(
            "LS9 Applied Life Sciences, Biotechnology, and Molecular and Biosystems Engineering",
        ) else {
            panic!("expected panel header");
        };
        assert_eq!(headings[0].code, "LS9");

        let LineKind::PanelHeader(headings) = classify_line(
            "Applied Life Sciences, Biotechnology, and Molecular and Biosystems Engineering (LS9)",
        ) else {
            panic!("expected panel header");
        };
        assert_eq!(headings[0].code, "LS9");
    }

    #[test]
    fn domain_banner_beats_everything() {
        assert_eq!(
            classify_line("PHYSICAL SCIENCES AND ENGINEERING"),
            LineKind::DomainHeader(Domain::PE)
        );
        assert_eq!(
            classify_line("SOCIAL SCIENCES & HUMANITIES"),
            LineKind::DomainHeader(Domain::SH)
        );
    }

    #[test]
    fn code_first_panel_header() {
        let LineKind::PanelHeader(headings) = classify_line("PE1 Mathematics") else {
            panic!("expected panel header");
        };
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].code, "PE1");
        assert_eq!(headings[0].display_name, "Mathematics (PE1)");
        assert_eq!(headings[0].domain, Domain::PE);
    }

    #[test]
    fn code_last_headers_can_share_a_line() {
        let LineKind::PanelHeader(headings) =
            classify_line("Mathematics (PE1) Fundamental Constituents of Matter (PE2)")
        else {
            panic!("expected panel header");
        };
        let labels: Vec<&str> = headings.iter().map(|h| h.display_name.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Mathematics (PE1)", "Fundamental Constituents of Matter (PE2)"]
        );
    }

    #[test]
    fn release_date_and_call_on_one_footer() {
        let kind = classify_line("ERC-2024-AdG Panel Members List – Release date: 18/09/2025 – p.8/8");
        let LineKind::Metadata(meta) = kind else {
            panic!("expected metadata, got {kind:?}");
        };
        assert_eq!(meta.call_year, Some(2024));
        assert_eq!(meta.funding_scheme.as_deref(), Some("AdG"));
        assert_eq!(meta.release_date, NaiveDate::from_ymd_opt(2025, 9, 18));
    }

    #[test]
    fn call_banner_yields_year_and_scheme() {
        let LineKind::Metadata(meta) = classify_line("ERC Starting Grant 2026 Panel Chairs") else {
            panic!("expected metadata");
        };
        assert_eq!(meta.call_year, Some(2026));
        assert_eq!(meta.funding_scheme.as_deref(), Some("StG"));
    }

    #[test]
    fn boilerplate_and_page_furniture_are_noise() {
        assert_eq!(classify_line("Helpdesk: erc-helpdesk@ec.europa.eu"), LineKind::Noise);
        assert_eq!(classify_line("p.3/8"), LineKind::Noise);
        assert_eq!(classify_line("12"), LineKind::Noise);
    }

    #[test]
    fn chair_markers() {
        assert_eq!(
            classify_line("Sara van de Geer (Panel Chair)"),
            LineKind::Chair("Sara van de Geer".into(), ChairMarker::Suffix)
        );
        assert_eq!(
            classify_line("Prof. Jane Doe"),
            LineKind::Chair("Jane Doe".into(), ChairMarker::Prefix)
        );
    }

    #[test]
    fn everything_else_is_a_member() {
        assert_eq!(
            classify_line("Elisabeth Bouscaren"),
            LineKind::Member("Elisabeth Bouscaren".into())
        );
    }
}
