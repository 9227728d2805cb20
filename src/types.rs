use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Top-level scientific area a panel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Domain {
    PE,
    LS,
    SH,
}

impl Domain {
    /// Parse the leading letters of a panel code: "PE1" → PE.
    pub fn from_code(code: &str) -> Option<Self> {
        let prefix: String = code
            .trim()
            .chars()
            .take_while(|c| !c.is_ascii_digit())
            .collect();
        match prefix.trim().to_ascii_uppercase().as_str() {
            "PE" => Some(Domain::PE),
            "LS" => Some(Domain::LS),
            "SH" => Some(Domain::SH),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::PE => "PE",
            Domain::LS => "LS",
            Domain::SH => "SH",
        }
    }
}

/// A panel discovered while scanning a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelDescriptor {
    /// Panel code, e.g. "PE1".
    pub code: String,
    /// Label as printed, e.g. "Mathematics (PE1)".
    pub display_name: String,
    pub domain: Domain,
    /// Index of the line that declared this panel.
    pub declared_at: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Chair,
    Member,
}

/// The two known panel-list layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layout {
    /// "PE1 Mathematics" headers followed by a block of "Prof. …" chairs.
    ChairList,
    /// "Mathematics (PE1)" headers, "… (Panel Chair)" lines, then members.
    MemberList,
}

/// One person listed on a panel in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub given_name: String,
    pub family_name: String,
    pub full_name: String,
    pub panel: PanelDescriptor,
    pub role: Role,
    pub call_year: Option<i32>,
}

/// Document-level facts. Each field keeps its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub call_year: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub funding_scheme: Option<String>,
}

/// A roster row exploded to a single year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub full_name: String,
    pub review_panel_label: String,
    pub year: i32,
    pub funding_scheme: String,
}

/// Flat form of a [`PersonRecord`] for JSON/CSV output.
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    pub domain: Domain,
    pub panel_code: String,
    pub panel: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: Role,
    pub year: Option<i32>,
}

impl From<&PersonRecord> for RecordRow {
    fn from(r: &PersonRecord) -> Self {
        RecordRow {
            domain: r.panel.domain,
            panel_code: r.panel.code.clone(),
            panel: r.panel.display_name.clone(),
            first_name: r.given_name.clone(),
            last_name: r.family_name.clone(),
            full_name: r.full_name.clone(),
            role: r.role,
            year: r.call_year,
        }
    }
}

/// One (person, role, year, panel) row of the reconciled table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MergedRow {
    pub year: i32,
    pub panel_code: String,
    pub role: Role,
    pub last_name: String,
    pub first_name: String,
    pub name: String,
    pub panel: String,
    pub domain: String,
    pub funding_scheme: Option<String>,
    pub call: Option<String>,
    pub roster_match: bool,
    pub continuous_member: bool,
    #[serde(serialize_with = "join_list")]
    pub topics: Vec<String>,
    pub affiliation: Option<String>,
}

/// Which provider supplied a profile's keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeywordSource {
    OpenAlexTopics,
    #[serde(rename = "ORCIDKeywords")]
    OrcidKeywords,
    ScrapedSkills,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedProfile {
    pub name: String,
    #[serde(serialize_with = "join_list")]
    pub topics: Vec<String>,
    pub affiliation: Option<String>,
    pub keyword_source: Option<KeywordSource>,
    pub orcid: Option<String>,
    pub biography: Option<String>,
    pub works_count: Option<usize>,
    #[serde(serialize_with = "join_list")]
    pub concepts: Vec<String>,
}

impl EnrichedProfile {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.affiliation.is_none()
    }
}

/// Lists are written as one "; "-joined cell so rows stay CSV-flat.
fn join_list<S: Serializer>(items: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&items.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_from_panel_code() {
        assert_eq!(Domain::from_code("PE1"), Some(Domain::PE));
        assert_eq!(Domain::from_code("sh12"), Some(Domain::SH));
        assert_eq!(Domain::from_code("LS"), Some(Domain::LS));
        assert_eq!(Domain::from_code("XY3"), None);
    }

    #[test]
    fn merged_row_topics_serialize_as_one_cell() {
        let row = MergedRow {
            year: 2024,
            panel_code: "PE1".into(),
            role: Role::Chair,
            last_name: "Doe".into(),
            first_name: "Jane".into(),
            name: "Jane Doe".into(),
            panel: "PE1 Mathematics".into(),
            domain: "PE".into(),
            funding_scheme: Some("AdG".into()),
            call: Some("AdG 2024".into()),
            roster_match: true,
            continuous_member: false,
            topics: vec!["Algebra".into(), "Topology".into()],
            affiliation: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["topics"], "Algebra; Topology");
        assert_eq!(json["role"], "chair");
    }
}
