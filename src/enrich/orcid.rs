use std::sync::Arc;

use serde::Deserialize;

use super::{HttpClient, LookupError, ProfileSource, Query, SourceHit, Throttle};

const RECORD_URL: &str = "https://pub.orcid.org/v3.0";

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    person: Option<Person>,
    #[serde(rename = "activities-summary", default)]
    activities: Option<Activities>,
}

#[derive(Deserialize)]
struct Person {
    #[serde(default)]
    biography: Option<Content>,
    #[serde(default)]
    keywords: Option<Keywords>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Keywords {
    #[serde(default)]
    keyword: Vec<Content>,
}

#[derive(Deserialize)]
struct Activities {
    #[serde(default)]
    employments: Option<Employments>,
    #[serde(default)]
    works: Option<Works>,
}

#[derive(Deserialize)]
struct Employments {
    #[serde(rename = "affiliation-group", default)]
    groups: Vec<EmploymentGroup>,
}

#[derive(Deserialize)]
struct EmploymentGroup {
    #[serde(default)]
    summaries: Vec<EmploymentSummaryWrapper>,
}

#[derive(Deserialize)]
struct EmploymentSummaryWrapper {
    #[serde(rename = "employment-summary")]
    summary: EmploymentSummary,
}

#[derive(Deserialize)]
struct EmploymentSummary {
    organization: Option<Organization>,
    #[serde(rename = "start-date", default)]
    start_date: Option<FuzzyDate>,
    #[serde(rename = "end-date", default)]
    end_date: Option<FuzzyDate>,
}

#[derive(Deserialize)]
struct Organization {
    name: Option<String>,
}

#[derive(Deserialize)]
struct FuzzyDate {
    #[serde(default)]
    year: Option<DateValue>,
}

#[derive(Deserialize)]
struct DateValue {
    value: Option<String>,
}

#[derive(Deserialize)]
struct Works {
    #[serde(default)]
    group: Vec<serde_json::Value>,
}

/// Public ORCID record lookup; needs the ORCID id from an earlier source.
pub struct OrcidSource {
    http: HttpClient,
    throttle: Arc<Throttle>,
}

impl OrcidSource {
    pub fn new(http: HttpClient, throttle: Arc<Throttle>) -> Self {
        Self { http, throttle }
    }
}

impl ProfileSource for OrcidSource {
    fn name(&self) -> &'static str {
        "orcid"
    }

    fn lookup(&self, query: Query<'_>) -> Result<Option<SourceHit>, LookupError> {
        let Some(orcid) = query.orcid else {
            return Ok(None);
        };
        let url = format!("{RECORD_URL}/{orcid}");
        self.throttle.wait();
        let Some(record) = self.http.get_json::<Record>(&url)? else {
            return Ok(None);
        };
        Ok(Some(record_hit(record, orcid)))
    }
}

fn record_hit(record: Record, orcid: &str) -> SourceHit {
    let (biography, topics) = match record.person {
        Some(person) => (
            person.biography.and_then(|b| b.content).filter(|b| !b.trim().is_empty()),
            person
                .keywords
                .map(|k| k.keyword.into_iter().filter_map(|kw| kw.content).collect())
                .unwrap_or_default(),
        ),
        None => (None, Vec::new()),
    };

    let (affiliation, works_count) = match record.activities {
        Some(activities) => (
            activities.employments.and_then(current_employer),
            activities.works.map(|w| w.group.len()),
        ),
        None => (None, None),
    };

    SourceHit {
        topics,
        affiliation,
        orcid: Some(orcid.to_string()),
        biography,
        works_count,
        concepts: Vec::new(),
    }
}

/// An open-ended employment if there is one, else the latest start year.
fn current_employer(employments: Employments) -> Option<String> {
    let summaries: Vec<EmploymentSummary> = employments
        .groups
        .into_iter()
        .flat_map(|g| g.summaries)
        .map(|s| s.summary)
        .collect();

    let org_name = |s: &EmploymentSummary| s.organization.as_ref().and_then(|o| o.name.clone());

    if let Some(open) = summaries.iter().find(|s| s.end_date.is_none()) {
        if let Some(name) = org_name(open) {
            return Some(name);
        }
    }

    let mut best: Option<(i32, &EmploymentSummary)> = None;
    for s in &summaries {
        let year = start_year(s);
        if best.is_none_or(|(y, _)| year > y) {
            best = Some((year, s));
        }
    }
    best.and_then(|(_, s)| org_name(s))
}

fn start_year(summary: &EmploymentSummary) -> i32 {
    summary
        .start_date
        .as_ref()
        .and_then(|d| d.year.as_ref())
        .and_then(|y| y.value.as_deref())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::decode;

    fn employment(org: &str, start: &str, end: Option<&str>) -> String {
        let end = match end {
            Some(y) => format!(r#"{{"year": {{"value": "{y}"}}}}"#),
            None => "null".to_string(),
        };
        format!(
            r#"{{"summaries": [{{"employment-summary": {{
                "organization": {{"name": "{org}"}},
                "start-date": {{"year": {{"value": "{start}"}}}},
                "end-date": {end}
            }}}}]}}"#
        )
    }

    fn record_json(groups: &[String]) -> String {
        format!(
            r#"{{
              "person": {{
                "biography": {{"content": "Works on soil microbes."}},
                "keywords": {{"keyword": [{{"content": "Soil"}}, {{"content": "Microbiome"}}, {{}}]}}
              }},
              "activities-summary": {{
                "employments": {{"affiliation-group": [{}]}},
                "works": {{"group": [{{}}, {{}}, {{}}]}}
              }}
            }}"#,
            groups.join(",")
        )
    }

    #[test]
    fn open_ended_employment_wins() {
        let json = record_json(&[
            employment("University of Oslo", "2010", Some("2015")),
            employment("Max Planck Institute", "2016", None),
            employment("University of Vienna", "2020", Some("2022")),
        ]);
        let record: Record = decode("fixture", &json).unwrap();
        let hit = record_hit(record, "0000-0001-2345-6789");
        assert_eq!(hit.affiliation.as_deref(), Some("Max Planck Institute"));
        assert_eq!(hit.topics, vec!["Soil", "Microbiome"]);
        assert_eq!(hit.biography.as_deref(), Some("Works on soil microbes."));
        assert_eq!(hit.works_count, Some(3));
        assert_eq!(hit.orcid.as_deref(), Some("0000-0001-2345-6789"));
    }

    #[test]
    fn latest_start_year_when_all_ended() {
        let json = record_json(&[
            employment("University of Oslo", "2010", Some("2015")),
            employment("University of Vienna", "2020", Some("2022")),
        ]);
        let record: Record = decode("fixture", &json).unwrap();
        let hit = record_hit(record, "x");
        assert_eq!(hit.affiliation.as_deref(), Some("University of Vienna"));
    }

    #[test]
    fn empty_record_has_no_answers() {
        let record: Record = decode("fixture", "{}").unwrap();
        let hit = record_hit(record, "x");
        assert!(hit.topics.is_empty());
        assert_eq!(hit.affiliation, None);
        assert_eq!(hit.works_count, None);
    }
}
