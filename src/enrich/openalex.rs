use std::sync::Arc;

use serde::Deserialize;

use super::{HttpClient, LookupError, MAX_TOPICS, ProfileSource, Query, SourceHit, Throttle};

const AUTHORS_URL: &str = "https://api.openalex.org/authors";
const MIN_CONCEPT_SCORE: f64 = 90.0;

#[derive(Deserialize)]
struct AuthorsResponse {
    #[serde(default)]
    results: Vec<Author>,
}

#[derive(Deserialize)]
struct Author {
    #[serde(default)]
    orcid: Option<String>,
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    affiliations: Vec<Affiliation>,
    #[serde(default)]
    x_concepts: Vec<Concept>,
}

#[derive(Deserialize)]
struct Topic {
    display_name: String,
    #[serde(default)]
    count: u64,
}

#[derive(Deserialize)]
struct Affiliation {
    institution: Institution,
    #[serde(default)]
    years: Vec<i32>,
}

#[derive(Deserialize)]
struct Institution {
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct Concept {
    display_name: String,
    #[serde(default)]
    score: f64,
}

/// Author search against OpenAlex; only the first result is used.
pub struct OpenAlexSource {
    http: HttpClient,
    throttle: Arc<Throttle>,
    mailto: Option<String>,
}

impl OpenAlexSource {
    pub fn new(http: HttpClient, throttle: Arc<Throttle>, mailto: Option<String>) -> Self {
        Self { http, throttle, mailto }
    }

    fn search_url(&self, name: &str) -> String {
        let terms = name.split_whitespace().collect::<Vec<_>>().join("+");
        let mut url = format!("{AUTHORS_URL}?filter=display_name.search:{terms}");
        if let Some(mailto) = &self.mailto {
            url.push_str("&mailto=");
            url.push_str(mailto);
        }
        url
    }
}

impl ProfileSource for OpenAlexSource {
    fn name(&self) -> &'static str {
        "openalex"
    }

    fn lookup(&self, query: Query<'_>) -> Result<Option<SourceHit>, LookupError> {
        let url = self.search_url(query.name);
        self.throttle.wait();
        let Some(resp) = self.http.get_json::<AuthorsResponse>(&url)? else {
            return Ok(None);
        };
        Ok(first_author_hit(resp))
    }
}

fn first_author_hit(resp: AuthorsResponse) -> Option<SourceHit> {
    let author = resp.results.into_iter().next()?;

    let mut topics = author.topics;
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    let topics = topics
        .into_iter()
        .take(MAX_TOPICS)
        .map(|t| t.display_name)
        .collect();

    let concepts = author
        .x_concepts
        .into_iter()
        .filter(|c| c.score >= MIN_CONCEPT_SCORE)
        .map(|c| c.display_name)
        .collect();

    Some(SourceHit {
        topics,
        affiliation: most_recent_affiliation(author.affiliations),
        orcid: author.orcid.as_deref().map(orcid_id),
        concepts,
        ..Default::default()
    })
}

/// The institution with the latest activity year; the first one wins ties.
fn most_recent_affiliation(affiliations: Vec<Affiliation>) -> Option<String> {
    let mut best: Option<(i32, Affiliation)> = None;
    for aff in affiliations {
        let latest = aff.years.iter().copied().max().unwrap_or(0);
        if best.as_ref().is_none_or(|(year, _)| latest > *year) {
            best = Some((latest, aff));
        }
    }
    best.and_then(|(_, aff)| aff.institution.display_name)
}

/// "https://orcid.org/0000-0002-1825-0097" → "0000-0002-1825-0097".
fn orcid_id(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
