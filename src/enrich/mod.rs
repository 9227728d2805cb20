//! Topic and affiliation lookups for panel members.
//!
//! Each name goes through OpenAlex first, then the person's public ORCID
//! record when OpenAlex left gaps, then a best-effort profile-page scrape
//! when there are still no keywords. Every source is independent: a failed
//! call is logged and treated as an empty answer.

mod openalex;
mod orcid;
mod scrape;
mod throttle;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{EnrichedProfile, KeywordSource};

pub use openalex::OpenAlexSource;
pub use orcid::OrcidSource;
pub use scrape::ProfilePageSource;
pub use throttle::Throttle;

pub const MAX_TOPICS: usize = 4;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: ureq::Error },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub workers: usize,
    pub timeout: Duration,
    /// Contact address for the OpenAlex polite pool.
    pub mailto: Option<String>,
    pub scrape: bool,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout: Duration::from_secs(10),
            mailto: None,
            scrape: true,
        }
    }
}

/// What one source knows about a person. Empty fields mean "no answer".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceHit {
    pub topics: Vec<String>,
    pub affiliation: Option<String>,
    pub orcid: Option<String>,
    pub biography: Option<String>,
    pub works_count: Option<usize>,
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub name: &'a str,
    pub orcid: Option<&'a str>,
}

pub trait ProfileSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the source has nothing for this person.
    fn lookup(&self, query: Query<'_>) -> Result<Option<SourceHit>, LookupError>;
}

/// Blocking HTTP access shared by the network sources.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    /// Body of a successful response; `Ok(None)` on 404.
    pub fn get_text(&self, url: &str, accept: &str) -> Result<Option<String>, LookupError> {
        let resp = self
            .agent
            .get(url)
            .header("Accept", accept)
            .call()
            .map_err(|source| LookupError::Transport { url: url.to_string(), source })?;
        let status = resp.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status != 200 {
            return Err(LookupError::Status { url: url.to_string(), status });
        }
        resp.into_body()
            .read_to_string()
            .map(Some)
            .map_err(|source| LookupError::Transport { url: url.to_string(), source })
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, LookupError> {
        match self.get_text(url, "application/json")? {
            Some(body) => decode(url, &body).map(Some),
            None => Ok(None),
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, LookupError> {
    serde_json::from_str(body).map_err(|source| LookupError::Decode { url: url.to_string(), source })
}

pub struct ProfileEnricher {
    openalex: Box<dyn ProfileSource>,
    orcid: Box<dyn ProfileSource>,
    scrape: Option<Box<dyn ProfileSource>>,
    workers: usize,
}

impl ProfileEnricher {
    /// Network-backed enricher; every service gets its own throttle.
    pub fn from_config(config: &EnrichConfig) -> Self {
        let http = HttpClient::new(config.timeout);
        let scrape: Option<Box<dyn ProfileSource>> = if config.scrape {
            Some(Box::new(ProfilePageSource::new(http.clone(), Arc::new(Throttle::polite()))))
        } else {
            None
        };
        let openalex = OpenAlexSource::new(
            http.clone(),
            Arc::new(Throttle::polite()),
            config.mailto.clone(),
        );
        let orcid = OrcidSource::new(http, Arc::new(Throttle::polite()));
        Self::with_sources(Box::new(openalex), Box::new(orcid), scrape, config.workers)
    }

    pub fn with_sources(
        openalex: Box<dyn ProfileSource>,
        orcid: Box<dyn ProfileSource>,
        scrape: Option<Box<dyn ProfileSource>>,
        workers: usize,
    ) -> Self {
        Self { openalex, orcid, scrape, workers }
    }

    pub fn enrich_one(&self, name: &str) -> EnrichedProfile {
        let mut profile = EnrichedProfile {
            name: name.to_string(),
            ..Default::default()
        };

        if let Some(hit) = self.ask(self.openalex.as_ref(), Query { name, orcid: None }) {
            profile.orcid = hit.orcid;
            profile.affiliation = hit.affiliation;
            profile.concepts = hit.concepts;
            take_topics(&mut profile, hit.topics, KeywordSource::OpenAlexTopics);
        }

        let needs_orcid = profile.affiliation.is_none() || profile.topics.is_empty();
        if needs_orcid {
            if let Some(orcid) = profile.orcid.clone() {
                let query = Query { name, orcid: Some(orcid.as_str()) };
                if let Some(hit) = self.ask(self.orcid.as_ref(), query) {
                    if profile.affiliation.is_none() {
                        profile.affiliation = hit.affiliation;
                    }
                    profile.biography = hit.biography;
                    profile.works_count = hit.works_count;
                    take_topics(&mut profile, hit.topics, KeywordSource::OrcidKeywords);
                }
            }
        }

        if profile.topics.is_empty() {
            if let Some(scrape) = &self.scrape {
                let query = Query { name, orcid: profile.orcid.as_deref() };
                if let Some(hit) = self.ask(&**scrape, query) {
                    take_topics(&mut profile, hit.topics, KeywordSource::ScrapedSkills);
                }
            }
        }

        if profile.is_empty() {
            info!(name, "no profile found");
        } else {
            debug!(name, source = ?profile.keyword_source, topics = profile.topics.len(), "profile enriched");
        }
        profile
    }

    /// Enrich every name on a bounded pool of worker threads. Results come
    /// back in input order.
    pub fn enrich_all(&self, names: &[String]) -> Vec<EnrichedProfile> {
        if names.is_empty() {
            return Vec::new();
        }
        let workers = self.workers.clamp(1, names.len());
        let next = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        info!(names = names.len(), workers, "enriching profiles");

        let mut slots: Vec<Option<EnrichedProfile>> = vec![None; names.len()];
        let finished: Vec<(usize, EnrichedProfile)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(|| {
                        let mut out = Vec::new();
                        loop {
                            let idx = next.fetch_add(1, Ordering::Relaxed);
                            let Some(name) = names.get(idx) else { break };
                            out.push((idx, self.enrich_one(name)));
                            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                            debug!(done = n, total = names.len(), "enrichment progress");
                        }
                        out
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(out) => out,
                    Err(_) => {
                        warn!("enrichment worker panicked");
                        Vec::new()
                    }
                })
                .collect()
        });

        for (idx, profile) in finished {
            slots[idx] = Some(profile);
        }
        slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| EnrichedProfile {
                    name: name.clone(),
                    ..Default::default()
                })
            })
            .collect()
    }

    fn ask(&self, source: &dyn ProfileSource, query: Query<'_>) -> Option<SourceHit> {
        match source.lookup(query) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(source = source.name(), name = query.name, error = %e, "lookup failed");
                None
            }
        }
    }
}

fn take_topics(profile: &mut EnrichedProfile, mut topics: Vec<String>, source: KeywordSource) {
    if !profile.topics.is_empty() || topics.is_empty() {
        return;
    }
    topics.truncate(MAX_TOPICS);
    profile.topics = topics;
    profile.keyword_source = Some(source);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Fake {
        name: &'static str,
        hit: Option<SourceHit>,
        fail: bool,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl Fake {
        fn new(name: &'static str, hit: Option<SourceHit>) -> Self {
            Self { name, hit, fail: false, seen: Mutex::new(Vec::new()) }
        }

        fn failing(name: &'static str) -> Self {
            Self { fail: true, ..Self::new(name, None) }
        }
    }

    impl ProfileSource for Arc<Fake> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn lookup(&self, query: Query<'_>) -> Result<Option<SourceHit>, LookupError> {
            self.seen
                .lock()
                .unwrap()
                .push((query.name.to_string(), query.orcid.map(str::to_string)));
            if self.fail {
                return Err(LookupError::Status { url: "http://fake".into(), status: 503 });
            }
            Ok(self.hit.clone())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn enricher(
        openalex: &Arc<Fake>,
        orcid: &Arc<Fake>,
        scrape: &Arc<Fake>,
    ) -> ProfileEnricher {
        ProfileEnricher::with_sources(
            Box::new(openalex.clone()),
            Box::new(orcid.clone()),
            Some(Box::new(scrape.clone())),
            2,
        )
    }

    #[test]
    fn complete_openalex_answer_skips_other_sources() {
        let openalex = Arc::new(Fake::new(
            "openalex",
            Some(SourceHit {
                topics: strings(&["A", "B", "C", "D", "E"]),
                affiliation: Some("ETH Zurich".into()),
                orcid: Some("0000-0001".into()),
                ..Default::default()
            }),
        ));
        let orcid = Arc::new(Fake::new("orcid", None));
        let scrape = Arc::new(Fake::new("scrape", None));
        let profile = enricher(&openalex, &orcid, &scrape).enrich_one("Jane Doe");

        assert_eq!(profile.topics, strings(&["A", "B", "C", "D"]));
        assert_eq!(profile.keyword_source, Some(KeywordSource::OpenAlexTopics));
        assert!(orcid.seen.lock().unwrap().is_empty());
        assert!(scrape.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn orcid_fills_missing_affiliation_and_keywords() {
        let openalex = Arc::new(Fake::new(
            "openalex",
            Some(SourceHit { orcid: Some("0000-0002".into()), ..Default::default() }),
        ));
        let orcid = Arc::new(Fake::new(
            "orcid",
            Some(SourceHit {
                topics: strings(&["Ecology"]),
                affiliation: Some("University of Oslo".into()),
                works_count: Some(12),
                ..Default::default()
            }),
        ));
        let scrape = Arc::new(Fake::new("scrape", None));
        let profile = enricher(&openalex, &orcid, &scrape).enrich_one("John Roe");

        assert_eq!(profile.affiliation.as_deref(), Some("University of Oslo"));
        assert_eq!(profile.keyword_source, Some(KeywordSource::OrcidKeywords));
        assert_eq!(profile.works_count, Some(12));
        assert_eq!(
            orcid.seen.lock().unwrap()[0],
            ("John Roe".to_string(), Some("0000-0002".to_string()))
        );
        assert!(scrape.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_fall_through_to_scrape() {
        let openalex = Arc::new(Fake::failing("openalex"));
        let orcid = Arc::new(Fake::new("orcid", None));
        let scrape = Arc::new(Fake::new(
            "scrape",
            Some(SourceHit { topics: strings(&["Proteomics"]), ..Default::default() }),
        ));
        let profile = enricher(&openalex, &orcid, &scrape).enrich_one("Ann Lee");

        assert_eq!(profile.keyword_source, Some(KeywordSource::ScrapedSkills));
        assert_eq!(profile.topics, strings(&["Proteomics"]));
        // No ORCID id was found, so ORCID is never asked.
        assert!(orcid.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn nothing_found_is_an_empty_profile() {
        let openalex = Arc::new(Fake::new("openalex", None));
        let orcid = Arc::new(Fake::new("orcid", None));
        let scrape = Arc::new(Fake::failing("scrape"));
        let profile = enricher(&openalex, &orcid, &scrape).enrich_one("Nobody");
        assert!(profile.is_empty());
        assert_eq!(profile.keyword_source, None);
        assert_eq!(profile.name, "Nobody");
    }

    #[test]
    fn pool_keeps_input_order() {
        let openalex = Arc::new(Fake::new(
            "openalex",
            Some(SourceHit {
                topics: strings(&["T"]),
                affiliation: Some("X".into()),
                ..Default::default()
            }),
        ));
        let orcid = Arc::new(Fake::new("orcid", None));
        let scrape = Arc::new(Fake::new("scrape", None));
        let names: Vec<String> = (0..9).map(|i| format!("Person {i}")).collect();
        let profiles = enricher(&openalex, &orcid, &scrape).enrich_all(&names);

        let got: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        let want: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(got, want);
        assert_eq!(openalex.seen.lock().unwrap().len(), 9);
    }
}
