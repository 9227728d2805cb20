use std::sync::Arc;

use scraper::{Html, Selector};

use super::{HttpClient, LookupError, MAX_TOPICS, ProfileSource, Query, SourceHit, Throttle};

const PROFILE_URL: &str = "https://www.researchgate.net/profile";
const SKILLS_HEADING: &str = "Skills and Expertise";
/// How many text nodes past the heading to look for skill labels.
const SKILLS_WINDOW: usize = 60;
const MAX_SKILL_LEN: usize = 60;

/// Best-effort plain HTTP fetch of a public researcher profile page.
///
/// Many profile pages are rendered client-side or sit behind bot checks; those
/// simply yield no skills.
pub struct ProfilePageSource {
    http: HttpClient,
    throttle: Arc<Throttle>,
}

impl ProfilePageSource {
    pub fn new(http: HttpClient, throttle: Arc<Throttle>) -> Self {
        Self { http, throttle }
    }
}

impl ProfileSource for ProfilePageSource {
    fn name(&self) -> &'static str {
        "profile-page"
    }

    fn lookup(&self, query: Query<'_>) -> Result<Option<SourceHit>, LookupError> {
        let url = format!("{PROFILE_URL}/{}", profile_slug(query.name));
        self.throttle.wait();
        let Some(html) = self.http.get_text(&url, "text/html")? else {
            return Ok(None);
        };
        let skills = extract_skills(&html);
        if skills.is_empty() {
            return Ok(None);
        }
        Ok(Some(SourceHit { topics: skills, ..Default::default() }))
    }
}

/// "Jane van Doe" → "Jane-van-Doe".
fn profile_slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Text labels following the skills heading, up to [`MAX_TOPICS`].
fn extract_skills(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next());
    let texts: Vec<&str> = match body {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    };

    let Some(start) = texts.iter().position(|t| t.contains(SKILLS_HEADING)) else {
        return Vec::new();
    };
    texts[start + 1..]
        .iter()
        .take(SKILLS_WINDOW)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_SKILL_LEN)
        .take(MAX_TOPICS)
        .map(str::to_string)
        .collect()
}
