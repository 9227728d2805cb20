use once_cell::sync::Lazy;

use crate::types::Domain;

// Force recompilation when KB files change (hash set by build.rs).
#[allow(dead_code)]
const _KB_HASH: &str = env!("KB_HASH");

static DOMAINS_KB: &str = include_str!("../kbs/domains.kb");
static BOILERPLATE_KB: &str = include_str!("../kbs/boilerplate.kb");
static TITLE_FRAGMENTS_KB: &str = include_str!("../kbs/title-fragments.kb");
static NAME_PARTICLES_KB: &str = include_str!("../kbs/name-particles.kb");
static HONORIFICS_KB: &str = include_str!("../kbs/honorifics.kb");

/// Domain banner phrase, as printed → domain.
/// Sorted by phrase length descending so "SOCIAL SCIENCES AND HUMANITIES"
/// wins over "SOCIAL SCIENCES".
pub static DOMAIN_PHRASES: Lazy<Vec<(String, Domain)>> = Lazy::new(|| {
    let mut entries: Vec<(String, Domain)> = kb_lines(DOMAINS_KB)
        .filter_map(|line| {
            let (phrase, code) = line.split_once("---")?;
            Some((phrase.trim().to_string(), Domain::from_code(code)?))
        })
        .collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    entries
});

/// Boilerplate phrases, lowercased.
pub static BOILERPLATE: Lazy<Vec<String>> =
    Lazy::new(|| kb_lines(BOILERPLATE_KB).map(str::to_lowercase).collect());

/// Words that only occur in wrapped panel titles.
pub static TITLE_FRAGMENTS: Lazy<Vec<String>> =
    Lazy::new(|| kb_lines(TITLE_FRAGMENTS_KB).map(str::to_string).collect());

/// Family-name particles, lowercased.
pub static NAME_PARTICLES: Lazy<Vec<String>> =
    Lazy::new(|| kb_lines(NAME_PARTICLES_KB).map(str::to_lowercase).collect());

/// Honorific tokens, lowercased.
pub static HONORIFICS: Lazy<Vec<String>> =
    Lazy::new(|| kb_lines(HONORIFICS_KB).map(str::to_lowercase).collect());

fn kb_lines(kb_text: &str) -> impl Iterator<Item = &str> {
    kb_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Find the domain announced by a banner line, if any.
/// Banners are printed in capitals; panel titles such as "Applied Life
/// Sciences" must not match, so the comparison is case-sensitive.
pub fn match_domain(line: &str) -> Option<Domain> {
    DOMAIN_PHRASES
        .iter()
        .find(|(phrase, _)| line.contains(phrase.as_str()))
        .map(|(_, domain)| *domain)
}

pub fn is_boilerplate(line: &str) -> bool {
    let lower = line.to_lowercase();
    BOILERPLATE.iter().any(|phrase| lower.contains(phrase.as_str()))
}

pub fn contains_title_fragment(line: &str) -> bool {
    TITLE_FRAGMENTS.iter().any(|frag| line.contains(frag.as_str()))
}

pub fn is_name_particle(token: &str) -> bool {
    let lower = token.to_lowercase();
    NAME_PARTICLES.iter().any(|p| *p == lower)
}

pub fn is_honorific(token: &str) -> bool {
    let lower = token.to_lowercase();
    HONORIFICS.iter().any(|h| *h == lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_domain_phrase_wins() {
        assert_eq!(
            match_domain("SOCIAL SCIENCES AND HUMANITIES"),
            Some(Domain::SH)
        );
        assert_eq!(
            match_domain("PHYSICAL SCIENCES & ENGINEERING"),
            Some(Domain::PE)
        );
        assert_eq!(match_domain("LIFE SCIENCES"), Some(Domain::LS));
    }

    #[test]
    fn domain_phrases_match_only_as_printed() {
        assert_eq!(match_domain("Applied Life Sciences, Biotechnology"), None);
        assert_eq!(match_domain("Social Sciences and Humanities"), None);
        assert_eq!(match_domain("Mathematics (PE1)"), None);
    }

    #[test]
    fn boilerplate_is_case_insensitive() {
        assert!(is_boilerplate("For questions, contact the ERC HELPDESK"));
        assert!(!is_boilerplate("Jane Doe"));
    }

    #[test]
    fn particles_and_honorifics() {
        assert!(is_name_particle("van"));
        assert!(is_name_particle("De"));
        assert!(!is_name_particle("Geer"));
        assert!(is_honorific("Prof."));
        assert!(is_honorific("DR."));
        assert!(!is_honorific("Jane"));
    }
}
