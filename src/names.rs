use crate::kb;

/// Surname prefixes that legitimately carry an inner capital ("McDonald").
const SURNAME_PREFIXES: &[&str] = &["Mc", "Mac", "De", "Di", "Da", "Du", "La", "Le", "Van", "Von"];

/// Which token order a document prints names in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOrder {
    /// Chair lists: "DOE Jane".
    SurnameFirst,
    /// Member lists: "Jane Doe", "Sara van de Geer".
    GivenFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameParts {
    pub given_name: String,
    pub family_name: String,
}

impl NameParts {
    /// "Given Family", used as the join key against rosters.
    pub fn display(&self) -> String {
        match (self.given_name.is_empty(), self.family_name.is_empty()) {
            (true, _) => self.family_name.clone(),
            (_, true) => self.given_name.clone(),
            _ => format!("{} {}", self.given_name, self.family_name),
        }
    }
}

/// Split a printed name into given and family parts.
pub fn split(raw: &str, order: NameOrder) -> NameParts {
    let cleaned = clean(raw);
    split_cleaned(&cleaned, order)
}

/// Strip honorifics, repair glued words and collapse whitespace.
pub fn clean(raw: &str) -> String {
    let stripped = strip_honorifics(raw);
    repair_concatenation(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_honorifics(raw: &str) -> String {
    raw.split_whitespace()
        .skip_while(|tok| kb::is_honorific(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Insert a space where a lowercase letter runs straight into an uppercase
/// one: "FrankVerstraete" → "Frank Verstraete".
pub fn repair_concatenation(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut word = String::new();
    let mut prev: Option<char> = None;

    for ch in name.chars() {
        if ch.is_whitespace() || ch == '-' {
            out.push_str(&word);
            out.push(ch);
            word.clear();
            prev = Some(ch);
            continue;
        }
        let glued = prev.is_some_and(|p| p.is_lowercase()) && ch.is_uppercase();
        if glued && !SURNAME_PREFIXES.contains(&word.as_str()) {
            out.push_str(&word);
            out.push(' ');
            word.clear();
        }
        word.push(ch);
        prev = Some(ch);
    }
    out.push_str(&word);
    out
}

fn split_cleaned(name: &str, order: NameOrder) -> NameParts {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.len() <= 1 {
        return NameParts {
            given_name: String::new(),
            family_name: name.to_string(),
        };
    }
    match order {
        NameOrder::SurnameFirst => split_surname_first(&tokens),
        NameOrder::GivenFirst => split_given_first(name, &tokens),
    }
}

/// Leading all-caps tokens are the printed surname. Without that marker the
/// line reads given-first.
fn split_surname_first(tokens: &[&str]) -> NameParts {
    let caps_run = tokens.iter().take_while(|t| is_all_caps(t)).count();
    if caps_run == 0 || caps_run == tokens.len() {
        return split_given_first(&tokens.join(" "), tokens);
    }
    NameParts {
        family_name: tokens[..caps_run].join(" "),
        given_name: tokens[caps_run..].join(" "),
    }
}

fn split_given_first(name: &str, tokens: &[&str]) -> NameParts {
    if let Some((family, given)) = name.split_once(',') {
        return NameParts {
            given_name: given.trim().to_string(),
            family_name: family.trim().to_string(),
        };
    }
    let mut start = tokens.len() - 1;
    while start > 1 && is_lowercase_particle(tokens[start - 1]) {
        start -= 1;
    }
    NameParts {
        given_name: tokens[..start].join(" "),
        family_name: tokens[start..].join(" "),
    }
}

fn is_all_caps(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn is_lowercase_particle(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_lowercase) && kb::is_name_particle(token)
}
