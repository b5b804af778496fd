//! Resolving a GitHub company field to a directory company.

use crate::directory::Company;
use crate::github::is_valid_login;

/// Legal-form words ignored when comparing company names.
const LEGAL_SUFFIXES: &[&str] = &["inc", "llc", "ltd", "gmbh", "corp", "co", "company"];

/// Shortest normalized name allowed to match by containment.
const MIN_PARTIAL_LEN: usize = 3;

/// What a profile says about its employer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyHint {
    pub name: String,
    /// GitHub organization login when the field used `@org`.
    pub github_org: Option<String>,
}

impl CompanyHint {
    pub fn github_url(&self) -> Option<String> {
        self.github_org
            .as_ref()
            .map(|org| format!("https://github.com/{org}"))
    }
}

/// Parse GitHub's free-text company field.
///
/// `@acme` names the `acme` organization. Anything else is a plain name; only
/// the first of several employers (`A, B`, `A | B`, `A / B`) is used.
pub fn parse_company_field(field: &str) -> Option<CompanyHint> {
    let first = field
        .split([',', '|', '/'])
        .map(str::trim)
        .find(|segment| !segment.is_empty())?;

    if let Some(rest) = first.strip_prefix('@') {
        let org = rest
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
        if is_valid_login(org) {
            return Some(CompanyHint {
                name: org.to_string(),
                github_org: Some(org.to_string()),
            });
        }
    }

    let name = first.trim_start_matches('@').trim();
    (!name.is_empty()).then(|| CompanyHint {
        name: name.to_string(),
        github_org: None,
    })
}

/// Normalize a company name for comparison.
///
/// Lowercases, drops punctuation, removes trailing legal suffixes and a
/// leading "the": `"The Acme Co., Inc."` becomes `"acme"`.
pub fn normalize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c.to_lowercase().next().unwrap_or(c))
            } else if c.is_whitespace() || matches!(c, '-' | '_' | '&' | ',' | '/' | '+') {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    if words.len() > 1 && words[0] == "the" {
        words.remove(0);
    }
    words.join(" ")
}

/// Whether `needle` occurs in `haystack` as a run of whole words.
fn contains_words(haystack: &str, needle: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

/// Pick the directory company best matching `candidate`.
///
/// An exact normalized match wins. Otherwise the longest company name that
/// contains, or is contained in, the candidate as whole words.
pub fn best_match<'a>(candidate: &str, companies: &'a [Company]) -> Option<&'a Company> {
    let wanted = normalize(candidate);
    if wanted.is_empty() {
        return None;
    }

    let normalized: Vec<(String, &Company)> = companies
        .iter()
        .map(|c| (normalize(&c.name), c))
        .filter(|(n, _)| !n.is_empty())
        .collect();

    if let Some((_, company)) = normalized.iter().find(|(n, _)| *n == wanted) {
        return Some(company);
    }

    if wanted.len() < MIN_PARTIAL_LEN {
        return None;
    }

    normalized
        .iter()
        .filter(|(n, _)| n.len() >= MIN_PARTIAL_LEN)
        .filter(|(n, _)| contains_words(&wanted, n) || contains_words(n, &wanted))
        .max_by_key(|(n, _)| n.len())
        .map(|(_, company)| *company)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn companies(names: &[&str]) -> Vec<Company> {
        names
            .iter()
            .map(|name| Company {
                id: Uuid::new_v4(),
                name: name.to_string(),
                github_url: None,
            })
            .collect()
    }

    #[test]
    fn parses_org_reference() {
        let hint = parse_company_field("@acme").unwrap();
        assert_eq!(hint.name, "acme");
        assert_eq!(hint.github_org.as_deref(), Some("acme"));
        assert_eq!(hint.github_url().as_deref(), Some("https://github.com/acme"));

        let hint = parse_company_field(" @acme-labs, @other ").unwrap();
        assert_eq!(hint.github_org.as_deref(), Some("acme-labs"));
    }

    #[test]
    fn parses_plain_name_and_first_segment() {
        let hint = parse_company_field("Acme Corp").unwrap();
        assert_eq!(hint.name, "Acme Corp");
        assert_eq!(hint.github_org, None);

        assert_eq!(parse_company_field("Acme | Globex").unwrap().name, "Acme");
        assert_eq!(parse_company_field("Acme / Globex").unwrap().name, "Acme");
        assert_eq!(parse_company_field(", Globex").unwrap().name, "Globex");
    }

    #[test]
    fn blank_field_yields_nothing() {
        assert_eq!(parse_company_field(""), None);
        assert_eq!(parse_company_field("  , | "), None);
        assert_eq!(parse_company_field("@"), None);
    }

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize("The Acme Co., Inc."), "acme");
        assert_eq!(normalize("ACME GmbH"), "acme");
        assert_eq!(normalize("Procter & Gamble"), "procter gamble");
        assert_eq!(normalize("A.B.C. Ltd"), "abc");
        assert_eq!(normalize("The Company"), "the");
        assert_eq!(normalize("Co"), "co");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn exact_normalized_match_wins() {
        let list = companies(&["Acme Labs", "Acme, Inc."]);
        assert_eq!(best_match("ACME", &list).unwrap().name, "Acme, Inc.");
    }

    #[test]
    fn longest_containment_match() {
        let list = companies(&["Acme", "Acme Rockets", "Globex"]);
        assert_eq!(
            best_match("Acme Rockets Europe", &list).unwrap().name,
            "Acme Rockets"
        );
        assert_eq!(best_match("Globex Corporation", &list).unwrap().name, "Globex");
    }

    #[test]
    fn containment_requires_whole_words_and_min_length() {
        let list = companies(&["Acme", "IO"]);
        assert!(best_match("Acmeish", &list).is_none());
        assert!(best_match("IO Systems", &list).is_none());
        assert!(best_match("Initech", &list).is_none());
        assert!(best_match("", &list).is_none());
    }
}
