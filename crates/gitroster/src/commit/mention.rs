//! Finding an employer in a free-text bio.

use regex::Regex;

/// Extracts a company name from a profile bio.
pub trait CompanyMentionExtractor: Send + Sync {
    fn extract_company_mention(&self, bio: &str) -> Option<String>;
}

/// One to four capitalized words, e.g. `Acme`, `Acme Rocket Co`.
const NAME: &str = r"([A-Z0-9][\w&'-]*(?:[ \t]+[A-Z0-9][\w&'-]*){0,3})";

const ROLES: &str = r"(?:[Ee]ngineer|[Dd]eveloper|[Dd]esigner|[Pp]rogrammer|[Rr]esearcher|[Ss]cientist|[Aa]rchitect|[Cc]onsultant|[Mm]anager|[Ll]ead|[Ii]ntern|SWE|SRE|CTO|CEO|COO|VP|[Dd]irector)";

fn default_patterns() -> Vec<String> {
    vec![
        // "Engineer @stripe", "(@acme)"
        r"(?:^|[\s(])@([A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9]){0,38})".to_string(),
        format!(r"\b(?:[Ww]ork(?:s|ing)?|[Ww]orked)[ \t]+(?:at|for)[ \t]+{NAME}"),
        format!(r"\b{ROLES}[ \t]+(?:at|@)[ \t]*{NAME}"),
        format!(r"\b(?:[Cc]o-?)?[Ff]ounder[ \t]+(?:of|at|@)[ \t]*{NAME}"),
    ]
}

/// Regex-based extractor. The earliest mention in the bio wins.
#[derive(Debug, Clone)]
pub struct PatternMentionExtractor {
    patterns: Vec<Regex>,
}

impl Default for PatternMentionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMentionExtractor {
    pub fn new() -> Self {
        let patterns = default_patterns()
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { patterns }
    }

    /// Use custom patterns; each must have one capture group holding the name.
    pub fn with_patterns(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }
}

impl CompanyMentionExtractor for PatternMentionExtractor {
    fn extract_company_mention(&self, bio: &str) -> Option<String> {
        self.patterns
            .iter()
            .filter_map(|re| re.captures(bio)?.get(1))
            .min_by_key(|m| m.start())
            .map(|m| {
                m.as_str()
                    .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\''])
                    .to_string()
            })
            .filter(|name| !name.is_empty())
    }
}
