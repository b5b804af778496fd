//! Bio and website text for imported people.

use url::Url;

/// Cross-reference to a directory entry, rendered as a link by the directory.
pub fn cross_reference(name: &str) -> String {
    format!("[[{name}]]")
}

/// Build the bio stored on an imported person.
///
/// The original bio is kept. A matched company is appended as a
/// cross-reference (or becomes the whole bio when there was none); with
/// neither bio nor company, the location is used.
pub fn compose_bio(
    original: Option<&str>,
    display_name: &str,
    company: Option<&str>,
    location: Option<&str>,
) -> Option<String> {
    let original = original.map(str::trim).filter(|b| !b.is_empty());
    let location = location.map(str::trim).filter(|l| !l.is_empty());

    match (original, company) {
        (Some(bio), Some(company)) => {
            let reference = cross_reference(company);
            if bio.contains(&reference) {
                Some(bio.to_string())
            } else {
                Some(format!("{bio}\n\nWorks at {reference}."))
            }
        }
        (None, Some(company)) => Some(format!(
            "{display_name} works at {}.",
            cross_reference(company)
        )),
        (Some(bio), None) => Some(bio.to_string()),
        (None, None) => location.map(|l| format!("{display_name} is based in {l}.")),
    }
}

/// Turn GitHub's `blog` field into a URL, adding `https://` when no scheme was typed.
pub fn normalize_website(blog: &str) -> Option<String> {
    let blog = blog.trim();
    if blog.is_empty() {
        return None;
    }

    let lower = blog.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        blog.to_string()
    } else {
        format!("https://{blog}")
    };

    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_company_to_existing_bio() {
        assert_eq!(
            compose_bio(Some("Builds things."), "Bob", Some("Acme"), None).as_deref(),
            Some("Builds things.\n\nWorks at [[Acme]].")
        );
    }

    #[test]
    fn does_not_repeat_existing_reference() {
        assert_eq!(
            compose_bio(Some("Happy at [[Acme]]"), "Bob", Some("Acme"), None).as_deref(),
            Some("Happy at [[Acme]]")
        );
    }

    #[test]
    fn synthesizes_bio_from_company() {
        assert_eq!(
            compose_bio(Some("  "), "Bob Builder", Some("Acme"), Some("Berlin")).as_deref(),
            Some("Bob Builder works at [[Acme]].")
        );
    }

    #[test]
    fn falls_back_to_location() {
        assert_eq!(
            compose_bio(None, "carol", None, Some("Lisbon")).as_deref(),
            Some("carol is based in Lisbon.")
        );
        assert_eq!(compose_bio(None, "carol", None, None), None);
        assert_eq!(
            compose_bio(Some("Hi"), "carol", None, Some("Lisbon")).as_deref(),
            Some("Hi")
        );
    }

    #[test]
    fn website_normalization() {
        assert_eq!(
            normalize_website("bob.dev").as_deref(),
            Some("https://bob.dev")
        );
        assert_eq!(
            normalize_website(" http://bob.dev/blog ").as_deref(),
            Some("http://bob.dev/blog")
        );
        assert_eq!(
            normalize_website("HTTPS://Bob.dev").as_deref(),
            Some("HTTPS://Bob.dev")
        );
        assert_eq!(normalize_website(""), None);
        assert_eq!(normalize_website("not a url at all"), None);
    }
}
