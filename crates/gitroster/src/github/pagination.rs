//! Link-header pagination for GitHub list endpoints.

/// Pagination information extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

impl LinkPagination {
    /// Returns the total number of pages if known.
    pub fn total_pages(&self) -> Option<u32> {
        self.last_page
    }

    /// Returns true if there are more pages to fetch.
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/1/followers?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "last" => info.last_page = Some(page_num),
                "next" => info.next_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the page parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let query = &url[url.find('?')? + 1..];

    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Decide which page to request after `current`.
///
/// Uses the Link header when present. Without one, a full page means there may
/// be more and a short page is the last. A `next` that doesn't move forward is
/// treated as the end so a misbehaving server can't loop the crawl.
pub fn next_page(
    current: u32,
    link_header: Option<&str>,
    count: usize,
    per_page: u32,
) -> Option<u32> {
    match link_header {
        Some(header) => parse_link_header(header)
            .next_page
            .filter(|&next| next > current),
        None if count >= per_page as usize => Some(current + 1),
        None => None,
    }
}
