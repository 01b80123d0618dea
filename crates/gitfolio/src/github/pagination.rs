//! Link-header pagination.
//!
//! GitHub list endpoints advertise further pages in the `Link` header. The
//! `next` URL is followed verbatim, so any query parameters GitHub adds are
//! preserved.

/// Page links extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// Full URL of the next page (from rel="next").
    pub next: Option<String>,
    /// Full URL of the last page (from rel="last").
    pub last: Option<String>,
}

impl LinkPagination {
    /// Returns the total number of pages if known.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_deref().and_then(page_number)
    }
}

/// Parse the Link header to extract pagination links.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let part = part.trim();

        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel) {
            match rel_type {
                "next" => info.next = Some(url.to_string()),
                "last" => info.last = Some(url.to_string()),
                _ => {}
            }
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
pub fn page_number(url: &str) -> Option<u32> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}
