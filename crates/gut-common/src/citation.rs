use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;
use url::Url;

/// A source URL with the display fields derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    /// 1-based marker number, matching `[n]` in the analysis text.
    pub number: usize,
    pub url: String,
    /// `None` when the URL could not be parsed.
    pub domain: Option<String>,
    pub title: String,
}

/// Hostname of `url` without a leading `www.`.
pub fn citation_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some(host.to_string())
}

/// Derive display metadata for the citation at zero-based `index`.
///
/// A malformed URL yields the placeholder title `Source <n>`.
pub fn describe_citation(index: usize, url: &str) -> Citation {
    let number = index + 1;
    let domain = citation_domain(url);
    let title = match &domain {
        Some(domain) => format!("{domain} - {url}"),
        None => format!("Source {number}"),
    };
    Citation {
        number,
        url: url.to_string(),
        domain,
        title,
    }
}

pub fn describe_citations(urls: &[String]) -> Vec<Citation> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| describe_citation(i, url))
        .collect()
}

/// Numeric reference markers (`[1]`, `[2]`, ...) found in `text`, ascending and de-duplicated.
pub fn citation_markers(text: &str) -> Vec<usize> {
    let marker_re = Regex::new(r"\[(\d+)\]").expect("valid regex");
    marker_re
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<usize>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Markers referenced by any of `texts` that have no matching citation.
pub fn unresolved_markers<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    citation_count: usize,
) -> Vec<usize> {
    texts
        .into_iter()
        .flat_map(citation_markers)
        .filter(|&n| n == 0 || n > citation_count)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
