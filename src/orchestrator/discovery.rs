//! Validation of the URL lists returned by discovery and crawl tasks.

use crate::error::{Result, ReviewError};
use url::Url;

const STATIC_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar.gz", ".exe", ".dmg", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".css",
    ".js",
];

const EXCLUDED_SEGMENTS: &[&str] = &[
    "/api/download/",
    "/files/",
    "/assets/",
    "/static/",
    "/_next/",
    "/_nuxt/",
];

/// Candidate pages after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPages {
    /// Pages to review, in discovery order, at most the cap.
    pub urls: Vec<String>,
    /// Unique valid candidates before truncation.
    pub total_valid: usize,
}

/// Parse and check a start URL. Only http(s) with a host is accepted.
pub fn parse_start_url(start_url: &str) -> Result<Url> {
    let url = Url::parse(start_url.trim())
        .map_err(|e| ReviewError::Config(format!("invalid start URL '{}': {}", start_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReviewError::Config(format!(
            "start URL must use http or https: {}",
            start_url
        )));
    }
    if url.host_str().is_none() {
        return Err(ReviewError::Config(format!(
            "start URL has no host: {}",
            start_url
        )));
    }
    Ok(url)
}

/// Host the remote agent is restricted to.
pub fn allowed_domain(start: &Url) -> Vec<String> {
    start.host_str().map(|h| vec![h.to_string()]).unwrap_or_default()
}

/// Filter candidates to same-host documentation pages, dedupe them, put
/// the start page first and truncate to `cap`.
pub fn validate(start: &Url, candidates: &[String], cap: usize) -> DiscoveredPages {
    let mut seen: Vec<String> = vec![without_fragment(start)];

    for candidate in candidates {
        let Some(url) = resolve(start, candidate) else {
            continue;
        };
        if !is_documentation_page(start, &url) {
            continue;
        }
        let url = without_fragment(&url);
        if !seen.contains(&url) {
            seen.push(url);
        }
    }

    let total_valid = seen.len();
    seen.truncate(cap.max(1));
    DiscoveredPages {
        urls: seen,
        total_valid,
    }
}

fn resolve(start: &Url, candidate: &str) -> Option<Url> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    start.join(candidate).ok()
}

fn is_documentation_page(start: &Url, url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if url.host_str() != start.host_str() {
        return false;
    }
    let path = url.path().to_lowercase();
    if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }
    let slashed = format!("{}/", path);
    !EXCLUDED_SEGMENTS.iter().any(|seg| slashed.contains(seg))
}

fn without_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
