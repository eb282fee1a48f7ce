//! Segment-level helpers for absolute XPath strings such as `/html/body/div[2]/span`

use crate::error::{NavError, Result};
use regex::Regex;

/// Number of leading segments covered by a root coordinate (`/html/body`)
pub const ROOT_SPAN: usize = 2;

fn re_first_integer() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn re_letters() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z]+").unwrap())
}

/// Split an XPath into its `/`-delimited segments, rejecting empty ones
pub fn segments(xpath: &str) -> Result<Vec<&str>> {
    if !xpath.contains('/') {
        return Err(NavError::malformed(xpath, "no '/'-delimited segments"));
    }

    let body = xpath.strip_prefix('/').unwrap_or(xpath);
    let segments: Vec<&str> = body.split('/').collect();

    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(NavError::malformed(xpath, "empty path segment"));
    }

    Ok(segments)
}

/// Trailing segment of an XPath (`div[2]` for `/html/body/div[2]`)
pub fn last_segment(xpath: &str) -> &str {
    xpath.rsplit('/').next().unwrap_or(xpath)
}

/// Sibling ordinal: the first integer in the segment, 0 when absent
pub fn index_of(segment: &str) -> usize {
    re_first_integer()
        .find(segment)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Element tag of a segment: its first run of letters
pub fn tag_of(segment: &str) -> Option<&str> {
    re_letters().find(segment).map(|m| m.as_str())
}

/// Ancestor chain from the root coordinate down to `xpath` itself.
///
/// The root spans the first [`ROOT_SPAN`] segments, so `/html/body/div` yields
/// `["/html/body", "/html/body/div"]`.
pub fn ancestry(xpath: &str) -> Result<Vec<String>> {
    let segments = segments(xpath)?;
    let leading = if xpath.starts_with('/') { "/" } else { "" };
    let root_len = segments.len().min(ROOT_SPAN);

    let mut chain = Vec::with_capacity(segments.len() - root_len + 1);
    for depth in root_len..=segments.len() {
        chain.push(format!("{}{}", leading, segments[..depth].join("/")));
    }
    Ok(chain)
}

/// Longest common prefix of whole segments shared by every xpath
pub fn common_segment_prefix<S: AsRef<str>>(xpaths: &[S]) -> String {
    let Some(first) = xpaths.first() else {
        return String::new();
    };

    let mut shared: Vec<&str> = first.as_ref().split('/').collect();
    for xpath in &xpaths[1..] {
        let parts: Vec<&str> = xpath.as_ref().split('/').collect();
        let common = shared
            .iter()
            .zip(parts.iter())
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count();
        shared.truncate(common);
    }

    shared.join("/")
}
