use regex::Regex;

fn re_scheme_host() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/?#]*").unwrap())
}

fn re_identifier_segment() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(\d+|[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}|[0-9a-f]{16,})$",
        )
        .unwrap()
    })
}

/// Placeholder substituted for identifier segments of API paths
pub const ID_PLACEHOLDER: &str = "{id}";

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Normalize a browser location to the path that identifies a page.
///
/// Scheme, host, query and fragment are dropped. Hash routes (`/#/users`) keep the route.
/// The result is percent-decoded, always starts with `/` and has no trailing slash.
pub fn normalize_location(url: &str) -> String {
    let trimmed = url.trim();
    let without_origin = re_scheme_host().replace(trimmed, "");

    let route = match without_origin.split_once('#') {
        Some((_, fragment)) if fragment.starts_with('/') => fragment,
        _ => without_origin.as_ref(),
    };

    let path = decode(strip_query(route));
    let path = path.trim_end_matches('/');

    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Collapse identifier segments (numbers, UUIDs, long hex strings) of an API path into
/// [`ID_PLACEHOLDER`] so that calls to one endpoint share a node.
pub fn api_path_template(path: &str) -> String {
    let without_origin = re_scheme_host().replace(path.trim(), "");
    let path = strip_query(&without_origin);

    let segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            if re_identifier_segment().is_match(segment) {
                ID_PLACEHOLDER.to_string()
            } else {
                decode(segment)
            }
        })
        .collect();

    let template = segments.join("/");
    let template = template.trim_end_matches('/');
    if template.starts_with('/') {
        template.to_string()
    } else {
        format!("/{}", template)
    }
}

/// Upper-case HTTP method, `GET` when missing
pub fn normalize_method(method: &str) -> String {
    let method = method.trim();
    if method.is_empty() {
        "GET".to_string()
    } else {
        method.to_ascii_uppercase()
    }
}
