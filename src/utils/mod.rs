//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Whether a reference already carries a scheme (`http://`, `https://`).
pub fn has_scheme(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Turn a raw competition reference into its canonical absolute URL.
///
/// Absolute references are kept as-is apart from collapsing a repeated
/// `prefix` (`prefix` + `prefix` + slug), so the result is stable no matter
/// how many times it is applied. Bare slugs are appended to `prefix`; rooted
/// paths are resolved against the prefix's origin.
pub fn normalize_competition_url(prefix: &str, reference: &str) -> String {
    let reference = reference.trim();

    if has_scheme(reference) {
        let mut url = reference.to_string();
        let doubled = format!("{prefix}{prefix}");
        while url.starts_with(&doubled) {
            url.replace_range(..prefix.len(), "");
        }
        return url;
    }

    if reference.starts_with('/') {
        if let Some(resolved) = resolve(prefix, reference) {
            return resolved;
        }
    }

    format!("{}{}", prefix, reference.trim_start_matches('/'))
}

/// Append a path segment to an URL, avoiding a doubled slash.
pub fn append_segment(url: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        url.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}
