//! Target URL repair
//!
//! Page addresses historically arrive pre-concatenated from two stored
//! fields (site base URL + page path), so raw input can carry doubled
//! separators, a stray leading slash, or scheme text glued onto the end of
//! other junk. Normalization repairs all of that with pure string work; it
//! never touches the network, so an unreachable host surfaces later as a
//! navigation failure rather than here.

/// Offset of the last embedded scheme marker, if any.
fn last_scheme_offset(s: &str) -> Option<usize> {
    let http = s.rfind("http://");
    let https = s.rfind("https://");
    match (http, https) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Normalize a raw target string into an absolute `http(s)` URL.
///
/// When junk got glued in front of a full URL, the last embedded scheme
/// wins. A single leading slash is dropped. Anything still missing a scheme
/// gets `https://` prepended. Idempotent on already well-formed URLs.
///
/// # Examples
///
/// ```
/// assert_eq!(pagewatch::target::normalize("example.com"), "https://example.com");
/// assert_eq!(pagewatch::target::normalize("/https://example.com"), "https://example.com");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    if let Some(idx) = last_scheme_offset(&s) {
        if idx > 0 {
            s = s[idx..].to_string();
        }
    }

    if !s.starts_with("http://") && !s.starts_with("https://") {
        if let Some(stripped) = s.strip_prefix('/') {
            s = stripped.to_string();
        }
        s = format!("https://{}", s);
    }

    s
}
