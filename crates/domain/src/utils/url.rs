//! Link canonicalization for deduplication.
//!
//! Two captures of the same article shared from different apps often differ
//! only in tracking parameters, default ports, or trailing slashes. The
//! normalized form below is what the queue compares when deciding whether a
//! new capture coalesces with an active entry.

use url::form_urlencoded;
use url::Url;

use crate::constants::TRACKING_QUERY_KEYS;

/// Canonical form of an absolute `http`/`https` URL, or `None` if the input
/// is blank, relative, uses another scheme, or has no host.
///
/// ```
/// use linkstash_domain::normalize_url;
///
/// assert_eq!(
///     normalize_url(" HTTPS://Example.com:443//news//story/?utm_source=x&b=2&a=1#top ").as_deref(),
///     Some("https://example.com/news/story?a=1&b=2"),
/// );
/// assert_eq!(normalize_url("mailto:someone@example.com"), None);
/// ```
#[must_use]
pub fn normalize_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = Url::parse(trimmed).ok()?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }
    let host = parsed.host_str()?.trim().to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    // `Url` already reports `None` for the scheme's default port.
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    let path = collapse_path(parsed.path());

    let mut kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter_map(|(key, value)| {
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() || is_tracking_key(key) {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect();
    kept.sort_by(|(ka, va), (kb, vb)| ka.to_lowercase().cmp(&kb.to_lowercase()).then(va.cmp(vb)));

    let mut normalized = format!("{scheme}://{authority}{path}");
    if !kept.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(kept).finish();
        normalized.push('?');
        normalized.push_str(&query);
    }
    Some(normalized)
}

/// Key used to detect duplicate active entries.
///
/// Falls back to the trimmed input for records whose URL does not normalize,
/// which only happens for data loaded from disk.
#[must_use]
pub fn dedup_key(value: &str) -> String {
    normalize_url(value).unwrap_or_else(|| value.trim().to_string())
}

fn is_tracking_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    lowered.starts_with("utm_") || TRACKING_QUERY_KEYS.contains(&lowered.as_str())
}

fn collapse_path(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len() + 1);
    for ch in path.chars() {
        if ch == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(ch);
    }
    while collapsed.len() > 1 && collapsed.ends_with('/') {
        collapsed.pop();
    }
    if collapsed.is_empty() {
        collapsed.push('/');
    }
    collapsed
}
