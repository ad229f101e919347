// src/utils/url.rs

//! URL manipulation utilities.

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters that only carry tracking state.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_cid", "mc_eid", "ref", "aff"];

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use career_events::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/path/", "page.html"),
///     "https://example.com/path/page.html"
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(href.trim())) {
        Ok(url) => url.to_string(),
        Err(_) => href.trim().to_string(),
    }
}

/// Extract the lowercased host from a URL.
///
/// # Examples
/// ```
/// use career_events::utils::url::get_domain;
///
/// assert_eq!(
///     get_domain("https://Example.COM/path"),
///     Some("example.com".to_string())
/// );
/// ```
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_lowercase()))
}

/// True if `host` equals `domain` or is one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Canonical form used for cache keys.
///
/// Lowercases scheme and host (the `url` crate does both), drops the
/// fragment and tracking parameters, sorts the remaining query pairs and
/// trims a trailing slash from non-root paths.
pub fn canonicalize(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let key = k.to_lowercase();
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// SHA-256 hex digest of the canonical URL.
pub fn url_hash(raw: &str) -> String {
    hex::encode(Sha256::digest(canonicalize(raw).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        assert_eq!(
            resolve("https://example.com/path/", "https://other.com/page"),
            "https://other.com/page"
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        assert_eq!(
            resolve("https://example.com/path/", "/root.html"),
            "https://example.com/root.html"
        );
    }

    #[test]
    fn test_resolve_relative_from_file() {
        assert_eq!(
            resolve("https://example.com/path/index.html", "other.html"),
            "https://example.com/path/other.html"
        );
    }

    #[test]
    fn test_resolve_with_unparseable_base_keeps_href() {
        assert_eq!(resolve("https//uio.no/", "/e/1"), "/e/1");
        assert_eq!(resolve("https://uio.no/", "/e/1"), "https://uio.no/e/1");
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://sub.Example.com:8080/path"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(get_domain("invalid-url"), None);
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("nav.no", "nav.no"));
        assert!(host_matches("arbeidsplassen.nav.no", "nav.no"));
        assert!(!host_matches("notnav.no", "nav.no"));
        assert!(host_matches("www.ntnu.edu", ".edu"));
    }

    #[test]
    fn test_canonicalize_drops_noise() {
        assert_eq!(
            canonicalize("HTTPS://Example.com/Events/?utm_source=x&b=2&a=1#top"),
            "https://example.com/Events?a=1&b=2"
        );
        assert_eq!(
            canonicalize("https://example.com/?fbclid=abc"),
            "https://example.com/"
        );
    }

    #[test]
    fn test_url_hash_is_canonical() {
        assert_eq!(
            url_hash("https://example.com/e/1/?utm_medium=mail"),
            url_hash("https://EXAMPLE.com/e/1")
        );
        assert_eq!(url_hash("https://example.com").len(), 64);
    }
}
