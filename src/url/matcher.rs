/// Checks if a domain matches an allowed-domain pattern
///
/// `"example.com"` only matches itself, while `"*.example.com"` matches the
/// bare domain and any subdomain of it. Ports are part of the domain, so
/// `"127.0.0.1:8080"` does not match `"127.0.0.1:9090"`.
///
/// # Arguments
///
/// * `pattern` - The domain pattern, optionally starting with "*."
/// * `candidate` - The lowercase `host[:port]` to check
///
/// # Examples
///
/// ```
/// use sumi_recrawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("www.mediagol.it", "www.mediagol.it"));
/// assert!(matches_wildcard("*.mediagol.it", "mediagol.it"));
/// assert!(matches_wildcard("*.mediagol.it", "video.mediagol.it"));
/// assert!(!matches_wildcard("*.mediagol.it", "notmediagol.it"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
