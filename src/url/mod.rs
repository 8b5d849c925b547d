//! URL handling module for Sumi-Recrawl
//!
//! This module provides the canonical form used as the seen-store key, domain
//! extraction, wildcard matching of allowed domains and query normalization.

mod canonical;
mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use canonical::canonicalize;
pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::normalize_query;

/// Returns true if `domain` is accepted by the allowed-domain patterns
///
/// An empty pattern list accepts every domain.
///
/// # Arguments
///
/// * `allowed` - Domain patterns, optionally starting with "*."
/// * `domain` - The lowercase `host[:port]` of a URL
///
/// # Examples
///
/// ```
/// use sumi_recrawl::url::is_domain_allowed;
///
/// let allowed = vec!["*.example.com".to_string()];
/// assert!(is_domain_allowed(&allowed, "blog.example.com"));
/// assert!(!is_domain_allowed(&allowed, "example.org"));
/// assert!(is_domain_allowed(&[], "anything.net"));
/// ```
pub fn is_domain_allowed(allowed: &[String], domain: &str) -> bool {
    allowed.is_empty()
        || allowed
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_allows_everything() {
        assert!(is_domain_allowed(&[], "example.com"));
    }

    #[test]
    fn test_exact_domain_with_port() {
        let allowed = vec!["127.0.0.1:8080".to_string()];
        assert!(is_domain_allowed(&allowed, "127.0.0.1:8080"));
        assert!(!is_domain_allowed(&allowed, "127.0.0.1:9090"));
    }

    #[test]
    fn test_pattern_case_is_ignored() {
        let allowed = vec!["WWW.Mediagol.it".to_string()];
        assert!(is_domain_allowed(&allowed, "www.mediagol.it"));
    }
}
