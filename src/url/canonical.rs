/// Bytes that are never percent-encoded in canonical keys
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-' | b'/')
}

/// Produces the canonical key of a URL
///
/// The canonical form identifies a page in the seen store. Variants that only
/// differ by scheme or trailing slashes share one key.
///
/// # Canonicalization Steps
///
/// 1. Strip trailing slashes
/// 2. Strip a leading `https://` or `http://`
/// 3. Percent-encode every byte outside `A-Z a-z 0-9 _ . - /`, so `~` becomes `%7E`
///
/// # Examples
///
/// ```
/// use sumi_recrawl::url::canonicalize;
///
/// assert_eq!(canonicalize("https://www.google.it/"), "www.google.it");
/// assert_eq!(
///     canonicalize("https://www.google.it?test=10&q=1"),
///     "www.google.it%3Ftest%3D10%26q%3D1"
/// );
/// ```
pub fn canonicalize(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let stripped = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let mut out = String::with_capacity(stripped.len());
    for &byte in stripped.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_and_trailing_slash_removed() {
        let cases = [
            ("http://www.google.it", "www.google.it"),
            ("https://www.google.it", "www.google.it"),
            ("https://www.google.it/", "www.google.it"),
            ("http://www.google.it///", "www.google.it"),
            ("www.google.it", "www.google.it"),
        ];

        for (input, expected) in cases {
            assert_eq!(canonicalize(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_query_is_percent_encoded() {
        assert_eq!(
            canonicalize("https://www.google.it?test=10&q=1"),
            "www.google.it%3Ftest%3D10%26q%3D1"
        );
    }

    #[test]
    fn test_path_kept() {
        assert_eq!(
            canonicalize("http://example.com/a/b_c-d.html"),
            "example.com/a/b_c-d.html"
        );
    }

    #[test]
    fn test_tilde_encoded() {
        assert_eq!(canonicalize("http://example.com/~user/"), "example.com/%7Euser");
        assert_eq!(canonicalize("https://example.com/~a_b.c-d"), "example.com/%7Ea_b.c-d");
    }

    #[test]
    fn test_port_colon_encoded() {
        assert_eq!(canonicalize("http://127.0.0.1:8080/x"), "127.0.0.1%3A8080/x");
    }

    #[test]
    fn test_non_ascii_encoded_as_utf8() {
        assert_eq!(canonicalize("http://example.com/caffè"), "example.com/caff%C3%A8");
    }

    #[test]
    fn test_other_scheme_untouched() {
        assert_eq!(canonicalize("ftp://example.com"), "ftp%3A//example.com");
    }
}
