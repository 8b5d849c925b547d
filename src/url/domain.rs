use crate::UrlError;
use url::Url;

/// Extracts the domain (`host[:port]`) from a URL string
///
/// The host is lowercased. An explicit port is kept unless it is the default
/// port of the scheme, so `http://example.com:80/` yields `example.com`.
///
/// # Arguments
///
/// * `url` - An absolute URL
///
/// # Returns
///
/// * `Ok(String)` - The lowercase domain
/// * `Err(UrlError)` - The URL could not be parsed or has no host
///
/// # Examples
///
/// ```
/// use sumi_recrawl::url::extract_domain;
///
/// assert_eq!(extract_domain("https://EXAMPLE.COM/path").unwrap(), "example.com");
/// assert_eq!(extract_domain("http://127.0.0.1:8080/").unwrap(), "127.0.0.1:8080");
/// ```
pub fn extract_domain(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UrlError::MissingDomain(url.to_string()))?
        .to_lowercase();

    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
