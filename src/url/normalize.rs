use url::form_urlencoded;

/// Normalizes the query string of a URL
///
/// Scheme, host and path are kept verbatim; only the query and fragment are
/// rewritten.
///
/// # Normalization Steps
///
/// 1. Remove the fragment (everything after #)
/// 2. Drop parameters with a blank value
/// 3. Drop parameters listed in `drop_params`
/// 4. Sort the remaining parameters by name when more than one remains
/// 5. Remove the query entirely when nothing remains
///
/// Repeated parameters are grouped under their first occurrence.
///
/// # Examples
///
/// ```
/// use sumi_recrawl::url::normalize_query;
///
/// let url = normalize_query("http://example.com/p?b=2&ref=home&a=1#top", &["ref".to_string()]);
/// assert_eq!(url, "http://example.com/p?a=1&b=2");
/// ```
pub fn normalize_query(url: &str, drop_params: &[String]) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);

    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, query),
        None => return without_fragment.to_string(),
    };

    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.trim().is_empty() || drop_params.iter().any(|p| p.as_str() == key) {
            continue;
        }
        match params.iter_mut().find(|(k, _)| k.as_str() == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => params.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    if params.is_empty() {
        return base.to_string();
    }

    if params.len() > 1 {
        params.sort_by(|a, b| a.0.cmp(&b.0));
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in &params {
        for value in values {
            serializer.append_pair(key, value);
        }
    }

    format!("{}?{}", base, serializer.finish())
}
