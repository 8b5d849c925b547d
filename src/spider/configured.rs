use crate::config::SpiderConfig;
use crate::output::Document;
use crate::seen::fingerprint_text;
use crate::spider::html::parse_html;
use crate::spider::Spider;
use crate::state::DocumentMeta;
use crate::url::{extract_domain, is_domain_allowed, normalize_query};
use crate::{CrawlError, UrlError};
use chrono::Utc;
use regex::Regex;
use url::Url;

/// A spider driven entirely by its `[[spider]]` table
#[derive(Debug, Clone)]
pub struct ConfiguredSpider {
    config: SpiderConfig,
    excludes: Vec<Regex>,
}

impl ConfiguredSpider {
    /// Compiles the exclude patterns of `config`
    ///
    /// Patterns only match at the start of a URL.
    pub fn new(config: SpiderConfig) -> Result<Self, CrawlError> {
        let excludes = config
            .exclude_pages
            .iter()
            .map(|pattern| Regex::new(&format!("^(?:{})", pattern)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { config, excludes })
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excludes.iter().any(|re| re.is_match(url))
    }

    /// Returns true if the domain of `url` is allowed; unparsable URLs are not
    pub fn is_allowed(&self, url: &str) -> bool {
        extract_domain(url)
            .map(|domain| is_domain_allowed(&self.config.allowed_domains, &domain))
            .unwrap_or(false)
    }
}

impl Spider for ConfiguredSpider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn settings(&self) -> &SpiderConfig {
        &self.config
    }

    fn normalize_url(&self, url: &str) -> String {
        normalize_query(url, &self.config.normalize_params)
    }

    fn check_and_normalize(&self, url: &str) -> (String, bool) {
        if self.is_excluded(url) || !self.is_allowed(url) {
            return (url.to_string(), true);
        }

        let normalized = self.normalize_url(url);
        let drop = normalized != url;
        (normalized, drop)
    }

    fn parse(&self, mut meta: DocumentMeta) -> Result<(Document, DocumentMeta), CrawlError> {
        let page = meta
            .response
            .as_ref()
            .ok_or_else(|| CrawlError::MissingResponse {
                url: meta.url.clone(),
            })?;

        let doc_url = self.normalize_url(&page.final_url);
        let page_url = Url::parse(&page.final_url)
            .map_err(|e| UrlError::Parse(format!("{}: {}", page.final_url, e)))?;

        let (title, fingerprint, canonical, links) = if page.is_html() {
            let parsed = parse_html(&page.body, &page_url);
            let links = if meta.depth < self.config.depth {
                let mut links: Vec<String> = Vec::new();
                for link in parsed.links {
                    if link.nofollow && self.config.nofollow_compliant {
                        continue;
                    }
                    if self.is_excluded(&link.url) || !self.is_allowed(&link.url) {
                        continue;
                    }
                    let normalized = self.normalize_url(&link.url);
                    if !links.contains(&normalized) {
                        links.push(normalized);
                    }
                }
                links
            } else {
                Vec::new()
            };
            (
                parsed.title,
                fingerprint_text(&parsed.text),
                parsed.canonical,
                links,
            )
        } else {
            (None, fingerprint_text(&page.body), None, Vec::new())
        };

        let document = Document {
            url: doc_url.clone(),
            raw_html: page.body.clone(),
            title,
            fetched_time: Utc::now().format("%Y-%m-%dT%H:%M").to_string(),
            status: page.status,
            hash: format!("{:016x}", fingerprint),
            domain: extract_domain(&doc_url).unwrap_or_default(),
        };

        meta.fingerprint = fingerprint;
        meta.links = links;
        if self.config.use_canonical {
            if let Some(canonical) = canonical {
                let normalized = self.normalize_url(&canonical);
                meta.push_alternative(normalized);
            }
        }

        Ok((document, meta))
    }
}
