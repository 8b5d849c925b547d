//! Spiders: per-site crawl policy
//!
//! A spider decides which URLs belong to its site, how they are normalized and
//! how a fetched page becomes a document plus outgoing links. The
//! [`SpiderRegistry`] holds one spider per `[[spider]]` table.

mod bootstrap;
mod configured;
mod html;

pub use bootstrap::{load_bootstrap, BootstrapEntry};
pub use configured::ConfiguredSpider;
pub use html::{parse_html, ExtractedLink, ParsedHtml};

use crate::config::SpiderConfig;
use crate::output::Document;
use crate::state::DocumentMeta;
use crate::CrawlError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Crawl policy of one site
pub trait Spider: Send + Sync {
    fn name(&self) -> &str;

    fn settings(&self) -> &SpiderConfig;

    /// Rewrites `url` into its normalized form
    fn normalize_url(&self, url: &str) -> String;

    /// Checks a dequeued URL
    ///
    /// # Returns
    ///
    /// The normalized URL and whether the dequeued one should be dropped: it is
    /// excluded, outside the allowed domains, or not in normalized form.
    fn check_and_normalize(&self, url: &str) -> (String, bool);

    /// Turns a fetched page into a document and its outgoing links
    ///
    /// The returned meta carries the fingerprint, the links to follow and any
    /// canonical alternative.
    fn parse(&self, meta: DocumentMeta) -> Result<(Document, DocumentMeta), CrawlError>;
}

/// Spiders by name
#[derive(Default, Clone)]
pub struct SpiderRegistry {
    spiders: BTreeMap<String, Arc<dyn Spider>>,
}

impl SpiderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one [`ConfiguredSpider`] per configuration table
    pub fn from_config(configs: &[SpiderConfig]) -> Result<Self, CrawlError> {
        let mut registry = Self::new();
        for config in configs {
            registry.register(Arc::new(ConfiguredSpider::new(config.clone())?));
        }
        Ok(registry)
    }

    /// Adds a spider, replacing any spider with the same name
    pub fn register(&mut self, spider: Arc<dyn Spider>) {
        self.spiders.insert(spider.name().to_string(), spider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Spider>> {
        self.spiders.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.spiders.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.spiders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spiders.is_empty()
    }

    /// Selects spiders by name; an empty selection means all of them
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Arc<dyn Spider>>)` - The selected spiders
    /// * `Err(CrawlError::UnknownSpider)` - A name is not registered
    pub fn select(&self, names: &[String]) -> Result<Vec<Arc<dyn Spider>>, CrawlError> {
        if names.is_empty() {
            return Ok(self.spiders.values().cloned().collect());
        }

        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| CrawlError::UnknownSpider(name.clone()))
            })
            .collect()
    }
}
