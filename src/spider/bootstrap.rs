//! Bootstrap URL lists
//!
//! A spider's `urllist` file holds one JSON object per line, e.g.
//! `{"url": "http://example.com/a", "depth": 1}`. The depth may also be a
//! numeric string. Entries outside the spider's allowed domains and the
//! spider's own start URLs are skipped at load time.

use crate::config::SpiderConfig;
use crate::url::{extract_domain, is_domain_allowed};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// A URL to enqueue at startup, with its recorded depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEntry {
    pub url: String,
    pub depth: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDepth {
    Number(u32),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    url: String,
    #[serde(default)]
    depth: Option<RawDepth>,
}

impl RawEntry {
    fn depth(&self) -> Option<u32> {
        match &self.depth {
            None => Some(0),
            Some(RawDepth::Number(n)) => Some(*n),
            Some(RawDepth::Text(s)) => s.trim().parse().ok(),
        }
    }
}

/// Loads the bootstrap list of a spider
///
/// # Arguments
///
/// * `path` - The JSON-lines file
/// * `config` - The spider owning the list
///
/// # Returns
///
/// The accepted entries in file order. A missing or unreadable file yields an
/// empty list; malformed lines are skipped.
pub fn load_bootstrap(path: &Path, config: &SpiderConfig) -> Vec<BootstrapEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                spider = %config.name,
                "Cannot read bootstrap list {}: {}",
                path.display(),
                e
            );
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: RawEntry = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Skipping bootstrap line {}: {}", number + 1, e);
                continue;
            }
        };
        let Some(depth) = raw.depth() else {
            debug!("Skipping bootstrap line {}: bad depth", number + 1);
            continue;
        };

        if config.start_urls.contains(&raw.url) {
            continue;
        }
        let allowed = extract_domain(&raw.url)
            .map(|domain| is_domain_allowed(&config.allowed_domains, &domain))
            .unwrap_or(false);
        if !allowed {
            continue;
        }

        entries.push(BootstrapEntry {
            url: raw.url,
            depth,
        });
    }

    debug!(
        spider = %config.name,
        "Loaded {} bootstrap URLs from {}",
        entries.len(),
        path.display()
    );
    entries
}
