//! Robots.txt handling module
//!
//! [`RobotsCache`] fetches `robots.txt` once per domain, keeps it for a day and
//! filters discovered links against it.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Reduces a User-Agent header to the product token robots.txt groups match on
///
/// `"sumi-recrawl/0.1 (+http://example.com)"` becomes `"sumi-recrawl"`.
pub fn product_token(user_agent: &str) -> &str {
    let token = user_agent
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .next()
        .unwrap_or("");
    if token.is_empty() {
        "*"
    } else {
        token
    }
}

/// Per-domain robots.txt cache shared by one spider's crawl loop
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    /// # Arguments
    ///
    /// * `client` - The spider's HTTP client
    /// * `user_agent` - The User-Agent the client sends
    pub fn new(client: Client, user_agent: &str) -> Self {
        Self {
            client,
            user_agent: product_token(user_agent).to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Downloads and parses the robots.txt at `robots_url`
    ///
    /// 401 and 403 disallow the whole site; any other failure allows it.
    async fn fetch(&self, robots_url: &str) -> ParsedRobots {
        let response = match self.client.get(robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {}: {}", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!("{} answered {}, disallowing all", robots_url, status);
            return ParsedRobots::disallow_all();
        }
        if !status.is_success() {
            debug!("{} answered {}, allowing all", robots_url, status);
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                warn!("Failed to read {}: {}", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }

    /// Checks if `url` may be fetched
    ///
    /// The domain's robots.txt is fetched on first use and again once the
    /// cached copy is stale. URLs that do not parse are rejected.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let key = match parsed.port() {
            Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
            None => format!("{}://{}", parsed.scheme(), host),
        };

        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key).filter(|e| !e.is_stale()) {
                return entry.is_allowed(url, &self.user_agent);
            }
        }

        let robots = self.fetch(&format!("{}/robots.txt", key)).await;
        let allowed = robots.is_allowed(url, &self.user_agent);
        self.entries.lock().await.insert(key, CachedRobots::new(robots));
        allowed
    }

    /// Keeps the links robots.txt allows, in order
    pub async fn filter(&self, links: Vec<String>) -> Vec<String> {
        let mut allowed = Vec::with_capacity(links.len());
        for link in links {
            if self.is_allowed(&link).await {
                allowed.push(link);
            } else {
                debug!("Disallowed by robots.txt: {}", link);
            }
        }
        allowed
    }

    /// Number of domains currently cached
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
