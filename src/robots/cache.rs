//! Cache entry for one domain's robots.txt
//!
//! Entries expire after 24 hours so rule changes made by the site are picked
//! up by long-running crawls.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Parsed robots.txt of a domain and when it was fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub content: ParsedRobots,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Returns true once the entry is older than 24 hours
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.content.is_allowed(url, user_agent)
    }
}
