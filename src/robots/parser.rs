//! Robots.txt rules, matched with the robotstxt crate

use robotstxt::DefaultMatcher;

/// The rules a site published in its robots.txt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRobots {
    /// No usable robots.txt; everything may be fetched
    AllowAll,

    /// Access to robots.txt was refused; nothing may be fetched
    DisallowAll,

    /// Raw robots.txt body
    Rules(String),
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::AllowAll
        } else {
            Self::Rules(content.to_string())
        }
    }

    pub fn allow_all() -> Self {
        Self::AllowAll
    }

    pub fn disallow_all() -> Self {
        Self::DisallowAll
    }

    /// Checks if `url` may be fetched by `user_agent`
    ///
    /// # Arguments
    ///
    /// * `url` - An absolute URL
    /// * `user_agent` - The product token the crawler identifies with
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Rules(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }
}
