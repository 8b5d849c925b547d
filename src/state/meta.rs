use crate::state::{FetchStatus, Source};

/// An HTTP response attached to a crawl attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status: u16,

    /// Value of the Content-Type header, if any
    pub content_type: Option<String>,

    /// Decoded response body
    pub body: String,
}

impl FetchedPage {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Returns true if the body looks like an HTML document
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.to_lowercase().contains("text/html"),
            None => true,
        }
    }
}

/// In-flight descriptor of one crawl attempt
///
/// Created by `QueueManager::pop`, filled in by the fetcher and the spider, and
/// consumed by `QueueManager::add_seen_and_reschedule`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMeta {
    pub url: String,

    /// Link distance from a start URL
    pub depth: u32,

    /// Links discovered on the page
    pub links: Vec<String>,

    /// URLs known to serve this same page
    pub alternatives: Vec<String>,

    /// Delay (seconds) that scheduled this attempt; 0 if none
    pub delay: u64,

    pub source: Source,

    /// Simhash of the page text; 0 if unset
    pub fingerprint: u64,

    pub response: Option<FetchedPage>,

    pub status: FetchStatus,
}

impl DocumentMeta {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// The descriptor returned when no queue has a due item
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }

    /// Returns true only if a response with status 200 was received
    pub fn responded_ok(&self) -> bool {
        self.response.as_ref().is_some_and(FetchedPage::is_ok)
    }

    /// Adds a URL to the alternatives unless it is already there
    pub fn push_alternative(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !url.is_empty() && !self.alternatives.contains(&url) {
            self.alternatives.push(url);
        }
    }
}
