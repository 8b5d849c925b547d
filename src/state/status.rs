//! Status and source tags for crawl attempts

use std::fmt;

/// The queue a URL was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    /// Not popped from any queue yet
    #[default]
    Unknown,

    /// Start URLs, refetched every `restart-delay` seconds
    Priority,

    /// Newly discovered links, ordered by depth
    Normal,

    /// Previously fetched pages waiting for their next visit
    Refetch,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Priority => "priority",
            Self::Normal => "normal",
            Self::Refetch => "refetch",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the last fetch attempt of a URL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchStatus {
    /// Not fetched yet
    #[default]
    Pending,

    /// A response was received (any HTTP status)
    Success,

    /// Connection-level failure; worth retrying later
    ConnectionError,

    /// Timeout, redirect loop, bad URL or HTTP error; skipped this cycle
    SkipUrl,

    /// Anything else
    GenericError,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::ConnectionError => "connection_error",
            Self::SkipUrl => "skip_url",
            Self::GenericError => "generic_error",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
