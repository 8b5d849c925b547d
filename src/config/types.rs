use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sumi-Recrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "spider")]
    pub spiders: Vec<SpiderConfig>,
}

/// Scheduling and fetching behaviour shared by every spider
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Baseline refetch delay in seconds
    #[serde(rename = "refetching-delay")]
    pub refetching_delay: u64,

    /// Push new or changed URLs to the shared realtime queue
    #[serde(default)]
    pub realtime: bool,

    /// Default refetch strategy
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Seconds to wait when no queue has a due item
    #[serde(rename = "idle-wait", default = "default_idle_wait")]
    pub idle_wait: u64,

    /// Fetch attempts before giving up on connection errors
    #[serde(rename = "fetch-max-attempts", default = "default_fetch_max_attempts")]
    pub fetch_max_attempts: u32,

    /// Linear backoff unit between fetch attempts (seconds)
    #[serde(rename = "fetch-backoff", default = "default_fetch_backoff")]
    pub fetch_backoff: u64,

    /// Retries for 500/502/504 responses within one attempt
    #[serde(rename = "status-retries", default = "default_status_retries")]
    pub status_retries: u32,

    /// Request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Which refetch strategy to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    Base,
    TimeSensitive,
}

/// Backing store for queues and seen records
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

/// Where parsed documents go
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "type", default)]
    pub kind: OutputKind,

    /// File path for the `file` and `keyed-store` sinks
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    #[default]
    Stdout,
    File,
    KeyedStore,
}

/// Per-site crawl rules
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Unique name; prefixes every queue and store of this spider
    pub name: String,

    /// Seeds, refetched every `restart-delay` seconds
    #[serde(rename = "start-urls", default)]
    pub start_urls: Vec<String>,

    /// Domains we may crawl; empty means any (wildcards like `*.example.com`)
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Regexes (anchored at the start) of pages never crawled
    #[serde(rename = "exclude-pages", default)]
    pub exclude_pages: Vec<String>,

    /// Links are only extracted from pages shallower than this
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Seconds between refetches of start URLs; 0 disables them
    #[serde(rename = "restart-delay", default = "default_restart_delay")]
    pub restart_delay: u64,

    /// Pause after each successful fetch (seconds)
    #[serde(default = "default_delay")]
    pub delay: u64,

    #[serde(rename = "use-canonical", default = "default_true")]
    pub use_canonical: bool,

    #[serde(rename = "nofollow-compliant", default = "default_true")]
    pub nofollow_compliant: bool,

    #[serde(rename = "robots-compliant", default = "default_true")]
    pub robots_compliant: bool,

    /// Query parameters stripped during normalization
    #[serde(rename = "normalize-params", default)]
    pub normalize_params: Vec<String>,

    /// JSON-lines file of bootstrap URLs
    pub urllist: Option<String>,

    /// Request headers (set at least a User-Agent)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Fallback charset when the response does not declare one
    #[serde(rename = "default-encoding", default = "default_encoding")]
    pub default_encoding: String,

    /// Overrides `crawler.strategy` for this spider
    pub strategy: Option<StrategyKind>,
}

fn default_idle_wait() -> u64 {
    5
}

fn default_fetch_max_attempts() -> u32 {
    5
}

fn default_fetch_backoff() -> u64 {
    600
}

fn default_status_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_database_path() -> String {
    "./recrawl.db".to_string()
}

fn default_depth() -> u32 {
    2
}

fn default_restart_delay() -> u64 {
    120
}

fn default_delay() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_encoding() -> String {
    "utf-8".to_string()
}
