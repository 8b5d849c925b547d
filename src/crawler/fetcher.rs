//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients from a spider's request headers
//! - Retrying connection failures with a linear backoff
//! - Retrying 500/502/504 responses with an exponential backoff
//! - Classifying failures into transient and terminal ones

use crate::config::CrawlerConfig;
use crate::state::{DocumentMeta, FetchStatus, FetchedPage};
use crate::CrawlError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Statuses worth asking again within one attempt
const RETRY_STATUSES: [u16; 3] = [500, 502, 504];

/// User-Agent sent when the spider's headers do not set one
pub const DEFAULT_USER_AGENT: &str = concat!("sumi-recrawl/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed before the URL is skipped
const MAX_REDIRECTS: usize = 10;

/// How often and how patiently a URL is fetched
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before a connection failure is given up
    pub max_attempts: u32,

    /// Linear backoff unit between attempts
    pub backoff_unit: Duration,

    /// Retries of a 500/502/504 response within one attempt
    pub status_retries: u32,

    /// Base of the exponential backoff between status retries
    pub status_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.fetch_max_attempts.max(1),
            backoff_unit: Duration::from_secs(config.fetch_backoff),
            status_retries: config.status_retries,
            status_backoff: Duration::from_secs(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(600),
            status_retries: 3,
            status_backoff: Duration::from_secs(1),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// A response was received and attached to the meta
    Fetched(DocumentMeta),

    /// Every attempt hit a connection failure; try again on the next schedule
    RetriesExhausted(DocumentMeta),

    /// Timeout, redirect loop, bad URL or HTTP error; skip this cycle
    Skipped { meta: DocumentMeta, reason: String },

    /// Any other failure
    Failed { meta: DocumentMeta, reason: String },
}

impl FetchOutcome {
    pub fn meta(&self) -> &DocumentMeta {
        match self {
            Self::Fetched(meta) | Self::RetriesExhausted(meta) => meta,
            Self::Skipped { meta, .. } | Self::Failed { meta, .. } => meta,
        }
    }
}

/// Builds an HTTP client sending the given default headers
///
/// A `User-Agent` is added when the headers do not set one.
///
/// # Arguments
///
/// * `headers` - Header names and values from the spider configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - A header was invalid or the client could not be built
pub fn build_http_client(
    headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<Client, CrawlError> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| CrawlError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| CrawlError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        header_map.insert(header_name, header_value);
    }

    if !header_map.contains_key(USER_AGENT) {
        header_map.insert(
            USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
    }

    let client = Client::builder()
        .default_headers(header_map)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Maps a request error to the status it leaves a URL in
pub fn classify_error(err: &reqwest::Error) -> FetchStatus {
    if err.is_timeout() || err.is_redirect() || err.is_builder() || err.is_status() {
        FetchStatus::SkipUrl
    } else if err.is_connect() || err.is_request() {
        FetchStatus::ConnectionError
    } else {
        FetchStatus::GenericError
    }
}

/// Sleeps for `duration` unless cancelled first; returns false on cancellation
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Sends one GET, asking again while the server answers 500, 502 or 504
async fn send_with_status_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Response, reqwest::Error> {
    let mut retry = 0;
    loop {
        let response = client.get(url).send().await?;
        let status = response.status().as_u16();

        if !RETRY_STATUSES.contains(&status) || retry >= policy.status_retries {
            return Ok(response);
        }

        let wait = policy.status_backoff.saturating_mul(1 << retry.min(16));
        debug!("{} answered {}, asking again in {:?}", url, status, wait);
        if !pause(wait, cancel).await {
            return Ok(response);
        }
        retry += 1;
    }
}

/// Fetches `meta.url` with bounded retries
///
/// Connection failures are retried up to `policy.max_attempts` times, waiting
/// `backoff_unit * n` before the n-th retry (the first retry is immediate).
/// The wait ends early when `cancel` fires, yielding `RetriesExhausted`.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `meta` - The attempt; its `response` and `status` are filled in
/// * `policy` - Retry limits
/// * `default_encoding` - Charset used when the response declares none
/// * `cancel` - Stops the backoff waits
pub async fn fetch(
    client: &Client,
    mut meta: DocumentMeta,
    policy: &RetryPolicy,
    default_encoding: &str,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let mut failures: u32 = 0;

    loop {
        match send_with_status_retry(client, &meta.url, policy, cancel).await {
            Ok(response) => {
                let final_url = response.url().to_string();
                let status = response.status().as_u16();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                return match response.text_with_charset(default_encoding).await {
                    Ok(body) => {
                        meta.status = FetchStatus::Success;
                        meta.response = Some(FetchedPage {
                            final_url,
                            status,
                            content_type,
                            body,
                        });
                        FetchOutcome::Fetched(meta)
                    }
                    Err(e) => {
                        meta.status = FetchStatus::GenericError;
                        FetchOutcome::Failed {
                            meta,
                            reason: format!("reading body failed: {}", e),
                        }
                    }
                };
            }
            Err(e) => {
                meta.status = classify_error(&e);
                match meta.status {
                    FetchStatus::SkipUrl => {
                        return FetchOutcome::Skipped {
                            meta,
                            reason: e.to_string(),
                        };
                    }
                    FetchStatus::ConnectionError => {
                        failures += 1;
                        if failures >= policy.max_attempts {
                            warn!(
                                "Giving up on {} after {} attempts: {}",
                                meta.url, failures, e
                            );
                            return FetchOutcome::RetriesExhausted(meta);
                        }

                        let wait = policy.backoff_unit.saturating_mul(failures - 1);
                        debug!(
                            "Connection to {} failed ({}), attempt {} of {}, retrying in {:?}",
                            meta.url, e, failures, policy.max_attempts, wait
                        );
                        if !pause(wait, cancel).await {
                            return FetchOutcome::RetriesExhausted(meta);
                        }
                    }
                    _ => {
                        return FetchOutcome::Failed {
                            meta,
                            reason: e.to_string(),
                        };
                    }
                }
            }
        }
    }
}
