use crate::config::types::{
    BackendKind, Config, CrawlerConfig, OutputConfig, OutputKind, SpiderConfig, StorageConfig,
};
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    validate_output_config(&config.output)?;
    validate_spiders(&config.spiders)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.refetching_delay == 0 {
        return Err(ConfigError::Validation(
            "refetching-delay must be > 0".to_string(),
        ));
    }

    if config.fetch_max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-max-attempts must be >= 1, got {}",
            config.fetch_max_attempts
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.backend == BackendKind::Sqlite && config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty with the sqlite backend".to_string(),
        ));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let needs_path = matches!(config.kind, OutputKind::File | OutputKind::KeyedStore);
    let has_path = config.path.as_deref().is_some_and(|p| !p.is_empty());

    if needs_path && !has_path {
        return Err(ConfigError::Validation(format!(
            "output type {:?} requires a path",
            config.kind
        )));
    }

    Ok(())
}

/// Validates every spider entry
fn validate_spiders(spiders: &[SpiderConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for spider in spiders {
        validate_spider_name(&spider.name)?;

        if !names.insert(spider.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "spider name '{}' is used more than once",
                spider.name
            )));
        }

        for seed in &spider.start_urls {
            let url = Url::parse(seed).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", seed, e))
            })?;

            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Validation(format!(
                    "Start URL '{}' must use http or https",
                    seed
                )));
            }
        }

        for pattern in &spider.allowed_domains {
            validate_domain_pattern(pattern)?;
        }

        for pattern in &spider.exclude_pages {
            Regex::new(pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("exclude-pages '{}': {}", pattern, e))
            })?;
        }
    }

    Ok(())
}

/// Spider names end up in queue and table keys
fn validate_spider_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "spider name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "spider name must contain only alphanumeric characters, '-' and '_', got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards and ports)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    let host = match domain.rsplit_once(':') {
        Some((host, port)) => {
            if port.parse::<u16>().is_err() {
                return Err(ConfigError::InvalidPattern(format!(
                    "Domain '{}' has an invalid port",
                    pattern
                )));
            }
            host
        }
        None => domain,
    };

    validate_domain_string(host)
}

/// Validates a host name (without wildcard prefix or port)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
