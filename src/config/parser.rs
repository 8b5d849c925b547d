use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a crawl can be traced back to the rules it ran with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, OutputKind, StrategyKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawler]
refetching-delay = 86400
realtime = true
strategy = "time-sensitive"

[storage]
backend = "memory"

[output]
type = "file"
path = "./documents.jsonl"

[[spider]]
name = "mediagol"
start-urls = ["http://www.mediagol.it"]
allowed-domains = ["www.mediagol.it"]
exclude-pages = [".*http://www\\.mediagol\\.it/foto/.*"]
normalize-params = ["ref"]

[spider.headers]
User-Agent = "TestCrawler/1.0"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.refetching_delay, 86400);
        assert!(config.crawler.realtime);
        assert_eq!(config.crawler.strategy, StrategyKind::TimeSensitive);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.output.kind, OutputKind::File);
        assert_eq!(config.spiders.len(), 1);

        let spider = &config.spiders[0];
        assert_eq!(spider.name, "mediagol");
        assert_eq!(spider.headers.get("User-Agent").unwrap(), "TestCrawler/1.0");
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(
            r#"
[crawler]
refetching-delay = 3600

[[spider]]
name = "site"
start-urls = ["https://example.com/"]
"#,
        )
        .unwrap();

        assert!(!config.crawler.realtime);
        assert_eq!(config.crawler.fetch_max_attempts, 5);
        assert_eq!(config.crawler.fetch_backoff, 600);
        assert_eq!(config.storage.backend, BackendKind::Sqlite);
        assert_eq!(config.output.kind, OutputKind::Stdout);

        let spider = &config.spiders[0];
        assert_eq!(spider.depth, 2);
        assert_eq!(spider.restart_delay, 120);
        assert_eq!(spider.delay, 20);
        assert!(spider.use_canonical);
        assert!(spider.robots_compliant);
        assert_eq!(spider.default_encoding, "utf-8");
        assert!(spider.strategy.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config(
            r#"
[crawler]
refetching-delay = 0
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
