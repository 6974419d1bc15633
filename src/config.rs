use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Translation service
    pub translate_api_url: String,
    pub request_timeout: Duration,

    // Local cache
    pub store_dir: PathBuf,

    // Failure backoff (disabled when initial delay is zero)
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backoff_ms: u64 = parse_env("TRANSLATION_RETRY_BACKOFF_MS", 0)?;
        let max_backoff_ms: u64 = parse_env("TRANSLATION_RETRY_MAX_BACKOFF_MS", 60_000)?;
        let multiplier: f64 = parse_env("TRANSLATION_RETRY_BACKOFF_MULTIPLIER", 2.0)?;

        Ok(Self {
            translate_api_url: std::env::var("TRANSLATE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000/translate".to_string()),
            request_timeout: Duration::from_secs(parse_env("TRANSLATE_TIMEOUT_SECS", 30)?),

            store_dir: std::env::var("TRANSLATION_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".storefront-i18n")),

            retry: RetryConfig::new(Duration::from_millis(backoff_ms))
                .with_max_delay(Duration::from_millis(max_backoff_ms))
                .with_backoff_multiplier(multiplier),
        })
    }
}

/// Read a numeric variable, falling back to `default` when it is unset.
/// A value that is set but unparseable is a configuration error.
fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "TRANSLATE_API_URL",
        "TRANSLATE_TIMEOUT_SECS",
        "TRANSLATION_STORE_DIR",
        "TRANSLATION_RETRY_BACKOFF_MS",
        "TRANSLATION_RETRY_MAX_BACKOFF_MS",
        "TRANSLATION_RETRY_BACKOFF_MULTIPLIER",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().expect("defaults should load");

        assert_eq!(config.translate_api_url, "http://localhost:8000/translate");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.store_dir, PathBuf::from(".storefront-i18n"));
        assert!(!config.retry.is_enabled());
        assert_eq!(config.retry.backoff_multiplier, 2.0);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TRANSLATE_API_URL", "https://ai.example.com/translate");
        std::env::set_var("TRANSLATE_TIMEOUT_SECS", "5");
        std::env::set_var("TRANSLATION_STORE_DIR", "/tmp/cache");
        std::env::set_var("TRANSLATION_RETRY_BACKOFF_MS", "250");
        std::env::set_var("TRANSLATION_RETRY_MAX_BACKOFF_MS", "1000");
        std::env::set_var("TRANSLATION_RETRY_BACKOFF_MULTIPLIER", "1.5");

        let config = Config::from_env().expect("overrides should load");
        clear_env();

        assert_eq!(config.translate_api_url, "https://ai.example.com/translate");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.store_dir, PathBuf::from("/tmp/cache"));
        assert!(config.retry.is_enabled());
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_millis(1000));
        assert_eq!(config.retry.backoff_multiplier, 1.5);
        assert_eq!(config.retry.delay_for_failure(2), Duration::from_millis(375));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_non_numeric_timeout() {
        clear_env();
        std::env::set_var("TRANSLATE_TIMEOUT_SECS", "soon");

        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("TRANSLATE_TIMEOUT_SECS"));
    }
}
