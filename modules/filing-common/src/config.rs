use std::env;
use std::time::Duration;

use tracing::info;

const DEFAULT_EXTRACTION_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_DISCLOSURE_BASE_URL: &str = "https://disclosures-clerk.house.gov";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10 * 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI provider
    pub anthropic_api_key: String,
    pub extraction_model: String,

    // Disclosure source
    pub disclosure_base_url: String,

    // Monitor timing
    pub check_interval: Duration,
    pub attempt_timeout: Duration,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| panic!("{key} environment variable is required"))
        };
        let secs = |key: &str, default: u64| {
            lookup(key)
                .map(|v| {
                    v.parse::<u64>()
                        .unwrap_or_else(|_| panic!("{key} must be a number of seconds"))
                })
                .unwrap_or(default)
        };

        Self {
            database_url: required("DATABASE_URL"),
            anthropic_api_key: required("ANTHROPIC_API_KEY"),
            extraction_model: lookup("EXTRACTION_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTION_MODEL.to_string()),
            disclosure_base_url: lookup("DISCLOSURE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DISCLOSURE_BASE_URL.to_string()),
            check_interval: Duration::from_secs(secs(
                "CHECK_INTERVAL_SECS",
                DEFAULT_CHECK_INTERVAL_SECS,
            )),
            attempt_timeout: Duration::from_secs(secs(
                "ATTEMPT_TIMEOUT_SECS",
                DEFAULT_ATTEMPT_TIMEOUT_SECS,
            )),
            web_host: lookup("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: lookup("WEB_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    /// Log the loaded configuration with secrets omitted.
    pub fn log_redacted(&self) {
        info!(
            extraction_model = %self.extraction_model,
            disclosure_base_url = %self.disclosure_base_url,
            check_interval_secs = self.check_interval.as_secs(),
            attempt_timeout_secs = self.attempt_timeout.as_secs(),
            web_host = %self.web_host,
            web_port = self.web_port,
            anthropic_api_key_set = !self.anthropic_api_key.is_empty(),
            "Configuration loaded"
        );
    }
}
