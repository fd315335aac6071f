//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ListingSelectors;
use crate::pipeline::CircuitBreakerConfig;

/// Environment variable overriding `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and fetching behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Storage locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delivery channel credentials and options
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Notification rendering settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Run-level settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Drop guard applied before committing a snapshot
    #[serde(default)]
    pub guard: CircuitBreakerConfig,

    /// Source definitions
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment overrides for credentials.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.telegram.bot_token = Some(token.trim().to_string());
            }
        }
    }

    /// Sources enabled for this run, in configuration order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|source| {
            self.pipeline.enabled_sources.is_empty()
                || self.pipeline.enabled_sources.contains(&source.id)
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.pipeline.max_concurrent_sources == 0 {
            return Err(AppError::validation(
                "pipeline.max_concurrent_sources must be > 0",
            ));
        }
        if self.notify.max_concurrent_deliveries == 0 {
            return Err(AppError::validation(
                "notify.max_concurrent_deliveries must be > 0",
            ));
        }
        if self.guard.max_drop_percent > 100 {
            return Err(AppError::validation(
                "guard.max_drop_percent must be <= 100",
            ));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.id.as_str()) {
                return Err(AppError::validation(format!(
                    "source id '{}' is defined twice",
                    source.id
                )));
            }
        }
        for id in &self.pipeline.enabled_sources {
            if !seen.contains(id.as_str()) {
                return Err(AppError::validation(format!(
                    "pipeline.enabled_sources names unknown source '{id}'"
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
            notify: NotifyConfig::default(),
            pipeline: PipelineConfig::default(),
            guard: CircuitBreakerConfig::default(),
            sources: defaults::sources(),
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between detail requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent detail requests per source
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Storage locations, relative to the storage root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory (or key prefix) holding one snapshot per source
    #[serde(default = "defaults::snapshot_dir")]
    pub snapshot_dir: String,

    /// JSON file listing subscribers
    #[serde(default = "defaults::subscribers_file")]
    pub subscribers_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: defaults::snapshot_dir(),
            subscribers_file: defaults::subscribers_file(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base URL
    #[serde(default = "defaults::telegram_api_base")]
    pub api_base: String,

    /// Bot token; prefer the `TELEGRAM_BOT_TOKEN` environment variable
    #[serde(default, skip_serializing)]
    pub bot_token: Option<String>,

    /// Suppress link previews in text messages
    #[serde(default = "defaults::enabled")]
    pub disable_preview: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::telegram_api_base(),
            bot_token: None,
            disable_preview: true,
        }
    }
}

/// Notification rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Language used when a subscriber's language has no translation
    #[serde(default = "defaults::default_language")]
    pub default_language: String,

    /// Screenings listed per entry before "and N more"
    #[serde(default = "defaults::max_screenings_per_entry")]
    pub max_screenings_per_entry: usize,

    /// Recipients served concurrently
    #[serde(default = "defaults::max_concurrent_deliveries")]
    pub max_concurrent_deliveries: usize,

    /// Optional TOML file adding or overriding translations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_file: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            default_language: defaults::default_language(),
            max_screenings_per_entry: defaults::max_screenings_per_entry(),
            max_concurrent_deliveries: defaults::max_concurrent_deliveries(),
            locale_file: None,
        }
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source ids to process; empty means all configured sources
    #[serde(default)]
    pub enabled_sources: Vec<String>,

    /// Sources processed concurrently
    #[serde(default = "defaults::max_concurrent_sources")]
    pub max_concurrent_sources: usize,

    /// Overall run budget; detail fetches stop once it is spent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_secs: Option<u64>,

    /// Announce every entry as new when a source has no stored snapshot
    #[serde(default = "defaults::enabled")]
    pub notify_first_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled_sources: Vec::new(),
            max_concurrent_sources: defaults::max_concurrent_sources(),
            time_budget_secs: None,
            notify_first_run: true,
        }
    }
}

/// One external programme source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable identifier, used as registry and storage key
    pub id: String,

    /// Human-readable name used in messages
    pub display_name: String,

    /// Listing page URL
    pub url: String,

    /// Listing and detail page selectors
    pub selectors: ListingSelectors,
}

impl SourceConfig {
    /// Validate identifier, URL and selectors.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_source_id(&self.id) {
            return Err(AppError::validation(format!(
                "source id '{}' must be non-empty and use only [a-z0-9_-]",
                self.id
            )));
        }
        if self.display_name.trim().is_empty() {
            return Err(AppError::validation(format!(
                "source '{}' has an empty display_name",
                self.id
            )));
        }
        url::Url::parse(&self.url)?;
        for selector in self.selectors.all() {
            Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }
}

/// Source ids double as file names, so they are restricted to a safe alphabet.
pub fn is_valid_source_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

mod defaults {
    use super::SourceConfig;
    use crate::models::ListingSelectors;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; cinewatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Storage defaults
    pub fn snapshot_dir() -> String {
        "snapshots".into()
    }
    pub fn subscribers_file() -> String {
        "subscribers.json".into()
    }

    // Delivery defaults
    pub fn telegram_api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn enabled() -> bool {
        true
    }

    // Notification defaults
    pub fn default_language() -> String {
        "en".into()
    }
    pub fn max_screenings_per_entry() -> usize {
        8
    }
    pub fn max_concurrent_deliveries() -> usize {
        4
    }

    // Pipeline defaults
    pub fn max_concurrent_sources() -> usize {
        2
    }

    // Source defaults
    pub fn sources() -> Vec<SourceConfig> {
        vec![SourceConfig {
            id: "meisengeige".to_string(),
            display_name: "Meisengeige".to_string(),
            url: "https://www.cinecitta.de/programm/meisengeige/".to_string(),
            selectors: ListingSelectors::meisengeige(),
        }]
    }
}
