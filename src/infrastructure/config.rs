//! Configuration infrastructure
//!
//! Layered configuration for the crawler:
//! 1. Built-in defaults (the `defaults` module below)
//! 2. Optional config file (TOML/JSON/YAML, picked by extension)
//! 3. Environment variables, `SMCE_` prefix, `__` between sections
//!    (e.g. `SMCE_CRAWL__END_PAGE=20`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::domain::CatalogProfile;
use crate::domain::constants::site;
use crate::infrastructure::parsing::ParsingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Which catalogue to crawl and where it lives
    pub site: SiteConfig,

    /// Page range and politeness
    pub crawl: CrawlConfig,

    /// Fetch collaborator settings
    pub http: HttpConfig,

    /// Output artifact
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Target site settings. Unset fields fall back to the profile's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub profile: CatalogProfile,

    /// Root used to resolve relative links and images
    pub base_url: String,

    /// Listing URL with a `{page}` placeholder (and optionally `{page_size}`)
    pub listing_url_template: Option<String>,

    /// Detail page queried with the row's identifiers
    pub detail_url: Option<String>,

    /// Rows requested per listing page
    pub page_size: Option<u32>,

    /// CSS selector overrides
    pub selectors: Option<ParsingConfig>,
}

/// Crawl range and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// First page to request
    pub start_page: u32,

    /// Last page to request (inclusive)
    pub end_page: u32,

    /// Minimum wait between outbound requests in milliseconds, 0 disables
    pub request_delay_ms: u64,

    /// Follow detail links to enrich summary records
    pub enrich_details: bool,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,

    /// Session cookie sent with every request (e.g. `PHPSESSID=...`)
    pub cookie: Option<String>,
    pub referer: Option<String>,

    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub max_redirects: usize,

    /// Encoding used when neither header nor markup declares one
    pub fallback_encoding: String,

    /// Bodies larger than this are rejected
    pub max_body_bytes: usize,
}

/// How records reach the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Append each record as it is emitted; the file is valid JSON throughout
    #[default]
    Streaming,
    /// Collect in memory and write the whole array at the end
    Buffered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub mode: OutputMode,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for the log file
    pub log_dir: PathBuf,

    /// Log file name
    pub file_name: String,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            profile: CatalogProfile::default(),
            base_url: site::BASE_URL.to_string(),
            listing_url_template: None,
            detail_url: None,
            page_size: None,
            selectors: None,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_page: site::PAGE_NUMBERING_BASE,
            end_page: defaults::END_PAGE,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
            enrich_details: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept: defaults::ACCEPT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            cookie: None,
            referer: Some(site::BASE_URL.to_string()),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            connect_timeout_seconds: defaults::CONNECT_TIMEOUT_SECONDS,
            max_redirects: defaults::MAX_REDIRECTS,
            fallback_encoding: site::FALLBACK_ENCODING.to_string(),
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::OUTPUT_PATH),
            mode: OutputMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: HashMap::new(),
        }
    }
}

impl SiteConfig {
    pub fn listing_url_template(&self) -> &str {
        self.listing_url_template
            .as_deref()
            .unwrap_or_else(|| self.profile.listing_url_template())
    }

    pub fn detail_url(&self) -> &str {
        self.detail_url
            .as_deref()
            .unwrap_or_else(|| self.profile.detail_url())
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or_else(|| self.profile.default_page_size())
    }

    pub fn selectors(&self) -> ParsingConfig {
        self.selectors
            .clone()
            .unwrap_or_else(|| ParsingConfig::for_profile(self.profile))
    }

    /// Listing URL for one page
    pub fn listing_url(&self, page: u32) -> String {
        utils::fill_template(self.listing_url_template(), page, self.page_size())
    }
}

impl CrawlConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl AppConfig {
    /// Load defaults, then the optional file, then `SMCE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration value validation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.start_page > self.crawl.end_page {
            return Err(ConfigError::validation(format!(
                "start_page ({}) cannot be greater than end_page ({})",
                self.crawl.start_page, self.crawl.end_page
            )));
        }

        if !self.site.listing_url_template().contains(utils::PAGE_PLACEHOLDER) {
            return Err(ConfigError::validation(format!(
                "listing_url_template must contain {}",
                utils::PAGE_PLACEHOLDER
            )));
        }

        for (name, value) in [("base_url", self.site.base_url.as_str()), ("detail_url", self.site.detail_url())] {
            Url::parse(value)
                .map_err(|e| ConfigError::validation(format!("{name} is not a valid URL: {e}")))?;
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(ConfigError::validation("output path cannot be empty"));
        }

        if self.http.request_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "request_timeout_seconds must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "SMCE";

    /// Environment variable holding the config file path
    pub const CONFIG_PATH_ENV: &str = "SMCE_CONFIG";

    /// Default last page to crawl
    pub const END_PAGE: u32 = 10;

    /// Default delay between requests in milliseconds
    pub const REQUEST_DELAY_MS: u64 = 1000;

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const CONNECT_TIMEOUT_SECONDS: u64 = 10;

    pub const MAX_REDIRECTS: usize = 10;

    /// 10 MiB
    pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    pub const ACCEPT_LANGUAGE: &str = "th-TH,th;q=0.9,en-US;q=0.8,en;q=0.7";

    pub const OUTPUT_PATH: &str = "output.json";

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    pub const LOG_DIR: &str = "logs";

    pub const LOG_FILE_NAME: &str = "smce-crawler.log";
}

/// URL building helper functions
pub mod utils {
    pub const PAGE_PLACEHOLDER: &str = "{page}";
    pub const PAGE_SIZE_PLACEHOLDER: &str = "{page_size}";

    /// Substitute page number and page size into a listing URL template
    pub fn fill_template(template: &str, page: u32, page_size: u32) -> String {
        template
            .replace(PAGE_PLACEHOLDER, &page.to_string())
            .replace(PAGE_SIZE_PLACEHOLDER, &page_size.to_string())
    }
}
