//! Infrastructure layer for configuration, fetching and parsing
//!
//! External collaborators of the crawl: configuration loading, logging,
//! the HTTP fetcher with charset transcoding, and HTML parsing.

pub mod charset; // Mandatory transcoding of legacy Thai encodings
pub mod config; // Layered configuration and defaults
pub mod http_client; // Fetch collaborator
pub mod logging; // Logging infrastructure
pub mod parsing; // Label dictionary, normalizer, row mapper, page parsers

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, OutputMode};
pub use http_client::{FetchError, FetchedPage, HttpClient, PageFetcher};
pub use logging::{init_logging_with_config, log_system_info};
pub use parsing::{
    DetailPageParser, LabelDictionary, ListPageParser, NormalizationError, ParsingConfig, ParsingError,
    ParsingResult, PositionalLayout, RowMapper,
};
