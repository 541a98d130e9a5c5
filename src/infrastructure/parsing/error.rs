//! Parsing and normalization error types
//!
//! Parse errors are recoverable at row or page granularity; normalization
//! errors only ever cost the single field being normalized.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No rows found on page {page}")]
    NoRowsFound {
        page: u32,
        tried_selectors: Vec<String>,
    },

    #[error("Detail page has no data table: {url}")]
    DetailNotFound { url: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },
}

impl ParsingError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn no_rows_found(page: u32, tried_selectors: Vec<String>) -> Self {
        Self::NoRowsFound {
            page,
            tried_selectors,
        }
    }

    /// Whether the crawl can carry on past this error.
    ///
    /// Only a broken selector configuration is unrecoverable: every page would fail the same way.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidSelector { .. } => false,
            Self::NoRowsFound { .. }
            | Self::DetailNotFound { .. }
            | Self::UrlResolutionFailed { .. } => true,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

/// A raw value that could not be turned into its typed form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("Unparseable price: {text:?}")]
    InvalidPrice { text: String },

    #[error("No coordinates in map link: {url}")]
    InvalidCoordinate { url: String },
}
