//! Crawl error taxonomy
//!
//! Fetch, parse and normalization failures cost a page, a row, a detail
//! enrichment or a field. A sink failure or a broken selector configuration
//! ends the run.

use thiserror::Error;

use super::record_sink::SinkError;
use crate::infrastructure::{FetchError, ParsingError};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParsingError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl CrawlError {
    /// Whether the run must stop: results can no longer be persisted, or
    /// every page would fail to parse the same way.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Fetch(_) => false,
            Self::Parse(e) => !e.is_recoverable(),
            Self::Sink(_) => true,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Fetch(FetchError::Cancelled))
    }
}
