//! Parsing contexts
//!
//! Per-document state handed to the parsers alongside the HTML.

use url::Url;

use super::row_mapper::Row;
use crate::domain::CrossReference;

/// Context for one listing page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Page number being parsed
    pub page: u32,

    /// URL the page was fetched from
    pub url: String,

    /// Base URL for resolving relative links
    pub base_url: Url,
}

impl ParseContext {
    pub fn new(page: u32, url: impl Into<String>, base_url: Url) -> Self {
        Self {
            page,
            url: url.into(),
            base_url,
        }
    }
}

/// A parsed listing page: its number, source and extracted rows.
///
/// Created per fetch and dropped once every row has been mapped.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page: u32,
    pub url: String,
    pub rows: Vec<Row>,
}

impl PageContext {
    pub fn new(context: ParseContext, rows: Vec<Row>) -> Self {
        Self {
            page: context.page,
            url: context.url,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Context for one detail page
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Detail URL being parsed
    pub url: String,

    /// Identifiers the request was built from
    pub reference: CrossReference,

    /// Listing page the row was found on
    pub source_page: Option<u32>,

    /// Row index within that page
    pub source_index: Option<usize>,
}

impl DetailParseContext {
    pub fn new(url: impl Into<String>, reference: CrossReference) -> Self {
        Self {
            url: url.into(),
            reference,
            source_page: None,
            source_index: None,
        }
    }

    pub fn with_source(mut self, page: u32, index: usize) -> Self {
        self.source_page = Some(page);
        self.source_index = Some(index);
        self
    }
}
