//! Parsing service
//!
//! Parses fetched text into rows. The HTML document never outlives the call,
//! so callers can hold the result across an `.await`.

use scraper::Html;
use tracing::debug;

use crate::infrastructure::parsing::{
    ContextualParser, DetailPageParser, DetailParseContext, ListPageParser, PageContext, ParseContext,
    ParsingConfig, ParsingResult, Row,
};

/// Listing and detail parsers built from one selector configuration
pub struct ParsingService {
    list_parser: ListPageParser,
    detail_parser: DetailPageParser,
}

impl ParsingService {
    pub fn new(config: &ParsingConfig) -> ParsingResult<Self> {
        Ok(Self {
            list_parser: ListPageParser::new(&config.list_selectors)?,
            detail_parser: DetailPageParser::new(&config.detail_selectors)?,
        })
    }

    /// Parse a listing page into its rows
    pub fn parse_listing(&self, html: &str, context: ParseContext) -> ParsingResult<PageContext> {
        let rows = {
            let document = Html::parse_document(html);
            self.list_parser.parse_with_context(&document, &context)?
        };

        let page = PageContext::new(context, rows);
        debug!(page = page.page, rows = page.row_count(), "Parsed listing page");
        Ok(page)
    }

    /// Parse a detail page into labeled rows
    pub fn parse_detail(&self, html: &str, context: &DetailParseContext) -> ParsingResult<Vec<Row>> {
        let document = Html::parse_document(html);
        self.detail_parser.parse_with_context(&document, context)
    }
}
