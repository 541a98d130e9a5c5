//! HTML parsing infrastructure
//!
//! Trait-based parsers for listing and detail documents, the label
//! dictionary and field normalizer they feed, and the row mapper that turns
//! extracted rows into records.

pub mod config;
pub mod context;
pub mod detail_page_parser;
pub mod error;
pub mod label_dictionary;
pub mod list_page_parser;
pub mod normalizer;
pub mod row_mapper;

// Re-export public types
pub use config::ParsingConfig;
pub use context::{DetailParseContext, PageContext, ParseContext};
pub use detail_page_parser::DetailPageParser;
pub use error::{NormalizationError, ParsingError, ParsingResult};
pub use label_dictionary::{FieldTarget, LabelDictionary, LabelRule, Transform};
pub use list_page_parser::ListPageParser;
pub use row_mapper::{Attachment, Cell, CellKind, PositionalLayout, Row, RowMapper};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use normalizer::clean_text;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile selector strings, skipping invalid ones.
///
/// Fails only when every selector of a non-empty list is invalid.
pub(crate) fn compile_selectors(selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push((selector_str.as_str(), e.to_string()));
            }
        }
    }

    if selectors.is_empty() {
        if let Some((selector, reason)) = errors.first() {
            return Err(ParsingError::invalid_selector(selector, reason));
        }
    } else if !errors.is_empty() {
        debug!("Some selectors failed to compile: {:?}", errors);
    }

    Ok(selectors)
}

/// Cleaned text of an element; text nodes are joined with a space so
/// `<br>`-separated parts stay apart.
pub(crate) fn element_text(element: &ElementRef) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first descendant matching any selector, if non-empty.
pub(crate) fn first_text(element: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        element
            .select(selector)
            .next()
            .map(|e| element_text(&e))
            .filter(|text| !text.is_empty())
    })
}
