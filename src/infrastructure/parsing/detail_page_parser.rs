//! Detail page parser
//!
//! Flattens a per-entity detail document into rows for the labeled mapper:
//! two-cell `label | value` table rows, single-cell `label : value` rows,
//! inline headings, and an attachment row holding map links and the image.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::DetailPageSelectors;
use super::context::DetailParseContext;
use super::row_mapper::{Attachment, Cell, Row};
use super::{ContextualParser, ParsingError, ParsingResult, compile_selectors, element_text};
use once_cell::sync::Lazy;

static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static TABLE_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Parser for detail pages
pub struct DetailPageParser {
    data_table_selectors: Vec<Selector>,
    heading_selectors: Vec<Selector>,
    map_link_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
}

impl DetailPageParser {
    pub fn new(selectors: &DetailPageSelectors) -> ParsingResult<Self> {
        Ok(Self {
            data_table_selectors: compile_selectors(&selectors.data_table)?,
            heading_selectors: compile_selectors(&selectors.heading)?,
            map_link_selectors: compile_selectors(&selectors.map_link)?,
            image_selectors: compile_selectors(&selectors.image)?,
        })
    }

    fn table_rows(table: &ElementRef) -> Vec<Row> {
        table
            .select(&TABLE_ROW)
            .filter_map(|tr| {
                let cells: Vec<ElementRef> = tr.select(&TABLE_CELL).collect();
                let cell = match cells.as_slice() {
                    [] => return None,
                    [only] => Cell::inline(element_text(only)),
                    [label, .., value] => Cell::labeled(element_text(label), element_text(value)),
                };
                Some(Row::new(vec![cell]))
            })
            .collect()
    }

    fn attachments(&self, html: &Html) -> Vec<Attachment> {
        let mut attachments = Vec::new();

        for selector in &self.map_link_selectors {
            for element in html.select(selector) {
                let target = element.value().attr("src").or_else(|| element.value().attr("href"));
                if let Some(target) = target {
                    attachments.push(Attachment::Link(target.trim().to_string()));
                }
            }
        }

        let image = self.image_selectors.iter().find_map(|selector| {
            html.select(selector)
                .find_map(|img| img.value().attr("src"))
                .map(|src| Attachment::Image(src.trim().to_string()))
        });
        attachments.extend(image);

        attachments
    }
}

impl ContextualParser for DetailPageParser {
    type Output = Vec<Row>;
    type Context = DetailParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!(
            url = %context.url,
            reference = %context.reference,
            source_page = ?context.source_page,
            source_index = ?context.source_index,
            "Parsing detail page"
        );

        let tables: Vec<ElementRef> = self
            .data_table_selectors
            .iter()
            .map(|selector| html.select(selector).collect::<Vec<_>>())
            .find(|tables| !tables.is_empty())
            .ok_or_else(|| ParsingError::DetailNotFound {
                url: context.url.clone(),
            })?;

        let mut rows: Vec<Row> = tables.iter().flat_map(Self::table_rows).collect();

        for selector in &self.heading_selectors {
            for heading in html.select(selector) {
                let text = element_text(&heading);
                if !text.is_empty() {
                    rows.push(Row::new(vec![Cell::inline(text)]));
                }
            }
        }

        let attachments = self.attachments(html);
        if !attachments.is_empty() {
            rows.push(Row::new(vec![Cell::attachments_only(attachments)]));
        }

        debug!(url = %context.url, rows = rows.len(), "Extracted detail rows");
        Ok(rows)
    }
}
