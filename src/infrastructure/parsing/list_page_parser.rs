//! Listing page parser
//!
//! Extracts one [`Row`] per entity from a summary page. Labeled widgets
//! become labeled cells; plain table cells become positional cells carrying
//! their column index. Images and links are kept as attachments.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::ListPageSelectors;
use super::context::ParseContext;
use super::row_mapper::{Attachment, Cell, Row};
use super::{ContextualParser, ParsingError, ParsingResult, compile_selectors, element_text, first_text};
use once_cell::sync::Lazy;

static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Parser for summary listing pages
pub struct ListPageParser {
    row_selectors: Vec<Selector>,
    cell_selectors: Vec<Selector>,
    labeled_item_selectors: Vec<Selector>,
    label_selectors: Vec<Selector>,
    value_selectors: Vec<Selector>,
}

impl ListPageParser {
    pub fn new(selectors: &ListPageSelectors) -> ParsingResult<Self> {
        Ok(Self {
            row_selectors: compile_selectors(&selectors.row)?,
            cell_selectors: compile_selectors(&selectors.cell)?,
            labeled_item_selectors: compile_selectors(&selectors.labeled_item)?,
            label_selectors: compile_selectors(&selectors.label)?,
            value_selectors: compile_selectors(&selectors.value)?,
        })
    }

    fn extract_row(&self, element: &ElementRef) -> Row {
        let mut row = Row::default();
        let Some(cell_selector) = self
            .cell_selectors
            .iter()
            .find(|selector| element.select(selector).next().is_some())
        else {
            return row;
        };

        for (index, td) in element.select(cell_selector).enumerate() {
            let attachments = extract_attachments(&td);
            let widgets = self.extract_widgets(&td);

            if widgets.is_empty() {
                let mut cell = Cell::positional(index, element_text(&td));
                cell.attachments = attachments;
                row.push(cell);
            } else {
                for cell in widgets {
                    row.push(cell);
                }
                if !attachments.is_empty() {
                    row.push(Cell::attachments_only(attachments));
                }
            }
        }

        row
    }

    /// `label` / `value` widgets inside one cell.
    fn extract_widgets(&self, td: &ElementRef) -> Vec<Cell> {
        self.labeled_item_selectors
            .iter()
            .map(|selector| {
                td.select(selector)
                    .filter_map(|item| {
                        let label = first_text(&item, &self.label_selectors)?;
                        let value = first_text(&item, &self.value_selectors).unwrap_or_default();
                        Some(Cell::labeled(label, value))
                    })
                    .collect::<Vec<_>>()
            })
            .find(|cells| !cells.is_empty())
            .unwrap_or_default()
    }
}

impl ContextualParser for ListPageParser {
    type Output = Vec<Row>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!(page = context.page, "Parsing listing page");

        let mut tried_selectors = Vec::new();

        for (i, selector) in self.row_selectors.iter().enumerate() {
            tried_selectors.push(format!("row_selector_{i}"));

            let rows: Vec<Row> = html
                .select(selector)
                .map(|element| self.extract_row(&element))
                .filter(|row| !row.is_empty())
                .collect();

            if !rows.is_empty() {
                debug!(page = context.page, rows = rows.len(), selector = i, "Extracted listing rows");
                return Ok(rows);
            }
        }

        Err(ParsingError::no_rows_found(context.page, tried_selectors))
    }
}

fn extract_attachments(element: &ElementRef) -> Vec<Attachment> {
    let images = element
        .select(&IMAGE)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| Attachment::Image(src.trim().to_string()));
    let links = element
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| Attachment::Link(href.trim().to_string()));
    images.chain(links).collect()
}
