//! Row mapper
//!
//! Turns one extracted row into a partially filled [`Record`]. A row may mix
//! positional cells (column index decides the field), labeled cells
//! (`label | value` pairs) and inline cells (`"label : value"` in one text),
//! so every cell is dispatched on its own kind within a single pass.

use tracing::{debug, warn};
use url::Url;

use super::label_dictionary::{FieldTarget, LabelDictionary, PHONE_MARKER, Transform, normalize_label};
use super::normalizer::{clean_text, extract_coordinates, is_map_link, normalize_price, split_numbered_list};
use crate::domain::{CatalogProfile, Record, RecordField};

/// Non-text payload found inside a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// `href` of an anchor, or `src` of an iframe
    Link(String),
    /// `src` of an image
    Image(String),
}

/// How a cell's text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellKind {
    /// Value whose label was carried by a sibling element
    Labeled { label: String },
    /// Text of the form `"label : value"`
    Inline,
    /// Column of a label-free table
    Positional(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Cell {
    pub fn labeled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Labeled { label: label.into() },
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Inline,
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn positional(index: usize, text: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Positional(index),
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Cell carrying only attachments.
    pub fn attachments_only(attachments: Vec<Attachment>) -> Self {
        Self {
            kind: CellKind::Inline,
            text: String::new(),
            attachments,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Ordered cells of one listing row or one detail document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every link target in the row, in document order.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.attachments().filter_map(|a| match a {
            Attachment::Link(href) => Some(href.as_str()),
            Attachment::Image(_) => None,
        })
    }

    fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.cells.iter().flat_map(|cell| cell.attachments.iter())
    }
}

/// Field assignment for one column of a label-free table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub index: usize,
    pub target: FieldTarget,
}

/// Column order of a label-free table. Columns without a rule are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionalLayout {
    columns: Vec<ColumnRule>,
}

impl PositionalLayout {
    pub fn new(columns: Vec<ColumnRule>) -> Self {
        Self { columns }
    }

    /// Serial, registration code, name, address with embedded phone.
    pub fn enterprise_directory() -> Self {
        let column = |index, field, transform| ColumnRule {
            index,
            target: FieldTarget { field, transform },
        };
        Self::new(vec![
            column(0, RecordField::Serial, Transform::Text),
            column(1, RecordField::RegistrationCode, Transform::Text),
            column(2, RecordField::EnterpriseName, Transform::Text),
            column(3, RecordField::Address, Transform::AddressWithPhone),
        ])
    }

    pub fn for_profile(profile: CatalogProfile) -> Self {
        match profile {
            CatalogProfile::ProductCatalog => Self::default(),
            CatalogProfile::EnterpriseDirectory => Self::enterprise_directory(),
        }
    }

    pub fn target(&self, index: usize) -> Option<FieldTarget> {
        self.columns.iter().find(|c| c.index == index).map(|c| c.target)
    }
}

/// Maps rows to records through the label dictionary and a positional layout.
#[derive(Debug, Clone)]
pub struct RowMapper {
    dictionary: LabelDictionary,
    layout: PositionalLayout,
    base_url: Url,
}

impl RowMapper {
    pub fn new(dictionary: LabelDictionary, layout: PositionalLayout, base_url: Url) -> Self {
        Self {
            dictionary,
            layout,
            base_url,
        }
    }

    /// Mapper for detail documents, which are always labeled.
    pub fn labeled_only(&self) -> Self {
        Self {
            dictionary: self.dictionary.clone(),
            layout: PositionalLayout::default(),
            base_url: self.base_url.clone(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Map one row into a new record.
    pub fn map_row(&self, row: &Row) -> Record {
        let mut record = Record::default();
        self.map_into(row, &mut record);
        record
    }

    /// Map one row onto an existing record. Fields the row does not set are
    /// left as they are.
    pub fn map_into(&self, row: &Row, record: &mut Record) {
        for cell in &row.cells {
            match self.resolve_cell(cell) {
                Some((target, value)) => apply(record, target, &value),
                None if !cell.text.trim().is_empty() => {
                    debug!(kind = ?cell.kind, text = %cell.text.trim(), "Ignoring unrecognised cell");
                }
                None => {}
            }
        }

        self.apply_attachments(row, record);
    }

    fn resolve_cell(&self, cell: &Cell) -> Option<(FieldTarget, String)> {
        match &cell.kind {
            CellKind::Labeled { label } => match self.dictionary.resolve(label) {
                Some(target) => Some((target, cell.text.clone())),
                // A `"label : value"` first cell read as the label of a wider row
                None if normalize_label(label).contains([':', '：']) => self
                    .dictionary
                    .resolve_inline(&clean_text(&format!("{label} {}", cell.text))),
                None => None,
            },
            CellKind::Inline => self.dictionary.resolve_inline(&clean_text(&cell.text)),
            CellKind::Positional(index) => self
                .layout
                .target(*index)
                .map(|target| (target, cell.text.clone())),
        }
    }

    fn apply_attachments(&self, row: &Row, record: &mut Record) {
        for attachment in row.attachments() {
            match attachment {
                Attachment::Image(src) if record.image_url.is_none() => {
                    match self.resolve_url(src) {
                        Some(url) => record.image_url = Some(url),
                        None => debug!(src = %src, "Unresolvable image source"),
                    }
                }
                Attachment::Link(href) if record.coordinate().is_none() && is_map_link(href) => {
                    match extract_coordinates(href) {
                        Ok(coordinate) => record.set_coordinate(coordinate),
                        Err(e) => debug!(error = %e, "Map link without coordinates"),
                    }
                }
                Attachment::Image(_) | Attachment::Link(_) => {}
            }
        }
    }

    fn resolve_url(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        self.base_url.join(reference).ok().map(String::from)
    }
}

/// Store `raw` into the record field `target` names, shaped by its transform.
fn apply(record: &mut Record, target: FieldTarget, raw: &str) {
    match target.transform {
        Transform::Text => record.set_text(target.field, clean_text(raw)),
        Transform::NumberedList => record.set_representatives(split_numbered_list(raw)),
        Transform::Price(implied) => {
            let text = clean_text(raw);
            if text.is_empty() {
                return;
            }
            record.price_per_kg = match normalize_price(&text, implied) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "Price left absent");
                    None
                }
            };
            record.set_text(target.field, text);
        }
        Transform::AddressWithPhone => {
            let text = clean_text(raw);
            match text.split_once(PHONE_MARKER) {
                Some((address, phone)) => {
                    record.set_text(target.field, address.trim());
                    let phone = phone.trim_start_matches([' ', ':']).trim();
                    record.set_text(RecordField::Phone, phone);
                }
                None => record.set_text(target.field, text),
            }
        }
    }
}
