//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors for listing and detail documents, with a
//! default set per catalogue profile. Every selector slot is a fallback
//! list; the first selector that matches wins.

use serde::{Deserialize, Serialize};

use crate::domain::CatalogProfile;

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Listing page selectors
    pub list_selectors: ListPageSelectors,

    /// Detail page selectors
    pub detail_selectors: DetailPageSelectors,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self::for_profile(CatalogProfile::default())
    }
}

impl ParsingConfig {
    pub fn for_profile(profile: CatalogProfile) -> Self {
        Self {
            list_selectors: ListPageSelectors::for_profile(profile),
            detail_selectors: DetailPageSelectors::default(),
        }
    }
}

/// CSS selectors for listing pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListPageSelectors {
    /// One element per entity - multiple fallbacks
    pub row: Vec<String>,

    /// Positional cells within a row
    pub cell: Vec<String>,

    /// Labeled widget within a row (`label` / `value` pairs)
    pub labeled_item: Vec<String>,

    /// Label element inside a labeled widget
    pub label: Vec<String>,

    /// Value element inside a labeled widget
    pub value: Vec<String>,
}

impl Default for ListPageSelectors {
    fn default() -> Self {
        Self::for_profile(CatalogProfile::default())
    }
}

impl ListPageSelectors {
    pub fn for_profile(profile: CatalogProfile) -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        match profile {
            CatalogProfile::ProductCatalog => Self {
                row: strings(&["table.table tbody tr", "table.table tr", ".product-list tr"]),
                cell: strings(&["td"]),
                labeled_item: strings(&[".box-product", ".product-box"]),
                label: strings(&[".pro-field", ".field-label"]),
                value: strings(&[".pro-disc", ".field-value"]),
            },
            CatalogProfile::EnterpriseDirectory => Self {
                row: strings(&["table.table tbody tr", "table tbody tr", "table tr"]),
                cell: strings(&["td"]),
                labeled_item: strings(&[".box-product"]),
                label: strings(&[".pro-field"]),
                value: strings(&[".pro-disc"]),
            },
        }
    }
}

/// CSS selectors for detail pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailPageSelectors {
    /// Data tables carrying `label | value` or `label : value` rows
    pub data_table: Vec<String>,

    /// Headings holding an inline `label : value`
    pub heading: Vec<String>,

    /// Embedded or linked maps
    pub map_link: Vec<String>,

    /// Product image
    pub image: Vec<String>,
}

impl Default for DetailPageSelectors {
    fn default() -> Self {
        Self {
            data_table: vec![
                "table.table-striped.table-hover".to_string(),
                "div.col-md-12 table".to_string(),
                "table".to_string(),
            ],
            heading: vec!["h3".to_string()],
            map_link: vec![
                "iframe[src*='maps']".to_string(),
                "a[href*='maps']".to_string(),
            ],
            image: vec!["div.col-md-12 img".to_string()],
        }
    }
}
