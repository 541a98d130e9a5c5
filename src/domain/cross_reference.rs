use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiers embedded in a listing row's link, used to reach the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossReference {
    /// `product_detail.php?smce_id=..&ps_id=..`
    Product { smce_id: String, ps_id: String },
    /// `managecontent.php?smce_id=..`
    Enterprise { smce_id: String },
}

impl CrossReference {
    pub fn smce_id(&self) -> &str {
        match self {
            Self::Product { smce_id, .. } | Self::Enterprise { smce_id } => smce_id,
        }
    }

    pub fn ps_id(&self) -> Option<&str> {
        match self {
            Self::Product { ps_id, .. } => Some(ps_id),
            Self::Enterprise { .. } => None,
        }
    }

    /// Query parameters of the canonical detail request, in wire order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Product { smce_id, ps_id } => vec![("smce_id", smce_id.as_str()), ("ps_id", ps_id.as_str())],
            Self::Enterprise { smce_id } => vec![("smce_id", smce_id.as_str())],
        }
    }
}

impl fmt::Display for CrossReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product { smce_id, ps_id } => write!(f, "smce_id={smce_id}, ps_id={ps_id}"),
            Self::Enterprise { smce_id } => write!(f, "smce_id={smce_id}"),
        }
    }
}
