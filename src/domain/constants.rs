//! Site characteristics and domain constants
//!
//! Fixed facts about the SMCE registry site (smce2023.doae.go.th) that the
//! crawler relies on.

use serde::{Deserialize, Serialize};

/// SMCE registry site constants
pub mod site {
    /// Site root, used to resolve relative image and link targets
    pub const BASE_URL: &str = "https://smce2023.doae.go.th/";

    /// Product catalogue listing, page number placeholder: {page}
    pub const PRODUCT_LISTING_URL_TEMPLATE: &str = "https://smce2023.doae.go.th/ProductC_Result.php?page_size={page_size}&PAGE={page}&business_type_id=1&smce_id=&select_province=&select_region=&select_amphur=&key_word=&startPage=1&endPage=20";

    /// Enterprise directory listing, page number placeholder: {page}
    pub const ENTERPRISE_LISTING_URL_TEMPLATE: &str = "https://smce2023.doae.go.th/ProductCategory/SmceCategory.php?page_size={page_size}&PAGE={page}&province_id=&region_id=&amphur_id=&key_word=&startPage=1&endPage=10";

    /// Per-product detail page, queried with `smce_id` and `ps_id`
    pub const PRODUCT_DETAIL_URL: &str = "https://smce2023.doae.go.th/product_detail.php";

    /// Per-enterprise detail page, queried with `smce_id`
    pub const ENTERPRISE_DETAIL_URL: &str = "https://smce2023.doae.go.th/ProductCategory/managecontent.php";

    /// Legacy encoding the site serves when no charset is declared (TIS-620 superset)
    pub const FALLBACK_ENCODING: &str = "windows-874";

    /// Site pages are 1-based
    pub const PAGE_NUMBERING_BASE: u32 = 1;
}

/// Price units recognised after the numeric part of a price cell
pub mod units {
    /// Per metric ton; divided by 1000 to give a per-kilogram figure
    pub const PER_TON: &[&str] = &["ตัน", "ton", "tons", "tonne"];

    /// Already per kilogram
    pub const PER_KILOGRAM: &[&str] = &["กิโลกรัม", "กก.", "กก", "kg", "kilogram"];

    /// Per bag; no known weight, left unscaled
    pub const PER_BAG: &[&str] = &["ถุง", "bag"];

    /// Currency and "per" words that may be glued onto a unit keyword
    pub const CONNECTIVES: &[&str] = &["บาท", "baht", "฿", "ต่อ", "per"];

    pub const KILOGRAMS_PER_TON: f64 = 1000.0;
}

/// Which of the two registry catalogues a crawl walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogProfile {
    /// Product listing with labeled widgets and `smce_id` + `ps_id` detail links
    #[default]
    ProductCatalog,
    /// Enterprise directory with positional columns and `smce_id` detail links
    EnterpriseDirectory,
}

impl CatalogProfile {
    pub fn listing_url_template(self) -> &'static str {
        match self {
            Self::ProductCatalog => site::PRODUCT_LISTING_URL_TEMPLATE,
            Self::EnterpriseDirectory => site::ENTERPRISE_LISTING_URL_TEMPLATE,
        }
    }

    pub fn detail_url(self) -> &'static str {
        match self {
            Self::ProductCatalog => site::PRODUCT_DETAIL_URL,
            Self::EnterpriseDirectory => site::ENTERPRISE_DETAIL_URL,
        }
    }

    pub fn default_page_size(self) -> u32 {
        match self {
            Self::ProductCatalog => 5,
            Self::EnterpriseDirectory => 10,
        }
    }
}
