//! Domain module - registry records and site facts
//!
//! Pure data: the record being built, the identifiers that link listing rows
//! to detail pages, and the constants of the crawled site.

pub mod constants;
pub mod cross_reference;
pub mod record;

// Re-export commonly used items
pub use constants::CatalogProfile;
pub use cross_reference::CrossReference;
pub use record::{Coordinate, Record, RecordField};
