//! Application layer - the crawl itself
//!
//! Drives pagination, resolves cross-references to detail pages, paces
//! requests and hands finished records to a sink.

pub mod cross_reference;
pub mod error;
pub mod pagination_driver;
pub mod parsing_service;
pub mod politeness;
pub mod record_sink;

// Re-export commonly used items
pub use cross_reference::CrossReferenceResolver;
pub use error::CrawlError;
pub use pagination_driver::{CrawlState, CrawlSummary, PaginationDriver};
pub use parsing_service::ParsingService;
pub use politeness::Politeness;
pub use record_sink::{JsonArraySink, MemorySink, RecordSink, SinkError, StreamingJsonSink};
