//! Pagination driver
//!
//! Sequential crawl expressed as an explicit state machine:
//!
//! ```text
//! Idle(page) -> Fetching(page) -> Mapping(row..) -> [Enriching(row)] -> Mapping(row+1) ...
//!      ^               |                 |
//!      |               v                 v (rows exhausted)
//!      +------ SkippedPage(page)    Idle(page+1) ... Done (page > end_page)
//! ```
//!
//! Every outbound request passes the politeness gate first. Fetch, parse
//! and enrichment failures are logged and cost only the page or the
//! enrichment; a sink failure or an unrecoverable parse error ends the run.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::cross_reference::{CrossReferenceResolver, stamp_identifiers};
use super::error::CrawlError;
use super::parsing_service::ParsingService;
use super::politeness::Politeness;
use super::record_sink::RecordSink;
use crate::domain::{CrossReference, Record};
use crate::infrastructure::PageFetcher;
use crate::infrastructure::config::{AppConfig, CrawlConfig, SiteConfig};
use crate::infrastructure::parsing::{
    LabelDictionary, PageContext, ParseContext, ParsingError, PositionalLayout, RowMapper,
};

/// One step of the crawl
#[derive(Debug)]
pub enum CrawlState {
    /// Between pages; `page` is the next one to request
    Idle { page: u32 },
    Fetching { page: u32 },
    /// Rows of a fetched page, `next_row` is the one to map next
    Mapping { page: PageContext, next_row: usize },
    /// Row `next_row` resolved to a detail page and awaits enrichment
    Enriching {
        page: PageContext,
        next_row: usize,
        record: Record,
        reference: CrossReference,
    },
    SkippedPage { page: u32, reason: String },
    Done,
}

impl CrawlState {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub pages_fetched: u32,
    pub pages_skipped: u32,
    pub rows_mapped: usize,
    pub rows_skipped: usize,
    pub detail_fetches: usize,
    pub detail_failures: usize,
    pub records_emitted: usize,
    pub cancelled: bool,
}

pub struct PaginationDriver<S: RecordSink> {
    fetcher: Arc<dyn PageFetcher>,
    sink: S,
    parsing: Arc<ParsingService>,
    mapper: RowMapper,
    resolver: CrossReferenceResolver,
    site: SiteConfig,
    crawl: CrawlConfig,
    politeness: Politeness,
    cancellation_token: CancellationToken,
    summary: CrawlSummary,
}

impl<S: RecordSink> PaginationDriver<S> {
    pub fn new(config: &AppConfig, fetcher: Arc<dyn PageFetcher>, sink: S) -> Result<Self, CrawlError> {
        let site = config.site.clone();
        let parsing = Arc::new(ParsingService::new(&site.selectors())?);

        let base_url = Url::parse(&site.base_url).map_err(|e| ParsingError::UrlResolutionFailed {
            url: site.base_url.clone(),
            reason: e.to_string(),
            base_url: None,
        })?;
        let mapper = RowMapper::new(
            LabelDictionary::default(),
            PositionalLayout::for_profile(site.profile),
            base_url,
        );
        let resolver =
            CrossReferenceResolver::new(site.profile, site.detail_url(), Arc::clone(&parsing), &mapper)?;

        Ok(Self {
            fetcher,
            sink,
            parsing,
            mapper,
            resolver,
            politeness: Politeness::new(config.crawl.request_delay()),
            crawl: config.crawl.clone(),
            site,
            cancellation_token: CancellationToken::new(),
            summary: CrawlSummary::default(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn summary(&self) -> &CrawlSummary {
        &self.summary
    }

    /// Crawl `start_page..=end_page`, then finish the sink.
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        info!(
            "Starting crawl of {:?}: pages {}..={}, delay {:?}",
            self.site.profile,
            self.crawl.start_page,
            self.crawl.end_page,
            self.politeness.delay()
        );

        let mut state = CrawlState::Idle {
            page: self.crawl.start_page,
        };
        while !state.is_done() {
            state = self.advance(state).await?;
        }

        let written = self.sink.finish()?;
        let summary = &self.summary;
        info!(
            pages_fetched = summary.pages_fetched,
            pages_skipped = summary.pages_skipped,
            rows_mapped = summary.rows_mapped,
            rows_skipped = summary.rows_skipped,
            detail_fetches = summary.detail_fetches,
            detail_failures = summary.detail_failures,
            records = written,
            cancelled = summary.cancelled,
            "Crawl finished"
        );
        Ok(self.summary.clone())
    }

    /// Perform one transition. Only fatal errors come back as `Err`.
    pub async fn advance(&mut self, state: CrawlState) -> Result<CrawlState, CrawlError> {
        match state {
            CrawlState::Idle { page } => Ok(self.next_page(page)),
            CrawlState::Fetching { page } => self.fetch_page(page).await,
            CrawlState::Mapping { page, next_row } => self.map_row(page, next_row),
            CrawlState::Enriching {
                page,
                next_row,
                record,
                reference,
            } => self.enrich_row(page, next_row, record, reference).await,
            CrawlState::SkippedPage { page, reason } => {
                warn!(page, reason = %reason, "Skipping page");
                self.summary.pages_skipped += 1;
                Ok(Self::after(page))
            }
            CrawlState::Done => Ok(CrawlState::Done),
        }
    }

    fn next_page(&mut self, page: u32) -> CrawlState {
        if page > self.crawl.end_page {
            debug!(page, end_page = self.crawl.end_page, "Page bound reached");
            return CrawlState::Done;
        }
        if self.cancellation_token.is_cancelled() {
            return self.cancelled();
        }
        CrawlState::Fetching { page }
    }

    /// Idle on the page after `page`; a page number past `u32::MAX` ends the crawl.
    fn after(page: u32) -> CrawlState {
        page.checked_add(1).map_or(CrawlState::Done, |page| CrawlState::Idle { page })
    }

    async fn fetch_page(&mut self, page: u32) -> Result<CrawlState, CrawlError> {
        if !self.politeness.wait(&self.cancellation_token).await {
            return Ok(self.cancelled());
        }

        let url = self.site.listing_url(page);
        info!("Fetching listing page {}: {}", page, url);

        match self.fetch_listing(page, &url).await {
            Ok(context) => {
                self.summary.pages_fetched += 1;
                Ok(CrawlState::Mapping {
                    page: context,
                    next_row: 0,
                })
            }
            Err(e) if e.is_cancellation() => Ok(self.cancelled()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Ok(CrawlState::SkippedPage {
                page,
                reason: e.to_string(),
            }),
        }
    }

    async fn fetch_listing(&self, page: u32, url: &str) -> Result<PageContext, CrawlError> {
        let fetched = self.fetcher.fetch(url).await?;
        let context = ParseContext::new(page, fetched.url, self.mapper.base_url().clone());
        Ok(self.parsing.parse_listing(&fetched.body, context)?)
    }

    fn map_row(&mut self, page: PageContext, next_row: usize) -> Result<CrawlState, CrawlError> {
        let Some(row) = page.rows.get(next_row) else {
            debug!(page = page.page, rows = page.row_count(), "Page complete");
            return Ok(Self::after(page.page));
        };

        let mut record = self.mapper.map_row(row);
        let reference = self.resolver.resolve(row);
        if let Some(reference) = &reference {
            stamp_identifiers(&mut record, reference);
        }

        if !record.has_identity() {
            debug!(page = page.page, row = next_row, "Row without identity skipped");
            self.summary.rows_skipped += 1;
            return Ok(CrawlState::Mapping {
                page,
                next_row: next_row + 1,
            });
        }
        self.summary.rows_mapped += 1;

        match reference {
            Some(reference) if self.crawl.enrich_details => {
                if self.cancellation_token.is_cancelled() {
                    return Ok(self.cancelled());
                }
                Ok(CrawlState::Enriching {
                    page,
                    next_row,
                    record,
                    reference,
                })
            }
            _ => {
                self.emit(record)?;
                Ok(CrawlState::Mapping {
                    page,
                    next_row: next_row + 1,
                })
            }
        }
    }

    async fn enrich_row(
        &mut self,
        page: PageContext,
        next_row: usize,
        mut record: Record,
        reference: CrossReference,
    ) -> Result<CrawlState, CrawlError> {
        if !self.politeness.wait(&self.cancellation_token).await {
            return Ok(self.cancelled());
        }

        self.summary.detail_fetches += 1;
        let result = self
            .resolver
            .enrich(
                self.fetcher.as_ref(),
                &mut record,
                &reference,
                Some((page.page, next_row)),
            )
            .await;

        match result {
            Ok(()) => debug!(reference = %reference, "Record enriched from detail page"),
            Err(e) if e.is_cancellation() => return Ok(self.cancelled()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.summary.detail_failures += 1;
                warn!(
                    reference = %reference,
                    error = %e,
                    "Detail enrichment failed, keeping summary record"
                );
            }
        }

        self.emit(record)?;
        Ok(CrawlState::Mapping {
            page,
            next_row: next_row + 1,
        })
    }

    fn emit(&mut self, record: Record) -> Result<(), CrawlError> {
        debug!(name = record.display_name(), smce_id = ?record.smce_id, "Emitting record");
        self.sink.emit(record)?;
        self.summary.records_emitted += 1;
        Ok(())
    }

    fn cancelled(&mut self) -> CrawlState {
        info!("Crawl cancelled");
        self.summary.cancelled = true;
        CrawlState::Done
    }
}
