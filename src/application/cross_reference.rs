//! Cross-reference resolver
//!
//! Finds the identifiers a listing row links to, builds the canonical
//! detail request, and merges the detail page's fields into the record.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::error::CrawlError;
use super::parsing_service::ParsingService;
use crate::domain::{CatalogProfile, CrossReference, Record, RecordField};
use crate::infrastructure::PageFetcher;
use crate::infrastructure::parsing::{DetailParseContext, ParsingError, ParsingResult, Row, RowMapper};

static IDENTIFIER_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"smce_id=(\d+)&(?:amp;)?ps_id=(\d+)").unwrap());
static SINGLE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"smce_id=(\d+)").unwrap());

pub struct CrossReferenceResolver {
    profile: CatalogProfile,
    detail_url: Url,
    /// Link targets must name this page, e.g. `product_detail.php`
    detail_page: String,
    parsing: Arc<ParsingService>,
    mapper: RowMapper,
}

impl CrossReferenceResolver {
    pub fn new(
        profile: CatalogProfile,
        detail_url: &str,
        parsing: Arc<ParsingService>,
        mapper: &RowMapper,
    ) -> ParsingResult<Self> {
        let detail_url = Url::parse(detail_url).map_err(|e| ParsingError::UrlResolutionFailed {
            url: detail_url.to_string(),
            reason: e.to_string(),
            base_url: None,
        })?;
        let detail_page = detail_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            profile,
            detail_url,
            detail_page,
            parsing,
            mapper: mapper.labeled_only(),
        })
    }

    /// Identifiers embedded in the row's links, if any.
    ///
    /// A row without them stays summary-only; that is not an error.
    pub fn resolve(&self, row: &Row) -> Option<CrossReference> {
        row.links()
            .filter(|link| link.contains(self.detail_page.as_str()))
            .find_map(|link| self.extract(link))
    }

    fn extract(&self, link: &str) -> Option<CrossReference> {
        match self.profile {
            CatalogProfile::ProductCatalog => {
                let caps = IDENTIFIER_PAIR.captures(link)?;
                Some(CrossReference::Product {
                    smce_id: caps[1].to_string(),
                    ps_id: caps[2].to_string(),
                })
            }
            CatalogProfile::EnterpriseDirectory => {
                let caps = SINGLE_IDENTIFIER.captures(link)?;
                Some(CrossReference::Enterprise {
                    smce_id: caps[1].to_string(),
                })
            }
        }
    }

    /// Canonical detail request for `reference`
    pub fn detail_url(&self, reference: &CrossReference) -> Url {
        let mut url = self.detail_url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(reference.query_pairs());
        url
    }

    /// Fetch and map the detail page for `reference`.
    ///
    /// `source` is the listing page and row index the reference came from.
    pub async fn fetch_detail(
        &self,
        fetcher: &dyn PageFetcher,
        reference: &CrossReference,
        source: Option<(u32, usize)>,
    ) -> Result<Record, CrawlError> {
        let url = self.detail_url(reference);
        let page = fetcher.fetch(url.as_str()).await?;

        let mut context = DetailParseContext::new(url, reference.clone());
        if let Some((page, index)) = source {
            context = context.with_source(page, index);
        }
        let rows = self.parsing.parse_detail(&page.body, &context)?;

        let mut detail = Record::default();
        for row in &rows {
            self.mapper.map_into(row, &mut detail);
        }
        debug!(reference = %reference, rows = rows.len(), "Mapped detail page");
        Ok(detail)
    }

    /// Fetch the detail page and overlay its fields onto `record`.
    ///
    /// On failure `record` is left exactly as it was.
    pub async fn enrich(
        &self,
        fetcher: &dyn PageFetcher,
        record: &mut Record,
        reference: &CrossReference,
        source: Option<(u32, usize)>,
    ) -> Result<(), CrawlError> {
        let detail = self.fetch_detail(fetcher, reference, source).await?;
        record.merge_from(detail);
        Ok(())
    }
}

/// Record the identifiers on the summary record itself.
pub fn stamp_identifiers(record: &mut Record, reference: &CrossReference) {
    record.set_text(RecordField::SmceId, reference.smce_id());
    if let Some(ps_id) = reference.ps_id() {
        record.set_text(RecordField::PsId, ps_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::site;
    use crate::infrastructure::parsing::{Attachment, Cell, LabelDictionary, ParsingConfig, PositionalLayout};
    use crate::infrastructure::{FetchError, FetchedPage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubFetcher {
        body: Option<String>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn serving(body: &str) -> Self {
            Self {
                body: Some(body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            match &self.body {
                Some(body) => Ok(FetchedPage {
                    url: url.to_string(),
                    status: 200,
                    body: body.clone(),
                    encoding: "UTF-8",
                }),
                None => Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "connection reset".into(),
                }),
            }
        }
    }

    fn resolver(profile: CatalogProfile) -> CrossReferenceResolver {
        let mapper = RowMapper::new(
            LabelDictionary::default(),
            PositionalLayout::for_profile(profile),
            Url::parse(site::BASE_URL).unwrap(),
        );
        let parsing = Arc::new(ParsingService::new(&ParsingConfig::for_profile(profile)).unwrap());
        CrossReferenceResolver::new(profile, profile.detail_url(), parsing, &mapper).unwrap()
    }

    fn row_linking(href: &str) -> Row {
        Row::new(vec![Cell::attachments_only(vec![Attachment::Link(href.to_string())])])
    }

    #[test]
    fn extracts_identifier_pair_from_product_link() {
        let reference = resolver(CatalogProfile::ProductCatalog)
            .resolve(&row_linking("product_detail.php?smce_id=42&ps_id=7"))
            .unwrap();
        assert_eq!(
            reference,
            CrossReference::Product {
                smce_id: "42".into(),
                ps_id: "7".into()
            }
        );
    }

    #[test]
    fn unrelated_links_give_no_reference() {
        let resolver = resolver(CatalogProfile::ProductCatalog);
        assert_eq!(resolver.resolve(&row_linking("index.php?smce_id=42&ps_id=7")), None);
        assert_eq!(resolver.resolve(&row_linking("product_detail.php?smce_id=42")), None);
        assert_eq!(resolver.resolve(&Row::default()), None);
    }

    #[test]
    fn enterprise_directory_uses_single_identifier() {
        let reference = resolver(CatalogProfile::EnterpriseDirectory)
            .resolve(&row_linking("managecontent.php?smce_id=88"))
            .unwrap();
        assert_eq!(reference, CrossReference::Enterprise { smce_id: "88".into() });
    }

    #[test]
    fn detail_url_is_built_from_identifiers() {
        let reference = CrossReference::Product {
            smce_id: "42".into(),
            ps_id: "7".into(),
        };
        assert_eq!(
            resolver(CatalogProfile::ProductCatalog).detail_url(&reference).as_str(),
            "https://smce2023.doae.go.th/product_detail.php?smce_id=42&ps_id=7"
        );
    }

    #[tokio::test]
    async fn detail_fields_overwrite_only_what_they_set() {
        let fetcher = StubFetcher::serving(
            r#"<div class="col-md-12"><table class="table table-striped table-hover">
                 <tr><td>โทรศัพท์  :</td><td>081-000-0000</td></tr>
                 <tr><td>ชื่อ :</td><td>วิสาหกิจชุมชนบ้านนา (ปรับปรุง)</td></tr>
               </table></div>"#,
        );
        let reference = CrossReference::Product {
            smce_id: "42".into(),
            ps_id: "7".into(),
        };
        let mut record = Record::default();
        record.set_text(RecordField::EnterpriseName, "วิสาหกิจชุมชนบ้านนา");
        record.set_text(RecordField::BusinessGroup, "ข้าว");

        resolver(CatalogProfile::ProductCatalog)
            .enrich(&fetcher, &mut record, &reference, Some((1, 0)))
            .await
            .unwrap();

        assert_eq!(record.enterprise_name.as_deref(), Some("วิสาหกิจชุมชนบ้านนา (ปรับปรุง)"));
        assert_eq!(record.phone.as_deref(), Some("081-000-0000"));
        assert_eq!(record.business_group.as_deref(), Some("ข้าว"));
        assert_eq!(
            *fetcher.requests.lock().unwrap(),
            vec!["https://smce2023.doae.go.th/product_detail.php?smce_id=42&ps_id=7"]
        );
    }

    #[tokio::test]
    async fn product_table_rows_with_label_and_value_in_the_first_cell() {
        let fetcher = StubFetcher::serving(
            r#"<div class="col-md-12"><table class="table table-striped table-hover">
                 <tr><td>คุณสมบัติ : ข้าวหอมมะลิ 100%</td><td></td></tr>
                 <tr><td>ราคา : สอบถามทางโทรศัพท์</td><td></td></tr>
               </table></div>"#,
        );
        let reference = CrossReference::Product {
            smce_id: "42".into(),
            ps_id: "7".into(),
        };
        let mut record = Record::default();
        record.set_text(RecordField::Price, "15,000");
        record.price_per_kg = Some(15.0);

        resolver(CatalogProfile::ProductCatalog)
            .enrich(&fetcher, &mut record, &reference, None)
            .await
            .unwrap();

        assert_eq!(record.properties.as_deref(), Some("ข้าวหอมมะลิ 100%"));
        assert_eq!(record.price_text.as_deref(), Some("สอบถามทางโทรศัพท์"));
        assert_eq!(record.price_per_kg, None);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_record_untouched() {
        let fetcher = StubFetcher::failing();
        let reference = CrossReference::Enterprise { smce_id: "88".into() };
        let mut record = Record::default();
        record.set_text(RecordField::EnterpriseName, "กลุ่มแม่บ้าน");
        let before = record.clone();

        let result = resolver(CatalogProfile::EnterpriseDirectory)
            .enrich(&fetcher, &mut record, &reference, None)
            .await;

        assert!(matches!(result, Err(CrawlError::Fetch(FetchError::Transport { .. }))));
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn detail_without_table_is_a_parse_error() {
        let fetcher = StubFetcher::serving("<p>Product not found</p>");
        let reference = CrossReference::Product {
            smce_id: "1".into(),
            ps_id: "2".into(),
        };
        let result = resolver(CatalogProfile::ProductCatalog)
            .fetch_detail(&fetcher, &reference, None)
            .await;
        assert!(matches!(result, Err(CrawlError::Parse(ParsingError::DetailNotFound { .. }))));
    }
}
