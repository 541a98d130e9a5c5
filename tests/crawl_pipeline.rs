//! End-to-end crawl runs against an in-memory site

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use smce_crawler::application::{JsonArraySink, MemorySink, PaginationDriver, StreamingJsonSink};
use smce_crawler::domain::Record;
use smce_crawler::infrastructure::{AppConfig, FetchError, FetchedPage, PageFetcher};

const DETAIL_42_7: &str = "https://smce2023.doae.go.th/product_detail.php?smce_id=42&ps_id=7";

/// Serves fixed bodies by URL and records every request.
#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(body) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                body: body.clone(),
                encoding: "UTF-8",
            }),
            None => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".into(),
            }),
        }
    }
}

fn config(end_page: u32, enrich_details: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.crawl.end_page = end_page;
    config.crawl.request_delay_ms = 0;
    config.crawl.enrich_details = enrich_details;
    config
}

fn widget(label: &str, value: &str) -> String {
    format!(r#"<div class="box-product"><span class="pro-field">{label}</span><span class="pro-disc">{value}</span></div>"#)
}

fn product_row(name: &str, product: &str, link: Option<&str>) -> String {
    let link = link.map(|href| format!(r#"<a href="{href}">รายละเอียด</a>"#)).unwrap_or_default();
    format!(
        r#"<tr><td><img src="upload/product/{product}.jpg"></td><td>{}{}{}{link}</td></tr>"#,
        widget("ชื่อ :", name),
        widget("ชื่อผลิตภัณฑ์/บริการ :", product),
        widget("ราคา ต่อ ตัน :", "15,000"),
    )
}

fn listing(rows: &[String]) -> String {
    format!(r#"<html><body><table class="table"><tbody>{}</tbody></table></body></html>"#, rows.concat())
}

fn names(records: &[Record]) -> Vec<&str> {
    records.iter().map(Record::display_name).collect()
}

#[tokio::test]
async fn failed_page_is_skipped_and_the_run_succeeds() {
    let config = config(3, false);
    let site = Arc::new(
        FakeSite::default()
            .with_page(
                config.site.listing_url(1),
                listing(&[product_row("กลุ่มข้าว", "ข้าวหอมมะลิ", None), product_row("กลุ่มผ้า", "ผ้าไหม", None)]),
            )
            .with_page(config.site.listing_url(3), listing(&[product_row("กลุ่มน้ำผึ้ง", "น้ำผึ้ง", None)])),
    );

    let mut driver = PaginationDriver::new(&config, site.clone(), MemorySink::new()).unwrap();
    let summary = driver.run().await.unwrap();

    assert_eq!(names(driver.sink().records()), vec!["กลุ่มข้าว", "กลุ่มผ้า", "กลุ่มน้ำผึ้ง"]);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.records_emitted, 3);
    assert_eq!(site.requests().len(), 3);

    let first = &driver.sink().records()[0];
    assert_eq!(first.price_per_kg, Some(15.0));
    let image = first.image_url.as_deref().unwrap();
    assert!(image.starts_with("https://smce2023.doae.go.th/upload/product/"));
    assert!(image.ends_with(".jpg"));
}

#[tokio::test]
async fn failed_detail_fetch_keeps_the_summary_record() {
    let rows = [product_row("กลุ่มข้าว", "ข้าวหอมมะลิ", Some("product_detail.php?smce_id=42&amp;ps_id=7"))];

    let summary_only = {
        let config = config(1, false);
        let site = Arc::new(FakeSite::default().with_page(config.site.listing_url(1), listing(&rows)));
        let mut driver = PaginationDriver::new(&config, site, MemorySink::new()).unwrap();
        driver.run().await.unwrap();
        driver.into_sink().into_records()
    };

    let config = config(1, true);
    let site = Arc::new(FakeSite::default().with_page(config.site.listing_url(1), listing(&rows)));
    let mut driver = PaginationDriver::new(&config, site.clone(), MemorySink::new()).unwrap();
    let summary = driver.run().await.unwrap();

    let detail_requests: Vec<_> = site
        .requests()
        .into_iter()
        .filter(|url| url.contains("product_detail.php"))
        .collect();
    assert_eq!(detail_requests, vec![DETAIL_42_7]);
    assert_eq!(summary.detail_fetches, 1);
    assert_eq!(summary.detail_failures, 1);

    let records = driver.into_sink().into_records();
    assert_eq!(records, summary_only);
    assert_eq!(records[0].smce_id.as_deref(), Some("42"));
    assert_eq!(records[0].ps_id.as_deref(), Some("7"));
}

#[tokio::test]
async fn detail_page_enriches_the_record() {
    let config = config(1, true);
    let detail = r#"<html><body><div class="col-md-12">
        <h3>ชื่อผลิตภัณฑ์/บริการ : ข้าวหอมมะลิอินทรีย์</h3>
        <table class="table table-striped table-hover">
          <tr><td>ที่ตั้ง :</td><td>99 หมู่ 1 ต.ในเมือง อ.เมือง จ.สุรินทร์</td></tr>
          <tr><td>โทรศัพท์  :</td><td>044-000-000</td></tr>
          <tr><td>ผู้มีอำนาจทำการแทน :</td><td>1. นางสมศรี ใจดี 2. นายสมชาย ขยัน</td></tr>
          <tr><td>มาตรฐาน :</td><td>GAP</td></tr>
        </table>
        <iframe src="https://maps.google.com/maps?q=14.8818,103.4936&amp;output=embed"></iframe>
      </div></body></html>"#;
    let site = Arc::new(
        FakeSite::default()
            .with_page(
                config.site.listing_url(1),
                listing(&[product_row("กลุ่มข้าว", "ข้าวหอมมะลิ", Some("product_detail.php?smce_id=42&ps_id=7"))]),
            )
            .with_page(DETAIL_42_7, detail),
    );

    let mut driver = PaginationDriver::new(&config, site, MemorySink::new()).unwrap();
    let summary = driver.run().await.unwrap();
    assert_eq!(summary.detail_failures, 0);

    let record = &driver.sink().records()[0];
    assert_eq!(record.enterprise_name.as_deref(), Some("กลุ่มข้าว"));
    assert_eq!(record.product_name.as_deref(), Some("ข้าวหอมมะลิอินทรีย์"));
    assert_eq!(record.address.as_deref(), Some("99 หมู่ 1 ต.ในเมือง อ.เมือง จ.สุรินทร์"));
    assert_eq!(record.phone.as_deref(), Some("044-000-000"));
    assert_eq!(record.representatives, vec!["นางสมศรี ใจดี", "นายสมชาย ขยัน"]);
    assert_eq!(record.standards.as_deref(), Some("GAP"));
    assert_eq!(record.latitude, Some(14.8818));
    assert_eq!(record.longitude, Some(103.4936));
    assert_eq!(record.price_per_kg, Some(15.0));
}

#[tokio::test]
async fn enterprise_directory_rows_map_by_column() {
    let mut config = config(1, false);
    config.site.profile = smce_crawler::domain::CatalogProfile::EnterpriseDirectory;
    let body = r#"<table class="table"><tbody>
        <tr><th>ลำดับ</th><th>รหัสทะเบียน</th><th>ชื่อ</th><th>ที่อยู่</th></tr>
        <tr><td>1</td><td>4-32-01-01/1-0001</td>
            <td><a href="managecontent.php?smce_id=88">กลุ่มแม่บ้านเกษตรกร</a></td>
            <td>12 หมู่ 3 ต.บ้านใหม่ โทรศัพท์ 081-234-5678</td></tr>
      </tbody></table>"#;
    let site = Arc::new(FakeSite::default().with_page(config.site.listing_url(1), body));

    let mut driver = PaginationDriver::new(&config, site, MemorySink::new()).unwrap();
    driver.run().await.unwrap();

    let records = driver.sink().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].smce_id.as_deref(), Some("88"));
    assert_eq!(records[0].ps_id, None);
    assert_eq!(records[0].registration_code.as_deref(), Some("4-32-01-01/1-0001"));
    assert_eq!(records[0].address.as_deref(), Some("12 หมู่ 3 ต.บ้านใหม่"));
    assert_eq!(records[0].phone.as_deref(), Some("081-234-5678"));
}

#[tokio::test]
async fn output_files_parse_back_to_the_emitted_records() {
    let dir = tempfile::tempdir().unwrap();

    for (pages, rows_per_page) in [(1u32, 0usize), (2, 3)] {
        let config = config(pages, false);
        let mut site = FakeSite::default();
        for page in 1..=pages {
            let rows: Vec<String> = (0..rows_per_page)
                .map(|i| product_row(&format!("กลุ่ม {page}-{i}"), &format!("สินค้า {i}"), None))
                .collect();
            site = site.with_page(config.site.listing_url(page), listing(&rows));
        }
        let site = Arc::new(site);

        let reference = {
            let mut driver = PaginationDriver::new(&config, site.clone(), MemorySink::new()).unwrap();
            driver.run().await.unwrap();
            driver.into_sink().into_records()
        };

        let streamed = dir.path().join(format!("streamed-{pages}.json"));
        let mut driver =
            PaginationDriver::new(&config, site.clone(), StreamingJsonSink::create(&streamed).unwrap()).unwrap();
        driver.run().await.unwrap();
        drop(driver);

        let buffered = dir.path().join(format!("buffered-{pages}.json"));
        let mut driver =
            PaginationDriver::new(&config, site.clone(), JsonArraySink::create(&buffered).unwrap()).unwrap();
        driver.run().await.unwrap();
        drop(driver);

        for path in [&streamed, &buffered] {
            let parsed: Vec<Record> = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(parsed.len(), pages as usize * rows_per_page);
            assert_eq!(parsed, reference);
        }
    }
}
