//! `smce-crawler [CONFIG]`
//!
//! The config path comes from the first argument, else `SMCE_CONFIG`.
//! Exits non-zero only when configuration, logging or the output artifact fails.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use smce_crawler::application::{JsonArraySink, PaginationDriver, RecordSink, StreamingJsonSink};
use smce_crawler::infrastructure::config::defaults;
use smce_crawler::infrastructure::{
    AppConfig, HttpClient, OutputMode, PageFetcher, init_logging_with_config, log_system_info,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(defaults::CONFIG_PATH_ENV).ok())
        .map(PathBuf::from);

    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    init_logging_with_config(&config.logging)?;
    log_system_info();

    let cancellation_token = CancellationToken::new();
    {
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Interrupt received, finishing current step");
                token.cancel();
            }
        });
    }

    let fetcher: Arc<dyn PageFetcher> =
        Arc::new(HttpClient::new(&config.http)?.with_cancellation(cancellation_token.clone()));

    let output = &config.output.path;
    let sink: Box<dyn RecordSink> = match config.output.mode {
        OutputMode::Streaming => Box::new(StreamingJsonSink::create(output)?),
        OutputMode::Buffered => Box::new(JsonArraySink::create(output)?),
    };
    info!("🚀 Writing {:?} output to {:?}", config.output.mode, output);

    let mut driver = PaginationDriver::new(&config, fetcher, sink)?.with_cancellation(cancellation_token);
    let summary = driver.run().await?;

    info!(
        "✅ {} records written to {:?} ({} pages fetched, {} skipped)",
        summary.records_emitted, output, summary.pages_fetched, summary.pages_skipped
    );
    Ok(())
}
