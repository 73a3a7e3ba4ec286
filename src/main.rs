mod browser;
mod config;
mod coordinator;
mod error;
mod odds;
mod outcome;
mod pipeline;
mod scraper;
mod sink;
mod stats;
mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::browser::{BrowserDriver, ChromiumDriver};
use crate::config::{non_empty, Settings};
use crate::coordinator::Coordinator;
use crate::pipeline::Pipeline;
use crate::sink::{JsonlSink, LogNotifier, LogSink, OddsSink};
use crate::stats::RunStats;

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

async fn maybe_write_jsonl(path: &Option<String>, line: &str) {
    if let Some(p) = non_empty(path) {
        if let Ok(mut f) = tokio::fs::OpenOptions::new().create(true).append(true).open(&p).await {
            use tokio::io::AsyncWriteExt;
            let _ = f.write_all(line.as_bytes()).await;
            let _ = f.write_all(b"\n").await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let s = Settings::from_env()?;
    let stats = RunStats::new(now_ms());

    let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new());
    let registry = scraper::profiles::registry(driver, &s.launch_options());

    let sink: Arc<dyn OddsSink> = match non_empty(&s.readings_jsonl_path) {
        Some(p) => {
            tracing::info!(path = %p, "writing readings as jsonl");
            Arc::new(JsonlSink::new(p))
        }
        None => Arc::new(LogSink),
    };

    let pipeline = Pipeline::new(
        registry,
        Coordinator::new(s.concurrency, stats.clone()),
        sink,
        Arc::new(LogNotifier),
    );

    let summary = pipeline.run(&s.run_options()).await?;

    let t = now_ms();
    let ss = stats.snapshot(t);
    let line = serde_json::to_string(&ss).unwrap_or_default();
    tracing::info!(
        elapsed_ms = ss.elapsed_ms,
        selected = ss.scrapers_selected,
        succeeded = ss.scrapers_succeeded,
        failed = ss.scrapers_failed,
        odds_extracted = ss.odds_extracted,
        rows_skipped = ss.rows_skipped,
        readings_saved = ss.readings_saved,
        save_errors = ss.save_errors,
        consensus_rows = ss.consensus_rows,
        "stats"
    );
    maybe_write_jsonl(&s.stats_jsonl_path, &line).await;

    if !summary.failures.is_empty() {
        anyhow::bail!("{} scraper(s) failed", summary.failures.len());
    }
    Ok(())
}
