//! Runs the selected scrapers with per-bookmaker failure isolation.

use std::sync::Arc;

use futures::{stream, StreamExt};
use tokio::task::JoinError;

use crate::error::{ConfigError, ScrapeError};
use crate::scraper::Scraper;
use crate::stats::RunStats;
use crate::types::{ScrapeFailure, ScrapeOutcome, ScrapeSuccess};

/// Narrows the registry to bookmakers whose name contains `filter`, ignoring case.
pub fn select_scrapers(
    registry: &[Arc<dyn Scraper>],
    filter: Option<&str>,
) -> Result<Vec<Arc<dyn Scraper>>, ConfigError> {
    let filter = match filter.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => f.to_lowercase(),
        None => return Ok(registry.to_vec()),
    };

    let selected: Vec<_> = registry
        .iter()
        .filter(|s| s.name().to_lowercase().contains(&filter))
        .cloned()
        .collect();

    if selected.is_empty() {
        let available = registry.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ");
        return Err(ConfigError::UnknownBookmaker { filter, available });
    }
    Ok(selected)
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub successes: Vec<ScrapeSuccess>,
    pub failures: Vec<ScrapeFailure>,
}

pub struct Coordinator {
    concurrency: usize,
    stats: Arc<RunStats>,
}

impl Coordinator {
    pub fn new(concurrency: usize, stats: Arc<RunStats>) -> Self {
        Self {
            concurrency: concurrency.max(1),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<RunStats> {
        &self.stats
    }

    /// Every scraper runs to completion on its own task; no outcome of one
    /// affects another. Never fails itself.
    pub async fn run_all(&self, scrapers: Vec<Arc<dyn Scraper>>) -> RunReport {
        self.stats.set_selected(scrapers.len() as u64);
        tracing::info!(
            scrapers = scrapers.len(),
            concurrency = self.concurrency,
            "starting odds scrape"
        );

        let mut outcomes = stream::iter(scrapers.into_iter().map(run_isolated))
            .buffer_unordered(self.concurrency);

        let mut report = RunReport::default();
        while let Some(outcome) = outcomes.next().await {
            tracing::debug!(bookmaker = outcome.bookmaker(), "scraper finished");
            match outcome {
                ScrapeOutcome::Success(s) => {
                    self.stats
                        .record_success(s.results.len() as u64, s.skipped_rows as u64);
                    tracing::info!(
                        bookmaker = %s.bookmaker,
                        results = s.results.len(),
                        skipped = s.skipped_rows,
                        "scraper succeeded"
                    );
                    report.successes.push(s);
                }
                ScrapeOutcome::Failure(f) => {
                    self.stats.record_failure();
                    tracing::error!(bookmaker = %f.bookmaker, error = %f.error, "scraper failed");
                    report.failures.push(f);
                }
            }
        }
        report
    }
}

async fn run_isolated(scraper: Arc<dyn Scraper>) -> ScrapeOutcome {
    let bookmaker = scraper.name().to_string();
    let task = tokio::spawn(async move { scraper.scrape().await });

    let result = match task.await {
        Ok(r) => r,
        Err(e) => Err(ScrapeError::Aborted(join_error_message(e))),
    };

    match result {
        // An empty success is treated like a layout change, whatever the scraper claims.
        Ok(ex) if ex.results.is_empty() => ScrapeOutcome::Failure(ScrapeFailure {
            bookmaker,
            error: ScrapeError::EmptyExtraction { candidates: ex.skipped }.to_string(),
        }),
        Ok(ex) => ScrapeOutcome::Success(ScrapeSuccess {
            bookmaker,
            results: ex.results,
            skipped_rows: ex.skipped,
        }),
        Err(e) => ScrapeOutcome::Failure(ScrapeFailure {
            bookmaker,
            error: e.to_string(),
        }),
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panicked: {msg}")
}
