//! One complete run: select, scrape, persist, build consensus, alert.

use std::sync::Arc;

use chrono::Utc;

use crate::coordinator::{select_scrapers, Coordinator, RunReport};
use crate::error::ConfigError;
use crate::odds::build_consensus;
use crate::scraper::Scraper;
use crate::sink::{FailureNotifier, OddsSink};
use crate::types::{ConsensusRun, ScrapeFailure, ScrapeSuccess};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Case-insensitive substring of a bookmaker name.
    pub bookmaker: Option<String>,
    /// Scrape and aggregate, but hand nothing to the sink.
    pub dry_run: bool,
    pub notify: bool,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub successes: Vec<ScrapeSuccess>,
    pub failures: Vec<ScrapeFailure>,
    pub consensus: ConsensusRun,
    pub notified: Option<bool>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn log(&self) {
        let total = self.total();
        tracing::info!(
            successful = self.successes.len(),
            failed = self.failures.len(),
            total,
            "scrape summary"
        );
        for s in &self.successes {
            tracing::info!(bookmaker = %s.bookmaker, results = s.results.len(), "succeeded");
        }
        for f in &self.failures {
            tracing::warn!(bookmaker = %f.bookmaker, error = %f.error, "failed");
        }
        for f in &self.consensus.excluded {
            tracing::warn!(bookmaker = %f.bookmaker, error = %f.error, "left out of consensus");
        }
        if let Some(sent) = self.notified {
            tracing::info!(sent, "failure alert");
        }
        for r in &self.consensus.rows {
            tracing::info!(
                outcome = %r.outcome,
                fair_probability = %r.fair_probability,
                averaged_odds = %r.averaged_odds,
                bookmakers = r.bookmaker_count,
                "consensus"
            );
        }
    }
}

pub struct Pipeline {
    registry: Vec<Arc<dyn Scraper>>,
    coordinator: Coordinator,
    sink: Arc<dyn OddsSink>,
    notifier: Arc<dyn FailureNotifier>,
}

impl Pipeline {
    pub fn new(
        registry: Vec<Arc<dyn Scraper>>,
        coordinator: Coordinator,
        sink: Arc<dyn OddsSink>,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Self {
        Self {
            registry,
            coordinator,
            sink,
            notifier,
        }
    }

    /// Only an unknown bookmaker filter fails the run; scrape and sink
    /// problems are reported in the summary.
    pub async fn run(&self, opts: &RunOptions) -> Result<RunSummary, ConfigError> {
        let scrapers = select_scrapers(&self.registry, opts.bookmaker.as_deref())?;

        let RunReport { successes, failures } = self.coordinator.run_all(scrapers).await;
        let stats = self.coordinator.stats();

        if opts.dry_run {
            tracing::warn!("dry run - not saving results");
        } else {
            for s in &successes {
                match self.sink.save(&s.bookmaker, &s.results).await {
                    Ok(()) => stats.add_saved(s.results.len() as u64),
                    Err(e) => {
                        stats.inc_save_error();
                        tracing::error!(bookmaker = %s.bookmaker, error = %e, "saving readings failed");
                    }
                }
            }
        }

        let consensus = build_consensus(Utc::now(), &successes);
        stats.set_consensus_rows(consensus.rows.len() as u64);
        if !opts.dry_run && !consensus.rows.is_empty() {
            if let Err(e) = self.sink.save_consensus(&consensus).await {
                stats.inc_save_error();
                tracing::error!(run_id = %consensus.run_id, error = %e, "saving consensus failed");
            }
        }

        let notified = if !failures.is_empty() && opts.notify {
            Some(self.notifier.notify(&failures).await)
        } else {
            None
        };

        let summary = RunSummary {
            successes,
            failures,
            consensus,
            notified,
        };
        summary.log();
        Ok(summary)
    }
}
