//! Where readings, consensus rows and failure alerts leave the core.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::outcome::OutcomeCode;
use crate::types::{ConsensusRun, OddsResult, ScrapeFailure};

/// Persistence collaborator.
#[async_trait]
pub trait OddsSink: Send + Sync {
    async fn save(&self, bookmaker: &str, results: &[OddsResult]) -> Result<()>;

    async fn save_consensus(&self, run: &ConsensusRun) -> Result<()>;
}

/// Alerting collaborator. Returns whether the alert went out.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, failures: &[ScrapeFailure]) -> bool;
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    Reading {
        date: NaiveDate,
        bookmaker: &'a str,
        outcome: OutcomeCode,
        odds: Decimal,
    },
    Consensus {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
        outcome: OutcomeCode,
        fair_probability: Decimal,
        averaged_odds: Decimal,
        bookmaker_count: usize,
    },
}

/// Appends one JSON object per reading / consensus row.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append(&self, records: &[Record<'_>]) -> Result<()> {
        let mut buf = String::new();
        for r in records {
            buf.push_str(&serde_json::to_string(r)?);
            buf.push('\n');
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open {} failed", self.path.display()))?;
        f.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("write {} failed", self.path.display()))?;
        f.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl OddsSink for JsonlSink {
    async fn save(&self, bookmaker: &str, results: &[OddsResult]) -> Result<()> {
        let date = Utc::now().date_naive();
        let records: Vec<Record> = results
            .iter()
            .map(|r| Record::Reading {
                date,
                bookmaker,
                outcome: r.outcome,
                odds: r.odds,
            })
            .collect();
        self.append(&records).await?;
        tracing::info!(bookmaker, saved = records.len(), path = %self.path.display(), "readings saved");
        Ok(())
    }

    async fn save_consensus(&self, run: &ConsensusRun) -> Result<()> {
        let records: Vec<Record> = run
            .rows
            .iter()
            .map(|r| Record::Consensus {
                run_id: run.run_id,
                timestamp: r.timestamp,
                outcome: r.outcome,
                fair_probability: r.fair_probability,
                averaged_odds: r.averaged_odds,
                bookmaker_count: r.bookmaker_count,
            })
            .collect();
        self.append(&records).await
    }
}

/// Logs instead of persisting; used when no output file is configured.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl OddsSink for LogSink {
    async fn save(&self, bookmaker: &str, results: &[OddsResult]) -> Result<()> {
        tracing::info!(bookmaker, readings = results.len(), "readings");
        for r in results {
            tracing::info!(bookmaker, outcome = %r.outcome, odds = %r.odds, "reading");
        }
        Ok(())
    }

    async fn save_consensus(&self, run: &ConsensusRun) -> Result<()> {
        for r in &run.rows {
            tracing::info!(
                run_id = %run.run_id,
                outcome = %r.outcome,
                party = r.outcome.display_name(),
                fair_probability = %r.fair_probability,
                averaged_odds = %r.averaged_odds,
                bookmakers = r.bookmaker_count,
                "consensus"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAlert {
    pub subject: String,
    pub body: String,
}

impl FailureAlert {
    pub fn render(failures: &[ScrapeFailure]) -> Self {
        let details = failures
            .iter()
            .map(|f| format!("  - {}: {}", f.bookmaker, f.error))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            subject: format!("BetPoll Scrape Alert: {} scraper(s) failed", failures.len()),
            body: format!(
                "BetPoll scrape encountered failures.\n\n\
                 Failed scrapers:\n{details}\n\n\
                 Please investigate and update selectors if site structure changed.\n"
            ),
        }
    }
}

/// Renders the alert and writes it to the log at error level.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl FailureNotifier for LogNotifier {
    async fn notify(&self, failures: &[ScrapeFailure]) -> bool {
        if failures.is_empty() {
            tracing::info!("no failures to report");
            return true;
        }
        let alert = FailureAlert::render(failures);
        tracing::error!(subject = %alert.subject, "{}", alert.body);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConsensusRow;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn jsonl_sink_appends_readings_and_consensus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.jsonl");
        let sink = JsonlSink::new(&path);

        let results = vec![
            OddsResult { outcome: OutcomeCode::Labor, odds: dec!(1.85) },
            OddsResult { outcome: OutcomeCode::Coalition, odds: dec!(2.10) },
        ];
        sink.save("Betr", &results).await.unwrap();

        let ts = Utc::now();
        let run = ConsensusRun {
            run_id: Uuid::new_v4(),
            timestamp: ts,
            rows: vec![ConsensusRow {
                timestamp: ts,
                outcome: OutcomeCode::Labor,
                fair_probability: dec!(0.5316),
                averaged_odds: dec!(1.85),
                bookmaker_count: 1,
            }],
            excluded: vec![],
        };
        sink.save_consensus(&run).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "reading");
        assert_eq!(lines[0]["bookmaker"], "Betr");
        assert_eq!(lines[0]["outcome"], "ALP");
        assert_eq!(lines[1]["outcome"], "LNP");
        assert_eq!(lines[2]["kind"], "consensus");
        assert_eq!(lines[2]["bookmaker_count"], 1);
        assert_eq!(lines[2]["run_id"], run.run_id.to_string());
    }

    #[test]
    fn alert_lists_every_failure() {
        let alert = FailureAlert::render(&[
            ScrapeFailure {
                bookmaker: "Sportsbet".to_string(),
                error: "timed out after 30000ms while waiting for market content".to_string(),
            },
            ScrapeFailure {
                bookmaker: "Ladbrokes".to_string(),
                error: "browser error: target closed".to_string(),
            },
        ]);
        assert_eq!(alert.subject, "BetPoll Scrape Alert: 2 scraper(s) failed");
        assert!(alert
            .body
            .contains("  - Sportsbet: timed out after 30000ms while waiting for market content\n"));
        assert!(alert.body.contains("  - Ladbrokes: browser error: target closed"));
    }

    #[tokio::test]
    async fn log_notifier_reports_success() {
        assert!(LogNotifier.notify(&[]).await);
        let failure = ScrapeFailure {
            bookmaker: "Betr".to_string(),
            error: "boom".to_string(),
        };
        assert!(LogNotifier.notify(&[failure]).await);
    }
}
