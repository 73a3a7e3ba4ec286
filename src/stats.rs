use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct RunStats {
    start_ms: AtomicU64,

    scrapers_selected: AtomicU64,
    scrapers_succeeded: AtomicU64,
    scrapers_failed: AtomicU64,

    odds_extracted: AtomicU64,
    rows_skipped: AtomicU64,

    readings_saved: AtomicU64,
    save_errors: AtomicU64,
    consensus_rows: AtomicU64,
}

impl RunStats {
    pub fn new(now_ms: u64) -> Arc<Self> {
        let s = Arc::new(Self::default());
        s.start_ms.store(now_ms, Ordering::Relaxed);
        s
    }

    pub fn set_selected(&self, n: u64) {
        self.scrapers_selected.store(n, Ordering::Relaxed);
    }

    pub fn record_success(&self, results: u64, skipped: u64) {
        self.scrapers_succeeded.fetch_add(1, Ordering::Relaxed);
        self.odds_extracted.fetch_add(results, Ordering::Relaxed);
        self.rows_skipped.fetch_add(skipped, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.scrapers_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_saved(&self, n: u64) {
        self.readings_saved.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_save_error(&self) {
        self.save_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_consensus_rows(&self, n: u64) {
        self.consensus_rows.store(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, now_ms: u64) -> RunStatsSnapshot {
        let start = self.start_ms.load(Ordering::Relaxed);
        RunStatsSnapshot {
            now_ms,
            elapsed_ms: now_ms.saturating_sub(start),
            scrapers_selected: self.scrapers_selected.load(Ordering::Relaxed),
            scrapers_succeeded: self.scrapers_succeeded.load(Ordering::Relaxed),
            scrapers_failed: self.scrapers_failed.load(Ordering::Relaxed),
            odds_extracted: self.odds_extracted.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            readings_saved: self.readings_saved.load(Ordering::Relaxed),
            save_errors: self.save_errors.load(Ordering::Relaxed),
            consensus_rows: self.consensus_rows.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatsSnapshot {
    pub now_ms: u64,
    pub elapsed_ms: u64,
    pub scrapers_selected: u64,
    pub scrapers_succeeded: u64,
    pub scrapers_failed: u64,
    pub odds_extracted: u64,
    pub rows_skipped: u64,
    pub readings_saved: u64,
    pub save_errors: u64,
    pub consensus_rows: u64,
}
