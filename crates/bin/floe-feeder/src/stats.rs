//! reconciliation counters

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

#[derive(Clone, Debug)]
pub struct ReconciliationStats {
    pub successful: u64,
    pub failed: u64,
    /// pushes left out by the drift threshold
    pub held: u64,
    /// ticks dropped because a cycle was still running
    pub skipped_ticks: u64,
    pub last_price: Option<f64>,
    pub last_update: Option<DateTime<Utc>>,
    started_at: Instant,
}

impl ReconciliationStats {
    pub fn new() -> Self {
        Self {
            successful: 0,
            failed: 0,
            held: 0,
            skipped_ticks: 0,
            last_price: None,
            last_update: None,
            started_at: Instant::now(),
        }
    }

    pub fn record_success(&mut self, price: f64, at: DateTime<Utc>) {
        self.successful += 1;
        self.last_price = Some(price);
        self.last_update = Some(at);
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn log(&self) {
        info!("stats:");
        info!("  successful updates: {}", self.successful);
        info!("  failed updates: {}", self.failed);
        if self.held > 0 {
            info!("  held below threshold: {}", self.held);
        }
        if self.skipped_ticks > 0 {
            info!("  skipped ticks: {}", self.skipped_ticks);
        }
        info!(
            "  last price: {}",
            self.last_price.map_or_else(|| "n/a".to_string(), |p| format!("${:.2}", p))
        );
        info!(
            "  last update: {}",
            self.last_update.map_or_else(|| "n/a".to_string(), |t| t.to_rfc3339())
        );
        info!("  uptime: {}", format_uptime(self.uptime()));
    }
}

impl Default for ReconciliationStats {
    fn default() -> Self {
        Self::new()
    }
}

/// `1h 2m 3s`
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
