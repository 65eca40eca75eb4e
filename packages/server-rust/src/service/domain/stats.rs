//! Scheduled record statistics.
//!
//! Runs on the background worker tick, in root scope, so the counts cover
//! every tenant.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::records::RecordService;
use crate::service::worker::{BackgroundRunnable, TenantJob};

/// Periodically counts stored records per collection.
///
/// Each tick publishes `tenancy_records_stored{collection}` and keeps the
/// report for [`StatsReport::last_report`]. A submitted task recounts
/// immediately in the scope it carries.
pub struct RecordStatsJob {
    records: Arc<RecordService>,
    last: Arc<Mutex<Vec<(String, usize)>>>,
}

impl RecordStatsJob {
    #[must_use]
    pub fn new(records: Arc<RecordService>) -> Self {
        Self {
            records,
            last: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the most recent report, readable after the job moves into
    /// its worker.
    #[must_use]
    pub fn report_handle(&self) -> StatsReport {
        StatsReport(Arc::clone(&self.last))
    }

    async fn recount(&self) {
        match self.records.counts().await {
            Ok(counts) => {
                for (collection, count) in &counts {
                    metrics::gauge!("tenancy_records_stored", "collection" => collection.clone())
                        .set(*count as f64);
                }
                debug!(collections = counts.len(), "record stats refreshed");
                *self.last.lock() = counts;
            }
            Err(err) => warn!(error = %err, "record stats failed"),
        }
    }
}

/// Shared view of the last [`RecordStatsJob`] report.
#[derive(Clone)]
pub struct StatsReport(Arc<Mutex<Vec<(String, usize)>>>);

impl StatsReport {
    #[must_use]
    pub fn last_report(&self) -> Vec<(String, usize)> {
        self.0.lock().clone()
    }
}

#[async_trait]
impl BackgroundRunnable for RecordStatsJob {
    type Task = TenantJob<()>;

    async fn run(&mut self, _task: TenantJob<()>) {
        self.recount().await;
    }

    async fn on_tick(&mut self) {
        self.recount().await;
    }
}
