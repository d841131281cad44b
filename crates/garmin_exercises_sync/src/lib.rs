//! Monthly batch job: collect the Garmin exercise catalogue and publish it as
//! one spreadsheet table.

use chrono::{DateTime, Utc};
use garmin_exercises_client::DocumentLoader;
use garmin_exercises_client::config::Config;
use garmin_exercises_client::pipeline::collect_exercises;
use metrics::counter;
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub mod config;
pub mod error;
pub mod google;
pub mod publisher;
pub mod table;
mod test_utils;

use error::SyncError;
use publisher::SheetPublisher;
use table::SheetTable;

pub const ROWS_PUBLISHED_TOTAL: &str = "garmin_exercises_rows_published_total";

/// Counts reported at the end of every completed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub found: usize,
    /// Records published without detail fields, whatever the reason.
    pub basic: usize,
    pub detail_unreachable: usize,
    pub detail_malformed: usize,
    pub skipped_records: usize,
    pub unmatched_translations: usize,
    pub rows_published: usize,
}

/// Run one full pass: fetch, merge, enrich, render and publish.
///
/// Per-exercise detail failures are logged and counted; only a failed
/// required source or a failed publish returns an error.
pub async fn run_sync(
    loader: &dyn DocumentLoader,
    publisher: &dyn SheetPublisher,
    config: &Config,
) -> Result<RunSummary, SyncError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let span = info_span!("sync_run", %run_id);
    async move {
        info!(%started_at, "sync run started");
        let collection = collect_exercises(loader, config).await?;
        let report = &collection.enrichment;
        let table = SheetTable::from_records(&report.records);

        let rows_published = publisher.publish(&table).await?;
        counter!(ROWS_PUBLISHED_TOTAL).increment(rows_published as u64);

        let total = report.records.len();
        let summary = RunSummary {
            run_id,
            started_at,
            total,
            found: report.found,
            basic: total - report.found,
            detail_unreachable: report.unreachable,
            detail_malformed: report.malformed,
            skipped_records: collection.skipped_records,
            unmatched_translations: collection.unmatched_translations,
            rows_published,
        };
        if !report.warnings.is_empty() {
            warn!(
                count = report.warnings.len(),
                "some detail lookups failed; those exercises were published without detail"
            );
        }
        info!(
            total = summary.total,
            found = summary.found,
            basic = summary.basic,
            detail_unreachable = summary.detail_unreachable,
            detail_malformed = summary.detail_malformed,
            skipped_records = summary.skipped_records,
            unmatched_translations = summary.unmatched_translations,
            rows_published = summary.rows_published,
            "sync run complete"
        );
        Ok(summary)
    }
    .instrument(span)
    .await
}
