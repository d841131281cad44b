//! Counters emitted through the `metrics` facade. They are no-ops unless the
//! host installs a recorder.

use metrics::counter;

use crate::catalog::SourceKind;

pub const DOCUMENTS_TOTAL: &str = "garmin_exercises_documents_total";
pub const DETAIL_LOOKUPS_TOTAL: &str = "garmin_exercises_detail_lookups_total";
pub const SKIPPED_RECORDS_TOTAL: &str = "garmin_exercises_skipped_records_total";

pub fn record_document(kind: SourceKind, outcome: &'static str) {
    counter!(DOCUMENTS_TOTAL, "kind" => kind.label(), "outcome" => outcome).increment(1);
}

pub fn record_detail_lookup(outcome: &'static str) {
    counter!(DETAIL_LOOKUPS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_skipped(source: &str, count: usize) {
    if count > 0 {
        counter!(SKIPPED_RECORDS_TOTAL, "source" => source.to_string()).increment(count as u64);
    }
}
