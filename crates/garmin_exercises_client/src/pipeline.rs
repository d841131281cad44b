//! Single pass over every declared source: load, normalize, merge, enrich.

use std::collections::BTreeSet;

use tracing::{info, instrument, warn};

use crate::catalog::{SourceCatalog, SourceRef};
use crate::config::Config;
use crate::enrich::{DetailEnricher, EnrichmentReport};
use crate::merge::ExerciseTable;
use crate::normalize::normalize;
use crate::observability::{record_document, record_skipped};
use crate::retry::RetryPolicy;
use crate::{DocumentLoader, ExercisesError, LoadError, ParsedDocument};

/// Merged table before detail lookups.
#[derive(Debug, Default)]
pub struct MergedCatalog {
    pub table: ExerciseTable,
    pub skipped_records: usize,
}

#[derive(Debug, Default)]
pub struct Collection {
    /// Enriched records (sorted by identifier) and lookup counts.
    pub enrichment: EnrichmentReport,
    pub skipped_records: usize,
    pub unmatched_translations: usize,
}

/// Load a source every later stage depends on. Any failure, including a
/// missing document, is fatal for the run.
async fn load_required(
    loader: &dyn DocumentLoader,
    retry: &RetryPolicy,
    source: &SourceRef,
) -> Result<ParsedDocument, ExercisesError> {
    let loaded = retry
        .retry_async_when(
            || loader.load(&source.url, source.format),
            LoadError::is_retryable,
        )
        .await;
    match loaded {
        Ok(doc) => {
            record_document(source.kind, "ok");
            Ok(doc)
        }
        Err(error) => {
            record_document(source.kind, error.kind());
            Err(ExercisesError::SourceMissing {
                source_name: source.name.clone(),
                error,
            })
        }
    }
}

async fn merge_source(
    loader: &dyn DocumentLoader,
    retry: &RetryPolicy,
    source: &SourceRef,
    workout_types: &BTreeSet<crate::WorkoutType>,
    merged: &mut MergedCatalog,
) -> Result<(), ExercisesError> {
    let doc = load_required(loader, retry, source).await?;
    let normalized = normalize(&doc, source.kind).map_err(|e| ExercisesError::SourceMissing {
        source_name: source.name.clone(),
        error: LoadError::Malformed {
            url: source.url.clone(),
            reason: e.to_string(),
        },
    })?;
    if normalized.skipped > 0 {
        warn!(source = %source.name, skipped = normalized.skipped, "dropped malformed records");
    }
    record_skipped(&source.name, normalized.skipped);
    info!(source = %source.name, entries = normalized.deltas.len(), "merging source");
    merged.skipped_records += normalized.skipped;
    merged.table.merge(normalized.deltas, workout_types);
    Ok(())
}

/// Load and merge every exercise list plus the equipment and translation
/// documents.
#[instrument(skip_all)]
pub async fn merge_sources(
    loader: &dyn DocumentLoader,
    catalog: &SourceCatalog,
    retry: &RetryPolicy,
) -> Result<MergedCatalog, ExercisesError> {
    let mut merged = MergedCatalog::default();
    for list in catalog.list_sources() {
        merge_source(loader, retry, &list.source, &list.workout_types, &mut merged).await?;
    }
    let none = BTreeSet::new();
    merge_source(loader, retry, &catalog.equipment_source(), &none, &mut merged).await?;
    merge_source(loader, retry, &catalog.translation_source(), &none, &mut merged).await?;
    info!(
        exercises = merged.table.len(),
        skipped = merged.skipped_records,
        "sources merged"
    );
    Ok(merged)
}

/// Run the whole fetch → merge → enrich pass.
pub async fn collect_exercises(
    loader: &dyn DocumentLoader,
    config: &Config,
) -> Result<Collection, ExercisesError> {
    let catalog = config.catalog();
    let merged = merge_sources(loader, &catalog, &config.retry_policy()).await?;
    let unmatched_translations = merged.table.unmatched_translations();
    let enricher = DetailEnricher::from_config(loader, &catalog, config);
    let enrichment = enricher.enrich(merged.table.into_records()).await;
    Ok(Collection {
        enrichment,
        skipped_records: merged.skipped_records,
        unmatched_translations,
    })
}
