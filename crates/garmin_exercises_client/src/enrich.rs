//! Per-exercise detail lookups.
//!
//! A missing detail document is the common case and leaves the record basic
//! without a warning. Unreachable or malformed documents also leave the
//! record basic but are reported, so a broken fetch is never mistaken for an
//! exercise that simply has no detail page.

use std::time::Duration;

use futures_util::{StreamExt, stream};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::catalog::SourceCatalog;
use crate::config::Config;
use crate::model::{ExerciseDetail, ExerciseIdentifier, ExerciseRecord};
use crate::observability::record_detail_lookup;
use crate::retry::RetryPolicy;
use crate::{DocumentLoader, LoadError, ParsedDocument, SourceFormat};

/// Detail fields plus the muscle groups the detail page lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundDetail {
    pub detail: ExerciseDetail,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
}

/// Result of one detail lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetailOutcome {
    Found(Box<FoundDetail>),
    NotFound,
    Unreachable(LoadError),
    Malformed(LoadError),
}

impl DetailOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DetailOutcome::Found(_) => "found",
            DetailOutcome::NotFound => "not_found",
            DetailOutcome::Unreachable(_) => "unreachable",
            DetailOutcome::Malformed(_) => "malformed",
        }
    }
}

/// A lookup that failed for a reason other than the document being absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailWarning {
    pub id: ExerciseIdentifier,
    pub error: LoadError,
}

#[derive(Clone, Debug, Default)]
pub struct EnrichmentReport {
    pub records: Vec<ExerciseRecord>,
    pub found: usize,
    pub not_found: usize,
    pub unreachable: usize,
    pub malformed: usize,
    pub warnings: Vec<DetailWarning>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetail {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    difficulty: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    hero_image: Option<String>,
    #[serde(default)]
    videos: Vec<RawVideo>,
    #[serde(default)]
    primary_muscles: Vec<String>,
    #[serde(default)]
    secondary_muscles: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Deserialize)]
struct RawVideo {
    thumbnail: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStep {
    Text(String),
    Object {
        description: Option<String>,
        text: Option<String>,
    },
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub struct DetailEnricher<'a> {
    loader: &'a dyn DocumentLoader,
    catalog: &'a SourceCatalog,
    retry: RetryPolicy,
    concurrency: usize,
    request_spacing: Duration,
    verify_media: bool,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(loader: &'a dyn DocumentLoader, catalog: &'a SourceCatalog) -> Self {
        let defaults = Config::default();
        Self {
            loader,
            catalog,
            retry: defaults.retry_policy(),
            concurrency: defaults.concurrency,
            request_spacing: defaults.request_spacing,
            verify_media: defaults.verify_media,
        }
    }

    pub fn from_config(
        loader: &'a dyn DocumentLoader,
        catalog: &'a SourceCatalog,
        config: &Config,
    ) -> Self {
        Self {
            loader,
            catalog,
            retry: config.retry_policy(),
            concurrency: config.concurrency.max(1),
            request_spacing: config.request_spacing,
            verify_media: config.verify_media,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_spacing(mut self, spacing: Duration) -> Self {
        self.request_spacing = spacing;
        self
    }

    pub fn with_media_verification(mut self, verify: bool) -> Self {
        self.verify_media = verify;
        self
    }

    /// Fetch and interpret the detail document for `id`. Unreachable
    /// fetches are retried per the retry policy; the other outcomes are final.
    pub async fn lookup(&self, id: &ExerciseIdentifier) -> DetailOutcome {
        let url = self.catalog.detail_url(id);
        let loaded = self
            .retry
            .retry_async_when(
                || self.loader.load(&url, SourceFormat::Json),
                LoadError::is_retryable,
            )
            .await;
        let value = match loaded {
            Ok(ParsedDocument::Json(value)) => value,
            Ok(ParsedDocument::Properties(_)) => {
                return DetailOutcome::Malformed(LoadError::Malformed {
                    url,
                    reason: "expected a JSON document".into(),
                });
            }
            Err(LoadError::NotFound(_)) => return DetailOutcome::NotFound,
            Err(e @ LoadError::Unreachable { .. }) => return DetailOutcome::Unreachable(e),
            Err(e @ LoadError::Malformed { .. }) => return DetailOutcome::Malformed(e),
        };
        if !value.is_object() {
            return DetailOutcome::Malformed(LoadError::Malformed {
                url,
                reason: "detail document is not a JSON object".into(),
            });
        }
        let raw = match RawDetail::deserialize(&value) {
            Ok(raw) => raw,
            Err(e) => {
                return DetailOutcome::Malformed(LoadError::Malformed {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        let image = self.select_image(&raw).await;
        let video = raw
            .videos
            .first()
            .and_then(|v| non_empty(&v.url))
            .map(|path| SourceCatalog::media_url(self.catalog.video_base_url(), path));
        let mut instructions: Vec<String> = raw
            .instructions
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for step in &raw.steps {
            let text = match step {
                RawStep::Text(s) => Some(s.as_str()),
                RawStep::Object { description, text } => {
                    non_empty(description).or_else(|| non_empty(text))
                }
            };
            if let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) {
                instructions.push(text.to_string());
            }
        }

        DetailOutcome::Found(Box::new(FoundDetail {
            detail: ExerciseDetail {
                difficulty: non_empty(&raw.difficulty).map(str::to_string),
                description: non_empty(&raw.description).map(str::to_string),
                image,
                video,
                instructions,
                page_url: self.catalog.page_url(id),
            },
            primary_muscles: raw.primary_muscles,
            secondary_muscles: raw.secondary_muscles,
        }))
    }

    /// Hero image first, then the first video thumbnail. With verification
    /// on, a candidate is kept only if it answers a HEAD request with 2xx.
    async fn select_image(&self, raw: &RawDetail) -> Option<String> {
        let mut candidates = Vec::new();
        if let Some(hero) = non_empty(&raw.hero_image) {
            candidates.push(SourceCatalog::media_url(self.catalog.base_url(), hero));
        }
        if let Some(thumb) = raw.videos.first().and_then(|v| non_empty(&v.thumbnail)) {
            candidates.push(SourceCatalog::media_url(
                self.catalog.video_base_url(),
                thumb,
            ));
        }
        for candidate in candidates {
            if !self.verify_media {
                return Some(candidate);
            }
            self.pause().await;
            match self.loader.probe(&candidate).await {
                Ok(true) => return Some(candidate),
                Ok(false) => debug!(url = %candidate, "media candidate rejected"),
                Err(e) => debug!(url = %candidate, error = %e, "media probe failed"),
            }
        }
        None
    }

    /// Per-worker spacing applied before every request to the Garmin hosts.
    async fn pause(&self) {
        if !self.request_spacing.is_zero() {
            tokio::time::sleep(self.request_spacing).await;
        }
    }

    /// Look up every record with bounded concurrency and fold the outcomes
    /// back into the records. Order of `records` is preserved.
    pub async fn enrich(&self, mut records: Vec<ExerciseRecord>) -> EnrichmentReport {
        info!(
            total = records.len(),
            concurrency = self.concurrency,
            spacing_ms = self.request_spacing.as_millis() as u64,
            "starting detail lookups"
        );
        let outcomes: Vec<(usize, DetailOutcome)> = stream::iter(records.iter().enumerate())
            .map(|(i, record)| async move {
                self.pause().await;
                (i, self.lookup(&record.id).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = EnrichmentReport::default();
        for (i, outcome) in outcomes {
            record_detail_lookup(outcome.label());
            let record = &mut records[i];
            match outcome {
                DetailOutcome::Found(found) => {
                    let FoundDetail {
                        detail,
                        primary_muscles,
                        secondary_muscles,
                    } = *found;
                    record.union_muscles(&primary_muscles, &secondary_muscles);
                    record.attach_detail(detail);
                    report.found += 1;
                }
                DetailOutcome::NotFound => {
                    debug!(id = %record.id, "no detail document");
                    report.not_found += 1;
                }
                DetailOutcome::Unreachable(error) => {
                    warn!(
                        id = %record.id,
                        %error,
                        "detail lookup unreachable; keeping basic record"
                    );
                    report.unreachable += 1;
                    report.warnings.push(DetailWarning {
                        id: record.id.clone(),
                        error,
                    });
                }
                DetailOutcome::Malformed(error) => {
                    warn!(
                        id = %record.id,
                        %error,
                        "detail document malformed; keeping basic record"
                    );
                    report.malformed += 1;
                    report.warnings.push(DetailWarning {
                        id: record.id.clone(),
                        error,
                    });
                }
            }
        }
        report.warnings.sort_by(|a, b| a.id.cmp(&b.id));
        report.records = records;
        info!(
            found = report.found,
            not_found = report.not_found,
            unreachable = report.unreachable,
            malformed = report.malformed,
            "detail lookups finished"
        );
        report
    }
}
