//! Garmin exercise catalogue client: fetch the public exercise documents,
//! merge them into one record per exercise and enrich each record with its
//! detail page.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod enrich;
pub mod http_client;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod properties;
pub mod retry;

pub use catalog::{SourceCatalog, SourceKind, SourceRef, WorkoutType};
pub use model::{ExerciseDetail, ExerciseIdentifier, ExerciseRecord};

/// Outcome of a single failed document fetch.
///
/// `NotFound` is a data fact (the resource does not exist); the other two
/// variants mean the fetch itself broke.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unreachable: {url}: {reason}")]
    Unreachable { url: String, reason: String },
    #[error("malformed: {url}: {reason}")]
    Malformed { url: String, reason: String },
}

impl LoadError {
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Unreachable { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound(_) => "not_found",
            LoadError::Unreachable { .. } => "unreachable",
            LoadError::Malformed { .. } => "malformed",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExercisesError {
    /// A required list/equipment/translation source could not be used.
    #[error("required source {source_name} failed: {error}")]
    SourceMissing {
        source_name: String,
        error: LoadError,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Payload format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Json,
    Properties,
}

/// A fetched and parsed source document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    Json(serde_json::Value),
    Properties(BTreeMap<String, String>),
}

impl ParsedDocument {
    /// Parse raw bytes according to `format`.
    pub fn parse(url: &str, format: SourceFormat, body: &[u8]) -> Result<Self, LoadError> {
        match format {
            SourceFormat::Json => serde_json::from_slice(body)
                .map(ParsedDocument::Json)
                .map_err(|e| LoadError::Malformed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
            SourceFormat::Properties => {
                let text = String::from_utf8_lossy(body);
                Ok(ParsedDocument::Properties(properties::parse(&text)))
            }
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParsedDocument::Json(v) => Some(v),
            ParsedDocument::Properties(_) => None,
        }
    }
}

/// Fetches one document per call. Implementations make exactly one attempt;
/// retrying is up to the caller.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, url: &str, format: SourceFormat) -> Result<ParsedDocument, LoadError>;

    /// Check that a media URL resolves (2xx) without downloading it.
    async fn probe(&self, url: &str) -> Result<bool, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_document() {
        let doc = ParsedDocument::parse("u", SourceFormat::Json, br#"{"a":1}"#).expect("json");
        assert_eq!(doc.as_json().and_then(|v| v.get("a")).and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn parse_invalid_json_is_malformed() {
        let err = ParsedDocument::parse("u", SourceFormat::Json, b"<html>").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn parse_properties_document() {
        let doc =
            ParsedDocument::parse("u", SourceFormat::Properties, b"PUSH_UP_PUSH_UP=Push-Up\n")
                .expect("props");
        match doc {
            ParsedDocument::Properties(map) => {
                assert_eq!(map.get("PUSH_UP_PUSH_UP").map(String::as_str), Some("Push-Up"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_unreachable_is_retryable() {
        assert!(
            LoadError::Unreachable {
                url: "u".into(),
                reason: "timeout".into()
            }
            .is_retryable()
        );
        assert!(!LoadError::NotFound("u".into()).is_retryable());
    }
}
