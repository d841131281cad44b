//! HTTP implementation of the [`DocumentLoader`](crate::DocumentLoader) trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::{DocumentLoader, ExercisesError, LoadError, ParsedDocument, SourceFormat};

const USER_AGENT: &str = concat!("garmin-exercises-sync/", env!("CARGO_PKG_VERSION"));

/// Loader for the public exercise documents using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestDocumentLoader {
    client: reqwest::Client,
}

impl ReqwestDocumentLoader {
    /// Create a loader whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ExercisesError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn unreachable(url: &str, reason: impl ToString) -> LoadError {
        LoadError::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map a non-success status to the load error taxonomy.
    fn error_from_status(url: &str, status: StatusCode) -> LoadError {
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => LoadError::NotFound(url.to_string()),
            other => Self::unreachable(url, format!("http status {}", other.as_u16())),
        }
    }
}

#[async_trait]
impl DocumentLoader for ReqwestDocumentLoader {
    async fn load(&self, url: &str, format: SourceFormat) -> Result<ParsedDocument, LoadError> {
        debug!(%url, ?format, "fetching document");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::unreachable(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::error_from_status(url, status));
        }
        let body = resp.bytes().await.map_err(|e| Self::unreachable(url, e))?;
        ParsedDocument::parse(url, format, &body)
    }

    async fn probe(&self, url: &str) -> Result<bool, LoadError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Self::unreachable(url, e))?;
        Ok(resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_separates_missing_from_broken() {
        let url = "http://x/doc.json";
        assert_eq!(
            ReqwestDocumentLoader::error_from_status(url, StatusCode::NOT_FOUND),
            LoadError::NotFound(url.into())
        );
        assert_eq!(
            ReqwestDocumentLoader::error_from_status(url, StatusCode::GONE),
            LoadError::NotFound(url.into())
        );
        assert!(
            ReqwestDocumentLoader::error_from_status(url, StatusCode::SERVICE_UNAVAILABLE)
                .is_retryable()
        );
        assert!(matches!(
            ReqwestDocumentLoader::error_from_status(url, StatusCode::FORBIDDEN),
            LoadError::Unreachable { .. }
        ));
    }

    #[test]
    fn loader_builds() {
        let loader = ReqwestDocumentLoader::new(Duration::from_secs(1));
        assert!(loader.is_ok());
    }
}
