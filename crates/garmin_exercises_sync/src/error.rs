//! Errors for the sync job.

use garmin_exercises_client::ExercisesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A required source could not be loaded; nothing was published.
    #[error("collection failed: {0}")]
    Collect(#[from] ExercisesError),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Publish(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
