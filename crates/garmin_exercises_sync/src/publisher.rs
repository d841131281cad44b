use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::SyncResult;
use crate::table::SheetTable;

/// Destination for the rendered table. A publish replaces whatever the
/// destination held before and returns the number of data rows written.
#[async_trait]
pub trait SheetPublisher: Send + Sync {
    async fn publish(&self, table: &SheetTable) -> SyncResult<usize>;
}

/// Writes the table as pretty JSON to a local file (dry run).
#[derive(Clone, Debug)]
pub struct JsonFilePublisher {
    path: PathBuf,
}

impl JsonFilePublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SheetPublisher for JsonFilePublisher {
    async fn publish(&self, table: &SheetTable) -> SyncResult<usize> {
        let body = serde_json::to_vec_pretty(table)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        info!(path = %self.path.display(), rows = table.len(), "dry run: table written");
        Ok(table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use garmin_exercises_client::{ExerciseIdentifier, ExerciseRecord};

    #[tokio::test]
    async fn writes_headers_and_rows_as_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("exercises.json");
        let table = SheetTable::from_records(&[ExerciseRecord::new(ExerciseIdentifier::new(
            "PLANK", "PLANK",
        ))]);

        let written = JsonFilePublisher::new(&path)
            .publish(&table)
            .await
            .expect("publish");
        assert_eq!(written, 1);

        let raw = tokio::fs::read_to_string(&path).await.expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["header_groups"][0], "IDENTIFIER");
        assert_eq!(value["header_columns"][2], "Name");
        assert_eq!(value["rows"][0][2], "PLANK PLANK");
    }

    #[tokio::test]
    async fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // a directory cannot be overwritten as a file
        let err = JsonFilePublisher::new(dir.path())
            .publish(&SheetTable::from_records(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
