use std::path::PathBuf;

use garmin_exercises_client::config::Config;
use secrecy::SecretString;

use crate::error::SyncError;

/// Where the rendered table goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishTarget {
    /// Replace the contents of one tab of a Google spreadsheet.
    GoogleSheets {
        spreadsheet_id: String,
        sheet_name: String,
    },
    /// Write the table as JSON to a local file instead of publishing.
    DryRun(PathBuf),
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub client: Config,
    pub target: PublishTarget,
    pub access_token: Option<SecretString>,
    pub credentials_file: PathBuf,
    pub sheets_base_url: String,
    pub metrics_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Same as [`SyncConfig::from_env`] but reads values through `get`.
    /// Empty values count as unset.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, SyncError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = move |k: &str| get(k).filter(|v| !v.trim().is_empty());
        let client =
            Config::from_env_with(&mut get).map_err(|e| SyncError::Config(e.to_string()))?;

        let target = match get("GARMIN_SYNC_DRY_RUN_PATH") {
            Some(path) => PublishTarget::DryRun(PathBuf::from(path)),
            None => PublishTarget::GoogleSheets {
                spreadsheet_id: get("GARMIN_SYNC_SPREADSHEET_ID").ok_or_else(|| {
                    SyncError::Config(
                        "GARMIN_SYNC_SPREADSHEET_ID missing (set GARMIN_SYNC_DRY_RUN_PATH for a dry run)"
                            .into(),
                    )
                })?,
                sheet_name: get("GARMIN_SYNC_SHEET_NAME").unwrap_or_else(|| "Exercises".into()),
            },
        };

        Ok(Self {
            client,
            target,
            access_token: get("GARMIN_SYNC_ACCESS_TOKEN")
                .map(|t| SecretString::new(t.into_boxed_str())),
            credentials_file: get("GARMIN_SYNC_CREDENTIALS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credentials.json")),
            sheets_base_url: get("GARMIN_SYNC_SHEETS_BASE_URL")
                .unwrap_or_else(|| "https://sheets.googleapis.com".into()),
            metrics_path: get("GARMIN_SYNC_METRICS_PATH").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn spreadsheet_id_is_required_without_dry_run() {
        let res = SyncConfig::from_env_with(|_| None);
        assert!(matches!(res, Err(SyncError::Config(_))));
    }

    #[test]
    fn reads_google_target_and_credentials() {
        let get = |k: &str| match k {
            "GARMIN_SYNC_SPREADSHEET_ID" => Some("sheet-123".into()),
            "GARMIN_SYNC_ACCESS_TOKEN" => Some("tok".into()),
            "GARMIN_SYNC_METRICS_PATH" => Some("/tmp/garmin.prom".into()),
            "GARMIN_EXERCISES_CONCURRENCY" => Some("8".into()),
            _ => None,
        };
        let cfg = SyncConfig::from_env_with(get).expect("cfg");
        assert_eq!(
            cfg.target,
            PublishTarget::GoogleSheets {
                spreadsheet_id: "sheet-123".into(),
                sheet_name: "Exercises".into(),
            }
        );
        assert_eq!(
            cfg.access_token.as_ref().map(|t| t.expose_secret()),
            Some("tok")
        );
        assert_eq!(cfg.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(cfg.sheets_base_url, "https://sheets.googleapis.com");
        assert_eq!(cfg.metrics_path, Some(PathBuf::from("/tmp/garmin.prom")));
        assert_eq!(cfg.client.concurrency, 8);
    }

    #[test]
    fn dry_run_needs_no_spreadsheet() {
        let get = |k: &str| match k {
            "GARMIN_SYNC_DRY_RUN_PATH" => Some("out.json".into()),
            "GARMIN_SYNC_ACCESS_TOKEN" => Some("   ".into()),
            _ => None,
        };
        let cfg = SyncConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.target, PublishTarget::DryRun(PathBuf::from("out.json")));
        assert!(cfg.access_token.is_none());
    }

    #[test]
    fn client_config_errors_surface_as_config() {
        let get = |k: &str| match k {
            "GARMIN_SYNC_DRY_RUN_PATH" => Some("out.json".into()),
            "GARMIN_EXERCISES_TIMEOUT_SECS" => Some("soon".into()),
            _ => None,
        };
        assert!(matches!(
            SyncConfig::from_env_with(get),
            Err(SyncError::Config(_))
        ));
    }
}
