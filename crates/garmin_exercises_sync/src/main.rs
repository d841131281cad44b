use std::path::Path;

use anyhow::Context;
use garmin_exercises_client::http_client::ReqwestDocumentLoader;
use garmin_exercises_sync::config::{PublishTarget, SyncConfig};
use garmin_exercises_sync::google::GoogleSheetsPublisher;
use garmin_exercises_sync::publisher::{JsonFilePublisher, SheetPublisher};
use garmin_exercises_sync::run_sync;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

fn write_metrics(handle: &PrometheusHandle, path: &Path) {
    // written atomically so a textfile collector never reads half a file
    let tmp = path.with_extension("prom.tmp");
    let result = std::fs::write(&tmp, handle.render()).and_then(|_| std::fs::rename(&tmp, path));
    match result {
        Ok(()) => tracing::info!(path = %path.display(), "metrics written"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not write metrics"),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Log level from `GARMIN_EXERCISES_LOG_LEVEL`, falling back to `RUST_LOG`,
    // then `info`.
    let log_env = std::env::var("GARMIN_EXERCISES_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "garmin-exercises-sync: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let cfg = SyncConfig::from_env().context("loading configuration")?;
    let loader = ReqwestDocumentLoader::new(cfg.client.request_timeout)?;
    let publisher: Box<dyn SheetPublisher> = match &cfg.target {
        PublishTarget::DryRun(path) => Box::new(JsonFilePublisher::new(path)),
        PublishTarget::GoogleSheets { .. } => Box::new(GoogleSheetsPublisher::from_config(&cfg)?),
    };

    let outcome = run_sync(&loader, publisher.as_ref(), &cfg.client).await;
    if let Some(path) = &cfg.metrics_path {
        write_metrics(&handle, path);
    }
    match outcome {
        Ok(summary) => {
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "sync run failed");
            Err(e.into())
        }
    }
}
