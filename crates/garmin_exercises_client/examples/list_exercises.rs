use garmin_exercises_client::config::Config;
use garmin_exercises_client::http_client::ReqwestDocumentLoader;
use garmin_exercises_client::pipeline::merge_sources;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_env()?;
    let loader = ReqwestDocumentLoader::new(cfg.request_timeout)?;
    let merged = merge_sources(&loader, &cfg.catalog(), &cfg.retry_policy()).await?;
    for record in merged.table.into_records() {
        let workouts: Vec<&str> = record.workout_types.iter().map(|w| w.label()).collect();
        println!("{}\t{}\t{}", record.id, record.display_name(), workouts.join(", "));
    }
    Ok(())
}
