use garmin_exercises_client::ExerciseIdentifier;
use garmin_exercises_client::config::Config;
use garmin_exercises_client::enrich::{DetailEnricher, DetailOutcome};
use garmin_exercises_client::http_client::ReqwestDocumentLoader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_env()?;

    let (Some(category), Some(name)) = (std::env::args().nth(1), std::env::args().nth(2)) else {
        eprintln!("usage: lookup_exercise <CATEGORY> <NAME>");
        return Ok(());
    };
    let Some(id) = ExerciseIdentifier::parse(&category, &name) else {
        eprintln!("category and name must not be empty");
        return Ok(());
    };

    let loader = ReqwestDocumentLoader::new(cfg.request_timeout)?;
    let catalog = cfg.catalog();
    let enricher = DetailEnricher::from_config(&loader, &catalog, &cfg);
    match enricher.lookup(&id).await {
        DetailOutcome::Found(found) => {
            let detail = &found.detail;
            println!("{id}: {}", detail.page_url);
            println!("  difficulty: {}", detail.difficulty.as_deref().unwrap_or("-"));
            println!("  image: {}", detail.image.as_deref().unwrap_or("-"));
            for (i, step) in detail.instructions.iter().enumerate() {
                println!("  {}. {step}", i + 1);
            }
        }
        DetailOutcome::NotFound => println!("{id}: no detail page"),
        DetailOutcome::Unreachable(e) | DetailOutcome::Malformed(e) => {
            return Err(format!("lookup failed: {e}").into());
        }
    }
    Ok(())
}
