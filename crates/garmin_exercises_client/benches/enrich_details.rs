use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use garmin_exercises_client::enrich::DetailEnricher;
use garmin_exercises_client::http_client::ReqwestDocumentLoader;
use garmin_exercises_client::retry::RetryPolicy;
use garmin_exercises_client::{ExerciseIdentifier, ExerciseRecord, SourceCatalog};
use tokio::runtime::Builder;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bench_enrich_details(c: &mut Criterion) {
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/web-data/exercises/en-US/.+\.json$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "difficulty": "INTERMEDIATE",
                "description": "bench",
                "primaryMuscles": ["CHEST"],
                "steps": [{"description": "one"}, {"description": "two"}]
            })))
            .mount(&server)
            .await;
        server
    });

    let catalog = SourceCatalog::new(&server.uri(), &server.uri(), "en-US");
    let loader = ReqwestDocumentLoader::new(Duration::from_secs(5)).expect("loader");
    let records: Vec<ExerciseRecord> = (0..200)
        .map(|i| ExerciseRecord::new(ExerciseIdentifier::new("BENCH", &format!("EXERCISE_{i}"))))
        .collect();

    c.bench_function("enrich_200_details", |b| {
        b.to_async(&rt).iter(|| {
            let records = records.clone();
            let enricher = DetailEnricher::new(&loader, &catalog)
                .with_retry(RetryPolicy::none())
                .with_concurrency(8)
                .with_request_spacing(Duration::ZERO)
                .with_media_verification(false);
            async move {
                let report = enricher.enrich(records).await;
                assert_eq!(report.found, 200);
            }
        })
    });
}

criterion_group!(benches, bench_enrich_details);
criterion_main!(benches);
