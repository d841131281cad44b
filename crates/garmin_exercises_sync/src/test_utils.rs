//! In-memory loader and publisher used by the unit tests.
#![cfg(test)]

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use garmin_exercises_client::{
    DocumentLoader, LoadError, ParsedDocument, SourceCatalog, SourceFormat,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::publisher::SheetPublisher;
use crate::table::SheetTable;

/// Serves canned documents by URL. Anything unknown is `NotFound`.
#[derive(Default)]
pub struct StaticLoader {
    documents: HashMap<String, Result<ParsedDocument, LoadError>>,
    live_media: HashSet<String>,
}

impl StaticLoader {
    pub fn with_json(mut self, url: &str, value: Value) -> Self {
        self.documents
            .insert(url.to_string(), Ok(ParsedDocument::Json(value)));
        self
    }

    pub fn with_properties(mut self, url: &str, text: &str) -> Self {
        let map = garmin_exercises_client::properties::parse(text);
        self.documents
            .insert(url.to_string(), Ok(ParsedDocument::Properties(map)));
        self
    }

    pub fn with_error(mut self, url: &str, error: LoadError) -> Self {
        self.documents.insert(url.to_string(), Err(error));
        self
    }

    pub fn with_live_media(mut self, url: &str) -> Self {
        self.live_media.insert(url.to_string());
        self
    }
}

#[async_trait]
impl DocumentLoader for StaticLoader {
    async fn load(&self, url: &str, _format: SourceFormat) -> Result<ParsedDocument, LoadError> {
        self.documents
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(LoadError::NotFound(url.to_string())))
    }

    async fn probe(&self, url: &str) -> Result<bool, LoadError> {
        Ok(self.live_media.contains(url))
    }
}

pub fn push_up_detail() -> Value {
    json!({
        "difficulty": "BEGINNER",
        "description": "Classic bodyweight press.",
        "heroImage": "/images/push-up.jpg",
        "secondaryMuscles": ["TRICEPS"],
        "steps": [{"description": "Start in a plank."}, {"description": "Lower your chest."}]
    })
}

/// Every required source for a small catalogue: a push-up present in the
/// shared strength list with a detail page, a yoga plank without one, and
/// a curl only the equipment map knows about.
pub fn fixture_loader(catalog: &SourceCatalog) -> StaticLoader {
    let lists = catalog.list_sources();
    let mut loader = StaticLoader::default();
    for list in &lists {
        let body = match list.source.name.as_str() {
            "Exercises.json" => json!({"categories": {
                "PUSH_UP": {"exercises": {"PUSH_UP": {"primaryMuscles": ["CHEST"]}}}
            }}),
            "Yoga.json" => json!({"categories": {
                "PLANK": {"exercises": {"PLANK": {"primaryMuscles": ["CORE"]}, "": {}}}
            }}),
            _ => json!({"categories": {}}),
        };
        loader = loader.with_json(&list.source.url, body);
    }
    loader
        .with_json(
            &catalog.equipment_source().url,
            json!([
                {"exerciseCategoryKey": "PUSH_UP", "exercisesInCategory": [{"exerciseKey": "PUSH_UP", "equipmentKeys": ["NONE"]}]},
                {"exerciseCategoryKey": "CURL", "exercisesInCategory": [{"exerciseKey": "BARBELL_CURL", "equipmentKeys": ["BARBELL"]}]}
            ]),
        )
        .with_properties(
            &catalog.translation_source().url,
            "PUSH_UP_PUSH_UP=Push-Up\nPLANK_PLANK=Plank\nUNKNOWN_THING=Nobody\n",
        )
        .with_json(
            &catalog.detail_url(&garmin_exercises_client::ExerciseIdentifier::new(
                "PUSH_UP", "PUSH_UP",
            )),
            push_up_detail(),
        )
}

/// Keeps every table it is asked to publish; optionally fails instead.
#[derive(Default)]
pub struct RecordingPublisher {
    pub tables: Mutex<Vec<SheetTable>>,
    pub fail: bool,
}

#[async_trait]
impl SheetPublisher for RecordingPublisher {
    async fn publish(&self, table: &SheetTable) -> Result<usize, SyncError> {
        if self.fail {
            return Err(SyncError::Publish("sheet rejected the update".into()));
        }
        self.tables.lock().await.push(table.clone());
        Ok(table.len())
    }
}
