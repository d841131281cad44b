//! Static mapping of workout types to the documents that describe them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::SourceFormat;
use crate::model::ExerciseIdentifier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkoutType {
    Strength,
    Cardio,
    #[serde(rename = "HIIT")]
    Hiit,
    Yoga,
    Pilates,
    Mobility,
    Run,
    Bike,
    Custom,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 9] = [
        WorkoutType::Strength,
        WorkoutType::Cardio,
        WorkoutType::Hiit,
        WorkoutType::Yoga,
        WorkoutType::Pilates,
        WorkoutType::Mobility,
        WorkoutType::Run,
        WorkoutType::Bike,
        WorkoutType::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WorkoutType::Strength => "Strength",
            WorkoutType::Cardio => "Cardio",
            WorkoutType::Hiit => "HIIT",
            WorkoutType::Yoga => "Yoga",
            WorkoutType::Pilates => "Pilates",
            WorkoutType::Mobility => "Mobility",
            WorkoutType::Run => "Run",
            WorkoutType::Bike => "Bike",
            WorkoutType::Custom => "Custom",
        }
    }

    /// File name of the exercise list backing this workout type, if any.
    fn list_file(self) -> Option<&'static str> {
        match self {
            WorkoutType::Strength | WorkoutType::Cardio | WorkoutType::Hiit => {
                Some("Exercises.json")
            }
            WorkoutType::Yoga => Some("Yoga.json"),
            WorkoutType::Pilates => Some("Pilates.json"),
            WorkoutType::Mobility => Some("Mobility.json"),
            WorkoutType::Run | WorkoutType::Bike | WorkoutType::Custom => None,
        }
    }
}

impl std::fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    ExerciseList,
    Equipment,
    Translations,
    Detail,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::ExerciseList => "exercise_list",
            SourceKind::Equipment => "equipment",
            SourceKind::Translations => "translations",
            SourceKind::Detail => "detail",
        }
    }
}

/// One remote document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
    pub format: SourceFormat,
    pub kind: SourceKind,
}

/// An exercise list together with every workout type that draws on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListSource {
    pub source: SourceRef,
    pub workout_types: BTreeSet<WorkoutType>,
}

#[derive(Clone, Debug)]
pub struct SourceCatalog {
    base_url: String,
    video_base_url: String,
    locale: String,
}

impl SourceCatalog {
    pub fn new(base_url: &str, video_base_url: &str, locale: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            video_base_url: video_base_url.trim_end_matches('/').to_string(),
            locale: locale.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn video_base_url(&self) -> &str {
        &self.video_base_url
    }

    fn list_ref(&self, file: &str) -> SourceRef {
        SourceRef {
            name: file.to_string(),
            url: format!("{}/web-data/exercises/{}", self.base_url, file),
            format: SourceFormat::Json,
            kind: SourceKind::ExerciseList,
        }
    }

    pub fn sources_for_workout_type(&self, workout: WorkoutType) -> Vec<SourceRef> {
        workout
            .list_file()
            .map(|file| vec![self.list_ref(file)])
            .unwrap_or_default()
    }

    /// Every distinct exercise list, each fetched once, tagged with the
    /// workout types that share it. Ordered by first appearance in
    /// [`WorkoutType::ALL`].
    pub fn list_sources(&self) -> Vec<ListSource> {
        let mut out: Vec<ListSource> = Vec::new();
        for workout in WorkoutType::ALL {
            for source in self.sources_for_workout_type(workout) {
                match out.iter_mut().find(|l| l.source.url == source.url) {
                    Some(existing) => {
                        existing.workout_types.insert(workout);
                    }
                    None => out.push(ListSource {
                        source,
                        workout_types: BTreeSet::from([workout]),
                    }),
                }
            }
        }
        out
    }

    pub fn equipment_source(&self) -> SourceRef {
        SourceRef {
            name: "exerciseToEquipments.json".to_string(),
            url: format!("{}/web-data/exercises/exerciseToEquipments.json", self.base_url),
            format: SourceFormat::Json,
            kind: SourceKind::Equipment,
        }
    }

    pub fn translation_source(&self) -> SourceRef {
        SourceRef {
            name: "exercise_types.properties".to_string(),
            url: format!(
                "{}/web-translations/exercise_types/exercise_types.properties",
                self.base_url
            ),
            format: SourceFormat::Properties,
            kind: SourceKind::Translations,
        }
    }

    pub fn detail_url(&self, id: &ExerciseIdentifier) -> String {
        format!(
            "{}/web-data/exercises/{}/{}/{}.json",
            self.base_url, self.locale, id.category, id.name
        )
    }

    pub fn page_url(&self, id: &ExerciseIdentifier) -> String {
        format!(
            "{}/modern/exercises/{}/{}",
            self.base_url, id.category, id.name
        )
    }

    /// Resolve a media path from a detail document against `host`.
    pub fn media_url(host: &str, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{host}{path}")
        } else {
            format!("{host}/{path}")
        }
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::new(
            "https://connect.garmin.com",
            "https://connectvideo.garmin.com",
            "en-US",
        )
    }
}
