//! Conversion of raw source documents into canonical deltas.
//!
//! Unknown fields are ignored. Entries without a usable identifier (or with a
//! body of the wrong type) are dropped and counted in [`Normalized::skipped`];
//! only a document whose overall shape is wrong is an error.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::ParsedDocument;
use crate::catalog::SourceKind;
use crate::model::ExerciseIdentifier;

/// One exercise-list entry, before equipment, translation and workout type
/// membership are known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialExercise {
    pub id: ExerciseIdentifier,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquipmentDelta {
    pub id: ExerciseIdentifier,
    pub equipment: Vec<String>,
}

/// Translation keyed by the joined `CATEGORY_NAME` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationDelta {
    pub key: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceDeltas {
    Exercises(Vec<PartialExercise>),
    Equipment(Vec<EquipmentDelta>),
    Translations(Vec<TranslationDelta>),
}

impl SourceDeltas {
    pub fn len(&self) -> usize {
        match self {
            SourceDeltas::Exercises(v) => v.len(),
            SourceDeltas::Equipment(v) => v.len(),
            SourceDeltas::Translations(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
    pub deltas: SourceDeltas,
    pub skipped: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unexpected {kind} document shape: {reason}")]
    Shape { kind: &'static str, reason: String },
}

fn shape(kind: SourceKind, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::Shape {
        kind: kind.label(),
        reason: reason.into(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExercise {
    #[serde(default)]
    primary_muscles: Vec<String>,
    #[serde(default)]
    secondary_muscles: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEquipmentCategory {
    exercise_category_key: Option<String>,
    #[serde(default)]
    exercises_in_category: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEquipmentExercise {
    exercise_key: Option<String>,
    #[serde(default)]
    equipment_keys: Vec<String>,
}

pub fn normalize(doc: &ParsedDocument, kind: SourceKind) -> Result<Normalized, NormalizeError> {
    match (kind, doc) {
        (SourceKind::ExerciseList, ParsedDocument::Json(value)) => normalize_exercise_list(value),
        (SourceKind::Equipment, ParsedDocument::Json(value)) => normalize_equipment(value),
        (SourceKind::Translations, ParsedDocument::Properties(map)) => {
            let mut skipped = 0;
            let deltas = map
                .iter()
                .filter_map(|(key, name)| {
                    if name.is_empty() {
                        skipped += 1;
                        return None;
                    }
                    Some(TranslationDelta {
                        key: crate::model::normalize_key(key),
                        name: name.clone(),
                    })
                })
                .collect();
            Ok(Normalized {
                deltas: SourceDeltas::Translations(deltas),
                skipped,
            })
        }
        (SourceKind::Detail, _) => Err(shape(kind, "detail documents are not list sources")),
        (_, _) => Err(shape(kind, "wrong payload format")),
    }
}

fn normalize_exercise_list(value: &Value) -> Result<Normalized, NormalizeError> {
    let kind = SourceKind::ExerciseList;
    let categories = value
        .get("categories")
        .and_then(Value::as_object)
        .ok_or_else(|| shape(kind, "missing `categories` object"))?;

    let mut out = Vec::new();
    let mut skipped = 0;
    for (category, cat_data) in categories {
        let Some(exercises) = cat_data.get("exercises").and_then(Value::as_object) else {
            warn!(%category, "category without `exercises` object; skipping");
            skipped += 1;
            continue;
        };
        for (name, entry) in exercises {
            let Some(id) = ExerciseIdentifier::parse(category, name) else {
                warn!(%category, %name, "exercise without identifier; skipping");
                skipped += 1;
                continue;
            };
            let raw = match entry {
                Value::Null => RawExercise {
                    primary_muscles: Vec::new(),
                    secondary_muscles: Vec::new(),
                },
                other => match RawExercise::deserialize(other) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(%id, error = %e, "malformed exercise entry; skipping");
                        skipped += 1;
                        continue;
                    }
                },
            };
            out.push(PartialExercise {
                id,
                primary_muscles: raw.primary_muscles,
                secondary_muscles: raw.secondary_muscles,
            });
        }
    }
    Ok(Normalized {
        deltas: SourceDeltas::Exercises(out),
        skipped,
    })
}

fn normalize_equipment(value: &Value) -> Result<Normalized, NormalizeError> {
    let kind = SourceKind::Equipment;
    let categories = value
        .as_array()
        .ok_or_else(|| shape(kind, "expected a top-level array"))?;

    let mut out = Vec::new();
    let mut skipped = 0;
    for entry in categories {
        let category = match RawEquipmentCategory::deserialize(entry) {
            Ok(RawEquipmentCategory {
                exercise_category_key: Some(key),
                exercises_in_category,
            }) => (key, exercises_in_category),
            Ok(RawEquipmentCategory {
                exercise_category_key: None,
                exercises_in_category,
            }) => {
                warn!("equipment category without key; skipping");
                skipped += exercises_in_category.len().max(1);
                continue;
            }
            Err(e) => {
                warn!(error = %e, "malformed equipment category; skipping");
                skipped += 1;
                continue;
            }
        };
        let (category_key, exercises) = category;
        for exercise in &exercises {
            let parsed = match RawEquipmentExercise::deserialize(exercise) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(
                        category = %category_key,
                        error = %e,
                        "malformed equipment entry; skipping"
                    );
                    skipped += 1;
                    continue;
                }
            };
            let Some(id) = parsed
                .exercise_key
                .as_deref()
                .and_then(|name| ExerciseIdentifier::parse(&category_key, name))
            else {
                warn!(category = %category_key, "equipment entry without identifier; skipping");
                skipped += 1;
                continue;
            };
            out.push(EquipmentDelta {
                id,
                equipment: parsed.equipment_keys,
            });
        }
    }
    Ok(Normalized {
        deltas: SourceDeltas::Equipment(out),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn exercise_list_entries_become_partials() {
        let doc = ParsedDocument::Json(json!({
            "categories": {
                "PUSH_UP": {
                    "exercises": {
                        "PUSH_UP": {
                            "primaryMuscles": ["CHEST"],
                            "secondaryMuscles": ["TRICEPS"],
                            "somethingNew": 42
                        },
                        "WIDE_HAND_PUSH_UP": null
                    }
                }
            },
            "version": 3
        }));
        let out = normalize(&doc, SourceKind::ExerciseList).expect("normalize");
        assert_eq!(out.skipped, 0);
        let SourceDeltas::Exercises(items) = out.deltas else {
            panic!("expected exercises");
        };
        assert_eq!(items.len(), 2);
        let push_up = items.iter().find(|p| p.id.name == "PUSH_UP").expect("push up");
        assert_eq!(push_up.primary_muscles, ["CHEST"]);
        assert_eq!(push_up.secondary_muscles, ["TRICEPS"]);
        let wide = items.iter().find(|p| p.id.name == "WIDE_HAND_PUSH_UP").expect("wide");
        assert!(wide.primary_muscles.is_empty());
    }

    #[test]
    fn entries_without_identifier_or_with_bad_body_are_counted() {
        let doc = ParsedDocument::Json(json!({
            "categories": {
                "PLANK": {
                    "exercises": {
                        "": {"primaryMuscles": ["CORE"]},
                        "PLANK": {"primaryMuscles": "CORE"},
                        "SIDE_PLANK": {"primaryMuscles": ["OBLIQUES"]}
                    }
                },
                "BROKEN": {"notExercises": {}}
            }
        }));
        let out = normalize(&doc, SourceKind::ExerciseList).expect("normalize");
        assert_eq!(out.skipped, 3);
        assert_eq!(out.deltas.len(), 1);
    }

    #[test]
    fn exercise_list_without_categories_is_a_shape_error() {
        let doc = ParsedDocument::Json(json!([1, 2, 3]));
        assert!(normalize(&doc, SourceKind::ExerciseList).is_err());
    }

    #[test]
    fn equipment_document_maps_identifiers() {
        let doc = ParsedDocument::Json(json!([
            {
                "exerciseCategoryKey": "PUSH_UP",
                "exercisesInCategory": [
                    {"exerciseKey": "PUSH_UP", "equipmentKeys": ["NONE"]},
                    {"equipmentKeys": ["BENCH"]}
                ]
            },
            {"exercisesInCategory": [{"exerciseKey": "X"}, {"exerciseKey": "Y"}]}
        ]));
        let out = normalize(&doc, SourceKind::Equipment).expect("normalize");
        assert_eq!(out.skipped, 3);
        let SourceDeltas::Equipment(items) = out.deltas else {
            panic!("expected equipment");
        };
        assert_eq!(
            items,
            [EquipmentDelta {
                id: ExerciseIdentifier::new("PUSH_UP", "PUSH_UP"),
                equipment: vec!["NONE".to_string()],
            }]
        );
    }

    #[test]
    fn translations_skip_empty_values() {
        let mut map = BTreeMap::new();
        map.insert("PUSH_UP_PUSH_UP".to_string(), "Push-Up".to_string());
        map.insert("PLANK_PLANK".to_string(), String::new());
        let out = normalize(&ParsedDocument::Properties(map), SourceKind::Translations)
            .expect("normalize");
        assert_eq!(out.skipped, 1);
        assert_eq!(
            out.deltas,
            SourceDeltas::Translations(vec![TranslationDelta {
                key: "PUSH_UP_PUSH_UP".into(),
                name: "Push-Up".into(),
            }])
        );
    }

    #[test]
    fn wrong_format_is_rejected() {
        let doc = ParsedDocument::Properties(BTreeMap::new());
        assert!(normalize(&doc, SourceKind::Equipment).is_err());
    }
}
