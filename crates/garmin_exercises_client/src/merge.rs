//! Merge of per-source deltas into one record per identifier.
//!
//! Every field is combined with set union (or "fill if absent" for the
//! display name, where each key has a single translation), so the final table
//! does not depend on the order in which sources are merged.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::WorkoutType;
use crate::model::{ExerciseIdentifier, ExerciseRecord};
use crate::normalize::{EquipmentDelta, PartialExercise, SourceDeltas, TranslationDelta};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExerciseTable {
    records: BTreeMap<ExerciseIdentifier, ExerciseRecord>,
    translations: BTreeMap<String, String>,
}

impl ExerciseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &ExerciseIdentifier) -> Option<&ExerciseRecord> {
        self.records.get(id)
    }

    /// Apply one normalized source. `workout_types` tags exercise-list
    /// entries and is ignored for auxiliary sources.
    pub fn merge(&mut self, deltas: SourceDeltas, workout_types: &BTreeSet<WorkoutType>) {
        match deltas {
            SourceDeltas::Exercises(items) => self.merge_exercises(items, workout_types),
            SourceDeltas::Equipment(items) => self.merge_equipment(items),
            SourceDeltas::Translations(items) => self.merge_translations(items),
        }
    }

    pub fn merge_exercises(
        &mut self,
        items: Vec<PartialExercise>,
        workout_types: &BTreeSet<WorkoutType>,
    ) {
        for item in items {
            let record = self.entry(item.id);
            record.workout_types.extend(workout_types.iter().copied());
            record.union_muscles(&item.primary_muscles, &item.secondary_muscles);
        }
    }

    /// Equipment may name identifiers no list has produced; those become
    /// bare records.
    pub fn merge_equipment(&mut self, items: Vec<EquipmentDelta>) {
        for item in items {
            self.entry(item.id).union_equipment(&item.equipment);
        }
    }

    /// Translations never create records; they name existing ones now and
    /// records that appear later.
    pub fn merge_translations(&mut self, items: Vec<TranslationDelta>) {
        for item in items {
            if item.name.trim().is_empty() {
                continue;
            }
            self.translations.entry(item.key).or_insert(item.name);
        }
        // Keys are joined `CATEGORY_NAME` strings and cannot be split back
        // into an identifier, so match from the record side.
        for record in self.records.values_mut() {
            if record.display_name.is_some() {
                continue;
            }
            if let Some(name) = self.translations.get(&record.id.translation_key()) {
                record.display_name = Some(name.clone());
            }
        }
    }

    /// Number of translation keys that matched no record.
    pub fn unmatched_translations(&self) -> usize {
        let known: BTreeSet<String> = self
            .records
            .keys()
            .map(ExerciseIdentifier::translation_key)
            .collect();
        self.translations
            .keys()
            .filter(|key| !known.contains(*key))
            .count()
    }

    /// Records sorted by identifier.
    pub fn into_records(self) -> Vec<ExerciseRecord> {
        self.records.into_values().collect()
    }

    fn entry(&mut self, id: ExerciseIdentifier) -> &mut ExerciseRecord {
        let translation = self.translations.get(&id.translation_key()).cloned();
        let record = self
            .records
            .entry(id.clone())
            .or_insert_with(|| ExerciseRecord::new(id));
        if record.display_name.is_none() {
            record.display_name = translation;
        }
        record
    }
}
