use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::WorkoutType;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\p{N}]+").expect("valid separator regex"));

/// Uppercase, underscore-separated form used for every merge key.
pub fn normalize_key(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    SEPARATORS
        .replace_all(&upper, "_")
        .trim_matches('_')
        .to_string()
}

/// `(category, name)` pair naming one exercise across all sources.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExerciseIdentifier {
    pub category: String,
    pub name: String,
}

impl ExerciseIdentifier {
    pub fn new(category: &str, name: &str) -> Self {
        Self {
            category: normalize_key(category),
            name: normalize_key(name),
        }
    }

    /// Returns `None` when either part normalizes to nothing.
    pub fn parse(category: &str, name: &str) -> Option<Self> {
        let id = Self::new(category, name);
        (!id.category.is_empty() && !id.name.is_empty()).then_some(id)
    }

    /// Key used by the translation document (`CATEGORY_NAME`).
    pub fn translation_key(&self) -> String {
        format!("{}_{}", self.category, self.name)
    }
}

impl std::fmt::Display for ExerciseIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Fields that only exist when a detail document was retrieved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExerciseDetail {
    pub difficulty: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub instructions: Vec<String>,
    pub page_url: String,
}

/// Canonical exercise, accumulated across every source that mentions it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseRecord {
    pub id: ExerciseIdentifier,
    pub display_name: Option<String>,
    pub workout_types: BTreeSet<WorkoutType>,
    pub primary_muscles: BTreeSet<String>,
    pub secondary_muscles: BTreeSet<String>,
    pub equipment: BTreeSet<String>,
    detail: Option<ExerciseDetail>,
}

impl ExerciseRecord {
    pub fn new(id: ExerciseIdentifier) -> Self {
        Self {
            id,
            display_name: None,
            workout_types: BTreeSet::new(),
            primary_muscles: BTreeSet::new(),
            secondary_muscles: BTreeSet::new(),
            equipment: BTreeSet::new(),
            detail: None,
        }
    }

    /// Translated name, or `"{CATEGORY} {NAME}"` when no translation exists.
    pub fn display_name(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.id.category, self.id.name),
        }
    }

    pub fn is_found(&self) -> bool {
        self.detail.is_some()
    }

    pub fn detail(&self) -> Option<&ExerciseDetail> {
        self.detail.as_ref()
    }

    /// Secondary muscles that are not also primary.
    pub fn secondary_only(&self) -> impl Iterator<Item = &String> {
        self.secondary_muscles
            .iter()
            .filter(|m| !self.primary_muscles.contains(*m))
    }

    pub(crate) fn union_muscles<'a>(
        &mut self,
        primary: impl IntoIterator<Item = &'a String>,
        secondary: impl IntoIterator<Item = &'a String>,
    ) {
        union_into(&mut self.primary_muscles, primary);
        union_into(&mut self.secondary_muscles, secondary);
    }

    pub(crate) fn union_equipment<'a>(&mut self, equipment: impl IntoIterator<Item = &'a String>) {
        union_into(&mut self.equipment, equipment);
    }

    pub(crate) fn attach_detail(&mut self, detail: ExerciseDetail) {
        self.detail = Some(detail);
    }
}

fn union_into<'a>(set: &mut BTreeSet<String>, items: impl IntoIterator<Item = &'a String>) {
    for item in items {
        let key = normalize_key(item);
        if !key.is_empty() {
            set.insert(key);
        }
    }
}
