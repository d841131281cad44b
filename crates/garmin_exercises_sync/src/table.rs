//! Rendering of merged records into the two-header-row sheet layout.

use garmin_exercises_client::ExerciseRecord;
use serde::Serialize;

/// `(group, column)` for every published column, left to right.
pub const COLUMNS: [(&str, &str); 14] = [
    ("IDENTIFIER", "CATEGORY"),
    ("IDENTIFIER", "NAME_GARMIN"),
    ("NAME", "Name"),
    ("WORKOUT", "WORKOUT_TYPES"),
    ("MUSCLE_GROUPS", "PRIMARY_MUSCLES"),
    ("MUSCLE_GROUPS", "SECONDARY_MUSCLES"),
    ("EQUIPMENT", "EQUIPMENT"),
    ("DETAILED_INFO", "FOUND"),
    ("DETAILED_INFO", "DIFFICULTY"),
    ("DETAILED_INFO", "DESCRIPTION"),
    ("DETAILED_INFO", "INSTRUCTIONS"),
    ("DETAILED_INFO", "IMAGE"),
    ("DETAILED_INFO", "VIDEO"),
    ("DETAILED_INFO", "URL"),
];

/// Number of header rows above the data.
pub const HEADER_ROWS: usize = 2;

const LIST_SEPARATOR: &str = ", ";

/// Fully rendered sheet contents, ready to hand to a publisher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SheetTable {
    pub header_groups: Vec<String>,
    pub header_columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A run of adjacent columns sharing one group label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl SheetTable {
    /// Render `records` sorted by identifier, whatever order they arrive in.
    pub fn from_records(records: &[ExerciseRecord]) -> Self {
        let mut sorted: Vec<&ExerciseRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            header_groups: COLUMNS.iter().map(|(g, _)| g.to_string()).collect(),
            header_columns: COLUMNS.iter().map(|(_, c)| c.to_string()).collect(),
            rows: sorted.into_iter().map(render_row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.header_columns.len()
    }

    /// Both header rows followed by the data rows.
    pub fn values(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + HEADER_ROWS);
        out.push(self.header_groups.clone());
        out.push(self.header_columns.clone());
        out.extend(self.rows.iter().cloned());
        out
    }

    /// Adjacent runs of identical group labels, as half-open column ranges.
    pub fn group_spans(&self) -> Vec<GroupSpan> {
        let mut spans: Vec<GroupSpan> = Vec::new();
        for (i, label) in self.header_groups.iter().enumerate() {
            match spans.last_mut() {
                Some(last) if last.label == *label => last.end = i + 1,
                _ => spans.push(GroupSpan {
                    label: label.clone(),
                    start: i,
                    end: i + 1,
                }),
            }
        }
        spans
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items.into_iter().collect::<Vec<_>>().join(LIST_SEPARATOR)
}

/// Image URLs render as `IMAGE` formulas so the sheet shows a thumbnail.
fn image_cell(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        format!("=IMAGE(\"{}\", 1)", url.replace('"', "%22"))
    } else {
        url.to_string()
    }
}

fn render_row(record: &ExerciseRecord) -> Vec<String> {
    let detail = record.detail();
    vec![
        record.id.category.clone(),
        record.id.name.clone(),
        record.display_name(),
        join(record.workout_types.iter().map(|w| w.label())),
        join(record.primary_muscles.iter().map(String::as_str)),
        join(record.secondary_only().map(String::as_str)),
        join(record.equipment.iter().map(String::as_str)),
        if record.is_found() { "TRUE" } else { "FALSE" }.to_string(),
        detail.and_then(|d| d.difficulty.clone()).unwrap_or_default(),
        detail.and_then(|d| d.description.clone()).unwrap_or_default(),
        detail.map(|d| d.instructions.join("\n")).unwrap_or_default(),
        detail
            .and_then(|d| d.image.as_deref())
            .map(image_cell)
            .unwrap_or_default(),
        detail.and_then(|d| d.video.clone()).unwrap_or_default(),
        detail.map(|d| d.page_url.clone()).unwrap_or_default(),
    ]
}
