// Tabular data: the in-memory dataset, its file formats, and the entity view.
//
// Every spreadsheet the pipeline touches is read into a `Dataset`, a plain
// grid of nullable strings with named columns. `Schema` says which of those
// columns carry entity meaning, so headers can differ between surveys.

pub mod io;
pub mod markdown;
pub mod merge;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Closed set of spreadsheet formats, resolved once from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Xlsx,
    /// Legacy Excel. Readable only.
    Xls,
    Csv,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx") => Ok(FileFormat::Xlsx),
            Some("xls") => Ok(FileFormat::Xls),
            Some("csv") => Ok(FileFormat::Csv),
            _ => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// The format used when writing something derived from a file of this format.
    pub fn writable(self) -> Self {
        match self {
            FileFormat::Xls => FileFormat::Xlsx,
            other => other,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Xlsx => "xlsx",
            FileFormat::Xls => "xls",
            FileFormat::Csv => "csv",
        }
    }
}

/// Build `<dir>/<stem>.<ext>` in the writable counterpart of `format`.
pub fn output_path(dir: &Path, stem: &str, format: FileFormat) -> PathBuf {
    dir.join(format!("{stem}.{}", format.writable().extension()))
}

/// A rectangular table. `None` is an absent cell, `Some("")` an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of a column, or `MissingColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Index of a column, appending it (all cells `None`) if it doesn't exist.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<String>) {
        let width = self.columns.len();
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() < width {
                r.resize(width, None);
            }
            r[col] = value;
        }
    }

    /// Append a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Typed entity views over every row.
    pub fn entities<'a>(&'a self, schema: &'a Schema) -> impl Iterator<Item = Entity<'a>> + 'a {
        (0..self.rows.len()).map(move |row| Entity {
            dataset: self,
            schema,
            row,
        })
    }
}

/// Which columns carry entity semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub presentation: String,
    pub history: String,
    pub activities: String,
    pub question1: String,
    pub answer1: String,
    pub question2: String,
    pub answer2: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            id: "id".into(),
            name: "name".into(),
            presentation: "presentation".into(),
            history: "history".into(),
            activities: "activities".into(),
            question1: "question1".into(),
            answer1: "answer1".into(),
            question2: "question2".into(),
            answer2: "answer2".into(),
        }
    }
}

impl Schema {
    /// The four columns the merger writes, in pair order.
    pub fn qa_columns(&self) -> [&str; 4] {
        [&self.question1, &self.answer1, &self.question2, &self.answer2]
    }

    /// The free-text columns whose concatenation is an entity's combined text.
    pub fn text_columns(&self) -> [&str; 5] {
        [
            &self.presentation,
            &self.history,
            &self.activities,
            &self.answer1,
            &self.answer2,
        ]
    }
}

/// Read-only view of one dataset row through the schema.
#[derive(Clone, Copy)]
pub struct Entity<'a> {
    dataset: &'a Dataset,
    schema: &'a Schema,
    row: usize,
}

impl<'a> Entity<'a> {
    pub fn row(&self) -> usize {
        self.row
    }

    fn field(&self, column: &str) -> Option<&'a str> {
        self.dataset
            .column_index(column)
            .and_then(|col| self.dataset.get(self.row, col))
    }

    pub fn id(&self) -> Option<i64> {
        self.field(&self.schema.id).and_then(parse_id)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.field(&self.schema.name)
    }

    pub fn presentation(&self) -> Option<&'a str> {
        self.field(&self.schema.presentation)
    }

    pub fn history(&self) -> Option<&'a str> {
        self.field(&self.schema.history)
    }

    pub fn activities(&self) -> Option<&'a str> {
        self.field(&self.schema.activities)
    }

    /// The (question, answer) pairs present on this row.
    pub fn pairs(&self) -> Vec<(Option<&'a str>, Option<&'a str>)> {
        let pair1 = (self.field(&self.schema.question1), self.field(&self.schema.answer1));
        let pair2 = (self.field(&self.schema.question2), self.field(&self.schema.answer2));
        [pair1, pair2]
            .into_iter()
            .filter(|(q, a)| q.is_some() || a.is_some())
            .collect()
    }

    /// Presentation, history, activities and both answers joined by one space.
    /// Missing fields count as empty strings.
    pub fn combined_text(&self) -> String {
        join_fields(self.schema.text_columns().iter().map(|c| self.field(c)))
    }
}

/// Join fields with a single space, treating `None` as "".
pub fn join_fields<'a>(fields: impl Iterator<Item = Option<&'a str>>) -> String {
    fields
        .map(|f| f.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an identifier cell. Spreadsheets often store integers as "12.0".
pub fn parse_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
