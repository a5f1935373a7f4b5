// Text normalization: turn dataset rows into analysis-ready documents.
//
// Two shapes are supported. Wide emits one document per entity by
// concatenating its text columns; long emits one document per non-empty
// (entity, column) so topics stay attributable to the field they came from.
// Translation and token cleaning are optional sub-stages in their own modules.

pub mod language;
pub mod tokens;
pub mod translate;

use serde::Serialize;
use tracing::warn;

use crate::tabular::{join_fields, Dataset, Schema};

pub use language::Language;

/// Document layout for topic modeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shape {
    Wide,
    Long,
}

/// One unit of text handed to a topic model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Row index of the entity in the source dataset.
    pub entity: usize,
    pub name: Option<String>,
    /// Source column, in the long shape.
    pub field_type: Option<String>,
    pub text: String,
}

/// Keep only the columns the dataset actually has, warning about the rest.
fn present_columns<'a>(dataset: &Dataset, columns: &'a [String]) -> Vec<(&'a str, usize)> {
    columns
        .iter()
        .filter_map(|c| match dataset.column_index(c) {
            Some(idx) => Some((c.as_str(), idx)),
            None => {
                warn!(column = %c, "Column not in dataset, skipping");
                None
            }
        })
        .collect()
}

/// One document per row: the given columns joined by a single space,
/// missing cells counted as empty strings.
pub fn wide_documents(dataset: &Dataset, columns: &[String], schema: &Schema) -> Vec<Document> {
    let cols = present_columns(dataset, columns);
    let name_col = dataset.column_index(&schema.name);
    (0..dataset.len())
        .map(|row| Document {
            entity: row,
            name: name_col.and_then(|c| dataset.get(row, c)).map(str::to_string),
            field_type: None,
            text: join_fields(cols.iter().map(|(_, idx)| dataset.get(row, *idx))),
        })
        .collect()
}

/// One document per non-empty cell of the given columns, tagged with its column.
pub fn long_documents(dataset: &Dataset, columns: &[String], schema: &Schema) -> Vec<Document> {
    let cols = present_columns(dataset, columns);
    let name_col = dataset.column_index(&schema.name);
    let mut docs = Vec::new();
    for row in 0..dataset.len() {
        for (column, idx) in &cols {
            let Some(text) = dataset.get(row, *idx) else { continue };
            if text.trim().is_empty() {
                continue;
            }
            docs.push(Document {
                entity: row,
                name: name_col.and_then(|c| dataset.get(row, c)).map(str::to_string),
                field_type: Some(column.to_string()),
                text: text.to_string(),
            });
        }
    }
    docs
}

/// Documents for a single column, one per row (empty cells kept as "").
pub fn column_documents(dataset: &Dataset, column: &str, schema: &Schema) -> Vec<Document> {
    wide_documents(dataset, &[column.to_string()], schema)
}

/// How dataset text becomes model input.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Text columns to analyse; defaults to the schema's text columns.
    pub columns: Vec<String>,
    pub shape: Shape,
    /// Run the token cleaner. Off leaves raw text for the model's own tokenizer.
    pub clean: bool,
    pub language: Language,
    pub custom_stop_words: Vec<String>,
    pub stem: bool,
    pub phrases: bool,
}

impl NormalizeOptions {
    pub fn for_schema(schema: &Schema) -> Self {
        Self {
            columns: schema.text_columns().iter().map(|c| c.to_string()).collect(),
            shape: Shape::Wide,
            clean: true,
            language: Language::English,
            custom_stop_words: tokens::DEFAULT_CUSTOM_STOP_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            stem: true,
            phrases: false,
        }
    }

    pub fn cleaner(&self) -> tokens::Cleaner {
        tokens::Cleaner::new(self.language, &self.custom_stop_words, self.stem, self.phrases)
    }
}

/// Clean every document's text in place. Blank documents stay blank.
pub fn clean_documents(
    documents: &mut [Document],
    cleaner: &tokens::Cleaner,
    filter: &mut dyn tokens::TokenFilter,
) {
    for doc in documents.iter_mut().filter(|d| !d.text.trim().is_empty()) {
        doc.text = cleaner.clean(&doc.text, filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new(vec!["name".into(), "history".into(), "answer1".into()]);
        ds.push_row(vec![Some("A".into()), Some("founded".into()), None]);
        ds.push_row(vec![Some("B".into()), Some("  ".into()), Some("yes".into())]);
        ds
    }

    #[test]
    fn test_wide_joins_with_single_space() {
        let cols = vec!["history".into(), "answer1".into(), "ghost".into()];
        let docs = wide_documents(&dataset(), &cols, &Schema::default());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "founded ");
        assert_eq!(docs[1].text, "   yes");
        assert_eq!(docs[1].name.as_deref(), Some("B"));
    }

    #[test]
    fn test_long_skips_empty_cells() {
        let cols = vec!["history".into(), "answer1".into()];
        let docs = long_documents(&dataset(), &cols, &Schema::default());
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].field_type.as_deref(), Some("history"));
        assert_eq!(docs[1].field_type.as_deref(), Some("answer1"));
        assert_eq!(docs[1].entity, 1);
    }
}
