// Document sets the topic models run over.
//
// Wide shape: one segment per configured column that exists in the dataset,
// plus a `combined` segment joining them all. Long shape: a single segment of
// per-field documents.

use crate::normalize::{column_documents, long_documents, wide_documents, Document, NormalizeOptions, Shape};
use crate::tabular::{Dataset, Schema};

pub const COMBINED: &str = "combined";
pub const LONG: &str = "fields";

/// A named set of documents.
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub documents: Vec<Document>,
}

impl Segment {
    pub fn usable(&self) -> usize {
        self.documents.iter().filter(|d| !d.text.trim().is_empty()).count()
    }
}

/// Build the segments, plus `(name, reason)` for configured columns the
/// dataset doesn't have.
pub fn build_segments(
    dataset: &Dataset,
    schema: &Schema,
    options: &NormalizeOptions,
) -> (Vec<Segment>, Vec<(String, String)>) {
    let mut skipped = Vec::new();
    let present: Vec<String> = options
        .columns
        .iter()
        .filter(|c| {
            let exists = dataset.column_index(c).is_some();
            if !exists {
                skipped.push((c.to_string(), "column not in dataset".to_string()));
            }
            exists
        })
        .cloned()
        .collect();

    let segments = match options.shape {
        Shape::Long => vec![Segment {
            name: LONG.to_string(),
            documents: long_documents(dataset, &present, schema),
        }],
        Shape::Wide => {
            let mut segments: Vec<Segment> = present
                .iter()
                .map(|c| Segment {
                    name: c.clone(),
                    documents: column_documents(dataset, c, schema),
                })
                .collect();
            if present.len() > 1 {
                segments.push(Segment {
                    name: COMBINED.to_string(),
                    documents: wide_documents(dataset, &present, schema),
                });
            }
            segments
        }
    };
    (segments, skipped)
}
