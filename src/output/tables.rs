// Tabular views of a topic fit, built as Datasets so they can be written in
// the same format as the input spreadsheet.

use crate::normalize::Document;
use crate::tabular::Dataset;
use crate::topics::TopicFit;

/// Column names for a segment's topic id and probability.
pub fn topic_columns(segment: &str) -> (String, String) {
    (
        format!("{segment}_topic"),
        format!("{segment}_topic_probability"),
    )
}

fn format_weight(w: f64) -> String {
    format!("{w:.4}")
}

/// Copy of `dataset` with the fit's topic and probability per row.
///
/// `documents` maps each fitted document back to its row; rows without a
/// document keep empty cells.
pub fn annotate_dataset(
    dataset: &Dataset,
    documents: &[Document],
    segment: &str,
    fit: &TopicFit,
) -> Dataset {
    let mut out = dataset.clone();
    let (topic_col, prob_col) = topic_columns(segment);
    let t = out.ensure_column(&topic_col);
    let p = out.ensure_column(&prob_col);
    for (doc, (topic, prob)) in documents
        .iter()
        .zip(fit.assignments.iter().zip(&fit.probabilities))
    {
        if doc.entity < out.len() {
            out.set(doc.entity, t, Some(topic.to_string()));
            out.set(doc.entity, p, Some(format_weight(*prob)));
        }
    }
    out
}

/// One row per document, for the long shape.
pub fn document_table(documents: &[Document], fit: &TopicFit) -> Dataset {
    let mut out = Dataset::new(
        ["entity", "name", "field_type", "text", "topic", "topic_probability"]
            .map(String::from)
            .to_vec(),
    );
    for (doc, (topic, prob)) in documents
        .iter()
        .zip(fit.assignments.iter().zip(&fit.probabilities))
    {
        out.push_row(vec![
            Some(doc.entity.to_string()),
            doc.name.clone(),
            doc.field_type.clone(),
            Some(doc.text.clone()),
            Some(topic.to_string()),
            Some(format_weight(*prob)),
        ]);
    }
    out
}

/// Ranked keywords: `topic, rank, keyword, weight`.
pub fn keyword_table(fit: &TopicFit) -> Dataset {
    let mut out = Dataset::new(["topic", "rank", "keyword", "weight"].map(String::from).to_vec());
    for topic in &fit.topics {
        for (rank, (word, weight)) in topic.keywords.iter().enumerate() {
            out.push_row(vec![
                Some(topic.id.to_string()),
                Some((rank + 1).to_string()),
                Some(word.clone()),
                Some(format_weight(*weight)),
            ]);
        }
    }
    out
}

/// Document × topic weights, or `None` when the model has no weight matrix.
pub fn distribution_table(documents: &[Document], fit: &TopicFit) -> Option<Dataset> {
    let distributions = fit.distributions.as_ref()?;
    let width = distributions.first().map(Vec::len).unwrap_or(0);
    let mut columns = vec!["entity".to_string(), "name".to_string()];
    columns.extend((0..width).map(|k| format!("topic_{k}")));
    let mut out = Dataset::new(columns);
    for (doc, row) in documents.iter().zip(distributions) {
        let mut cells = vec![Some(doc.entity.to_string()), doc.name.clone()];
        cells.extend(row.iter().map(|w| Some(format_weight(*w))));
        out.push_row(cells);
    }
    Some(out)
}
