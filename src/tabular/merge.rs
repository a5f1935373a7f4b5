// Merge extracted Q/A records into a dataset, keyed by entity name.

use tracing::{info, warn};

use super::{parse_id, Dataset, Schema};
use crate::error::PipelineError;
use crate::extract::ExtractedRecord;

/// Number of Q/A pairs the dataset schema can hold per entity.
pub const MAX_PAIRS: usize = 2;

/// What a merge did to the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Records whose name matched at least one existing row.
    pub updated: usize,
    /// Records appended as new entities.
    pub appended: usize,
    /// Q/A pairs dropped because a record had more than `MAX_PAIRS`.
    pub discarded_pairs: usize,
}

/// Merge records into `dataset`.
///
/// A record whose name equals a row's name (exactly) overwrites that row's
/// four Q/A columns, on every matching row. A record with no match becomes a
/// new row with the next identifier and only the Q/A columns filled. The Q/A
/// columns are created if the dataset doesn't have them yet.
pub fn merge_records(
    dataset: &mut Dataset,
    records: &[ExtractedRecord],
    schema: &Schema,
) -> Result<MergeSummary, PipelineError> {
    let mut summary = MergeSummary::default();
    if records.is_empty() {
        return Ok(summary);
    }

    let name_col = dataset.require_column(&schema.name)?;
    let id_col = dataset.ensure_column(&schema.id);
    let qa_cols: Vec<usize> = schema
        .qa_columns()
        .iter()
        .map(|c| dataset.ensure_column(c))
        .collect();

    let mut next_id = dataset
        .rows
        .iter()
        .filter_map(|row| row.get(id_col).and_then(|c| c.as_deref()).and_then(parse_id))
        .max()
        .map(|max| max + 1)
        .unwrap_or(1);

    for record in records {
        if record.pairs.len() > MAX_PAIRS {
            let dropped = record.pairs.len() - MAX_PAIRS;
            warn!(
                name = %record.name,
                dropped,
                "Record has more Q/A pairs than the schema holds; extra pairs discarded"
            );
            summary.discarded_pairs += dropped;
        }
        let values = qa_values(record);

        let matches: Vec<usize> = (0..dataset.len())
            .filter(|&r| dataset.get(r, name_col) == Some(record.name.as_str()))
            .collect();

        if matches.is_empty() {
            let mut row = vec![None; dataset.columns.len()];
            row[id_col] = Some(next_id.to_string());
            row[name_col] = Some(record.name.clone());
            for (col, value) in qa_cols.iter().zip(&values) {
                row[*col] = Some(value.clone());
            }
            dataset.push_row(row);
            next_id += 1;
            summary.appended += 1;
        } else {
            for r in matches {
                for (col, value) in qa_cols.iter().zip(&values) {
                    dataset.set(r, *col, Some(value.clone()));
                }
            }
            summary.updated += 1;
        }
    }

    info!(
        updated = summary.updated,
        appended = summary.appended,
        "Merged extracted records"
    );
    Ok(summary)
}

/// question1, answer1, question2, answer2. Missing pairs become "".
fn qa_values(record: &ExtractedRecord) -> [String; 4] {
    let pair = |i: usize| {
        record
            .pairs
            .get(i)
            .map(|p| (p.question.clone(), p.answer.clone()))
            .unwrap_or_default()
    };
    let (q1, a1) = pair(0);
    let (q2, a2) = pair(1);
    [q1, a1, q2, a2]
}
