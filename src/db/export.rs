// Export a dataset into the normalized tables.
//
// Each entity becomes a `space` row, a `question_answer` row and a `manager`
// row sharing its id, plus a `holds` link. Existing rows are cleared first
// and everything is inserted in one transaction.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::{info, warn};

use crate::tabular::{parse_id, Dataset, Schema};

/// Optional space columns copied when the dataset has them.
pub const OPTIONAL_COLUMNS: [&str; 7] = [
    "opening_date",
    "closing_date",
    "website",
    "country",
    "city",
    "latitude",
    "longitude",
];
pub const MANAGERS_COLUMN: &str = "managers";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    /// Rows whose identifier is empty or not a number.
    pub missing_ids: usize,
    /// Identifiers seen more than once; only the first row is exported.
    pub duplicate_ids: Vec<i64>,
}

/// Identifier checks run before any insert.
pub fn check_ids(dataset: &Dataset, schema: &Schema) -> (Vec<Option<i64>>, ExportSummary) {
    let id_col = dataset.column_index(&schema.id);
    let ids: Vec<Option<i64>> = (0..dataset.len())
        .map(|r| id_col.and_then(|c| dataset.get(r, c)).and_then(parse_id))
        .collect();

    let mut summary = ExportSummary {
        missing_ids: ids.iter().filter(|id| id.is_none()).count(),
        ..Default::default()
    };
    let mut seen = HashSet::new();
    for id in ids.iter().flatten() {
        if !seen.insert(*id) && !summary.duplicate_ids.contains(id) {
            summary.duplicate_ids.push(*id);
        }
    }
    (ids, summary)
}

/// Replace the contents of the normalized tables with `dataset`.
pub fn export_dataset(conn: &mut Connection, dataset: &Dataset, schema: &Schema) -> Result<ExportSummary> {
    let (ids, mut summary) = check_ids(dataset, schema);
    if summary.missing_ids > 0 {
        warn!(count = summary.missing_ids, column = %schema.id, "Rows without an identifier are not exported");
    }
    if !summary.duplicate_ids.is_empty() {
        warn!(ids = ?summary.duplicate_ids, "Duplicate identifiers, keeping the first row of each");
    }

    let cell = |row: usize, column: &str| -> Option<String> {
        dataset
            .column_index(column)
            .and_then(|c| dataset.get(row, c))
            .map(str::to_string)
    };

    let tx = conn.transaction().context("Failed to start export transaction")?;
    tx.execute_batch(
        "DELETE FROM holds; DELETE FROM manager; DELETE FROM question_answer; DELETE FROM space;",
    )
    .context("Failed to clear export tables")?;

    {
        let mut space = tx.prepare(
            "INSERT INTO space (id, name, history, activities, presentation, opening_date,
                                closing_date, website, country, city, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        let mut qa = tx.prepare(
            "INSERT INTO question_answer (id, question1, answer1, question2, answer2)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut manager = tx.prepare(
            "INSERT INTO manager (id, managers, question_answer_id) VALUES (?1, ?2, ?1)",
        )?;
        let mut holds = tx.prepare("INSERT INTO holds (space_id, manager_id) VALUES (?1, ?1)")?;

        let mut exported = HashSet::new();
        for (row, id) in ids.iter().enumerate() {
            let Some(id) = *id else { continue };
            if !exported.insert(id) {
                continue;
            }
            let optional: Vec<Option<String>> = OPTIONAL_COLUMNS.iter().map(|c| cell(row, c)).collect();
            space
                .execute(params![
                    id,
                    cell(row, &schema.name),
                    cell(row, &schema.history),
                    cell(row, &schema.activities),
                    cell(row, &schema.presentation),
                    optional[0],
                    optional[1],
                    optional[2],
                    optional[3],
                    optional[4],
                    optional[5],
                    optional[6],
                ])
                .with_context(|| format!("Failed to insert space {id}"))?;
            qa.execute(params![
                id,
                cell(row, &schema.question1),
                cell(row, &schema.answer1),
                cell(row, &schema.question2),
                cell(row, &schema.answer2),
            ])?;
            manager.execute(params![id, cell(row, MANAGERS_COLUMN)])?;
            holds.execute(params![id])?;
        }
        summary.exported = exported.len();
    }

    tx.commit().context("Failed to commit export")?;
    info!(exported = summary.exported, "Exported dataset to SQLite");
    Ok(summary)
}
