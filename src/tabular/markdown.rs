// Markdown pipe tables: export a dataset and read one back for verification.

use anyhow::Result;

use super::Dataset;

/// Render the dataset as a Markdown pipe table: header, separator, rows.
///
/// Line breaks in cell text become spaces and `|` is escaped so the table
/// stays parseable. Columns are padded to a common width.
pub fn to_markdown(dataset: &Dataset) -> String {
    let header: Vec<String> = dataset.columns.iter().map(|c| escape_cell(c)).collect();
    let body: Vec<Vec<String>> = dataset
        .rows
        .iter()
        .map(|row| {
            (0..dataset.columns.len())
                .map(|i| escape_cell(row.get(i).and_then(|c| c.as_deref()).unwrap_or("")))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&render_row(&header, &widths));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&render_row(&separator, &widths));
    for row in &body {
        out.push_str(&render_row(row, &widths));
    }
    out
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| {
            let pad = w.saturating_sub(c.chars().count());
            format!("{c}{}", " ".repeat(pad))
        })
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

// Line breaks become single spaces; a row cannot span lines. Other
// whitespace is kept as is.
fn escape_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace('|', "\\|")
}

/// Parse a Markdown pipe table back into a dataset.
///
/// Lines that are not table rows are ignored, as is the separator row.
/// Empty cells come back as `None`.
pub fn parse_markdown(text: &str) -> Result<Dataset> {
    let mut rows = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('|'))
        .map(split_row)
        .filter(|cells| !is_separator(cells));

    let columns = rows
        .next()
        .ok_or_else(|| anyhow::anyhow!("No Markdown table found"))?;
    let mut dataset = Dataset::new(columns);
    for cells in rows {
        dataset.push_row(
            cells
                .into_iter()
                .map(|c| (!c.is_empty()).then_some(c))
                .collect(),
        );
    }
    Ok(dataset)
}

fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn is_separator(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|c| !c.is_empty() && c.chars().all(|ch| ch == '-' || ch == ':'))
}

/// Non-null cell count per column, used to check an export before trusting it.
pub fn column_profile(dataset: &Dataset) -> Vec<(String, usize)> {
    dataset
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let filled = dataset
                .rows
                .iter()
                .filter(|r| r.get(i).is_some_and(|c| c.is_some()))
                .count();
            (name.clone(), filled)
        })
        .collect()
}
