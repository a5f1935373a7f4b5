// Spreadsheet I/O: Excel via calamine (read) and rust_xlsxwriter (write), CSV via csv.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use rust_xlsxwriter::Workbook;
use tracing::{debug, warn};

use super::{Dataset, FileFormat};
use crate::error::PipelineError;

/// Load a dataset. The first row (or first worksheet row) is the header.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()).into());
    }
    let format = FileFormat::from_path(path)?;
    let dataset = match format {
        FileFormat::Xlsx | FileFormat::Xls => read_excel(path)?,
        FileFormat::Csv => read_csv(path)?,
    };
    debug!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns.len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Write a dataset in the format given by the path's extension.
/// Legacy `.xls` cannot be written.
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    match FileFormat::from_path(path)? {
        FileFormat::Xlsx => write_xlsx(dataset, path),
        FileFormat::Csv => write_csv(dataset, path),
        FileFormat::Xls => Err(PipelineError::UnsupportedFormat(path.to_path_buf()).into()),
    }
}

fn read_excel(path: &Path) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Workbook {} has no worksheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| anyhow::anyhow!("Worksheet '{sheet_name}' not found"))?
        .with_context(|| format!("Failed to read worksheet '{sheet_name}'"))?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok(Dataset::default());
    };

    let columns: Vec<String> = header_row
        .iter()
        .map(|c| cell_to_string(c).unwrap_or_default())
        .collect();
    let mut dataset = Dataset::new(columns);
    for row in rows_iter {
        let cells: Vec<Option<String>> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(Option::is_none) {
            continue;
        }
        dataset.push_row(cells);
    }
    Ok(dataset)
}

fn cell_to_string(cell: &DataType) -> Option<String> {
    match cell {
        DataType::Empty => None,
        DataType::String(s) if s.is_empty() => None,
        _ => Some(cell.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let width = columns.len();
    let mut dataset = Dataset::new(columns);
    for record in reader.records() {
        let record = record.context("Failed to read CSV record")?;
        let cells: Vec<Option<String>> = record
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect();
        let dropped = overflow_cells(&cells, width);
        if dropped > 0 {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            warn!(
                path = %path.display(),
                line,
                dropped,
                "Row is wider than the header, extra cells dropped"
            );
        }
        dataset.push_row(cells);
    }
    Ok(dataset)
}

/// Non-empty cells past the header width.
fn overflow_cells(cells: &[Option<String>], width: usize) -> usize {
    cells.iter().skip(width).filter(|c| c.is_some()).count()
}

fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in dataset.columns.iter().enumerate() {
        sheet.write_string(0, excel_column(col)?, excel_safe(name))?;
    }
    for (r, row) in dataset.rows.iter().enumerate() {
        let excel_row = u32::try_from(r + 1).with_context(|| format!("Row {r} is past the xlsx row limit"))?;
        for (col, cell) in row.iter().enumerate() {
            let Some(value) = cell else { continue };
            let excel_col = excel_column(col)?;
            match numeric_cell(value) {
                Some(n) => sheet.write_number(excel_row, excel_col, n)?,
                None => sheet.write_string(excel_row, excel_col, excel_safe(value))?,
            };
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn excel_column(col: usize) -> Result<u16> {
    u16::try_from(col).with_context(|| format!("Column {col} is past the xlsx column limit"))
}

/// Cells that round-trip as numbers. Leading zeros stay text.
fn numeric_cell(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() || v != value || (v.len() > 1 && v.starts_with('0') && !v.starts_with("0.")) {
        return None;
    }
    v.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Replace control characters Excel rejects with a visible `<0xNN>` marker.
pub fn excel_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && !matches!(c, '\n' | '\r' | '\t') {
            out.push_str(&format!("<0x{:02x}>", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
