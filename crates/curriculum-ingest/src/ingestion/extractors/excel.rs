//! Spreadsheets via calamine
//!
//! Only the first sheet is read. The first row supplies the column names and
//! every following non-empty row becomes one JSON object on its own line.
//! The fast variant streams .xlsx/.xlsm cells and stops at the row cap, so a
//! large sheet is never loaded whole.

use std::path::Path;

use calamine::{open_workbook, open_workbook_auto, Data, Reader, Xlsx};
use serde_json::{Map, Value};

use super::FormatExtractor;
use crate::error::{Error, Result};
use crate::processing::ExtractionVariant;

/// Spreadsheet extractor
pub struct ExcelExtractor {
    /// Data rows kept by the fast variant
    fast_row_limit: usize,
}

impl ExcelExtractor {
    /// Create a new spreadsheet extractor
    pub fn new(fast_row_limit: usize) -> Self {
        Self {
            fast_row_limit: fast_row_limit.max(1),
        }
    }

    /// Load the whole first sheet, then cap rows
    fn read_range(&self, path: &Path, row_limit: usize) -> Result<String> {
        let mut workbook = open_workbook_auto(path).map_err(calamine_error)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .unwrap_or_else(|| "Sheet1".to_string());
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::extraction("calamine", "workbook has no sheets"))?
            .map_err(calamine_error)?;

        let mut rows = range.rows();
        let mut sheet = match rows.next() {
            Some(header_row) => SheetLines::new(&sheet_name, header_row),
            None => return Ok(format!("Sheet: {}", sheet_name)),
        };
        for row in rows.take(row_limit) {
            sheet.push_row(row);
        }

        let total_rows = range.height().saturating_sub(1);
        if total_rows > row_limit {
            tracing::info!(
                "Large spreadsheet: kept {} of {} rows from sheet '{}'",
                row_limit,
                total_rows,
                sheet_name
            );
            sheet.note(format!("[truncated: first {} of {} rows]", row_limit, total_rows));
        }

        Ok(sheet.finish())
    }

    /// Stream the first sheet cell by cell and stop after `row_limit` data rows
    fn stream_xlsx(&self, path: &Path, row_limit: usize) -> Result<String> {
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(calamine_error)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::extraction("calamine", "workbook has no sheets"))?;
        let mut cells = workbook.worksheet_cells_reader(&sheet_name).map_err(calamine_error)?;

        let mut sheet: Option<SheetLines> = None;
        let mut current_row: Option<u32> = None;
        let mut first_col = 0;
        let mut row: Vec<Data> = Vec::new();
        let mut data_rows = 0usize;
        let mut truncated = false;

        loop {
            let next = cells.next_cell().map_err(calamine_error)?;
            let row_ended = match &next {
                Some(cell) => current_row.is_some_and(|r| r != cell.get_position().0),
                None => current_row.is_some(),
            };
            if row_ended {
                let finished = std::mem::take(&mut row);
                match sheet.as_mut() {
                    None => sheet = Some(SheetLines::new(&sheet_name, &finished)),
                    Some(_) if data_rows == row_limit => {
                        truncated = true;
                        break;
                    }
                    Some(lines) => {
                        lines.push_row(&finished);
                        data_rows += 1;
                    }
                }
            }

            let Some(cell) = next else {
                break;
            };
            let (r, c) = cell.get_position();
            if current_row.is_none() {
                first_col = c;
            }
            current_row = Some(r);
            if c < first_col {
                continue;
            }
            let index = (c - first_col) as usize;
            if row.len() <= index {
                row.resize(index + 1, Data::Empty);
            }
            row[index] = Data::from(cell.get_value().clone());
        }

        let Some(mut sheet) = sheet else {
            return Ok(format!("Sheet: {}", sheet_name));
        };
        if truncated {
            tracing::info!(
                "Large spreadsheet: stopped reading sheet '{}' after {} rows",
                sheet_name,
                row_limit
            );
            sheet.note(format!("[truncated: first {} rows]", row_limit));
        }
        Ok(sheet.finish())
    }
}

impl FormatExtractor for ExcelExtractor {
    fn name(&self) -> &'static str {
        "calamine"
    }

    fn try_primary(&self, path: &Path, variant: ExtractionVariant) -> Result<String> {
        match variant {
            ExtractionVariant::Full => self.read_range(path, usize::MAX),
            ExtractionVariant::Fast if is_xlsx(path) => self.stream_xlsx(path, self.fast_row_limit),
            ExtractionVariant::Fast => self.read_range(path, self.fast_row_limit),
        }
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false)
}

fn calamine_error(e: impl std::fmt::Display) -> Error {
    Error::extraction("calamine", e.to_string())
}

/// Output lines for one sheet, keyed by its header row
struct SheetLines {
    headers: Vec<String>,
    lines: Vec<String>,
}

impl SheetLines {
    fn new(sheet_name: &str, header_row: &[Data]) -> Self {
        Self {
            headers: column_names(header_row),
            lines: vec![format!("Sheet: {}", sheet_name)],
        }
    }

    /// Append a row as a JSON object; rows with no values are skipped
    fn push_row(&mut self, row: &[Data]) {
        let mut record = Map::new();
        let mut has_value = false;
        for (i, header) in self.headers.iter().enumerate() {
            let value = row.get(i).map(cell_to_json).unwrap_or(Value::Null);
            has_value |= !value.is_null();
            record.insert(header.clone(), value);
        }
        if has_value {
            self.lines.push(Value::Object(record).to_string());
        }
    }

    fn note(&mut self, line: String) {
        self.lines.push(line);
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Header cells as unique column names; blanks become `column_N`
fn column_names(header_row: &[Data]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(header_row.len());
    let mut names: Vec<String> = Vec::with_capacity(header_row.len());
    for (i, cell) in header_row.iter().enumerate() {
        let mut base = cell.to_string().trim().to_string();
        if base.is_empty() {
            base = format!("column_{}", i + 1);
        }
        let mut name = base.clone();
        let mut suffix = i + 1;
        while !seen.insert(name.clone()) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}
