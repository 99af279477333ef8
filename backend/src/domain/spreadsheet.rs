//! Reading uploaded `.xlsx` workbooks and writing generated ones.

use anyhow::{anyhow, Result};
use calamine::{Data, DataType, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashMap;
use std::io::Cursor;

use crate::domain::calendar::format_dmy;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A data row of the first sheet, keyed by lower-cased header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    /// Position below the header row, from 1
    pub number: usize,
    cells: HashMap<String, String>,
}

impl SheetRow {
    /// Trimmed cell text under `header`, matched case-insensitively
    pub fn get(&self, header: &str) -> &str {
        self.cells.get(&header.to_lowercase()).map(String::as_str).unwrap_or("")
    }
}

/// Header and width of a generated column
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub width: f64,
}

/// Rows of the first worksheet. The first row holds the headers; blank rows are skipped.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|e| anyhow!("unreadable workbook: {}", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))?
        .map_err(|e| anyhow!("unreadable sheet: {}", e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell_text(cell).to_lowercase()).collect(),
        None => return Ok(Vec::new()),
    };

    let mut result = Vec::new();
    for (index, row) in rows.enumerate() {
        let cells: HashMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell_text(cell)))
            .collect();
        if cells.values().all(|value| value.is_empty()) {
            continue;
        }
        result.push(SheetRow { number: index + 1, cells });
    }
    Ok(result)
}

/// Single-sheet workbook with a bold header row
pub fn write_sheet(sheet_name: &str, columns: &[Column], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, column) in columns.iter().enumerate() {
        let col = u16::try_from(col)?;
        sheet.write_string_with_format(0, col, column.header, &bold)?;
        sheet.set_column_width(col, column.width)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let line = u32::try_from(index + 1)?;
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(line, u16::try_from(col)?, value.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell.as_date().map(format_dmy).unwrap_or_default(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
