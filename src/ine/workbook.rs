use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use crate::error::SourceError;
use crate::model::{Cell, Table};

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) => Cell::from(*v),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.trim().to_string()),
        other => Cell::Text(other.to_string()),
    }
}

/// Reads the first sheet of an XLSX file into a [`Table`].
///
/// `header_row` is the 0-based sheet row holding the column names; rows
/// above it are skipped and all-empty rows below it are dropped. Blank
/// header cells are named `unnamed_{i}`. Column names are only trimmed.
pub fn read_first_sheet(bytes: &[u8], header_row: usize) -> Result<Table, SourceError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(SourceError::xlsx)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(SourceError::xlsx("workbook has no sheets"));
    };
    let range = workbook.worksheet_range(first).map_err(SourceError::xlsx)?;

    // The range starts at the first used cell, not at A1.
    let first_used_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let skip = header_row.saturating_sub(first_used_row);

    let mut rows = range.rows().skip(skip);
    let Some(header) = rows.next() else {
        return Err(SourceError::xlsx(format!("no header at row {}", header_row)));
    };
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (i, cell) in header.iter().enumerate() {
        let name = match to_cell(cell) {
            Cell::Empty => format!("unnamed_{}", i),
            other => other.to_string().trim().to_string(),
        };
        // Column names must be unique in a frame.
        if columns.contains(&name) {
            columns.push(format!("{}_{}", name, i));
        } else {
            columns.push(name);
        }
    }

    let rows: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(to_cell).collect::<Vec<Cell>>())
        .filter(|cells| !cells.iter().all(Cell::is_empty))
        .collect();
    Table::from_rows(columns, rows).map_err(SourceError::xlsx)
}

/// Column names trimmed, lowercased and with spaces turned into `_`.
pub fn normalize_columns(table: &Table) -> Table {
    let mut out = table.clone();
    for column in table.columns() {
        let normalized = column.trim().to_lowercase().replace(' ', "_");
        if normalized != column {
            out.rename_column(&column, &normalized);
        }
    }
    out
}
