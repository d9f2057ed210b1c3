use crate::error::StorageError;
use polars::prelude::*;
use std::fmt;

use super::traits::Record;

const ROW_INDEX: &str = "__row";

/// A single value in a [`Table`] row, as built by records and read back
/// by [`Table::value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Numeric view of the cell. Text is parsed leniently (`"1.234,5"` style
    /// thousands separators are not supported, a lone decimal comma is).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) if v.is_finite() => Some(*v),
            Cell::Float(_) => None,
            Cell::Text(s) => parse_number(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Float(v) => v.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Int(_) => false,
        }
    }

    fn from_any(value: &AnyValue) -> Self {
        match value {
            AnyValue::Null => Cell::Empty,
            AnyValue::Boolean(b) => Cell::Int(i64::from(*b)),
            AnyValue::String(s) => Cell::from(*s),
            AnyValue::StringOwned(s) => Cell::Text(s.to_string()),
            AnyValue::Float32(v) => Cell::from(f64::from(*v)),
            AnyValue::Float64(v) => Cell::from(*v),
            other => match other.extract::<i64>() {
                Some(v) => Cell::Int(v),
                None => Cell::Text(other.to_string()),
            },
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let t = text.trim();
    t.parse::<f64>()
        .or_else(|_| t.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|v| v.is_finite())
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) if v.is_nan() => Ok(()),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Cell::Empty
        } else {
            Cell::Float(v)
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Int(i64::from(v))
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Int(v as i64)
    }
}

impl From<Option<u8>> for Cell {
    fn from(v: Option<u8>) -> Self {
        v.map(|x| Cell::Int(i64::from(x))).unwrap_or(Cell::Empty)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        v.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

/// Picks the narrowest column type that holds every non-empty cell:
/// integers, then floats, then text.
fn series_from_cells<'a>(name: &str, cells: impl IntoIterator<Item = &'a Cell>) -> Series {
    let cells: Vec<&Cell> = cells.into_iter().collect();
    let mut present = cells.iter().filter(|c| !c.is_empty()).peekable();
    let any_present = present.peek().is_some();
    let (mut all_int, mut all_numeric) = (true, true);
    for cell in present {
        match cell {
            Cell::Int(_) => {}
            Cell::Float(_) => all_int = false,
            _ => {
                all_int = false;
                all_numeric = false;
            }
        }
    }

    if any_present && all_int {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Cell::Int(v) => Some(*v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else if all_numeric {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_f64()).collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells
            .iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect();
        Series::new(name.into(), values)
    }
}

/// Named columns backed by a polars [`DataFrame`], the in-memory shape of
/// every CSV this crate writes.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            frame: DataFrame::empty(),
        }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.frame.equals_missing(&other.frame)
    }
}

impl From<DataFrame> for Table {
    fn from(frame: DataFrame) -> Self {
        Self { frame }
    }
}

impl Table {
    /// A table with the given header and no rows.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<Column> = columns
            .into_iter()
            .map(|c| {
                let name: String = c.into();
                Column::new_empty(name.into(), &DataType::String)
            })
            .collect();
        match DataFrame::new(columns) {
            Ok(frame) => Self { frame },
            Err(e) => {
                tracing::error!("Invalid table header: {}", e);
                Self::default()
            }
        }
    }

    /// Builds a table column by column from row-shaped cells.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Cell>>) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = columns.into_iter().map(Into::into).collect();
        if let Some(row) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(StorageError::RowWidth {
                expected: names.len(),
                found: row.len(),
            });
        }
        if rows.is_empty() {
            return Ok(Self::new(names));
        }
        let columns: Vec<Column> = names
            .iter()
            .enumerate()
            .map(|(i, name)| series_from_cells(name, rows.iter().map(|r| &r[i])).into())
            .collect();
        Ok(Self {
            frame: DataFrame::new(columns)?,
        })
    }

    pub fn from_records<R: Record>(records: &[R]) -> Self {
        let rows = records.iter().map(Record::to_row).collect();
        Self::from_rows(R::COLUMNS.iter().copied(), rows).unwrap_or_else(|e| {
            tracing::error!("Failed to build table from records: {}", e);
            Self::new(R::COLUMNS.iter().copied())
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<Cell> {
        let series = self.frame.column(column).ok()?.as_materialized_series();
        series.get(row).ok().map(|v| Cell::from_any(&v))
    }

    /// Numeric view of a whole column; missing column yields an empty vec.
    /// Text columns are parsed with a lone decimal comma accepted.
    pub fn numbers(&self, column: &str) -> Vec<Option<f64>> {
        let Ok(column) = self.frame.column(column) else {
            return Vec::new();
        };
        let series = column.as_materialized_series();
        let parsed: PolarsResult<Vec<Option<f64>>> = if series.dtype() == &DataType::String {
            series
                .str()
                .map(|ca| ca.into_iter().map(|v| v.and_then(parse_number)).collect())
        } else {
            series.cast(&DataType::Float64).and_then(|s| {
                s.f64()
                    .map(|ca| ca.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
            })
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!("Column {} is not numeric: {}", series.name(), e);
            vec![None; self.len()]
        })
    }

    /// Trimmed text view of a whole column; blank and missing values are
    /// `None`, as is every row when the column is absent.
    pub fn texts(&self, column: &str) -> Vec<Option<String>> {
        let Ok(column) = self.frame.column(column) else {
            return vec![None; self.len()];
        };
        let texts: PolarsResult<Vec<Option<String>>> = column
            .as_materialized_series()
            .cast(&DataType::String)
            .and_then(|s| {
                s.str().map(|ca| {
                    ca.into_iter()
                        .map(|v| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string))
                        .collect()
                })
            });
        texts.unwrap_or_else(|_| vec![None; self.len()])
    }

    /// Distinct non-null values of `column`.
    pub fn n_unique(&self, column: &str) -> usize {
        self.frame
            .column(column)
            .ok()
            .and_then(|c| c.as_materialized_series().drop_nulls().n_unique().ok())
            .unwrap_or(0)
    }

    /// Replaces the column if it exists, appends it otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), StorageError> {
        self.check_length(values.len())?;
        self.frame.with_column(series_from_cells(name, &values))?;
        Ok(())
    }

    /// Like [`Table::set_column`] for a float column.
    pub fn set_numbers(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<(), StorageError> {
        self.check_length(values.len())?;
        let values: Vec<Option<f64>> = values.into_iter().map(|v| v.filter(|x| x.is_finite())).collect();
        self.frame.with_column(Series::new(name.into(), values))?;
        Ok(())
    }

    fn check_length(&self, found: usize) -> Result<(), StorageError> {
        if found != self.len() {
            return Err(StorageError::RowWidth {
                expected: self.len(),
                found,
            });
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if !self.has_column(from) {
            return;
        }
        if let Err(e) = self.frame.rename(from, to.into()) {
            tracing::warn!("Failed to rename {} to {}: {}", from, to, e);
        }
    }

    /// Keeps the rows whose mask entry is `true`.
    pub fn retain(&mut self, mask: &[bool]) -> Result<(), StorageError> {
        let mask = BooleanChunked::from_slice("mask".into(), mask);
        self.frame = self.frame.filter(&mask)?;
        Ok(())
    }

    /// Keeps the listed columns in the given order; unknown names are skipped.
    pub fn select(&self, columns: &[&str]) -> Table {
        let picked: Vec<&str> = columns.iter().copied().filter(|c| self.has_column(c)).collect();
        match self.frame.select(picked) {
            Ok(frame) => Self { frame },
            Err(e) => {
                tracing::error!("Failed to select columns: {}", e);
                Self::default()
            }
        }
    }

    /// Rows in ascending order of `column`, nulls last.
    pub fn sort_by(&self, column: &str) -> Table {
        if !self.has_column(column) {
            return self.clone();
        }
        let options = SortMultipleOptions::default().with_nulls_last(true);
        match self.frame.sort([column], options) {
            Ok(frame) => Self { frame },
            Err(e) => {
                tracing::warn!("Failed to sort by {}: {}", column, e);
                self.clone()
            }
        }
    }

    /// Drops earlier duplicates of the `keys` tuple, keeping the last one.
    /// Surviving rows stay in their original order.
    pub fn dedup_keep_last(&self, keys: &[&str]) -> Table {
        let subset: Vec<String> = keys
            .iter()
            .filter(|k| self.has_column(k))
            .map(|k| k.to_string())
            .collect();
        match self.frame.unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::Last, None) {
            Ok(frame) => Self { frame },
            Err(e) => {
                tracing::warn!("Failed to drop duplicates: {}", e);
                self.clone()
            }
        }
    }

    /// Left join on `key`, keeping left row order. With a `prefix` the
    /// right-hand columns are renamed `{prefix}_{column}`. When the right
    /// side has duplicate keys, the first match wins.
    pub fn left_join(&self, right: &Table, key: &str, prefix: Option<&str>) -> Table {
        if !self.has_column(key) || !right.has_column(key) {
            return self.clone();
        }
        match self.try_left_join(right, key, prefix) {
            Ok(frame) => Self { frame },
            Err(e) => {
                tracing::error!("Failed to join on {}: {}", key, e);
                self.clone()
            }
        }
    }

    fn try_left_join(&self, right: &Table, key: &str, prefix: Option<&str>) -> PolarsResult<DataFrame> {
        let keys = [key.to_string()];
        let mut right_frame = right
            .frame
            .unique_stable(Some(keys.as_slice()), UniqueKeepStrategy::First, None)?;
        if let Some(prefix) = prefix {
            for column in right.columns().iter().filter(|c| c.as_str() != key) {
                right_frame.rename(column, format!("{}_{}", prefix, column).into())?;
            }
        }

        let joined = self
            .frame
            .clone()
            .lazy()
            .with_column(col(key).cast(DataType::String))
            .with_row_index(ROW_INDEX, None)
            .join(
                right_frame.lazy().with_column(col(key).cast(DataType::String)),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Left),
            )
            .sort([ROW_INDEX], SortMultipleOptions::default())
            .collect()?;
        joined.drop(ROW_INDEX)
    }

    /// Null count per column, only for columns that have any.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.frame
            .get_columns()
            .iter()
            .filter_map(|c| {
                let n = c.null_count();
                (n > 0).then(|| (c.name().to_string(), n))
            })
            .collect()
    }
}
