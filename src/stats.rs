//! Descriptive statistics and group-by aggregation over [`Table`] columns.
//!
//! Missing values are skipped, the standard deviation is the sample one
//! (n - 1) and needs at least two values.

use crate::model::Table;
use polars::prelude::*;

pub fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// `(v - min) / (max - min)` per value; undefined when the range is zero.
pub fn min_max_normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let known = present(values);
    let (Some(lo), Some(hi)) = (min(&known), max(&known)) else {
        return vec![None; values.len()];
    };
    let range = hi - lo;
    values
        .iter()
        .map(|v| v.and_then(|x| (range != 0.0).then(|| (x - lo) / range)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Mean,
    Std,
    Min,
    Max,
    Sum,
}

impl Agg {
    pub fn suffix(self) -> &'static str {
        match self {
            Agg::Mean => "mean",
            Agg::Std => "std",
            Agg::Min => "min",
            Agg::Max => "max",
            Agg::Sum => "sum",
        }
    }

    /// `{column}_{suffix}` over the column read as floats.
    pub fn expr(self, column: &str) -> Expr {
        let values = col(column).cast(DataType::Float64);
        let reduced = match self {
            Agg::Mean => values.mean(),
            Agg::Std => values.std(1),
            Agg::Min => values.min(),
            Agg::Max => values.max(),
            Agg::Sum => values.sum(),
        };
        reduced.alias(format!("{}_{}", column, self.suffix()))
    }
}

/// Groups `table` by `key` and evaluates `exprs` per group.
///
/// Rows with a null key are dropped and groups come out sorted by key.
pub fn group_by(table: &Table, key: &str, exprs: Vec<Expr>) -> Table {
    if !table.has_column(key) {
        return Table::default();
    }
    let grouped = table
        .frame()
        .clone()
        .lazy()
        .with_column(col(key).cast(DataType::String))
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg(exprs)
        .sort([key], SortMultipleOptions::default())
        .collect();
    match grouped {
        Ok(frame) => Table::from(frame),
        Err(e) => {
            tracing::error!("Failed to group by {}: {}", key, e);
            Table::default()
        }
    }
}

/// Rounds the listed float columns in place.
pub fn round_columns(table: &mut Table, columns: &[String], decimals: u32) {
    for column in columns {
        let rounded = table
            .numbers(column)
            .into_iter()
            .map(|v| v.map(|x| round(x, decimals)))
            .collect();
        if let Err(e) = table.set_numbers(column, rounded) {
            tracing::error!("Failed to round {}: {}", column, e);
        }
    }
}

/// Aggregate expressions for the listed columns, skipping those absent from
/// `table`, with the output column names in the order given.
pub fn aggregate_exprs(table: &Table, specs: &[(&str, &[Agg])]) -> (Vec<Expr>, Vec<String>) {
    specs
        .iter()
        .filter(|(column, _)| table.has_column(column))
        .flat_map(|(column, aggs)| {
            aggs.iter()
                .map(move |a| (a.expr(column), format!("{}_{}", column, a.suffix())))
        })
        .unzip()
}

/// Groups `table` by `key` and reduces each listed column.
///
/// Output columns are `key` followed by `{column}_{agg}` in the order given.
/// Columns absent from the input are skipped. Values are rounded to
/// `decimals`.
pub fn aggregate(table: &Table, key: &str, specs: &[(&str, &[Agg])], decimals: u32) -> Table {
    let (exprs, names) = aggregate_exprs(table, specs);
    let mut out = group_by(table, key, exprs);
    round_columns(&mut out, &names, decimals);
    out
}
