use crate::model::Table;
use crate::stats::{aggregate_exprs, group_by, round, round_columns, Agg};
use polars::prelude::*;

const PRICE_SPECS: &[(&str, &[Agg])] = &[
    ("precio_distrito", &[Agg::Mean, Agg::Std, Agg::Min, Agg::Max]),
    ("precio_base", &[Agg::Mean, Agg::Std]),
];

const DAILY: &str = "precio_medio_diario";
const PEAK: &str = "precio_punta";
const VALLEY: &str = "precio_valle";
const SPREAD: &str = "diferencial_punta_valle";

fn period_mean(period: &str, alias: &str) -> Expr {
    col("precio_distrito")
        .cast(DataType::Float64)
        .filter(col("tipo_tarifa").eq(lit(period)))
        .mean()
        .alias(alias)
}

/// Mean of the per-day mean prices, one row per district.
fn daily_means(table: &Table) -> Table {
    if !table.has_column("fecha") || !table.has_column("precio_distrito") {
        return Table::default();
    }
    let per_day = table
        .frame()
        .clone()
        .lazy()
        .with_column(col("distrito").cast(DataType::String))
        .group_by([col("distrito"), col("fecha")])
        .agg([col("precio_distrito").cast(DataType::Float64).mean()])
        .collect();
    match per_day {
        Ok(frame) => group_by(
            &Table::from(frame),
            "distrito",
            vec![col("precio_distrito").mean().alias(DAILY)],
        ),
        Err(e) => {
            tracing::error!("Failed to compute daily prices: {}", e);
            Table::default()
        }
    }
}

/// Price summary per district, rounded to 4 decimals.
///
/// Besides the plain aggregates it adds the mean of daily means, the peak
/// and valley means and the spread between them.
pub fn calculate_metrics(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    let (mut exprs, mut columns) = aggregate_exprs(table, PRICE_SPECS);
    if table.has_column("tipo_tarifa") && table.has_column("precio_distrito") {
        exprs.push(period_mean("punta", PEAK));
        exprs.push(period_mean("valle", VALLEY));
    }
    let mut metrics = group_by(table, "distrito", exprs).left_join(&daily_means(table), "distrito", None);

    let n = metrics.len();
    for column in [DAILY, PEAK, VALLEY] {
        if !metrics.has_column(column) {
            set_or_log(&mut metrics, column, vec![None; n]);
        }
        columns.push(column.to_string());
    }
    round_columns(&mut metrics, &columns, 4);

    let spread = metrics
        .numbers(PEAK)
        .into_iter()
        .zip(metrics.numbers(VALLEY))
        .map(|(p, v)| p.zip(v).map(|(p, v)| round(p - v, 4)))
        .collect();
    set_or_log(&mut metrics, SPREAD, spread);
    columns.push(SPREAD.to_string());

    let order: Vec<&str> = std::iter::once("distrito")
        .chain(columns.iter().map(String::as_str))
        .collect();
    metrics.select(&order)
}

fn set_or_log(table: &mut Table, column: &str, values: Vec<Option<f64>>) {
    if let Err(e) = table.set_numbers(column, values) {
        tracing::error!("Failed to add column {}: {:?}", column, e);
    }
}
