//! Household electricity consumption percentiles (INE table 59532).

use crate::district::{normalize_text, District};
use crate::model::{Cell, Table};

pub const DISTRICT_COLUMN: &str = "Distritos";
pub const PERCENTILES: [&str; 5] = ["p10", "p25", "p50", "p75", "p90"];
const MADRID_MUNICIPALITY: &str = "28079";

/// `pNN` for headers such as `Percentil 50 de consumo eléctrico en kWh`.
pub fn percentile_column(header: &str) -> Option<String> {
    let normalized = normalize_text(header);
    let start = normalized.find("percentil")? + "percentil".len();
    let rest = normalized[start..].trim_start_matches(['_', ' ']);
    let digits: String = rest.chars().take(2).collect();
    (digits.len() == 2 && digits.chars().all(|c| c.is_ascii_digit())).then(|| format!("p{}", digits))
}

/// Five-digit municipality code at the start of a `Distritos` cell.
pub fn municipality_code(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let code = trimmed.get(..5)?;
    code.chars().all(|c| c.is_ascii_digit()).then_some(code)
}

/// District of a Madrid city row, e.g. `2807901 Madrid distrito 01`.
pub fn madrid_district(text: &str) -> Option<District> {
    if municipality_code(text)? != MADRID_MUNICIPALITY {
        return None;
    }
    let lower = text.to_lowercase();
    let start = lower.find("distrito")? + "distrito".len();
    let digits: String = lower[start..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    District::from_number(&digits)
}

fn is_total_row(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "total")
}

/// Renames the first column to `Distritos` and percentile columns to `pNN`.
pub fn standardize_columns(table: &Table) -> Table {
    let mut out = table.clone();
    if let Some(first) = table.columns().first() {
        if normalize_text(first) != "distritos" {
            out.rename_column(first, DISTRICT_COLUMN);
        }
    }
    for column in table.columns() {
        if let Some(p) = percentile_column(&column) {
            out.rename_column(&column, &p);
        }
    }
    out
}

/// Keeps the 21 district rows of Madrid city with typed percentiles.
///
/// Output columns are `Distritos, distrito_num, distrito_nombre`, the
/// percentiles present, then every other column in source order.
pub fn madrid_districts(table: &Table) -> Table {
    let mut out = standardize_columns(table);
    let Some(district_column) = out
        .columns()
        .into_iter()
        .find(|c| normalize_text(c) == "distritos")
    else {
        return Table::default();
    };

    let keep: Vec<bool> = out
        .texts(&district_column)
        .iter()
        .map(|text| {
            text.as_deref().is_some_and(|t| {
                municipality_code(t) == Some(MADRID_MUNICIPALITY) && !is_total_row(t)
            })
        })
        .collect();
    if let Err(e) = out.retain(&keep) {
        tracing::error!("Failed to filter Madrid rows: {:?}", e);
        return Table::default();
    }

    let districts: Vec<Option<District>> = out
        .texts(&district_column)
        .iter()
        .map(|t| t.as_deref().and_then(madrid_district))
        .collect();

    let percentiles: Vec<&str> = PERCENTILES.iter().copied().filter(|p| out.has_column(p)).collect();
    for p in &percentiles {
        let values = out.numbers(p);
        if let Err(e) = out.set_numbers(p, values) {
            tracing::error!("Failed to set column {}: {:?}", p, e);
        }
    }
    let labels: [(&str, Vec<Cell>); 2] = [
        (
            "distrito_num",
            districts.iter().map(|d| Cell::from(d.map(District::number))).collect(),
        ),
        (
            "distrito_nombre",
            districts.iter().map(|d| Cell::from(d.map(|d| d.name().to_string()))).collect(),
        ),
    ];
    for (column, values) in labels {
        if let Err(e) = out.set_column(column, values) {
            tracing::error!("Failed to set column {}: {:?}", column, e);
        }
    }

    let mut order: Vec<&str> = vec![district_column.as_str(), "distrito_num", "distrito_nombre"];
    order.extend(&percentiles);
    let columns = out.columns();
    let rest: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| !order.contains(c))
        .collect();
    order.extend(rest);
    out.select(&order)
}
