//! Per-district summaries of an air-quality table.

use std::fmt;

use super::index::{Pollutant, QualityLevel};
use crate::error::CollectorError;
use crate::model::{Cell, Table};
use crate::stats::{self, aggregate_exprs, group_by, round, round_columns, Agg};
use polars::prelude::*;

const SUMMARY: &[Agg] = &[Agg::Mean, Agg::Std, Agg::Max];

const METRIC_SPECS: &[(&str, &[Agg])] = &[
    ("NO2", SUMMARY),
    ("PM10", SUMMARY),
    ("PM2.5", SUMMARY),
    ("O3", SUMMARY),
    ("SO2", SUMMARY),
    ("CO", SUMMARY),
    ("ICA", SUMMARY),
];

const HEALTH_COLUMNS: &[&str] = &[
    "distrito",
    "dias_peligrosos",
    "porcentaje_dias_peligrosos",
    "exposicion_NO2_promedio",
    "exposicion_PM2.5_promedio",
    "exposicion_O3_promedio",
    "nivel_riesgo",
];

fn days_with(level: QualityLevel) -> Expr {
    col("calidad")
        .cast(DataType::String)
        .eq(lit(level.label()))
        .sum()
        .alias(level.days_column())
}

/// Mean, std and max per pollutant and ICA, day counts per quality label and
/// the share of good days among good, moderate and bad ones.
pub fn calculate_metrics(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    let mut input = table.clone();
    if !input.has_column("calidad") {
        set_or_log(&mut input, "calidad", vec![None; table.len()]);
    }

    let (mut exprs, summary_columns) = aggregate_exprs(&input, METRIC_SPECS);
    exprs.extend(QualityLevel::ALL.iter().map(|&level| days_with(level)));
    let mut metrics = group_by(&input, "distrito", exprs);
    round_columns(&mut metrics, &summary_columns, 2);

    let days = |level: QualityLevel| metrics.numbers(&level.days_column());
    let (good, moderate, bad) = (
        days(QualityLevel::Buena),
        days(QualityLevel::Moderada),
        days(QualityLevel::Mala),
    );
    let share = good
        .iter()
        .zip(&moderate)
        .zip(&bad)
        .map(|((g, m), b)| {
            let g = g.unwrap_or(0.0);
            let considered = g + m.unwrap_or(0.0) + b.unwrap_or(0.0);
            (considered > 0.0).then(|| round(g / considered * 100.0, 1))
        })
        .collect();
    set_or_log(&mut metrics, "porcentaje_dias_buena", share);

    metrics
}

fn set_or_log(table: &mut Table, column: &str, values: Vec<Option<f64>>) {
    if let Err(e) = table.set_numbers(column, values) {
        tracing::error!("Failed to add column {}: {:?}", column, e);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Bajo,
    Moderado,
    Alto,
}

impl RiskLevel {
    /// Alto above 30 % dangerous days, Moderado above 10 %.
    pub fn from_dangerous_days(dangerous: usize, total: usize) -> Self {
        let total = total as f64;
        let dangerous = dangerous as f64;
        if dangerous > total * 0.3 {
            RiskLevel::Alto
        } else if dangerous > total * 0.1 {
            RiskLevel::Moderado
        } else {
            RiskLevel::Bajo
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RiskLevel::Bajo => write!(f, "Bajo"),
            RiskLevel::Moderado => write!(f, "Moderado"),
            RiskLevel::Alto => write!(f, "Alto"),
        }
    }
}

/// Days with ICA of 3 or more, mean exposure and a coarse risk level.
pub fn health_impact(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    let exposures: Vec<(&str, String)> = [Pollutant::No2, Pollutant::Pm25, Pollutant::O3]
        .iter()
        .map(|p| (p.column(), format!("exposicion_{}_promedio", p.column())))
        .collect();

    let mut exprs = vec![len().alias("registros")];
    if table.has_column("ICA") {
        exprs.push(
            col("ICA")
                .cast(DataType::Float64)
                .gt_eq(lit(3.0))
                .sum()
                .alias("dias_peligrosos"),
        );
    }
    exprs.extend(
        exposures
            .iter()
            .filter(|(column, _)| table.has_column(column))
            .map(|(column, name)| col(*column).cast(DataType::Float64).mean().alias(name.as_str())),
    );
    let mut out = group_by(table, "distrito", exprs);

    let n = out.len();
    if !out.has_column("dias_peligrosos") {
        set_or_log(&mut out, "dias_peligrosos", vec![Some(0.0); n]);
    }
    let names: Vec<String> = exposures.into_iter().map(|(_, name)| name).collect();
    let absent: Vec<&String> = names.iter().filter(|name| !out.has_column(name.as_str())).collect();
    for name in absent {
        set_or_log(&mut out, name, vec![None; n]);
    }
    round_columns(&mut out, &names, 2);

    let (totals, dangerous) = (out.numbers("registros"), out.numbers("dias_peligrosos"));
    let (shares, risks): (Vec<Option<f64>>, Vec<Cell>) = totals
        .iter()
        .zip(&dangerous)
        .map(|(total, dangerous)| {
            let total = total.unwrap_or(0.0) as usize;
            let dangerous = dangerous.unwrap_or(0.0) as usize;
            let share = (total > 0).then(|| round(dangerous as f64 / total as f64 * 100.0, 1));
            let risk = RiskLevel::from_dangerous_days(dangerous, total).to_string();
            (share, Cell::from(risk))
        })
        .unzip();
    set_or_log(&mut out, "porcentaje_dias_peligrosos", shares);
    if let Err(e) = out.set_column("nivel_riesgo", risks) {
        tracing::error!("Failed to add column nivel_riesgo: {:?}", e);
    }
    out.select(HEALTH_COLUMNS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollutantCheck {
    pub pollutant: Pollutant,
    pub mean: f64,
    pub ref_mean: f64,
    pub mean_ok: bool,
    pub min: f64,
    pub ref_min: f64,
    pub min_ok: bool,
    pub max: f64,
    pub ref_max: f64,
    pub max_ok: bool,
}

impl PollutantCheck {
    pub fn valid(&self) -> bool {
        self.mean_ok && self.min_ok && self.max_ok
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub checks: Vec<PollutantCheck>,
}

impl ValidationReport {
    pub fn all_valid(&self) -> bool {
        self.checks.iter().all(PollutantCheck::valid)
    }

    pub fn pollutants_checked(&self) -> usize {
        self.checks.len()
    }

    pub fn within_ranges(&self) -> usize {
        self.checks.iter().filter(|c| c.valid()).count()
    }
}

/// Compares each pollutant column with the Madrid reference range.
///
/// The mean may deviate up to 50 % from the reference mean, the minimum may
/// go down to half the reference minimum and the maximum up to 1.5 times the
/// reference maximum.
pub fn validate_against_reference(table: &Table) -> Result<ValidationReport, CollectorError> {
    if table.is_empty() {
        return Err(CollectorError::ValidationFailed(
            "air quality table is empty".to_string(),
        ));
    }

    let checks = Pollutant::ALL
        .iter()
        .filter_map(|&p| {
            let values = stats::present(&table.numbers(p.column()));
            let (mean, min, max) = (
                stats::mean(&values)?,
                stats::min(&values)?,
                stats::max(&values)?,
            );
            let reference = p.reference();
            let mean_ok = reference.mean <= 0.0
                || (mean - reference.mean).abs() / reference.mean <= 0.5;
            Some(PollutantCheck {
                pollutant: p,
                mean: round(mean, 2),
                ref_mean: reference.mean,
                mean_ok,
                min: round(min, 2),
                ref_min: reference.min,
                min_ok: min >= reference.min * 0.5,
                max: round(max, 2),
                ref_max: reference.max,
                max_ok: max <= reference.max * 1.5,
            })
        })
        .collect();

    Ok(ValidationReport { checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::air_quality::simulator::simulate_year;
    use crate::district::District;

    fn readings() -> Table {
        let rows = [
            ("2023-01-01", "Centro", 30.0, 8.0, 60.0, 1i64, "Buena"),
            ("2023-01-02", "Centro", 50.0, 12.0, 80.0, 2, "Moderada"),
            ("2023-01-03", "Centro", 210.0, 40.0, 50.0, 4, "Muy mala"),
            ("2023-01-04", "Centro", 45.0, 30.0, 70.0, 3, "Mala"),
            ("2023-01-01", "Barajas", 20.0, 5.0, 90.0, 1, "Buena"),
        ]
        .into_iter()
        .map(|(fecha, d, no2, pm25, o3, ica, calidad)| {
            vec![
                fecha.into(),
                d.into(),
                no2.into(),
                pm25.into(),
                o3.into(),
                ica.into(),
                calidad.into(),
            ]
        })
        .collect();
        Table::from_rows(["fecha", "distrito", "NO2", "PM2.5", "O3", "ICA", "calidad"], rows).unwrap()
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_metrics_columns_and_counts() {
            let metrics = calculate_metrics(&readings());

            assert_eq!(metrics.len(), 2);
            assert_eq!(metrics.value(0, "distrito"), Some(Cell::from("Barajas")));
            assert!(metrics.has_column("NO2_mean"));
            assert!(metrics.has_column("ICA_std"));
            assert!(!metrics.has_column("CO_mean"));

            // Centro: 1 good, 1 moderate, 1 bad, 1 very bad
            assert_eq!(metrics.value(1, "NO2_max"), Some(Cell::Float(210.0)));
            assert_eq!(metrics.value(1, "ICA_mean"), Some(Cell::Float(2.5)));
            assert_eq!(metrics.value(1, "dias_buena"), Some(Cell::Int(1)));
            assert_eq!(metrics.value(1, "dias_muy_mala"), Some(Cell::Int(1)));
            assert_eq!(metrics.value(1, "dias_extremadamente_mala"), Some(Cell::Int(0)));
            assert_eq!(metrics.value(1, "porcentaje_dias_buena"), Some(Cell::Float(33.3)));
            assert_eq!(metrics.value(0, "porcentaje_dias_buena"), Some(Cell::Float(100.0)));
        }

        #[test]
        fn test_health_impact() {
            let health = health_impact(&readings());

            assert_eq!(health.value(1, "distrito"), Some(Cell::from("Centro")));
            assert_eq!(health.value(1, "dias_peligrosos"), Some(Cell::Int(2)));
            assert_eq!(health.value(1, "porcentaje_dias_peligrosos"), Some(Cell::Float(50.0)));
            assert_eq!(health.value(1, "exposicion_NO2_promedio"), Some(Cell::Float(83.75)));
            assert_eq!(health.value(1, "nivel_riesgo"), Some(Cell::from("Alto")));
            assert_eq!(health.value(0, "nivel_riesgo"), Some(Cell::from("Bajo")));
            assert_eq!(health.columns(), HEALTH_COLUMNS);
        }

        #[test]
        fn test_health_impact_without_ica_has_no_dangerous_days() {
            let t = readings().select(&["distrito", "NO2"]);
            let health = health_impact(&t);

            assert_eq!(health.columns(), HEALTH_COLUMNS);
            assert_eq!(health.numbers("dias_peligrosos"), vec![Some(0.0), Some(0.0)]);
            assert_eq!(health.value(0, "exposicion_O3_promedio"), Some(Cell::Empty));
            assert_eq!(health.value(1, "nivel_riesgo"), Some(Cell::from("Bajo")));
        }

        #[test]
        fn test_metrics_without_quality_labels_count_zero_days() {
            let t = readings().select(&["distrito", "NO2"]);
            let metrics = calculate_metrics(&t);

            assert_eq!(metrics.numbers("dias_buena"), vec![Some(0.0), Some(0.0)]);
            assert_eq!(metrics.value(0, "porcentaje_dias_buena"), Some(Cell::Empty));
            assert_eq!(metrics.value(1, "NO2_mean"), Some(Cell::Float(83.75)));
        }

        #[test]
        fn test_risk_thresholds_are_strict() {
            assert_eq!(RiskLevel::from_dangerous_days(3, 10), RiskLevel::Moderado);
            assert_eq!(RiskLevel::from_dangerous_days(4, 10), RiskLevel::Alto);
            assert_eq!(RiskLevel::from_dangerous_days(1, 10), RiskLevel::Bajo);
        }

        #[test]
        fn test_simulated_year_validates() {
            let table = Table::from_records(&simulate_year(District::Centro, 2023));
            let report = validate_against_reference(&table).unwrap();

            assert_eq!(report.pollutants_checked(), 6);
            let no2 = &report.checks[0];
            assert_eq!(no2.pollutant, Pollutant::No2);
            assert!(no2.mean_ok);
            assert!(no2.max_ok);
            assert!(report.within_ranges() >= 4);
        }

        #[test]
        fn test_validation_flags_out_of_range() {
            let report = validate_against_reference(&readings()).unwrap();
            assert_eq!(report.pollutants_checked(), 3);
            let no2 = report.checks.iter().find(|c| c.pollutant == Pollutant::No2).unwrap();
            assert!(!no2.max_ok);
            assert!(!report.all_valid());
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_empty_table() {
            assert!(calculate_metrics(&Table::default()).is_empty());
            assert!(health_impact(&Table::default()).is_empty());
            assert!(matches!(
                validate_against_reference(&Table::default()),
                Err(CollectorError::ValidationFailed(_))
            ));
        }

        #[test]
        fn test_no_good_moderate_or_bad_days() {
            let t = Table::from_rows(
                ["distrito", "ICA", "calidad"],
                vec![vec!["Usera".into(), 5i64.into(), "Extremadamente mala".into()]],
            )
            .unwrap();
            let metrics = calculate_metrics(&t);
            assert_eq!(metrics.value(0, "porcentaje_dias_buena"), Some(Cell::Empty));
        }
    }
}
