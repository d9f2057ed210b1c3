//! Joins the per-district datasets into one table with composite indices.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::air_quality::{self, AirQualityCollector};
use crate::config::{ApiKeyConfig, CollectorConfig, EndpointConfig};
use crate::district::District;
use crate::electricity::{self, tariffs, ElectricityCollector};
use crate::error::CollectorError;
use crate::http::Client;
use crate::ine::IneTable;
use crate::mobility::{self, MobilityCollector};
use crate::model::{batch_collect_datasets, Cell, DataKind, DatasetCollector, Table};
use crate::stats::{self, min_max_normalize, round};
use crate::storage::CsvStore;
use crate::weather::{self, WeatherCollector};

pub const PROCESSED_DIR: &str = "processed";
pub const INTEGRATED_FILE: &str = "integrated_data_madrid.csv";
pub const COST_ESTIMATES_FILE: &str = "electricity_cost_estimates_madrid.csv";

pub const SUSTAINABILITY_INDEX: &str = "sustainability_index";
pub const ENERGY_EFFICIENCY_INDEX: &str = "energy_efficiency_index";
pub const URBAN_ACCESSIBILITY_INDEX: &str = "urban_accessibility_index";
pub const QUALITY_OF_LIFE_INDEX: &str = "quality_of_life_index";

const COMPOSITE_INDICES: [&str; 4] = [
    SUSTAINABILITY_INDEX,
    ENERGY_EFFICIENCY_INDEX,
    URBAN_ACCESSIBILITY_INDEX,
    QUALITY_OF_LIFE_INDEX,
];

/// Per-district summary of one dataset, the table that gets joined.
pub fn primary_metrics(kind: DataKind, table: &Table) -> Table {
    match kind {
        DataKind::Weather => weather::metrics::calculate_metrics(table),
        DataKind::Electricity => electricity::metrics::calculate_metrics(table),
        DataKind::AirQuality => air_quality::metrics::calculate_metrics(table),
        DataKind::Mobility => mobility::calculate_metrics(table),
    }
}

/// Every metrics table, named after its output file stem.
pub fn calculate_metrics(data: &[(DataKind, Table)]) -> Vec<(String, Table)> {
    let mut metrics = Vec::new();
    for (kind, table) in data {
        if table.is_empty() {
            continue;
        }
        metrics.push((format!("{}_metrics", kind), primary_metrics(*kind, table)));
        match kind {
            DataKind::AirQuality => {
                metrics.push(("health_metrics".to_string(), air_quality::metrics::health_impact(table)));
            }
            DataKind::Mobility => {
                metrics.push((
                    "connectivity_metrics".to_string(),
                    mobility::connectivity_analysis(table),
                ));
            }
            _ => {}
        }
        tracing::info!(kind = %kind, "Metrics calculated");
    }
    metrics
}

fn district_base() -> Table {
    let rows = District::all().map(|d| vec![Cell::from(d.name())]).collect();
    Table::from_rows(["distrito"], rows).unwrap_or_else(|e| {
        tracing::error!("Failed to build district rows: {:?}", e);
        Table::new(["distrito"])
    })
}

/// The 21 districts with every dataset's metrics joined in under a
/// `{kind}_` prefix, plus `ine_p50` when the INE consumption table is given.
pub fn join_metrics(data: &[(DataKind, Table)], consumption: Option<&Table>) -> Table {
    let mut joined = district_base();
    for (kind, table) in data {
        let metrics = primary_metrics(*kind, table);
        if !metrics.has_column("distrito") {
            tracing::warn!(kind = %kind, "Metrics have no distrito column, skipping");
            continue;
        }
        joined = joined.left_join(&metrics, "distrito", Some(&kind.to_string()));
    }

    if let Some(consumption) = consumption {
        if consumption.has_column("distrito_nombre") && consumption.has_column("p50") {
            let mut p50 = consumption.select(&["distrito_nombre", "p50"]);
            p50.rename_column("distrito_nombre", "distrito");
            joined = joined.left_join(&p50, "distrito", Some("ine"));
        }
    }

    add_composite_indices(&mut joined);
    joined
}

fn set_index(table: &mut Table, name: &str, values: Vec<Option<f64>>) {
    let rounded = values.into_iter().map(|v| v.map(|x| round(x, 3))).collect();
    if let Err(e) = table.set_numbers(name, rounded) {
        tracing::error!("Failed to add {}: {:?}", name, e);
    }
}

/// Adds each composite index whose inputs are present in `table`.
pub fn add_composite_indices(table: &mut Table) {
    if table.has_column("air_quality_ICA_mean") && table.has_column("weather_temperatura_media_mean") {
        let ica = min_max_normalize(&table.numbers("air_quality_ICA_mean"));
        let temperature = min_max_normalize(&table.numbers("weather_temperatura_media_mean"));
        let values = ica
            .iter()
            .zip(&temperature)
            .map(|(a, t)| Some(((*a)? + (1.0 - (*t)?)) / 2.0))
            .collect();
        set_index(table, SUSTAINABILITY_INDEX, values);
    }

    if table.has_column("ine_p50") && table.has_column("electricity_precio_distrito_mean") {
        let values = table
            .numbers("ine_p50")
            .into_iter()
            .zip(table.numbers("electricity_precio_distrito_mean"))
            .map(|(p50, price)| match (p50, price) {
                (Some(p50), Some(price)) if price != 0.0 => Some(p50 / price),
                _ => None,
            })
            .collect();
        set_index(table, ENERGY_EFFICIENCY_INDEX, values);
    }

    if table.has_column("mobility_accessibility_score") && table.has_column("mobility_connectivity_score") {
        let values = table
            .numbers("mobility_accessibility_score")
            .into_iter()
            .zip(table.numbers("mobility_connectivity_score"))
            .map(|(access, conn)| Some((access? + conn? / 100.0) / 2.0))
            .collect();
        set_index(table, URBAN_ACCESSIBILITY_INDEX, values);
    }

    let parts: Vec<Vec<Option<f64>>> = [SUSTAINABILITY_INDEX, URBAN_ACCESSIBILITY_INDEX]
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| table.numbers(c))
        .collect();
    if !parts.is_empty() {
        let values = (0..table.len())
            .map(|i| {
                let row: Vec<Option<f64>> = parts.iter().map(|p| p[i]).collect();
                stats::mean(&stats::present(&row))
            })
            .collect();
        set_index(table, QUALITY_OF_LIFE_INDEX, values);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationReport {
    pub total_districts: usize,
    pub total_variables: usize,
    pub data_types_integrated: Vec<DataKind>,
    pub missing_data_summary: Vec<(String, usize)>,
    pub new_metrics_created: Vec<String>,
}

pub fn integration_report(table: &Table) -> IntegrationReport {
    let data_types_integrated = [
        DataKind::Weather,
        DataKind::Electricity,
        DataKind::AirQuality,
        DataKind::Mobility,
    ]
    .into_iter()
    .filter(|kind| {
        let prefix = format!("{}_", kind);
        table.columns().iter().any(|c| c.starts_with(&prefix))
    })
    .collect();

    IntegrationReport {
        total_districts: table.len(),
        total_variables: table.columns().len(),
        data_types_integrated,
        missing_data_summary: table.missing_counts(),
        new_metrics_created: COMPOSITE_INDICES
            .iter()
            .filter(|c| table.has_column(c))
            .map(|c| c.to_string())
            .collect(),
    }
}

pub struct DataIntegration {
    collectors: Vec<Box<dyn DatasetCollector>>,
    store: CsvStore,
}

impl DataIntegration {
    pub fn new(collectors: Vec<Box<dyn DatasetCollector>>, store: CsvStore) -> Self {
        Self { collectors, store }
    }

    /// Weather, electricity, air quality and mobility collectors wired to
    /// the configured endpoints.
    pub fn from_config(
        client: Arc<Client>,
        config: &CollectorConfig,
        endpoints: &EndpointConfig,
        keys: &ApiKeyConfig,
        store: CsvStore,
    ) -> Self {
        let district_delay = Duration::from_millis(config.district_delay_ms);
        let collectors: Vec<Box<dyn DatasetCollector>> = vec![
            Box::new(
                WeatherCollector::new(
                    client.clone(),
                    endpoints.openweather_base.clone(),
                    keys.openweather().map(str::to_string),
                    config.days_back,
                )
                .with_request_delay(district_delay),
            ),
            Box::new(
                ElectricityCollector::new(client.clone(), endpoints, config.days_back)
                    .with_day_delay(Duration::from_millis(config.day_delay_ms)),
            ),
            Box::new(
                AirQualityCollector::new(
                    client,
                    endpoints.madrid_air_json.clone(),
                    endpoints.madrid_air_csv.clone(),
                    config.air_quality_year,
                ),
            ),
            Box::new(MobilityCollector::new()),
        ];
        Self::new(collectors, store)
    }

    pub async fn collect_all(&self) -> Vec<(DataKind, Table)> {
        tracing::info!("Collecting district datasets");
        batch_collect_datasets(&self.collectors).await
    }

    fn consumption_table(&self) -> Option<Table> {
        let file = IneTable::ElectricityConsumption.output_file();
        if !self.store.exists(PROCESSED_DIR, file) {
            return None;
        }
        match self.store.read(PROCESSED_DIR, file) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", file, e);
                None
            }
        }
    }

    fn log_checks(&self, data: &[(DataKind, Table)]) {
        let Some((_, air)) = data.iter().find(|(k, _)| *k == DataKind::AirQuality) else {
            return;
        };
        match air_quality::metrics::validate_against_reference(air) {
            Ok(report) => {
                tracing::info!(
                    checked = report.pollutants_checked(),
                    within_ranges = report.within_ranges(),
                    "Air quality validated against Madrid reference ranges"
                );
                tracing::info!(all_valid = report.all_valid(), "Summary: all valid");
            }
            Err(e) => tracing::warn!("Air quality validation failed: {}", e),
        }
    }

    /// Cost of the reference consumption in every district, written only
    /// when electricity prices were collected.
    fn write_cost_estimates(&self, data: &[(DataKind, Table)]) -> Result<Option<PathBuf>, CollectorError> {
        if !data.iter().any(|(k, t)| *k == DataKind::Electricity && !t.is_empty()) {
            return Ok(None);
        }
        let estimates = tariffs::cost_estimates(tariffs::REFERENCE_CONSUMPTION_KWH)?;
        let path = self
            .store
            .write(PROCESSED_DIR, COST_ESTIMATES_FILE, &Table::from_records(&estimates))?;
        Ok(Some(path))
    }

    /// Collects, summarises and stores every dataset plus the joined table.
    ///
    /// Returns the files written; an empty list means nothing was collected.
    pub async fn run(&self) -> Result<Vec<PathBuf>, CollectorError> {
        let data = self.collect_all().await;
        if data.is_empty() {
            tracing::error!("No district datasets collected");
            return Ok(Vec::new());
        }
        tracing::info!(types = data.len(), "District datasets collected");

        let mut written = Vec::new();
        for (kind, table) in &data {
            written.push(self.store.write(PROCESSED_DIR, &format!("{}_data_madrid.csv", kind), table)?);
        }
        for (name, table) in calculate_metrics(&data) {
            if table.is_empty() {
                tracing::warn!(metrics = %name, "Empty metrics table, not saved");
                continue;
            }
            written.push(self.store.write(PROCESSED_DIR, &format!("{}_madrid.csv", name), &table)?);
        }

        written.extend(self.write_cost_estimates(&data)?);

        let consumption = self.consumption_table();
        let joined = join_metrics(&data, consumption.as_ref());
        written.push(self.store.write(PROCESSED_DIR, INTEGRATED_FILE, &joined)?);

        let report = integration_report(&joined);
        tracing::info!(
            districts = report.total_districts,
            variables = report.total_variables,
            types = ?report.data_types_integrated,
            indices = ?report.new_metrics_created,
            "Integration completed"
        );
        for (column, missing) in &report.missing_data_summary {
            tracing::debug!(%column, missing, "Missing values");
        }
        self.log_checks(&data);

        Ok(written)
    }
}
