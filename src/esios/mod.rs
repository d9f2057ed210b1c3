//! Grid indicators from REE's e·sios API: demand, prices and generation.

pub mod client;

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ApiKeyConfig, EndpointConfig};
use crate::error::CollectorError;
use crate::http::Client;
use crate::model::{Cell, Table};
use crate::rate_limit::RateLimiter;
use crate::storage::CsvStore;
pub use client::{EsiosClient, Indicator};

pub const OUTPUT_DIR: &str = "raw/esios";
pub const HISTORICAL_DIR: &str = "raw/esios/historical";
pub const CATALOG_FILE: &str = "indicator_catalog.csv";

/// Catalogue search terms, matched against indicator names and descriptions.
pub const CATALOG_TERMS: [&str; 3] = ["consumo", "demanda", "precio"];

/// Indicators pulled over the whole collection window: real demand, PVPC
/// price and the main generation technologies.
pub const HISTORICAL_INDICATORS: [(IndicatorGroup, u32); 6] = [
    (IndicatorGroup::Demand, 1293),
    (IndicatorGroup::Price, 1001),
    (IndicatorGroup::Generation, 1),
    (IndicatorGroup::Generation, 4),
    (IndicatorGroup::Generation, 9),
    (IndicatorGroup::Generation, 12),
];

pub const COLUMNS: [&str; 8] = [
    "indicator_id",
    "indicator_name",
    "unit",
    "datetime",
    "value",
    "geo_id",
    "geo_name",
    "geo_agg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorGroup {
    Demand,
    Price,
    Generation,
}

impl IndicatorGroup {
    pub const ALL: [IndicatorGroup; 3] = [
        IndicatorGroup::Demand,
        IndicatorGroup::Price,
        IndicatorGroup::Generation,
    ];

    pub fn indicator_ids(self) -> &'static [u32] {
        match self {
            // real, national, non-peninsular, daily max, daily min
            IndicatorGroup::Demand => &[1293, 2037, 1740, 624, 625],
            IndicatorGroup::Price => &[573, 574, 1001, 1002, 1004, 1005],
            // PBF schedule: hydro, nuclear, combined cycle, fuel, wind, solar PV
            IndicatorGroup::Generation => &[1, 4, 9, 10, 11, 12],
        }
    }

    pub fn stem(self) -> &'static str {
        match self {
            IndicatorGroup::Demand => "demand",
            IndicatorGroup::Price => "price",
            IndicatorGroup::Generation => "generation",
        }
    }

    pub fn csv_file(self) -> String {
        format!("{}_data.csv", self.stem())
    }

    pub fn json_file(self) -> String {
        format!("{}_data.json", self.stem())
    }

    pub fn historical_file(self, id: u32) -> String {
        format!("{}_{}.csv", self.stem(), id)
    }
}

/// `(start, end)` as `YYYY-MM-DD` for the `days_back` days ending `today`.
pub fn date_window(today: NaiveDate, days_back: u32) -> (String, String) {
    let start = today - ChronoDuration::days(i64::from(days_back));
    (
        start.format("%Y-%m-%d").to_string(),
        today.format("%Y-%m-%d").to_string(),
    )
}

/// One row per indicator value, in indicator order.
pub fn group_table(indicators: &[Indicator]) -> Table {
    let rows: Vec<Vec<Cell>> = indicators
        .iter()
        .flat_map(|indicator| {
            indicator.values.iter().map(move |v| {
                vec![
                    Cell::from(indicator.id),
                    Cell::from(indicator.name.as_str()),
                    Cell::from(indicator.unit.as_str()),
                    Cell::from(v.datetime.as_str()),
                    Cell::from(v.value),
                    v.geo_id.map(Cell::Int).unwrap_or(Cell::Empty),
                    Cell::from(v.geo_name.clone()),
                    Cell::from(v.geo_agg.clone()),
                ]
            })
        })
        .collect();
    Table::from_rows(COLUMNS, rows).unwrap_or_else(|e| {
        tracing::error!("Failed to build ESIOS table: {:?}", e);
        Table::new(COLUMNS)
    })
}

/// `{"<id>": {indicator_id, name, unit, type, description, values}}`.
pub fn group_json(indicators: &[Indicator]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = indicators
        .iter()
        .map(|i| {
            (
                i.id.to_string(),
                serde_json::json!({
                    "indicator_id": i.id,
                    "name": i.name,
                    "unit": i.unit,
                    "type": i.kind,
                    "description": i.description,
                    "values": i.values,
                }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

pub struct EsiosCollector {
    client: EsiosClient,
    store: CsvStore,
}

impl EsiosCollector {
    pub fn new(client: EsiosClient, store: CsvStore) -> Self {
        Self { client, store }
    }

    /// Fails with [`CollectorError::MissingApiKey`] when `ESIOS_API_KEY` is unset.
    pub fn from_config(
        http: Arc<Client>,
        endpoints: &EndpointConfig,
        keys: &ApiKeyConfig,
        min_interval: Duration,
        store: CsvStore,
    ) -> Result<Self, CollectorError> {
        let key = keys.esios().ok_or_else(|| CollectorError::missing_api_key("ESIOS"))?;
        let limiter = RateLimiter::new("esios", min_interval);
        let client = EsiosClient::new(http, endpoints.esios_base.clone(), key, limiter);
        Ok(Self::new(client, store))
    }

    /// Indicators of `group` that answered; failures are logged and skipped.
    pub async fn fetch_group(&self, group: IndicatorGroup) -> Vec<Indicator> {
        let mut indicators = Vec::new();
        for &id in group.indicator_ids() {
            match self.client.indicator(id).await {
                Ok(indicator) => {
                    tracing::info!(
                        indicator = id,
                        name = %indicator.name,
                        values = indicator.values.len(),
                        "Fetched ESIOS indicator"
                    );
                    indicators.push(indicator);
                }
                Err(e) => tracing::warn!(indicator = id, "Failed to fetch ESIOS indicator: {}", e),
            }
        }
        indicators
    }

    /// Catalogue entries matching [`CATALOG_TERMS`], one row per match.
    pub async fn catalog(&self) -> Table {
        let mut rows = Vec::new();
        for term in CATALOG_TERMS {
            match self.client.indicators_by_type(term).await {
                Ok(found) => {
                    tracing::info!(term, indicators = found.len(), "ESIOS catalogue search");
                    rows.extend(found.into_iter().map(|i| {
                        vec![Cell::from(term), Cell::from(i.id), Cell::from(i.name)]
                    }));
                }
                Err(e) => tracing::warn!(term, "ESIOS catalogue search failed: {}", e),
            }
        }
        Table::from_rows(["term", "indicator_id", "name"], rows).unwrap_or_else(|e| {
            tracing::error!("Failed to build ESIOS catalogue: {:?}", e);
            Table::default()
        })
    }

    /// Values of the historical indicators between `start` and `end`,
    /// stored one file per indicator in datetime order.
    pub async fn collect_historical(&self, start: &str, end: &str) -> Result<Vec<PathBuf>, CollectorError> {
        let mut written = Vec::new();
        for (group, id) in HISTORICAL_INDICATORS {
            let indicator = match self.client.indicator_data(id, start, end).await {
                Ok(indicator) => indicator,
                Err(e) => {
                    tracing::warn!(indicator = id, "Failed to fetch ESIOS history: {}", e);
                    continue;
                }
            };
            let table = group_table(&[indicator]).sort_by("datetime");
            if table.is_empty() {
                tracing::warn!(indicator = id, start, end, "No ESIOS history in window");
                continue;
            }
            written.push(self.store.write(HISTORICAL_DIR, &group.historical_file(id), &table)?);
        }
        Ok(written)
    }

    /// Checks the connection, then stores the indicator catalogue, every
    /// group that returned data (CSV plus a JSON dump) and the history of
    /// the last `days_back` days. Returns the CSV paths written.
    pub async fn collect_all(&self, days_back: u32) -> Result<Vec<PathBuf>, CollectorError> {
        if !self.client.test_connection().await {
            return Err(CollectorError::Unavailable("ESIOS".to_string()));
        }

        let mut written = Vec::new();
        let catalog = self.catalog().await;
        if catalog.is_empty() {
            tracing::warn!("No ESIOS catalogue entries matched");
        } else {
            written.push(self.store.write(OUTPUT_DIR, CATALOG_FILE, &catalog)?);
        }

        for group in IndicatorGroup::ALL {
            let indicators = self.fetch_group(group).await;
            if indicators.is_empty() {
                tracing::warn!(group = group.stem(), "No ESIOS data to save");
                continue;
            }
            let table = group_table(&indicators);
            if table.is_empty() {
                tracing::warn!(group = group.stem(), "ESIOS indicators returned no values");
            } else {
                written.push(self.store.write(OUTPUT_DIR, &group.csv_file(), &table)?);
            }
            self.store
                .write_json(OUTPUT_DIR, &group.json_file(), &group_json(&indicators))?;
        }

        let (start, end) = date_window(Local::now().date_naive(), days_back);
        written.extend(self.collect_historical(&start, &end).await?);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::config::TestEndpointConfigBuilder;
    use crate::test_utils::fixtures;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn keys(esios: Option<&str>) -> ApiKeyConfig {
        ApiKeyConfig {
            openweather_api_key: None,
            esios_api_key: esios.map(str::to_string),
        }
    }

    fn collector_for(server: &MockServer, dir: &TempDir) -> EsiosCollector {
        let endpoints = TestEndpointConfigBuilder::new().with_base_url(&server.uri()).build();
        EsiosCollector::from_config(
            Arc::new(Client::new(5).unwrap()),
            &endpoints,
            &keys(Some("test-key")),
            Duration::ZERO,
            CsvStore::new(dir.path()),
        )
        .unwrap()
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_groups() {
            assert_eq!(IndicatorGroup::Demand.indicator_ids(), &[1293, 2037, 1740, 624, 625]);
            assert_eq!(IndicatorGroup::Price.indicator_ids().len(), 6);
            assert_eq!(IndicatorGroup::Generation.csv_file(), "generation_data.csv");
            assert_eq!(IndicatorGroup::Price.json_file(), "price_data.json");
        }

        #[test]
        fn test_date_window() {
            let today = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
            assert_eq!(
                date_window(today, 30),
                ("2024-02-11".to_string(), "2024-03-12".to_string())
            );
            assert_eq!(IndicatorGroup::Price.historical_file(1001), "price_1001.csv");
        }

        #[test]
        fn test_group_table_flattens_values() {
            let indicator: Indicator = serde_json::from_value(
                serde_json::from_str::<serde_json::Value>(fixtures::ESIOS_INDICATOR_JSON).unwrap()["indicator"]
                    .clone(),
            )
            .unwrap();

            let table = group_table(&[indicator]);

            assert_eq!(table.columns(), &COLUMNS);
            assert_eq!(table.len(), 2);
            assert_eq!(table.value(0, "indicator_id"), Some(Cell::Int(1293)));
            assert_eq!(table.value(0, "geo_id"), Some(Cell::Int(8741)));
            assert_eq!(table.value(0, "geo_agg"), Some(Cell::Empty));
        }

        #[tokio::test]
        async fn test_collect_all_writes_groups_with_data() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATORS_JSON))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/indicators/1293"))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATOR_JSON))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/indicators/1293/data"))
                .and(query_param("end_date", Local::now().date_naive().format("%Y-%m-%d").to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::ESIOS_INDICATOR_JSON))
                .mount(&server)
                .await;
            let dir = TempDir::new().unwrap();

            let written = collector_for(&server, &dir).collect_all(7).await.unwrap();

            let esios_dir = dir.path().join("raw").join("esios");
            assert_eq!(
                written,
                vec![
                    esios_dir.join(CATALOG_FILE),
                    esios_dir.join("demand_data.csv"),
                    esios_dir.join("historical").join("demand_1293.csv"),
                ]
            );
            assert!(esios_dir.join("demand_data.json").is_file());
            assert!(!esios_dir.join("price_data.csv").exists());

            let json: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(esios_dir.join("demand_data.json")).unwrap())
                    .unwrap();
            assert_eq!(json["1293"]["name"], "Demanda real");
            assert_eq!(json["1293"]["values"].as_array().unwrap().len(), 2);

            let store = CsvStore::new(dir.path());
            let catalog = store.read(OUTPUT_DIR, CATALOG_FILE).unwrap();
            assert_eq!(catalog.columns(), &["term", "indicator_id", "name"]);
            // "demanda" matches 1293 and 573, "precio" matches 573
            assert_eq!(catalog.len(), 3);
            assert_eq!(catalog.value(2, "indicator_id"), Some(Cell::Int(573)));

            let history = store.read(HISTORICAL_DIR, "demand_1293.csv").unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(
                history.value(0, "datetime"),
                Some(Cell::from("2024-03-12T00:00:00.000+01:00"))
            );
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_missing_api_key() {
            let endpoints = TestEndpointConfigBuilder::new().build();
            let dir = TempDir::new().unwrap();

            let result = EsiosCollector::from_config(
                Arc::new(Client::new(5).unwrap()),
                &endpoints,
                &keys(None),
                Duration::ZERO,
                CsvStore::new(dir.path()),
            );

            assert!(matches!(result, Err(CollectorError::MissingApiKey { .. })));
        }

        #[tokio::test]
        async fn test_collect_all_nothing_answers() {
            let server = MockServer::start().await;
            let dir = TempDir::new().unwrap();

            let err = collector_for(&server, &dir).collect_all(7).await.unwrap_err();

            assert!(matches!(err, CollectorError::Unavailable(ref name) if name == "ESIOS"));
            assert!(!dir.path().join("raw").exists());
        }

        #[tokio::test]
        async fn test_collect_all_without_indicator_data() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/indicators"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"indicators": []}"#))
                .mount(&server)
                .await;
            let dir = TempDir::new().unwrap();

            let written = collector_for(&server, &dir).collect_all(7).await.unwrap();

            assert!(written.is_empty());
            assert!(!dir.path().join("raw").exists());
        }
    }
}
