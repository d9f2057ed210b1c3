//! Configuration builders for tests.
//!
//! Point every remote source at a mock server, and keep delays and date
//! ranges small enough for fast runs.

use crate::config::{CollectorConfig, EndpointConfig};

/// Builder for test endpoint configurations.
///
/// Without a base URL every endpoint targets a closed local port, so any
/// live fetch fails fast and collectors fall back to simulation.
#[derive(Debug)]
pub struct TestEndpointConfigBuilder {
    base_url: String,
}

impl TestEndpointConfigBuilder {
    /// Creates a new builder pointing at an unreachable host.
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:9".to_string(),
        }
    }

    /// Routes every endpoint to `url`, under the paths the mocks expect.
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Builds the endpoint configuration.
    pub fn build(self) -> EndpointConfig {
        let uri = self.base_url;
        EndpointConfig {
            madrid_air_json: format!("{}/air.json", uri),
            madrid_air_csv: format!("{}/air.csv", uri),
            openweather_base: uri.clone(),
            preciodelaluz_base: format!("{}/prices", uri),
            ree_prices_url: format!("{}/indicators/1001", uri),
            omie_base: format!("{}/file-download", uri),
            esios_base: uri.clone(),
            ine_base: uri,
        }
    }
}

/// Builder for test collector configurations.
#[derive(Debug)]
pub struct TestCollectorConfigBuilder {
    days_back: u32,
    air_quality_year: i32,
    task_timeout_seconds: u64,
}

impl TestCollectorConfigBuilder {
    /// One day back, no delays and a generous task timeout.
    pub fn new() -> Self {
        Self {
            days_back: 1,
            air_quality_year: 2023,
            task_timeout_seconds: 120,
        }
    }

    pub fn with_days_back(mut self, days_back: u32) -> Self {
        self.days_back = days_back;
        self
    }

    pub fn with_task_timeout(mut self, seconds: u64) -> Self {
        self.task_timeout_seconds = seconds;
        self
    }

    /// Builds the collector configuration.
    pub fn build(self) -> CollectorConfig {
        CollectorConfig {
            days_back: self.days_back,
            air_quality_year: self.air_quality_year,
            request_timeout_sec: 5,
            task_timeout_seconds: self.task_timeout_seconds,
            district_delay_ms: 0,
            day_delay_ms: 0,
            esios_min_interval_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_config_builder() {
        let config = TestEndpointConfigBuilder::new()
            .with_base_url("http://mock.local/")
            .build();

        assert_eq!(config.madrid_air_json, "http://mock.local/air.json");
        assert_eq!(config.preciodelaluz_base, "http://mock.local/prices");
        assert_eq!(config.ree_prices_url, "http://mock.local/indicators/1001");
        assert_eq!(config.esios_base, "http://mock.local");
        assert_eq!(config.ine_base, "http://mock.local");
    }

    #[test]
    fn test_collector_config_builder() {
        let config = TestCollectorConfigBuilder::new()
            .with_days_back(3)
            .with_task_timeout(7)
            .build();

        assert_eq!(config.days_back, 3);
        assert_eq!(config.task_timeout_seconds, 7);
        assert_eq!(config.district_delay_ms, 0);
        assert_eq!(config.esios_min_interval_ms, 0);
    }
}
