use crate::error::ConfigError;
use anyhow::{anyhow, Result};
use serde_derive::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load AppConfig: {}", err)),
    }
}

fn default_days_back() -> u32 {
    30
}

fn default_air_quality_year() -> i32 {
    2023
}

fn default_request_timeout_sec() -> u64 {
    30
}

fn default_task_timeout_seconds() -> u64 {
    900
}

fn default_district_delay_ms() -> u64 {
    100
}

fn default_day_delay_ms() -> u64 {
    500
}

fn default_esios_min_interval_ms() -> u64 {
    1000
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectorConfig {
    // how many days of weather and prices to gather
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_air_quality_year")]
    pub air_quality_year: i32,
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,
    #[serde(default = "default_district_delay_ms")]
    pub district_delay_ms: u64,
    #[serde(default = "default_day_delay_ms")]
    pub day_delay_ms: u64,
    #[serde(default = "default_esios_min_interval_ms")]
    pub esios_min_interval_ms: u64,
}

impl CollectorConfig {
    /// Rejects settings that would make a run meaningless.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.days_back == 0 {
            return Err(ConfigError::invalid("days_back", "must be at least 1"));
        }
        if self.task_timeout_seconds == 0 {
            return Err(ConfigError::invalid("task_timeout_seconds", "must be positive"));
        }
        if !(1900..=2100).contains(&self.air_quality_year) {
            return Err(ConfigError::invalid(
                "air_quality_year",
                format!("{} is out of range", self.air_quality_year),
            ));
        }
        Ok(())
    }
}

pub fn load_collector_config() -> Result<CollectorConfig> {
    match envy::prefixed("COLLECTOR_").from_env::<CollectorConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load CollectorConfig: {}", err)),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Deserialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl OutputConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}

pub fn load_output_config() -> Result<OutputConfig> {
    match envy::prefixed("OUTPUT_").from_env::<OutputConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load OutputConfig: {}", err)),
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ApiKeyConfig {
    #[serde(default)]
    pub openweather_api_key: Option<String>,
    #[serde(default)]
    pub esios_api_key: Option<String>,
}

impl ApiKeyConfig {
    pub fn openweather(&self) -> Option<&str> {
        non_blank(&self.openweather_api_key)
    }

    pub fn esios(&self) -> Option<&str> {
        non_blank(&self.esios_api_key)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn load_api_key_config() -> Result<ApiKeyConfig> {
    match envy::from_env::<ApiKeyConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load ApiKeyConfig: {}", err)),
    }
}

fn default_madrid_air_json() -> String {
    "https://datos.madrid.es/egob/catalogo/212531-7916318-calidad-aire-tiempo-real.json".to_string()
}

fn default_madrid_air_csv() -> String {
    "https://datos.madrid.es/egob/catalogo/212531-7916318-calidad-aire-tiempo-real.csv".to_string()
}

fn default_openweather_base() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_preciodelaluz_base() -> String {
    "https://api.preciodelaluz.info/api/v1/prices".to_string()
}

fn default_ree_prices_url() -> String {
    "https://api.esios.ree.es/indicators/1001".to_string()
}

fn default_omie_base() -> String {
    "https://www.omie.es/es/file-download".to_string()
}

fn default_esios_base() -> String {
    "https://api.esios.ree.es".to_string()
}

fn default_ine_base() -> String {
    "https://www.ine.es".to_string()
}

/// Base URLs of every remote source, overridable for mirrors and tests.
#[derive(Deserialize, Debug, Clone)]
pub struct EndpointConfig {
    #[serde(default = "default_madrid_air_json")]
    pub madrid_air_json: String,
    #[serde(default = "default_madrid_air_csv")]
    pub madrid_air_csv: String,
    #[serde(default = "default_openweather_base")]
    pub openweather_base: String,
    #[serde(default = "default_preciodelaluz_base")]
    pub preciodelaluz_base: String,
    #[serde(default = "default_ree_prices_url")]
    pub ree_prices_url: String,
    #[serde(default = "default_omie_base")]
    pub omie_base: String,
    #[serde(default = "default_esios_base")]
    pub esios_base: String,
    #[serde(default = "default_ine_base")]
    pub ine_base: String,
}

pub fn load_endpoint_config() -> Result<EndpointConfig> {
    match envy::prefixed("ENDPOINT_").from_env::<EndpointConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load EndpointConfig: {}", err)),
    }
}
