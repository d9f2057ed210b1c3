//! Daily weather per district.
//!
//! OpenWeatherMap's time-machine endpoint is queried when an API key is
//! configured (it only reaches five days back); otherwise, or when a
//! district gets no answer, a single synthetic observation is produced.

pub mod metrics;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate, NaiveTime};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::district::District;
use crate::error::{CollectorError, ParseError, SourceError};
use crate::http::Client;
use crate::model::{Cell, DataKind, DatasetCollector, Record, Table};
use crate::stats::round;
use crate::synthetic::{exponential, normal, seeded_rng, uniform};

pub const OPENWEATHER_MAX_DAYS: u32 = 5;

/// Approximate centre of each district as `(lat, lon)`.
pub fn coordinates(district: District) -> (f64, f64) {
    match district {
        District::Centro => (40.4168, -3.7038),
        District::Arganzuela => (40.4000, -3.7000),
        District::Retiro => (40.4200, -3.6800),
        District::Salamanca => (40.4300, -3.6700),
        District::Chamartin => (40.4500, -3.6700),
        District::Tetuan => (40.4600, -3.7000),
        District::Chamberi => (40.4300, -3.7000),
        District::FuencarralElPardo => (40.4800, -3.7500),
        District::MoncloaAravaca => (40.4400, -3.7200),
        District::Latina => (40.4000, -3.7500),
        District::Carabanchel => (40.3800, -3.7500),
        District::Usera => (40.3800, -3.7200),
        District::PuenteDeVallecas => (40.3900, -3.6500),
        District::Moratalaz => (40.4200, -3.6500),
        District::CiudadLineal => (40.4300, -3.6500),
        District::Hortaleza => (40.4600, -3.6500),
        District::Villaverde => (40.3500, -3.7000),
        District::VillaDeVallecas => (40.3700, -3.6000),
        District::Vicalvaro => (40.4000, -3.6000),
        District::SanBlasCanillejas => (40.4300, -3.6000),
        District::Barajas => (40.4800, -3.5800),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherSource {
    OpenWeather,
    Simulated,
}

impl fmt::Display for WeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WeatherSource::OpenWeather => write!(f, "openweather"),
            WeatherSource::Simulated => write!(f, "simulado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub fecha: NaiveDate,
    pub distrito: District,
    pub temperatura_media: f64,
    pub temperatura_min: f64,
    pub temperatura_max: f64,
    pub humedad: f64,
    pub presion: f64,
    pub velocidad_viento: f64,
    pub direccion_viento: f64,
    pub nubosidad: f64,
    pub precipitacion: f64,
    pub uv_index: f64,
    pub fuente: WeatherSource,
}

impl Record for WeatherRecord {
    const COLUMNS: &'static [&'static str] = &[
        "fecha",
        "distrito",
        "temperatura_media",
        "temperatura_min",
        "temperatura_max",
        "humedad",
        "presion",
        "velocidad_viento",
        "direccion_viento",
        "nubosidad",
        "precipitacion",
        "uv_index",
        "fuente",
    ];

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.fecha.format("%Y-%m-%d").to_string()),
            Cell::from(self.distrito.name()),
            Cell::from(self.temperatura_media),
            Cell::from(self.temperatura_min),
            Cell::from(self.temperatura_max),
            Cell::from(self.humedad),
            Cell::from(self.presion),
            Cell::from(self.velocidad_viento),
            Cell::from(self.direccion_viento),
            Cell::from(self.nubosidad),
            Cell::from(self.precipitacion),
            Cell::from(self.uv_index),
            Cell::from(self.fuente.to_string()),
        ]
    }
}

/// One plausible day for Madrid, reproducible for `(district, date)`.
pub fn simulate_observation(district: District, date: NaiveDate) -> WeatherRecord {
    let mut rng = seeded_rng(&format!("{}_{}", district.name(), date));
    WeatherRecord {
        fecha: date,
        distrito: district,
        temperatura_media: round(normal(&mut rng, 15.0, 5.0), 2),
        temperatura_min: round(normal(&mut rng, 10.0, 3.0), 2),
        temperatura_max: round(normal(&mut rng, 20.0, 4.0), 2),
        humedad: round(uniform(&mut rng, 40.0, 80.0), 2),
        presion: round(uniform(&mut rng, 1010.0, 1020.0), 2),
        velocidad_viento: round(uniform(&mut rng, 0.0, 15.0), 2),
        direccion_viento: round(uniform(&mut rng, 0.0, 360.0), 2),
        nubosidad: round(uniform(&mut rng, 0.0, 100.0), 2),
        precipitacion: round(exponential(&mut rng, 2.0), 2),
        uv_index: round(uniform(&mut rng, 0.0, 10.0), 2),
        fuente: WeatherSource::Simulated,
    }
}

fn current_number(current: &Value, key: &str) -> Result<f64, ParseError> {
    current
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ParseError::missing_column(format!("current.{}", key)))
}

/// Reads the `current` block of a time-machine response. The single reading
/// stands in for the daily mean, min and max.
pub fn parse_timemachine(
    value: &Value,
    district: District,
    date: NaiveDate,
) -> Result<WeatherRecord, ParseError> {
    let current = value
        .get("current")
        .ok_or_else(|| ParseError::missing_column("current"))?;
    let temp = current_number(current, "temp")?;
    Ok(WeatherRecord {
        fecha: date,
        distrito: district,
        temperatura_media: temp,
        temperatura_min: temp,
        temperatura_max: temp,
        humedad: current_number(current, "humidity")?,
        presion: current_number(current, "pressure")?,
        velocidad_viento: current_number(current, "wind_speed")?,
        direccion_viento: current_number(current, "wind_deg")?,
        nubosidad: current_number(current, "clouds")?,
        precipitacion: current
            .get("rain")
            .and_then(|r| r.get("1h"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        uv_index: current.get("uvi").and_then(Value::as_f64).unwrap_or(0.0),
        fuente: WeatherSource::OpenWeather,
    })
}

pub struct WeatherCollector {
    client: Arc<Client>,
    base_url: String,
    api_key: Option<String>,
    days_back: u32,
    request_delay: Duration,
}

impl WeatherCollector {
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        days_back: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            days_back,
            request_delay: Duration::ZERO,
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn fetch_day(
        &self,
        api_key: &str,
        district: District,
        date: NaiveDate,
    ) -> Result<WeatherRecord, SourceError> {
        let (lat, lon) = coordinates(district);
        let timestamp = date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", api_key.to_string()),
            ("units", "metric".to_string()),
            ("dt", timestamp.to_string()),
        ];
        let url = format!("{}/onecall/timemachine", self.base_url.trim_end_matches('/'));
        let value = self.client.get_json(&url, &[], &query).await?;
        Ok(parse_timemachine(&value, district, date)?)
    }

    /// Up to five days of observations from OpenWeatherMap; failed days are
    /// logged and skipped.
    pub async fn fetch_openweather(&self, api_key: &str, district: District) -> Vec<WeatherRecord> {
        let today = Local::now().date_naive();
        let mut records = Vec::new();
        for i in 0..self.days_back.min(OPENWEATHER_MAX_DAYS) {
            let date = today - ChronoDuration::days(i64::from(i));
            match self.fetch_day(api_key, district, date).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(district = %district, %date, "OpenWeatherMap request failed: {}", e)
                }
            }
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }
        records
    }

    pub async fn collect_all(&self) -> Vec<WeatherRecord> {
        let api_key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("OpenWeatherMap API key not configured, simulating weather");
        }
        let today = Local::now().date_naive();

        let mut all = Vec::new();
        for district in District::all() {
            if let Some(key) = api_key {
                let records = self.fetch_openweather(key, district).await;
                if !records.is_empty() {
                    all.extend(records);
                    continue;
                }
            }
            tracing::debug!(district = %district, "Simulating weather");
            all.push(simulate_observation(district, today));
        }
        all
    }
}

#[async_trait]
impl DatasetCollector for WeatherCollector {
    fn kind(&self) -> DataKind {
        DataKind::Weather
    }

    async fn collect(&self) -> Result<Table, CollectorError> {
        Ok(Table::from_records(&self.collect_all().await))
    }
}
