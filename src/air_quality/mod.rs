//! Air-quality collector for the Madrid districts.
//!
//! Each district is served by the first source that has data for it: the
//! city's real-time JSON feed, the real-time CSV export, and finally the
//! seeded simulator.

pub mod index;
pub mod metrics;
pub mod parser;
pub mod simulator;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::fmt;
use std::sync::Arc;

use crate::district::District;
use crate::error::{CollectorError, SourceError};
use crate::http::Client;
use crate::model::{Cell, DataKind, DatasetCollector, Record, Table};
use index::{air_quality_index, Pollutant, Pollutants, QualityLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirSource {
    Api,
    Csv,
    Simulated,
}

impl fmt::Display for AirSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AirSource::Api => write!(f, "api_madrid"),
            AirSource::Csv => write!(f, "csv_madrid"),
            AirSource::Simulated => write!(f, "simulado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirQualityRecord {
    pub fecha: NaiveDate,
    pub distrito: District,
    pub pollutants: Pollutants,
    pub quality: Option<QualityLevel>,
    pub estacion: Option<String>,
    pub fuente: AirSource,
}

impl AirQualityRecord {
    pub fn new(
        fecha: NaiveDate,
        distrito: District,
        pollutants: Pollutants,
        estacion: Option<String>,
        fuente: AirSource,
    ) -> Self {
        Self {
            fecha,
            distrito,
            quality: air_quality_index(&pollutants),
            pollutants,
            estacion,
            fuente,
        }
    }
}

impl Record for AirQualityRecord {
    const COLUMNS: &'static [&'static str] = &[
        "fecha",
        "distrito",
        "NO2",
        "PM10",
        "PM2.5",
        "O3",
        "SO2",
        "CO",
        "ICA",
        "calidad",
        "recomendacion",
        "estacion_nombre",
        "fuente",
    ];

    fn to_row(&self) -> Vec<Cell> {
        let mut row = vec![
            Cell::from(self.fecha.format("%Y-%m-%d").to_string()),
            Cell::from(self.distrito.name()),
        ];
        row.extend(Pollutant::ALL.iter().map(|p| Cell::from(self.pollutants.get(*p))));
        row.push(Cell::from(self.quality.map(QualityLevel::index)));
        row.push(Cell::from(self.quality.map(|q| q.label().to_string())));
        row.push(Cell::from(self.quality.map(|q| q.recommendation().to_string())));
        row.push(Cell::from(self.estacion.clone()));
        row.push(Cell::from(self.fuente.to_string()));
        row
    }
}

pub struct AirQualityCollector {
    client: Arc<Client>,
    realtime_json_url: String,
    realtime_csv_url: String,
    year: i32,
}

impl AirQualityCollector {
    pub fn new(
        client: Arc<Client>,
        realtime_json_url: impl Into<String>,
        realtime_csv_url: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            client,
            realtime_json_url: realtime_json_url.into(),
            realtime_csv_url: realtime_csv_url.into(),
            year,
        }
    }

    async fn fetch_realtime(&self) -> Result<Vec<AirQualityRecord>, SourceError> {
        let value = self.client.get_json(&self.realtime_json_url, &[], &[]).await?;
        Ok(parser::parse_realtime_json(&value, Local::now().date_naive()))
    }

    async fn fetch_portal_csv(&self) -> Result<Vec<AirQualityRecord>, SourceError> {
        let body = self.client.get(&self.realtime_csv_url).await?;
        parser::parse_portal_csv(&body)
    }

    /// Records for every district, one source per district.
    ///
    /// The two live feeds are fetched once and shared by all districts.
    pub async fn collect_all(&self) -> Vec<AirQualityRecord> {
        tracing::info!(year = self.year, "Collecting air quality for all districts");

        let realtime = self.fetch_realtime().await.unwrap_or_else(|e| {
            tracing::debug!("Real-time air quality feed unavailable: {}", e);
            Vec::new()
        });
        let portal = self.fetch_portal_csv().await.unwrap_or_else(|e| {
            tracing::warn!("Air quality CSV export unavailable: {}", e);
            Vec::new()
        });

        District::all()
            .flat_map(|district| self.records_for(district, &realtime, &portal))
            .collect()
    }

    fn records_for(
        &self,
        district: District,
        realtime: &[AirQualityRecord],
        portal: &[AirQualityRecord],
    ) -> Vec<AirQualityRecord> {
        if let Some(hit) = realtime.iter().find(|r| r.distrito == district) {
            tracing::info!(district = %district, "Using real-time air quality feed");
            return vec![hit.clone()];
        }
        let from_csv: Vec<AirQualityRecord> = portal
            .iter()
            .filter(|r| r.distrito == district)
            .cloned()
            .collect();
        if !from_csv.is_empty() {
            tracing::info!(district = %district, "Using {} rows from the CSV export", from_csv.len());
            return from_csv;
        }
        tracing::info!(district = %district, year = self.year, "Simulating air quality");
        simulator::simulate_year(district, self.year)
    }
}

#[async_trait]
impl DatasetCollector for AirQualityCollector {
    fn kind(&self) -> DataKind {
        DataKind::AirQuality
    }

    async fn collect(&self) -> Result<Table, CollectorError> {
        let records = self.collect_all().await;
        Ok(Table::from_records(&records).dedup_keep_last(&["fecha", "distrito"]))
    }
}
