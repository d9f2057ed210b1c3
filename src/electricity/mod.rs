//! Hourly electricity prices per district.
//!
//! For each day the collector walks the live market sources in order and
//! falls back to the simulator when none of them answers.

pub mod metrics;
pub mod simulator;
pub mod sources;
pub mod tariffs;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::district::District;
use crate::error::{CollectorError, SourceError};
use crate::http::Client;
use crate::model::{Cell, DataKind, DatasetCollector, Record, Table};
use sources::HourlyPrice;
use tariffs::TariffPeriod;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    PrecioDeLaLuz,
    Ree,
    Omie,
    Simulated,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PriceSource::PrecioDeLaLuz => write!(f, "preciodelaluz"),
            PriceSource::Ree => write!(f, "ree"),
            PriceSource::Omie => write!(f, "omie"),
            PriceSource::Simulated => write!(f, "simulado"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub fecha: NaiveDate,
    pub hora: u32,
    pub distrito: District,
    pub precio_base: f64,
    pub precio_distrito: f64,
    pub periodo: TariffPeriod,
    pub precio_mercado: f64,
    pub margen_distrito: f64,
    pub fuente: PriceSource,
}

impl Record for PriceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "fecha",
        "hora",
        "distrito",
        "precio_base",
        "precio_distrito",
        "tipo_tarifa",
        "precio_mercado",
        "margen_distrito",
        "fuente",
    ];

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.fecha.format("%Y-%m-%d").to_string()),
            Cell::from(self.hora),
            Cell::from(self.distrito.name()),
            Cell::from(self.precio_base),
            Cell::from(self.precio_distrito),
            Cell::from(self.periodo.to_string()),
            Cell::from(self.precio_mercado),
            Cell::from(self.margen_distrito),
            Cell::from(self.fuente.to_string()),
        ]
    }
}

pub struct ElectricityCollector {
    client: Arc<Client>,
    preciodelaluz_base: String,
    ree_prices_url: String,
    omie_base: String,
    days_back: u32,
    day_delay: Duration,
}

impl ElectricityCollector {
    pub fn new(client: Arc<Client>, endpoints: &EndpointConfig, days_back: u32) -> Self {
        Self {
            client,
            preciodelaluz_base: endpoints.preciodelaluz_base.clone(),
            ree_prices_url: endpoints.ree_prices_url.clone(),
            omie_base: endpoints.omie_base.clone(),
            days_back,
            day_delay: Duration::ZERO,
        }
    }

    pub fn with_day_delay(mut self, delay: Duration) -> Self {
        self.day_delay = delay;
        self
    }

    async fn fetch_preciodelaluz(&self, date: NaiveDate) -> Result<Vec<HourlyPrice>, SourceError> {
        let url = format!(
            "{}/{}",
            self.preciodelaluz_base.trim_end_matches('/'),
            date.format("%Y-%m-%d")
        );
        let value = self
            .client
            .get_json(&url, &[("User-Agent", BROWSER_USER_AGENT)], &[])
            .await?;
        Ok(sources::parse_preciodelaluz(&value))
    }

    async fn fetch_ree(&self, date: NaiveDate) -> Result<Vec<HourlyPrice>, SourceError> {
        let query = [
            ("start_date", date.format("%Y-%m-%dT00:00:00Z").to_string()),
            ("end_date", date.format("%Y-%m-%dT23:59:59Z").to_string()),
        ];
        let headers = [
            ("Accept", "application/json; application/vnd.esios-api-v1+json"),
            ("Content-Type", "application/json"),
        ];
        let value = self
            .client
            .get_json(&self.ree_prices_url, &headers, &query)
            .await?;
        Ok(sources::parse_ree(&value))
    }

    async fn fetch_omie(&self, date: NaiveDate) -> Result<Vec<HourlyPrice>, SourceError> {
        let query = [
            ("parents[0]", "marginalpdbc".to_string()),
            ("filename", format!("marginalpdbc_{}.1", date.format("%Y%m%d"))),
        ];
        let body = self.client.get_with(&self.omie_base, &[], &query).await?;
        Ok(sources::parse_omie(&body, date))
    }

    /// Market prices from the first live source that has any for `date`.
    pub async fn real_prices(&self, date: NaiveDate) -> Option<(PriceSource, Vec<HourlyPrice>)> {
        for source in [PriceSource::PrecioDeLaLuz, PriceSource::Ree, PriceSource::Omie] {
            let result = match source {
                PriceSource::PrecioDeLaLuz => self.fetch_preciodelaluz(date).await,
                PriceSource::Ree => self.fetch_ree(date).await,
                PriceSource::Omie => self.fetch_omie(date).await,
                PriceSource::Simulated => continue,
            };
            match result {
                Ok(prices) if !prices.is_empty() => {
                    tracing::info!(%date, source = %source, "Got real electricity prices");
                    return Some((source, prices));
                }
                Ok(_) => tracing::debug!(%date, source = %source, "No prices returned"),
                Err(e) => tracing::warn!(%date, source = %source, "Price source failed: {}", e),
            }
        }
        None
    }

    pub async fn prices_for(&self, date: NaiveDate) -> Vec<PriceRecord> {
        match self.real_prices(date).await {
            Some((source, prices)) => sources::fan_out(date, &prices, source),
            None => {
                tracing::info!(%date, "Simulating electricity prices");
                simulator::simulate_day(date)
            }
        }
    }

    /// Today and the `days_back - 1` days before it, newest first.
    pub async fn historical_prices(&self) -> Vec<PriceRecord> {
        let today = Local::now().date_naive();
        let mut records = Vec::new();
        for i in 0..self.days_back {
            if i > 0 && !self.day_delay.is_zero() {
                tokio::time::sleep(self.day_delay).await;
            }
            let date = today - ChronoDuration::days(i64::from(i));
            records.extend(self.prices_for(date).await);
        }
        records
    }
}

#[async_trait]
impl DatasetCollector for ElectricityCollector {
    fn kind(&self) -> DataKind {
        DataKind::Electricity
    }

    async fn collect(&self) -> Result<Table, CollectorError> {
        Ok(Table::from_records(&self.historical_prices().await))
    }
}
