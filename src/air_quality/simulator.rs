//! Synthetic daily pollutant series for a district and year.
//!
//! Used when neither the real-time API nor the CSV portal has data for a
//! district. Concentrations start from the Madrid reference means and are
//! shaped by season, weekday traffic, a slow yearly wave and log-normal noise.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use std::f64::consts::PI;

use super::index::{Pollutant, Pollutants};
use super::{AirQualityRecord, AirSource};
use crate::district::District;
use crate::stats::round;
use crate::synthetic::{lognormal, normal, seeded_rng, uniform};

/// Traffic and density multiplier per district.
pub fn district_factor(district: District) -> f64 {
    match district {
        District::Centro => 1.10,
        District::Arganzuela => 1.05,
        District::Retiro => 0.95,
        District::Salamanca => 1.05,
        District::Chamartin => 0.95,
        District::Tetuan => 1.00,
        District::Chamberi => 1.00,
        District::FuencarralElPardo => 0.85,
        District::MoncloaAravaca => 0.90,
        District::Latina => 0.95,
        District::Carabanchel => 1.00,
        District::Usera => 1.05,
        District::PuenteDeVallecas => 1.10,
        District::Moratalaz => 0.95,
        District::CiudadLineal => 0.95,
        District::Hortaleza => 0.90,
        District::Villaverde => 1.05,
        District::VillaDeVallecas => 1.05,
        District::Vicalvaro => 0.95,
        District::SanBlasCanillejas => 0.95,
        District::Barajas => 0.85,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalFactors {
    pub no2: f64,
    pub pm: f64,
    pub o3: f64,
    pub so2: f64,
    pub co: f64,
}

pub fn seasonal_factors(month: u32) -> SeasonalFactors {
    match month {
        12 | 1 | 2 => SeasonalFactors {
            no2: 1.3,
            pm: 1.3,
            o3: 0.7,
            so2: 1.2,
            co: 1.2,
        },
        6..=8 => SeasonalFactors {
            no2: 0.8,
            pm: 0.8,
            o3: 1.5,
            so2: 0.9,
            co: 0.9,
        },
        _ => SeasonalFactors {
            no2: 1.0,
            pm: 1.0,
            o3: 1.0,
            so2: 1.0,
            co: 1.0,
        },
    }
}

/// Monday = 0 … Sunday = 6.
pub fn weekday_traffic_factor(weekday_from_monday: u32) -> f64 {
    match weekday_from_monday {
        0..=4 => 1.15,
        5 => 0.95,
        _ => 0.8,
    }
}

/// Draws one day of concentrations, clamped to `[0, 1.5 × reference max]`
/// and rounded to two decimals.
pub fn simulate_day<R: Rng + ?Sized>(rng: &mut R, district: District, date: NaiveDate) -> Pollutants {
    let factor = district_factor(district);
    let season = seasonal_factors(date.month());
    let traffic = weekday_traffic_factor(date.weekday().num_days_from_monday());
    let doy = f64::from(date.ordinal());
    let variation = 1.0 + 0.05 * (2.0 * PI * doy / 365.0).sin() + normal(rng, 0.0, 0.03);

    let mean = |p: Pollutant| p.reference().mean;

    let no2 = mean(Pollutant::No2) * factor * season.no2 * traffic * variation * lognormal(rng, 0.12);
    let pm10 = mean(Pollutant::Pm10) * factor * season.pm * traffic * variation * lognormal(rng, 0.15);
    let pm25 = pm10 * 0.6 * uniform(rng, 0.9, 1.1);
    let o3_adjustment = (1.0 - no2 / 100.0 * 0.3).max(0.5);
    let o3 = mean(Pollutant::O3) * season.o3 * o3_adjustment * variation * lognormal(rng, 0.18);
    let so2 = mean(Pollutant::So2) * season.so2 * factor * lognormal(rng, 0.25);
    let co = mean(Pollutant::Co) * factor * season.co * traffic * lognormal(rng, 0.10);

    let mut pollutants = Pollutants::default();
    for (p, raw) in [
        (Pollutant::No2, no2),
        (Pollutant::Pm10, pm10),
        (Pollutant::Pm25, pm25),
        (Pollutant::O3, o3),
        (Pollutant::So2, so2),
        (Pollutant::Co, co),
    ] {
        let capped = raw.max(0.0).min(p.reference().max * 1.5);
        pollutants.set(p, Some(round(capped, 2)));
    }
    pollutants
}

/// One record per calendar day of `year`, reproducible for `(district, year)`.
pub fn simulate_year(district: District, year: i32) -> Vec<AirQualityRecord> {
    let Some(start) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        tracing::warn!(year, "Cannot simulate air quality for an invalid year");
        return Vec::new();
    };
    let mut rng = seeded_rng(&format!("{}_{}", district.name(), year));

    start
        .iter_days()
        .take_while(|d| d.year() == year)
        .map(|date| {
            let pollutants = simulate_day(&mut rng, district, date);
            AirQualityRecord::new(date, district, pollutants, None, AirSource::Simulated)
        })
        .collect()
}
