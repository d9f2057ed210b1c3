use std::fmt;

use crate::district::District;
use crate::error::CollectorError;
use crate::model::{Cell, Record};
use crate::stats::round;

pub const PEAK_START_HOUR: u32 = 8;
pub const PEAK_END_HOUR: u32 = 22;

/// Monthly household consumption used for the per-district cost table.
pub const REFERENCE_CONSUMPTION_KWH: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    /// €/kWh
    pub base_price: f64,
    pub peak_multiplier: f64,
    pub off_peak_multiplier: f64,
    pub efficiency_factor: f64,
}

impl Tariff {
    pub fn multiplier(&self, period: TariffPeriod) -> f64 {
        match period {
            TariffPeriod::Punta => self.peak_multiplier,
            TariffPeriod::Valle => self.off_peak_multiplier,
        }
    }
}

/// Tariff for a district. Central districts with older buildings pay more
/// and swing harder between peak and valley.
pub fn tariff(district: District) -> Tariff {
    let (base_price, peak_multiplier, off_peak_multiplier, efficiency_factor) = match district {
        District::Centro => (0.125, 1.4, 0.7, 0.8),
        District::Arganzuela => (0.123, 1.3, 0.75, 0.85),
        District::Retiro => (0.127, 1.5, 0.65, 0.75),
        District::Salamanca => (0.130, 1.6, 0.6, 0.7),
        District::Chamartin => (0.128, 1.4, 0.7, 0.8),
        District::Tetuan => (0.124, 1.3, 0.75, 0.85),
        District::Chamberi => (0.126, 1.4, 0.7, 0.8),
        District::FuencarralElPardo => (0.120, 1.2, 0.8, 0.9),
        District::MoncloaAravaca => (0.122, 1.3, 0.75, 0.85),
        District::Latina => (0.118, 1.2, 0.8, 0.9),
        District::Carabanchel => (0.116, 1.1, 0.85, 0.95),
        District::Usera => (0.117, 1.2, 0.8, 0.9),
        District::PuenteDeVallecas => (0.115, 1.1, 0.85, 0.95),
        District::Moratalaz => (0.117, 1.2, 0.8, 0.9),
        District::CiudadLineal => (0.119, 1.2, 0.8, 0.9),
        District::Hortaleza => (0.119, 1.2, 0.8, 0.9),
        District::Villaverde => (0.114, 1.1, 0.85, 0.95),
        District::VillaDeVallecas => (0.114, 1.1, 0.85, 0.95),
        District::Vicalvaro => (0.116, 1.1, 0.85, 0.95),
        District::SanBlasCanillejas => (0.117, 1.2, 0.8, 0.9),
        District::Barajas => (0.115, 1.1, 0.85, 0.95),
    };
    Tariff {
        base_price,
        peak_multiplier,
        off_peak_multiplier,
        efficiency_factor,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffPeriod {
    Punta,
    Valle,
}

impl TariffPeriod {
    /// Hours 08 to 22 inclusive are peak.
    pub fn for_hour(hour: u32) -> Self {
        if (PEAK_START_HOUR..=PEAK_END_HOUR).contains(&hour) {
            TariffPeriod::Punta
        } else {
            TariffPeriod::Valle
        }
    }
}

impl fmt::Display for TariffPeriod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TariffPeriod::Punta => write!(f, "punta"),
            TariffPeriod::Valle => write!(f, "valle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub distrito: District,
    pub consumo_total_kwh: f64,
    pub consumo_punta_kwh: f64,
    pub consumo_valle_kwh: f64,
    pub coste_punta_euros: f64,
    pub coste_valle_euros: f64,
    pub coste_total_euros: f64,
    pub precio_medio_euros_kwh: f64,
}

impl Record for CostEstimate {
    const COLUMNS: &'static [&'static str] = &[
        "distrito",
        "consumo_total_kwh",
        "consumo_punta_kwh",
        "consumo_valle_kwh",
        "coste_punta_euros",
        "coste_valle_euros",
        "coste_total_euros",
        "precio_medio_euros_kwh",
    ];

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.distrito.name()),
            Cell::from(self.consumo_total_kwh),
            Cell::from(round(self.consumo_punta_kwh, 2)),
            Cell::from(round(self.consumo_valle_kwh, 2)),
            Cell::from(self.coste_punta_euros),
            Cell::from(self.coste_valle_euros),
            Cell::from(self.coste_total_euros),
            Cell::from(self.precio_medio_euros_kwh),
        ]
    }
}

/// Hours per day in the peak window, both ends included.
pub fn peak_hours() -> u32 {
    PEAK_END_HOUR - PEAK_START_HOUR + 1
}

/// Cost of `consumption_kwh` in every district, split between peak and
/// valley by the length of the tariff windows.
pub fn cost_estimates(consumption_kwh: f64) -> Result<Vec<CostEstimate>, CollectorError> {
    let peak = peak_hours();
    District::all()
        .map(|d| estimate_consumption_cost(consumption_kwh, d.name(), peak, 24 - peak))
        .collect()
}

/// Splits `consumption_kwh` between peak and valley in proportion to the
/// hours of each per day and prices both at the district tariff.
pub fn estimate_consumption_cost(
    consumption_kwh: f64,
    district: &str,
    peak_hours: u32,
    valley_hours: u32,
) -> Result<CostEstimate, CollectorError> {
    let distrito = District::normalize(district)
        .ok_or_else(|| CollectorError::UnknownDistrict(district.to_string()))?;
    if consumption_kwh <= 0.0 {
        return Err(CollectorError::ValidationFailed(format!(
            "consumption must be positive, got {}",
            consumption_kwh
        )));
    }
    let t = tariff(distrito);

    let consumo_punta_kwh = consumption_kwh * f64::from(peak_hours) / 24.0;
    let consumo_valle_kwh = consumption_kwh * f64::from(valley_hours) / 24.0;
    let cost_peak = consumo_punta_kwh * t.base_price * t.peak_multiplier;
    let cost_valley = consumo_valle_kwh * t.base_price * t.off_peak_multiplier;
    let total = cost_peak + cost_valley;

    Ok(CostEstimate {
        distrito,
        consumo_total_kwh: consumption_kwh,
        consumo_punta_kwh,
        consumo_valle_kwh,
        coste_punta_euros: round(cost_peak, 2),
        coste_valle_euros: round(cost_valley, 2),
        coste_total_euros: round(total, 2),
        precio_medio_euros_kwh: round(total / consumption_kwh, 4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod succeeds {
        use super::*;

        #[test]
        fn test_peak_window_is_inclusive() {
            assert_eq!(TariffPeriod::for_hour(7), TariffPeriod::Valle);
            assert_eq!(TariffPeriod::for_hour(8), TariffPeriod::Punta);
            assert_eq!(TariffPeriod::for_hour(22), TariffPeriod::Punta);
            assert_eq!(TariffPeriod::for_hour(23), TariffPeriod::Valle);
            assert_eq!(TariffPeriod::Punta.to_string(), "punta");
        }

        #[test]
        fn test_tariff_lookup() {
            let t = tariff(District::Salamanca);
            assert_eq!(t.base_price, 0.130);
            assert_eq!(t.multiplier(TariffPeriod::Punta), 1.6);
            assert_eq!(t.multiplier(TariffPeriod::Valle), 0.6);
        }

        #[test]
        fn test_cost_estimate_for_centro() {
            let estimate = estimate_consumption_cost(1000.0, "Centro", 8, 16).unwrap();

            // 333.33 kWh × 0.125 × 1.4 and 666.67 kWh × 0.125 × 0.7
            assert_eq!(estimate.distrito, District::Centro);
            assert_eq!(estimate.coste_punta_euros, 58.33);
            assert_eq!(estimate.coste_valle_euros, 58.33);
            assert_eq!(estimate.coste_total_euros, 116.67);
            assert_eq!(estimate.precio_medio_euros_kwh, 0.1167);
            assert!((estimate.consumo_valle_kwh - 666.666_666).abs() < 1e-3);
        }

        #[test]
        fn test_cost_estimates_cover_every_district() {
            let estimates = cost_estimates(REFERENCE_CONSUMPTION_KWH).unwrap();
            assert_eq!(peak_hours(), 15);
            assert_eq!(estimates.len(), 21);

            // 625 kWh × 0.125 × 1.4 and 375 kWh × 0.125 × 0.7
            let centro = &estimates[0];
            assert_eq!(centro.distrito, District::Centro);
            assert_eq!(centro.coste_punta_euros, 109.38);
            assert_eq!(centro.coste_valle_euros, 32.81);
            assert_eq!(centro.coste_total_euros, 142.19);

            let row = centro.to_row();
            assert_eq!(row.len(), CostEstimate::COLUMNS.len());
            assert_eq!(row[2], Cell::Float(625.0));
        }

        #[test]
        fn test_cost_estimate_accepts_loose_names() {
            let estimate = estimate_consumption_cost(100.0, "villa de vallecas", 8, 16).unwrap();
            assert_eq!(estimate.distrito, District::VillaDeVallecas);
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_unknown_district() {
            let err = estimate_consumption_cost(1000.0, "Alcobendas", 8, 16).unwrap_err();
            assert!(matches!(err, CollectorError::UnknownDistrict(name) if name == "Alcobendas"));
        }

        #[test]
        fn test_non_positive_consumption() {
            assert!(matches!(
                estimate_consumption_cost(0.0, "Centro", 8, 16),
                Err(CollectorError::ValidationFailed(_))
            ));
            assert!(cost_estimates(-1.0).is_err());
        }
    }
}
