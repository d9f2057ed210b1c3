//! Synthetic hourly electricity prices shaped on the Spanish wholesale market.
//!
//! A day's hourly base price is the monthly average scaled by a weekday
//! volatility factor, an hourly demand curve and a calendar event factor,
//! with 8 % Gaussian noise. Each district then applies its peak or valley
//! multiplier plus 2 % noise of its own.

use chrono::{Datelike, NaiveDate};

use super::tariffs::{tariff, TariffPeriod};
use super::{PriceRecord, PriceSource};
use crate::district::District;
use crate::stats::round;
use crate::synthetic::{normal, seeded_rng};

pub const MIN_PRICE: f64 = 0.01;

/// Average €/kWh per month.
pub fn monthly_base_price(month: u32) -> f64 {
    match month {
        1 => 0.135,
        2 => 0.128,
        3 => 0.118,
        4 => 0.105,
        5 => 0.098,
        6 => 0.102,
        7 => 0.115,
        8 => 0.125,
        9 => 0.112,
        10 => 0.108,
        11 => 0.115,
        12 => 0.130,
        _ => 0.120,
    }
}

/// Monday = 0 … Sunday = 6.
pub fn weekday_volatility(weekday_from_monday: u32) -> f64 {
    const FACTORS: [f64; 7] = [0.95, 1.05, 1.08, 1.10, 1.12, 1.05, 0.90];
    FACTORS.get(weekday_from_monday as usize).copied().unwrap_or(1.0)
}

/// Demand shape over the day; the evening peak tops out at 20h.
pub fn hourly_pattern(hour: u32) -> f64 {
    const PATTERN: [f64; 24] = [
        0.45, 0.38, 0.35, 0.32, 0.38, 0.45, 0.65, 0.80, 1.15, 1.25, 1.10, 1.05, 1.08, 1.20, 1.30,
        1.25, 1.15, 1.10, 1.35, 1.50, 1.65, 1.45, 1.20, 0.85,
    ];
    PATTERN.get(hour as usize).copied().unwrap_or(1.0)
}

const HOLIDAY_DAYS: [u32; 4] = [1, 6, 15, 25];
const HEAT_WAVE_MONTHS: [u32; 2] = [7, 8];
const COLD_SPELL_MONTHS: [u32; 3] = [1, 2, 12];

/// Holidays lower prices; heat waves and cold spells raise them.
pub fn event_factor(date: NaiveDate) -> f64 {
    if HOLIDAY_DAYS.contains(&date.day()) {
        0.85
    } else if HEAT_WAVE_MONTHS.contains(&date.month()) {
        1.15
    } else if COLD_SPELL_MONTHS.contains(&date.month()) {
        1.20
    } else {
        1.0
    }
}

/// 24 × 21 records for `date`, reproducible for the same date.
pub fn simulate_day(date: NaiveDate) -> Vec<PriceRecord> {
    let mut rng = seeded_rng(&date.format("%Y-%m-%d").to_string());

    let day_factor = monthly_base_price(date.month())
        * weekday_volatility(date.weekday().num_days_from_monday())
        * event_factor(date);
    let hourly: Vec<f64> = (0..24)
        .map(|hour| {
            let volatility = normal(&mut rng, 0.0, 0.08);
            round((day_factor * hourly_pattern(hour) * (1.0 + volatility)).max(MIN_PRICE), 4)
        })
        .collect();

    let mut records = Vec::with_capacity(24 * District::ALL.len());
    for district in District::all() {
        let t = tariff(district);
        for (hour, &base) in (0u32..).zip(&hourly) {
            let period = TariffPeriod::for_hour(hour);
            let noise = normal(&mut rng, 1.0, 0.02);
            let district_price = (base * t.multiplier(period) * noise).max(MIN_PRICE);
            records.push(PriceRecord {
                fecha: date,
                hora: hour,
                distrito: district,
                precio_base: base,
                precio_distrito: round(district_price, 4),
                periodo: period,
                precio_mercado: base,
                margen_distrito: round(district_price - base, 4),
                fuente: PriceSource::Simulated,
            });
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_full_grid_for_one_day() {
            let records = simulate_day(day(2024, 3, 12));
            assert_eq!(records.len(), 24 * 21);
            assert_eq!(records[0].distrito, District::Centro);
            assert_eq!(records[0].hora, 0);
            assert_eq!(records[23].hora, 23);
            assert!(records.iter().all(|r| r.fuente == PriceSource::Simulated));
        }

        #[test]
        fn test_same_date_reproduces() {
            assert_eq!(simulate_day(day(2024, 3, 12)), simulate_day(day(2024, 3, 12)));
            assert_ne!(
                simulate_day(day(2024, 3, 12))[0].precio_base,
                simulate_day(day(2024, 3, 13))[0].precio_base
            );
        }

        #[test]
        fn test_prices_floor_and_rounding() {
            for r in simulate_day(day(2024, 1, 1)) {
                assert!(r.precio_base >= MIN_PRICE);
                assert!(r.precio_distrito >= MIN_PRICE);
                assert!((r.precio_distrito * 1e4 - (r.precio_distrito * 1e4).round()).abs() < 1e-6);
            }
        }

        #[test]
        fn test_base_price_shared_by_districts() {
            let records = simulate_day(day(2024, 5, 20));
            let hour9: Vec<f64> = records
                .iter()
                .filter(|r| r.hora == 9)
                .map(|r| r.precio_base)
                .collect();
            assert_eq!(hour9.len(), 21);
            assert!(hour9.windows(2).all(|w| w[0] == w[1]));
        }

        #[test]
        fn test_evening_costs_more_than_night() {
            let records = simulate_day(day(2024, 10, 9));
            let avg = |hour: u32| {
                let v: Vec<f64> = records
                    .iter()
                    .filter(|r| r.hora == hour)
                    .map(|r| r.precio_distrito)
                    .collect();
                v.iter().sum::<f64>() / v.len() as f64
            };
            assert!(avg(20) > avg(3));
        }

        #[test]
        fn test_event_factor_precedence() {
            // a holiday in a cold-spell month is still a holiday
            assert_eq!(event_factor(day(2024, 1, 6)), 0.85);
            assert_eq!(event_factor(day(2024, 7, 10)), 1.15);
            assert_eq!(event_factor(day(2024, 12, 10)), 1.20);
            assert_eq!(event_factor(day(2024, 4, 10)), 1.0);
        }

        #[test]
        fn test_lookup_tables() {
            assert_eq!(monthly_base_price(5), 0.098);
            assert_eq!(weekday_volatility(4), 1.12);
            assert_eq!(hourly_pattern(20), 1.65);
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_out_of_range_lookups_are_neutral() {
            assert_eq!(weekday_volatility(9), 1.0);
            assert_eq!(hourly_pattern(24), 1.0);
            assert_eq!(monthly_base_price(13), 0.120);
        }
    }
}
