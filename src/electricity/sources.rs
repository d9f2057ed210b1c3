//! Parsers for the live wholesale price sources.
//!
//! All three report €/MWh; prices are converted to €/kWh here.

use chrono::{DateTime, NaiveDate, Timelike};
use serde_json::Value;

use super::tariffs::{tariff, TariffPeriod};
use super::{PriceRecord, PriceSource};
use crate::district::District;
use crate::stats::round;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyPrice {
    pub hour: u32,
    /// €/kWh
    pub price: f64,
}

fn mwh_to_kwh(value: f64) -> f64 {
    value / 1000.0
}

fn leading_hour(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|h| u32::try_from(h).ok()),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
        _ => None,
    }
    .filter(|h| *h < 24)
}

/// A JSON array of `{hour, price}` objects.
pub fn parse_preciodelaluz(value: &Value) -> Vec<HourlyPrice> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let hour = leading_hour(entry.get("hour")?)?;
                    let price = entry.get("price")?.as_f64()?;
                    Some(HourlyPrice {
                        hour,
                        price: mwh_to_kwh(price),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `indicator.values[]` of an ESIOS indicator; the hour is read from the
/// RFC 3339 `datetime` in its own offset.
pub fn parse_ree(value: &Value) -> Vec<HourlyPrice> {
    let Some(values) = value
        .get("indicator")
        .and_then(|i| i.get("values"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|v| {
            let datetime = DateTime::parse_from_rfc3339(v.get("datetime")?.as_str()?).ok()?;
            let price = v.get("value")?.as_f64()?;
            Some(HourlyPrice {
                hour: datetime.hour(),
                price: mwh_to_kwh(price),
            })
        })
        .collect()
}

/// OMIE `marginalpdbc` day-ahead file.
///
/// Data lines read `year;month;day;period;price_pt;price_es;`. Only lines
/// for `date` are kept, period `n` is hour `n - 1` and the Spanish price is
/// used. The header and the trailing `*` line are ignored.
pub fn parse_omie(body: &str, date: NaiveDate) -> Vec<HourlyPrice> {
    body.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() < 6 {
                return None;
            }
            let year: i32 = fields[0].parse().ok()?;
            let month: u32 = fields[1].parse().ok()?;
            let day: u32 = fields[2].parse().ok()?;
            if NaiveDate::from_ymd_opt(year, month, day)? != date {
                return None;
            }
            let period: u32 = fields[3].parse().ok()?;
            let price: f64 = fields[5].replace(',', ".").parse().ok()?;
            Some(HourlyPrice {
                hour: period.checked_sub(1).filter(|h| *h < 24)?,
                price: mwh_to_kwh(price),
            })
        })
        .collect()
}

/// Applies every district's peak or valley multiplier to the market prices.
pub fn fan_out(date: NaiveDate, prices: &[HourlyPrice], source: PriceSource) -> Vec<PriceRecord> {
    let mut records = Vec::with_capacity(prices.len() * District::ALL.len());
    for p in prices {
        let period = TariffPeriod::for_hour(p.hour);
        for district in District::all() {
            let district_price = p.price * tariff(district).multiplier(period);
            records.push(PriceRecord {
                fecha: date,
                hora: p.hour,
                distrito: district,
                precio_base: round(p.price, 4),
                precio_distrito: round(district_price, 4),
                periodo: period,
                precio_mercado: round(p.price, 4),
                margen_distrito: round(district_price - p.price, 4),
                fuente: source,
            });
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 12).unwrap()
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_parse_preciodelaluz() {
            let value = json!([
                {"hour": 0, "price": 85.5},
                {"hour": "21-22", "price": 140.0}
            ]);
            let prices = parse_preciodelaluz(&value);
            assert_eq!(
                prices,
                vec![
                    HourlyPrice { hour: 0, price: 0.0855 },
                    HourlyPrice { hour: 21, price: 0.14 },
                ]
            );
        }

        #[test]
        fn test_parse_ree_uses_local_hour() {
            let value: Value = serde_json::from_str(fixtures::REE_PRICES_JSON).unwrap();
            let prices = parse_ree(&value);
            assert_eq!(prices.len(), 3);
            assert_eq!(prices[0].hour, 0);
            assert_eq!(prices[2].hour, 20);
            assert_eq!(prices[2].price, 0.1605);
        }

        #[test]
        fn test_parse_omie_file() {
            let prices = parse_omie(fixtures::OMIE_MARGINALPDBC, date());
            assert_eq!(prices.len(), 3);
            assert_eq!(prices[0], HourlyPrice { hour: 0, price: 0.0625 });
            assert_eq!(prices[2].hour, 23);
        }

        #[test]
        fn test_fan_out_applies_multipliers() {
            let records = fan_out(
                date(),
                &[
                    HourlyPrice { hour: 3, price: 0.1 },
                    HourlyPrice { hour: 19, price: 0.2 },
                ],
                PriceSource::Ree,
            );
            assert_eq!(records.len(), 42);

            let centro_night = &records[0];
            assert_eq!(centro_night.distrito, District::Centro);
            assert_eq!(centro_night.periodo, TariffPeriod::Valle);
            assert_eq!(centro_night.precio_distrito, 0.07);
            assert_eq!(centro_night.margen_distrito, -0.03);

            let centro_peak = &records[21];
            assert_eq!(centro_peak.periodo, TariffPeriod::Punta);
            assert_eq!(centro_peak.precio_distrito, 0.28);
            assert_eq!(centro_peak.fuente, PriceSource::Ree);
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_preciodelaluz_not_an_array() {
            assert!(parse_preciodelaluz(&json!({"00-01": {"price": 80}})).is_empty());
            assert!(parse_preciodelaluz(&json!([{"hour": 25, "price": 80}])).is_empty());
        }

        #[test]
        fn test_ree_without_values() {
            assert!(parse_ree(&json!({"indicator": {"name": "PVPC"}})).is_empty());
            assert!(parse_ree(&json!({"indicator": {"values": [{"datetime": "ayer", "value": 1}]}}))
                .is_empty());
        }

        #[test]
        fn test_omie_other_day_or_garbage() {
            let other = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
            assert!(parse_omie(fixtures::OMIE_MARGINALPDBC, other).is_empty());
            assert!(parse_omie("<html>not found</html>", date()).is_empty());
        }
    }
}
