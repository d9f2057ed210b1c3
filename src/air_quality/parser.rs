use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::index::{Pollutant, Pollutants};
use super::{AirQualityRecord, AirSource};
use crate::district::{strip_accents, District};
use crate::error::SourceError;

/// Monitoring station codes with a known district.
pub fn station_district(code: &str) -> Option<District> {
    let district = match code {
        "28079001" | "28079002" | "28079004" => District::Centro,
        "28079003" | "28079035" => District::Arganzuela,
        "28079036" | "28079008" => District::Retiro,
        "28079009" => District::Salamanca,
        "28079038" | "28079010" => District::Chamartin,
        "28079011" => District::Chamberi,
        "28079012" => District::MoncloaAravaca,
        "28079013" => District::Usera,
        "28079014" => District::PuenteDeVallecas,
        "28079015" => District::CiudadLineal,
        "28079016" => District::Hortaleza,
        "28079017" => District::Villaverde,
        "28079018" => District::SanBlasCanillejas,
        _ => return None,
    };
    Some(district)
}

// Longer keywords come first so "villa de vallecas" wins over "vallecas".
const STATION_KEYWORDS: &[(&str, District)] = &[
    ("villa de vallecas", District::VillaDeVallecas),
    ("centro", District::Centro),
    ("castilla", District::Chamartin),
    ("retiro", District::Retiro),
    ("vallecas", District::PuenteDeVallecas),
    ("villaverde", District::Villaverde),
    ("barajas", District::Barajas),
    ("carabanchel", District::Carabanchel),
    ("usera", District::Usera),
    ("latina", District::Latina),
    ("moncloa", District::MoncloaAravaca),
    ("chamberi", District::Chamberi),
    ("tetuan", District::Tetuan),
    ("salamanca", District::Salamanca),
    ("arganzuela", District::Arganzuela),
    ("fuencarral", District::FuencarralElPardo),
    ("hortaleza", District::Hortaleza),
    ("ciudad lineal", District::CiudadLineal),
    ("moratalaz", District::Moratalaz),
    ("vicalvaro", District::Vicalvaro),
    ("san blas", District::SanBlasCanillejas),
    ("canillejas", District::SanBlasCanillejas),
];

/// Maps a station name to a district by keyword, ignoring case and accents.
pub fn district_from_station_name(name: &str) -> Option<District> {
    let key = strip_accents(&name.to_lowercase());
    STATION_KEYWORDS
        .iter()
        .find(|(keyword, _)| key.contains(keyword))
        .map(|(_, district)| *district)
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses the real-time feed, a `@graph` array or a bare array of stations.
///
/// Stations that can't be placed in a district or that report no pollutant
/// are skipped. Every record is dated `today`.
pub fn parse_realtime_json(value: &Value, today: NaiveDate) -> Vec<AirQualityRecord> {
    let stations = match value.get("@graph").and_then(Value::as_array) {
        Some(graph) => graph.as_slice(),
        None => value.as_array().map(Vec::as_slice).unwrap_or_default(),
    };

    stations
        .iter()
        .filter_map(|station| {
            let code = match station.get("id").and_then(Value::as_str) {
                Some(id) => id.rsplit('/').next().map(str::to_string),
                None => json_text(station.get("codigo")),
            }
            .unwrap_or_default();
            let name = json_text(station.get("title"))
                .filter(|t| !t.is_empty())
                .or_else(|| json_text(station.get("nombre")))
                .unwrap_or_default();

            let district = station_district(&code).or_else(|| district_from_station_name(&name))?;

            let mut pollutants = Pollutants::default();
            for p in Pollutant::ALL {
                let lower = p.column().to_lowercase();
                let raw = station
                    .get(p.column())
                    .or_else(|| station.get(lower.as_str()))
                    .or_else(|| station.get(format!("valor_{}", lower).as_str()));
                pollutants.set(p, raw.and_then(json_number));
            }
            if !pollutants.any() {
                return None;
            }

            let estacion = (!name.is_empty()).then_some(name);
            Some(AirQualityRecord::new(
                today,
                district,
                pollutants,
                estacion,
                AirSource::Api,
            ))
        })
        .collect()
}

#[derive(Debug, Default)]
struct PortalColumns {
    date: Option<usize>,
    station: Option<usize>,
    pollutants: Vec<(Pollutant, usize)>,
}

impl PortalColumns {
    // a later matching header replaces an earlier one
    fn assign(&mut self, pollutant: Pollutant, index: usize) {
        self.pollutants.retain(|(p, _)| *p != pollutant);
        self.pollutants.push((pollutant, index));
    }
}

fn detect_columns(headers: &[String]) -> PortalColumns {
    let mut cols = PortalColumns::default();
    for (i, h) in headers.iter().enumerate() {
        let h = h.as_str();
        if h.contains("fecha") || h.contains("date") || h.contains("time") {
            cols.date = Some(i);
        } else if h.contains("estacion") || h.contains("station") || h.contains("punto") {
            cols.station = Some(i);
        } else if h.contains("no2") {
            cols.assign(Pollutant::No2, i);
        } else if h.contains("pm10") {
            cols.assign(Pollutant::Pm10, i);
        } else if h.contains("pm2") || h.contains("pm25") {
            cols.assign(Pollutant::Pm25, i);
        } else if h.contains("o3") || h.contains("ozono") {
            cols.assign(Pollutant::O3, i);
        } else if h.contains("so2") {
            cols.assign(Pollutant::So2, i);
        } else if h.contains("co") {
            cols.assign(Pollutant::Co, i);
        }
    }
    cols
}

fn sniff_delimiter(body: &str) -> u8 {
    let first = body.lines().next().unwrap_or_default();
    if first.matches(';').count() > first.matches(',').count() {
        b';'
    } else {
        b','
    }
}

/// Date in `YYYY-MM-DD`, `DD/MM/YYYY` or either with a time part.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(d);
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn parse_concentration(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parses the real-time CSV export.
///
/// Column roles are detected from lowercased header keywords. Rows with an
/// unreadable date, an unknown station, or no valid concentration are skipped,
/// and negative readings are dropped.
pub fn parse_portal_csv(body: &str) -> Result<Vec<AirQualityRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(body))
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let cols = detect_columns(&headers);
    let (Some(date_col), Some(station_col)) = (cols.date, cols.station) else {
        tracing::warn!("No date or station column found in the air quality CSV");
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!("Skipping malformed CSV row: {}", e);
                continue;
            }
        };
        let Some(fecha) = row.get(date_col).and_then(parse_date) else {
            continue;
        };
        let station = row.get(station_col).unwrap_or_default().trim().to_string();
        let Some(district) = district_from_station_name(&station) else {
            continue;
        };

        let mut pollutants = Pollutants::default();
        for (p, i) in &cols.pollutants {
            pollutants.set(*p, row.get(*i).and_then(parse_concentration));
        }
        if pollutants.any() {
            records.push(AirQualityRecord::new(
                fecha,
                district,
                pollutants,
                Some(station),
                AirSource::Csv,
            ));
        }
    }
    Ok(records)
}
