//! Payloads captured from the remote sources, trimmed to a few entries.

/// Madrid real-time air quality feed, JSON-LD `@graph` form.
pub const AIR_REALTIME_JSON: &str = r#"{
  "@context": {"c": "http://www.w3.org/2002/12/cal#"},
  "@graph": [
    {
      "@id": "https://datos.madrid.es/egob/catalogo/aire/estacion/28079004",
      "id": "https://datos.madrid.es/egob/catalogo/aire/estacion/28079004",
      "title": "Plaza del Carmen",
      "NO2": 52,
      "PM2.5": 12.5
    },
    {
      "title": "Barajas Pueblo",
      "O3": 90
    }
  ]
}"#;

/// Open data portal CSV export: semicolons, comma decimals and a few rows
/// that must be skipped (bad date, station outside Madrid).
pub const AIR_PORTAL_CSV: &str = "fecha;estacion;no2;pm10
15/01/2024;Retiro;41,5;18
16/01/2024;Retiro;-3;22
ayer;Retiro;1;1
15/01/2024;Alcobendas;5;5
2024-01-15;Usera;20;10
";

/// REE PVPC indicator 1001, in EUR/MWh with local timestamps.
pub const REE_PRICES_JSON: &str = r#"{
  "indicator": {
    "name": "Término de facturación de energía activa del PVPC 2.0TD",
    "short_name": "PVPC T. 2.0TD",
    "id": 1001,
    "values": [
      {"value": 90.2, "datetime": "2024-03-12T00:00:00.000+01:00", "geo_id": 8741, "geo_name": "Península"},
      {"value": 85.75, "datetime": "2024-03-12T01:00:00.000+01:00", "geo_id": 8741, "geo_name": "Península"},
      {"value": 160.5, "datetime": "2024-03-12T20:00:00.000+01:00", "geo_id": 8741, "geo_name": "Península"}
    ]
  }
}"#;

/// OMIE `marginalpdbc` day-ahead file for 2024-03-12.
pub const OMIE_MARGINALPDBC: &str = "MARGINALPDBC;
2024;03;12;1;62.50;62.50;
2024;03;12;2;60.10;60.10;
2024;03;12;24;70.00;71.25;
*
";

/// OpenWeather One Call `timemachine` response.
pub const OPENWEATHER_TIMEMACHINE_JSON: &str = r#"{
  "lat": 40.4168,
  "lon": -3.7038,
  "timezone": "Europe/Madrid",
  "current": {
    "dt": 1712059200,
    "temp": 18.4,
    "humidity": 52,
    "pressure": 1016,
    "wind_speed": 3.1,
    "wind_deg": 220,
    "clouds": 40,
    "rain": {"1h": 0.6},
    "uvi": 4.1
  }
}"#;

/// e·sios `/indicators` catalogue.
pub const ESIOS_INDICATORS_JSON: &str = r#"{
  "indicators": [
    {"id": 1293, "name": "Demanda real", "description": "Valor real de la demanda de energía eléctrica medida en tiempo real"},
    {"id": 573, "name": "Precio medio de la demanda en los SNP", "description": "Precio medio ponderado"},
    {"id": 1, "name": "Generación programada PBF Hidráulica", "description": "Programa base de funcionamiento hidráulico"}
  ]
}"#;

/// e·sios `/indicators/1293` with two peninsular values.
pub const ESIOS_INDICATOR_JSON: &str = r#"{
  "indicator": {
    "id": 1293,
    "name": "Demanda real",
    "unit": "MW",
    "type": "Demanda",
    "description": "Valor real de la demanda de energía eléctrica medida en tiempo real",
    "values": [
      {"value": 28150.5, "datetime": "2024-03-12T00:00:00.000+01:00", "geo_id": 8741, "geo_name": "Península"},
      {"value": 27000, "datetime": "2024-03-12T00:05:00.000+01:00", "geo_id": 8741, "geo_name": "Península"}
    ]
  }
}"#;
