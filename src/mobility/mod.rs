//! Public transport coverage per district.
//!
//! There is no live source here: metrics are derived from a static map of
//! the metro, Cercanías and EMT bus network serving each district.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;

use crate::district::District;
use crate::error::CollectorError;
use crate::model::{Cell, DataKind, DatasetCollector, Record, Table};
use crate::stats::round;

pub struct TransportNetwork {
    pub metro_stations: &'static [&'static str],
    pub cercanias_stations: &'static [&'static str],
    pub bus_lines: &'static [u16],
    pub accessibility_score: f64,
}

pub fn network(district: District) -> TransportNetwork {
    let (metro_stations, cercanias_stations, bus_lines, accessibility_score): (
        &'static [&'static str],
        &'static [&'static str],
        &'static [u16],
        f64,
    ) = match district {
        District::Centro => (
            &[
                "Sol",
                "Gran Vía",
                "Callao",
                "Santo Domingo",
                "Noviciado",
                "Tribunal",
                "Chueca",
                "Sevilla",
                "Banco de España",
                "Ópera",
                "La Latina",
                "Tirso de Molina",
                "Lavapiés",
                "Antón Martín",
            ],
            &["Sol"],
            &[3, 5, 9, 15, 20, 46, 50, 51, 52, 53, 150, 17, 18, 23, 31, 35],
            0.95,
        ),
        District::Arganzuela => (
            &[
                "Embajadores",
                "Acacias",
                "Pirámides",
                "Legazpi",
                "Delicias",
                "Palos de la Frontera",
                "Méndez Álvaro",
                "Arganzuela-Planetario",
            ],
            &["Embajadores", "Delicias", "Méndez Álvaro"],
            &[6, 8, 18, 19, 45, 47, 55, 59, 85, 86],
            0.9,
        ),
        District::Retiro => (
            &[
                "Retiro",
                "Ibiza",
                "Sainz de Baranda",
                "O'Donnell",
                "Príncipe de Vergara",
                "Menéndez Pelayo",
                "Pacífico",
                "Conde de Casal",
            ],
            &["Atocha"],
            &[2, 14, 19, 20, 26, 30, 32, 56, 63],
            0.88,
        ),
        District::Salamanca => (
            &[
                "Goya",
                "Lista",
                "Manuel Becerra",
                "Ventura Rodríguez",
                "Príncipe de Vergara",
                "Velázquez",
                "Serrano",
                "Núñez de Balboa",
                "Diego de León",
            ],
            &["Recoletos"],
            &[1, 2, 9, 12, 14, 19, 21, 26, 28, 43, 48, 53, 74, 143, 146, 152, 156],
            0.9,
        ),
        District::Chamartin => (
            &[
                "Chamartín",
                "Plaza de Castilla",
                "Duque de Pastrana",
                "Pío XII",
                "Bambú",
                "Colombia",
                "Cuzco",
            ],
            &["Chamartín", "Nuevos Ministerios"],
            &[5, 11, 14, 16, 27, 40, 147, 150, 129, 134, 135],
            0.95,
        ),
        District::Tetuan => (
            &[
                "Tetuán",
                "Valdeacederas",
                "Cuzco",
                "Plaza de Castilla",
                "Estrecho",
                "Alvarado",
            ],
            &[],
            &[11, 44, 66, 124, 126, 128, 149],
            0.85,
        ),
        District::Chamberi => (
            &[
                "Bilbao",
                "Iglesia",
                "Quevedo",
                "Canal",
                "Islas Filipinas",
                "Alonso Cano",
                "Ríos Rosas",
                "San Bernardo",
            ],
            &["Nuevos Ministerios"],
            &[3, 12, 16, 21, 37, 40, 61],
            0.9,
        ),
        District::FuencarralElPardo => (
            &[
                "Fuencarral",
                "Tres Olivos",
                "Montecarmelo",
                "Mirasierra",
                "Paco de Lucía",
                "Barrio del Pilar",
                "Begoña",
                "Herrera Oria",
                "Lacoma",
                "Avenida de la Ilustración",
                "Pitis",
            ],
            &["Pitis", "Ramón y Cajal", "Mirasierra-Paco de Lucía"],
            &[49, 64, 67, 83, 126, 128, 133, 134, 135, 147],
            0.8,
        ),
        District::MoncloaAravaca => (
            &[
                "Moncloa",
                "Argüelles",
                "Ciudad Universitaria",
                "Vicente Aleixandre",
                "Islas Filipinas",
                "Lago",
                "Batán",
                "Príncipe Pío",
            ],
            &["Príncipe Pío", "Aravaca"],
            &[1, 16, 21, 44, 46, 61, 82, 83, 132, 160, 161, 162],
            0.88,
        ),
        District::Latina => (
            &[
                "Alto de Extremadura",
                "Lucero",
                "Batán",
                "Campamento",
                "Casa de Campo",
                "Aluche",
                "Eugenia de Montijo",
                "Carpetana",
                "Laguna",
            ],
            &["Laguna", "Maestra Justa Freire-Polideportivo Aluche", "Aluche"],
            &[17, 25, 31, 39, 55, 65, 121, 131, 138],
            0.8,
        ),
        District::Carabanchel => (
            &[
                "Carabanchel",
                "Carabanchel Alto",
                "Eugenia de Montijo",
                "Oporto",
                "Vista Alegre",
                "Opañel",
                "Pan Bendito",
            ],
            &[],
            &[34, 35, 47, 81, 108, 118, 121],
            0.75,
        ),
        District::Usera => (
            &[
                "Plaza Elíptica",
                "Usera",
                "Almendrales",
                "Hospital 12 de Octubre",
                "San Fermín-Orcasur",
                "Legazpi",
            ],
            &["Doce de Octubre"],
            &[6, 18, 22, 23, 47, 59, 60, 78, 81],
            0.7,
        ),
        District::PuenteDeVallecas => (
            &[
                "Puente de Vallecas",
                "Nueva Numancia",
                "Portazgo",
                "Buenos Aires",
                "Alto del Arenal",
            ],
            &["El Pozo", "Asamblea de Madrid-Entrevías"],
            &[10, 24, 37, 54, 57, 58, 111, 102, 103, 136, 310],
            0.7,
        ),
        District::Moratalaz => (
            &["Vinateros", "Artilleros", "Pavones", "Estrella"],
            &[],
            &[20, 30, 32, 71, 100, 140],
            0.75,
        ),
        District::CiudadLineal => (
            &[
                "Ventas",
                "La Elipa",
                "El Carmen",
                "Quintana",
                "Pueblo Nuevo",
                "Ciudad Lineal",
                "Ascao",
                "Suanzes",
                "Torre Arias",
                "Barrio de la Concepción",
            ],
            &[],
            &[4, 21, 38, 48, 70, 106, 113, 146],
            0.8,
        ),
        District::Hortaleza => (
            &[
                "Pinar del Rey",
                "Hortaleza",
                "Parque de Santa María",
                "San Lorenzo",
                "Mar de Cristal",
                "Canillas",
                "Esperanza",
                "Manoteras",
            ],
            &["Fuente de la Mora"],
            &[7, 9, 29, 72, 73, 120, 122, 125, 172],
            0.8,
        ),
        District::Villaverde => (
            &["Villaverde Alto", "San Cristóbal", "Ciudad de los Ángeles"],
            &["Villaverde Alto", "Villaverde Bajo"],
            &[22, 76, 79, 85, 86, 123, 130, 131],
            0.72,
        ),
        District::VillaDeVallecas => (
            &[
                "Sierra de Guadalupe",
                "Congosto",
                "La Gavia",
                "Las Suertes",
                "Valdecarros",
                "Villa de Vallecas",
            ],
            &["Vallecas", "Santa Eugenia", "Sierra de Guadalupe"],
            &[54, 58, 63, 130, 142, 145],
            0.7,
        ),
        District::Vicalvaro => (
            &["Vicálvaro", "San Cipriano", "Puerta de Arganda"],
            &["Vicálvaro"],
            &[4, 71, 100, 106, 130],
            0.7,
        ),
        District::SanBlasCanillejas => (
            &[
                "San Blas",
                "Simancas",
                "Las Musas",
                "Las Rosas",
                "Canillejas",
                "Torre Arias",
                "Suanzes",
                "Ciudad Lineal",
                "Avenida de Guadalajara",
            ],
            &[],
            &[28, 38, 48, 77, 104, 105, 109, 114, 140, 153],
            0.75,
        ),
        District::Barajas => (
            &[
                "Barajas",
                "Aeropuerto T1-T2-T3",
                "Aeropuerto T4",
                "Alameda de Osuna",
            ],
            &["Aeropuerto T4"],
            &[101, 105, 115, 151],
            0.8,
        ),
    };
    TransportNetwork {
        metro_stations,
        cercanias_stations,
        bus_lines,
        accessibility_score,
    }
}

fn connectivity_score(metro: usize, bus: usize, cercanias: usize) -> f64 {
    metro as f64 * 0.4 + bus as f64 * 0.3 + cercanias as f64 * 0.3
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobilityRecord {
    pub distrito: District,
    pub metro_stations_count: usize,
    pub bus_lines_count: usize,
    pub cercanias_stations_count: usize,
    pub total_transport_stations: usize,
    pub avg_travel_time_minutes: f64,
    pub accessibility_score: f64,
    pub metro_density: f64,
    pub bus_density: f64,
    pub transport_diversity: f64,
    pub connectivity_score: f64,
}

impl MobilityRecord {
    pub fn for_district(district: District) -> Self {
        let net = network(district);
        let metro = net.metro_stations.len();
        let bus = net.bus_lines.len();
        let cercanias = net.cercanias_stations.len();

        // More metro stops means shorter trips, never above the 30 min baseline.
        let travel_factor = (metro as f64 / 5.0).max(1.0);
        let rail_stops: BTreeSet<&str> = net
            .metro_stations
            .iter()
            .chain(net.cercanias_stations)
            .copied()
            .collect();

        Self {
            distrito: district,
            metro_stations_count: metro,
            bus_lines_count: bus,
            cercanias_stations_count: cercanias,
            total_transport_stations: metro + bus + cercanias,
            avg_travel_time_minutes: round(30.0 / travel_factor, 2),
            accessibility_score: round(net.accessibility_score, 2),
            metro_density: round(metro as f64 / 10.0, 2),
            bus_density: round(bus as f64 / 10.0, 2),
            transport_diversity: round(rail_stops.len() as f64 / 10.0, 2),
            connectivity_score: round(connectivity_score(metro, bus, cercanias), 2),
        }
    }
}

impl Record for MobilityRecord {
    const COLUMNS: &'static [&'static str] = &[
        "distrito",
        "metro_stations_count",
        "bus_lines_count",
        "cercanias_stations_count",
        "total_transport_stations",
        "avg_travel_time_minutes",
        "accessibility_score",
        "metro_density",
        "bus_density",
        "transport_diversity",
        "connectivity_score",
    ];

    fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.distrito.name()),
            Cell::from(self.metro_stations_count),
            Cell::from(self.bus_lines_count),
            Cell::from(self.cercanias_stations_count),
            Cell::from(self.total_transport_stations),
            Cell::from(self.avg_travel_time_minutes),
            Cell::from(self.accessibility_score),
            Cell::from(self.metro_density),
            Cell::from(self.bus_density),
            Cell::from(self.transport_diversity),
            Cell::from(self.connectivity_score),
        ]
    }
}

/// One record per district, in official district order.
pub fn all_districts() -> Vec<MobilityRecord> {
    District::all().map(MobilityRecord::for_district).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityLevel {
    Excelente,
    Buena,
    Moderada,
    Baja,
}

impl ConnectivityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 20.0 {
            ConnectivityLevel::Excelente
        } else if score >= 15.0 {
            ConnectivityLevel::Buena
        } else if score >= 10.0 {
            ConnectivityLevel::Moderada
        } else {
            ConnectivityLevel::Baja
        }
    }
}

impl fmt::Display for ConnectivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectivityLevel::Excelente => write!(f, "Excelente"),
            ConnectivityLevel::Buena => write!(f, "Buena"),
            ConnectivityLevel::Moderada => write!(f, "Moderada"),
            ConnectivityLevel::Baja => write!(f, "Baja"),
        }
    }
}

const COUNT_DEFAULTS: &[(&str, f64)] = &[
    ("metro_stations_count", 0.0),
    ("bus_lines_count", 0.0),
    ("cercanias_stations_count", 0.0),
    ("accessibility_score", 0.5),
];

fn connectivity_column(table: &Table) -> Vec<Cell> {
    let metro = table.numbers("metro_stations_count");
    let bus = table.numbers("bus_lines_count");
    let cercanias = table.numbers("cercanias_stations_count");
    (0..table.len())
        .map(|i| {
            let m = metro.get(i).copied().flatten().unwrap_or(0.0);
            let b = bus.get(i).copied().flatten().unwrap_or(0.0);
            let c = cercanias.get(i).copied().flatten().unwrap_or(0.0);
            Cell::from(round(m * 0.4 + b * 0.3 + c * 0.3, 2))
        })
        .collect()
}

/// Completes a per-district mobility table.
///
/// Missing count columns are filled with their defaults and the total and
/// connectivity columns are derived when absent. Tables produced by
/// [`all_districts`] pass through unchanged.
pub fn calculate_metrics(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    let mut metrics = table.clone();
    let n = metrics.len();
    let fill = |metrics: &mut Table, column: &str, values: Vec<Option<f64>>| {
        if let Err(e) = metrics.set_numbers(column, values) {
            tracing::error!("Failed to add column {}: {:?}", column, e);
        }
    };

    for (column, default) in COUNT_DEFAULTS {
        if !metrics.has_column(column) {
            fill(&mut metrics, column, vec![Some(*default); n]);
        }
    }
    if !metrics.has_column("total_transport_stations") {
        let mut totals = vec![0.0; n];
        for column in ["metro_stations_count", "bus_lines_count", "cercanias_stations_count"] {
            for (total, value) in totals.iter_mut().zip(metrics.numbers(column)) {
                *total += value.unwrap_or(0.0);
            }
        }
        fill(&mut metrics, "total_transport_stations", totals.into_iter().map(Some).collect());
    }
    if !metrics.has_column("connectivity_score") {
        let scores = connectivity_column(&metrics);
        fill(&mut metrics, "connectivity_score", scores.iter().map(Cell::as_f64).collect());
    }
    metrics
}

/// Classifies each district by connectivity score and shortens the count
/// column names.
pub fn connectivity_analysis(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    let mut analysis = table.clone();
    if !analysis.has_column("connectivity_score") {
        let scores = connectivity_column(&analysis);
        if let Err(e) = analysis.set_column("connectivity_score", scores) {
            tracing::error!("Failed to add connectivity score: {:?}", e);
        }
    }

    let levels = analysis
        .numbers("connectivity_score")
        .into_iter()
        .map(|score| {
            score
                .map(|s| Cell::from(ConnectivityLevel::from_score(s).to_string()))
                .unwrap_or(Cell::Empty)
        })
        .collect();
    if let Err(e) = analysis.set_column("connectivity_level", levels) {
        tracing::error!("Failed to add connectivity level: {:?}", e);
    }

    for (from, to) in [
        ("metro_stations_count", "metro_stations"),
        ("bus_lines_count", "bus_lines"),
        ("cercanias_stations_count", "cercanias_stations"),
        ("total_transport_stations", "total_stations"),
    ] {
        analysis.rename_column(from, to);
    }
    analysis
}

#[derive(Debug, Default)]
pub struct MobilityCollector;

impl MobilityCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatasetCollector for MobilityCollector {
    fn kind(&self) -> DataKind {
        DataKind::Mobility
    }

    async fn collect(&self) -> Result<Table, CollectorError> {
        tracing::info!("Building mobility data from the transport network");
        let records = all_districts();
        tracing::info!("Mobility data ready for {} districts", records.len());
        Ok(Table::from_records(&records))
    }
}
