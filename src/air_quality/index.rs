//! Composite air-quality index (ICA).
//!
//! Each measured pollutant is bucketed 1..=5 against fixed upper bounds and
//! the index is the worst bucket.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    No2,
    Pm10,
    Pm25,
    O3,
    So2,
    Co,
}

/// Reference concentration range for Madrid, µg/m³ (CO in mg/m³).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::No2,
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Co,
    ];

    /// Column header used in every air-quality table.
    pub fn column(self) -> &'static str {
        match self {
            Pollutant::No2 => "NO2",
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
            Pollutant::Co => "CO",
        }
    }

    /// Upper bounds for good, moderate, bad and very bad.
    pub fn limits(self) -> [f64; 4] {
        match self {
            Pollutant::No2 => [40.0, 100.0, 200.0, 400.0],
            Pollutant::Pm10 => [20.0, 40.0, 50.0, 100.0],
            Pollutant::Pm25 => [10.0, 25.0, 35.0, 75.0],
            Pollutant::O3 => [120.0, 180.0, 240.0, 320.0],
            Pollutant::So2 => [125.0, 350.0, 500.0, 750.0],
            Pollutant::Co => [2.0, 4.0, 8.0, 15.0],
        }
    }

    pub fn reference(self) -> Reference {
        let (mean, min, max) = match self {
            Pollutant::No2 => (35.0, 10.0, 80.0),
            Pollutant::Pm10 => (22.0, 5.0, 60.0),
            Pollutant::Pm25 => (10.0, 3.0, 35.0),
            Pollutant::O3 => (70.0, 20.0, 160.0),
            Pollutant::So2 => (4.0, 0.0, 20.0),
            Pollutant::Co => (0.4, 0.05, 2.0),
        };
        Reference { mean, min, max }
    }

    pub fn sub_index(self, value: f64) -> u8 {
        self.limits()
            .iter()
            .position(|limit| value <= *limit)
            .map(|i| i as u8 + 1)
            .unwrap_or(5)
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One concentration per pollutant; `None` means not measured.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pollutants {
    pub no2: Option<f64>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
}

impl Pollutants {
    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::No2 => self.no2,
            Pollutant::Pm10 => self.pm10,
            Pollutant::Pm25 => self.pm25,
            Pollutant::O3 => self.o3,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
        }
    }

    pub fn set(&mut self, pollutant: Pollutant, value: Option<f64>) {
        let slot = match pollutant {
            Pollutant::No2 => &mut self.no2,
            Pollutant::Pm10 => &mut self.pm10,
            Pollutant::Pm25 => &mut self.pm25,
            Pollutant::O3 => &mut self.o3,
            Pollutant::So2 => &mut self.so2,
            Pollutant::Co => &mut self.co,
        };
        *slot = value;
    }

    pub fn any(&self) -> bool {
        Pollutant::ALL.iter().any(|p| self.get(*p).is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityLevel {
    Buena = 1,
    Moderada = 2,
    Mala = 3,
    MuyMala = 4,
    ExtremadamenteMala = 5,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 5] = [
        QualityLevel::Buena,
        QualityLevel::Moderada,
        QualityLevel::Mala,
        QualityLevel::MuyMala,
        QualityLevel::ExtremadamenteMala,
    ];

    pub fn from_index(index: u8) -> Option<QualityLevel> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Buena => "Buena",
            QualityLevel::Moderada => "Moderada",
            QualityLevel::Mala => "Mala",
            QualityLevel::MuyMala => "Muy mala",
            QualityLevel::ExtremadamenteMala => "Extremadamente mala",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            QualityLevel::Buena => "Calidad del aire satisfactoria",
            QualityLevel::Moderada => "Calidad del aire aceptable para la mayoría de personas",
            QualityLevel::Mala => "Sensibles al aire pueden experimentar síntomas",
            QualityLevel::MuyMala => "Toda la población puede experimentar efectos",
            QualityLevel::ExtremadamenteMala => "Toda la población experimentará efectos graves",
        }
    }

    /// Column name for the day count of this level, e.g. `dias_muy_mala`.
    pub fn days_column(self) -> String {
        format!("dias_{}", self.label().to_lowercase().replace(' ', "_"))
    }
}

/// ICA for the measured pollutants, or `None` when nothing was measured.
pub fn air_quality_index(pollutants: &Pollutants) -> Option<QualityLevel> {
    Pollutant::ALL
        .iter()
        .filter_map(|p| pollutants.get(*p).map(|v| p.sub_index(v)))
        .max()
        .and_then(QualityLevel::from_index)
}
