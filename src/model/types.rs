use std::fmt;

/// The district datasets assembled by the integrator.
///
/// The display form is used both as file stem (`weather_data_madrid.csv`)
/// and as column prefix in the joined table (`weather_temperatura_media_mean`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    Weather,
    Electricity,
    AirQuality,
    Mobility,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataKind::Weather => write!(f, "weather"),
            DataKind::Electricity => write!(f, "electricity"),
            DataKind::AirQuality => write!(f, "air_quality"),
            DataKind::Mobility => write!(f, "mobility"),
        }
    }
}
