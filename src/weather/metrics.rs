use crate::model::Table;
use crate::stats::{aggregate, Agg};

const WEATHER_SPECS: &[(&str, &[Agg])] = &[
    ("temperatura_media", &[Agg::Mean, Agg::Std, Agg::Min, Agg::Max]),
    ("humedad", &[Agg::Mean, Agg::Std]),
    ("presion", &[Agg::Mean, Agg::Std]),
    ("velocidad_viento", &[Agg::Mean, Agg::Std, Agg::Max]),
    ("nubosidad", &[Agg::Mean, Agg::Std]),
    ("precipitacion", &[Agg::Sum, Agg::Mean, Agg::Max]),
    ("uv_index", &[Agg::Mean, Agg::Max]),
];

pub fn calculate_metrics(table: &Table) -> Table {
    if table.is_empty() {
        return Table::default();
    }
    aggregate(table, "distrito", WEATHER_SPECS, 2)
}
