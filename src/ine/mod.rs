//! Census tables from the Spanish statistics institute (INE).
//!
//! Workbooks are downloaded once into `raw/` and reused on later runs; the
//! processed tables land in `processed/`.

pub mod consumption;
pub mod workbook;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{CollectorError, SourceError};
use crate::http::Client;
use crate::model::Table;
use crate::storage::CsvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneTable {
    ElectricityConsumption,
    Income,
    Demography,
    Education,
}

impl IneTable {
    pub const ALL: [IneTable; 4] = [
        IneTable::ElectricityConsumption,
        IneTable::Income,
        IneTable::Demography,
        IneTable::Education,
    ];

    pub fn id(self) -> &'static str {
        match self {
            IneTable::ElectricityConsumption => "59532",
            IneTable::Income => "31097",
            IneTable::Demography => "31105",
            IneTable::Education => "66753",
        }
    }

    pub fn url(self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            IneTable::ElectricityConsumption => {
                format!("{}/jaxi/files/tpx/xlsx/{}.xlsx", base, self.id())
            }
            _ => format!("{}/jaxiT3/files/t/xlsx/{}.xlsx", base, self.id()),
        }
    }

    pub fn raw_file(self) -> String {
        let stem = match self {
            IneTable::ElectricityConsumption => "consumo_electrico",
            IneTable::Income => "renta",
            IneTable::Demography => "demografia",
            IneTable::Education => "educacion",
        };
        format!("ine_{}_{}.xlsx", stem, self.id())
    }

    pub fn output_file(self) -> &'static str {
        match self {
            IneTable::ElectricityConsumption => "ine_consumo_electrico_madrid.csv",
            IneTable::Income => "ine_renta_madrid.csv",
            IneTable::Demography => "ine_demografia_madrid.csv",
            IneTable::Education => "ine_educacion_madrid.csv",
        }
    }

    /// 0-based sheet row holding the column names.
    pub fn header_row(self) -> usize {
        match self {
            IneTable::ElectricityConsumption => 6,
            _ => 1,
        }
    }
}

/// Row subsets of the demography table, matched on its first column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemographyView {
    HouseholdSize,
    Over65,
    Population,
}

impl DemographyView {
    pub const ALL: [DemographyView; 3] = [
        DemographyView::HouseholdSize,
        DemographyView::Over65,
        DemographyView::Population,
    ];

    fn term(self) -> &'static str {
        match self {
            DemographyView::HouseholdSize => "hogar",
            DemographyView::Over65 => "65",
            DemographyView::Population => "poblaci",
        }
    }

    pub fn output_file(self) -> &'static str {
        match self {
            DemographyView::HouseholdSize => "ine_demografia_hogar_madrid.csv",
            DemographyView::Over65 => "ine_demografia_mayores_65_madrid.csv",
            DemographyView::Population => "ine_demografia_poblacion_madrid.csv",
        }
    }
}

pub fn demography_view(table: &Table, view: DemographyView) -> Table {
    let Some(first) = table.columns().into_iter().next() else {
        return Table::default();
    };
    let term = view.term();
    let mask: Vec<bool> = table
        .texts(&first)
        .iter()
        .map(|t| t.as_deref().is_some_and(|t| t.to_lowercase().contains(term)))
        .collect();
    let mut view = table.clone();
    match view.retain(&mask) {
        Ok(()) => view,
        Err(e) => {
            tracing::error!("Failed to select demography rows: {:?}", e);
            Table::default()
        }
    }
}

/// Stores every non-empty view of the demography table in `processed/`.
pub fn write_demography_views(store: &CsvStore, table: &Table) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for view in DemographyView::ALL {
        let rows = demography_view(table, view);
        if rows.is_empty() {
            tracing::warn!(view = ?view, "No demography rows for view");
            continue;
        }
        match store.write("processed", view.output_file(), &rows) {
            Ok(path) => written.push(path),
            Err(e) => tracing::error!(view = ?view, "Failed to store demography view: {}", e),
        }
    }
    written
}

pub struct IneCollector {
    client: Arc<Client>,
    base_url: String,
    store: CsvStore,
}

impl IneCollector {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>, store: CsvStore) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
        }
    }

    /// Workbook bytes, from `raw/` when already downloaded.
    pub async fn download(&self, table: IneTable) -> Result<Vec<u8>, CollectorError> {
        let file = table.raw_file();
        if self.store.exists("raw", &file) {
            tracing::info!(table = table.id(), "Using cached workbook {}", file);
            return Ok(self.store.read_bytes("raw", &file)?);
        }
        let url = table.url(&self.base_url);
        tracing::info!(table = table.id(), "Downloading {}", url);
        let bytes = self.client.get_bytes(&url).await?;
        let path = self.store.write_bytes("raw", &file, &bytes)?;
        tracing::info!(table = table.id(), "Saved workbook to {}", path.display());
        Ok(bytes)
    }

    pub async fn load(&self, table: IneTable) -> Result<Table, CollectorError> {
        let bytes = self.download(table).await?;
        let sheet = workbook::read_first_sheet(&bytes, table.header_row())?;
        let processed = match table {
            IneTable::ElectricityConsumption => consumption::madrid_districts(&sheet),
            _ => workbook::normalize_columns(&sheet),
        };
        if processed.is_empty() {
            return Err(SourceError::no_data(format!("INE table {}", table.id())).into());
        }
        Ok(processed)
    }

    /// Loads and stores every table. A failing table is logged and skipped.
    pub async fn collect_all(&self) -> Vec<PathBuf> {
        let mut written = Vec::new();
        for table in IneTable::ALL {
            let result = match self.load(table).await {
                Ok(data) => self
                    .store
                    .write("processed", table.output_file(), &data)
                    .map(|path| (path, data))
                    .map_err(CollectorError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok((path, data)) => {
                    tracing::info!(table = table.id(), rows = data.len(), "INE table stored");
                    written.push(path);
                    if table == IneTable::Demography {
                        written.extend(write_demography_views(&self.store, &data));
                    }
                }
                Err(e) => tracing::error!(table = table.id(), "Failed to process INE table: {}", e),
            }
        }
        written
    }
}
