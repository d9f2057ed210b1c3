use crate::error::StorageError;
use crate::model::Table;
use polars::prelude::{CsvReadOptions, CsvWriter, SerReader, SerWriter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Writes tables and raw payloads under a data directory.
///
/// Layout is `{root}/{subdir}/{file}`; subdirectories are created on demand.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, subdir: &str, file: &str) -> PathBuf {
        self.root.join(subdir).join(file)
    }

    pub fn exists(&self, subdir: &str, file: &str) -> bool {
        self.path(subdir, file).is_file()
    }

    /// Writes `table` as UTF-8 CSV with a header row. Empty tables are refused.
    pub fn write(&self, subdir: &str, file: &str, table: &Table) -> Result<PathBuf, StorageError> {
        if table.is_empty() {
            return Err(StorageError::empty_table(file));
        }
        let path = self.prepare(subdir, file)?;
        let mut out = File::create(&path).map_err(|e| StorageError::io(&path, e))?;
        let mut frame = table.frame().clone();
        CsvWriter::new(&mut out).include_header(true).finish(&mut frame)?;
        tracing::info!("Saved {} rows to {}", table.len(), path.display());
        Ok(path)
    }

    pub fn write_json(
        &self,
        subdir: &str,
        file: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, StorageError> {
        let path = self.prepare(subdir, file)?;
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&path, body).map_err(|e| StorageError::io(&path, e))?;
        tracing::info!("Saved JSON to {}", path.display());
        Ok(path)
    }

    pub fn write_bytes(&self, subdir: &str, file: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.prepare(subdir, file)?;
        fs::write(&path, bytes).map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    pub fn read_bytes(&self, subdir: &str, file: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(subdir, file);
        fs::read(&path).map_err(|e| StorageError::io(&path, e))
    }

    /// Reads a CSV written by [`CsvStore::write`], inferring column types.
    pub fn read(&self, subdir: &str, file: &str) -> Result<Table, StorageError> {
        let path = self.path(subdir, file);
        if !path.is_file() {
            return Err(StorageError::io(&path, "file not found"));
        }
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;
        Ok(Table::from(frame))
    }

    fn prepare(&self, subdir: &str, file: &str) -> Result<PathBuf, StorageError> {
        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        Ok(dir.join(file))
    }
}

/// Size of a written file in kilobytes, for run summaries.
pub fn file_size_kb(path: &Path) -> Option<f64> {
    fs::metadata(path).ok().map(|m| m.len() as f64 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cell;
    use tempfile::TempDir;

    fn test_table() -> Table {
        Table::from_rows(
            ["distrito", "ICA", "calidad"],
            vec![
                vec!["Chamartín".into(), 2i64.into(), "Moderada".into()],
                vec!["Usera".into(), Cell::Empty, "Buena, según".into()],
            ],
        )
        .unwrap()
    }

    mod succeeds {
        use super::*;

        #[test]
        fn test_write_creates_subdir_and_header() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());

            let path = store.write("processed", "air.csv", &test_table()).unwrap();

            assert_eq!(path, dir.path().join("processed").join("air.csv"));
            let body = std::fs::read_to_string(&path).unwrap();
            let mut lines = body.lines();
            assert_eq!(lines.next(), Some("distrito,ICA,calidad"));
            assert_eq!(lines.next(), Some("Chamartín,2,Moderada"));
            assert_eq!(lines.next(), Some("Usera,,\"Buena, según\""));
            assert!(store.exists("processed", "air.csv"));
        }

        #[test]
        fn test_read_types_cells() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());
            store.write("processed", "air.csv", &test_table()).unwrap();

            let table = store.read("processed", "air.csv").unwrap();

            assert_eq!(table.columns(), &["distrito", "ICA", "calidad"]);
            assert_eq!(table.value(0, "ICA"), Some(Cell::Int(2)));
            assert_eq!(table.value(1, "ICA"), Some(Cell::Empty));
            assert_eq!(table.value(1, "calidad"), Some(Cell::from("Buena, según")));
        }

        #[test]
        fn test_write_json_pretty() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());
            let value = serde_json::json!({"1293": {"name": "Demanda real"}});

            let path = store.write_json("raw/esios", "demand_data.json", &value).unwrap();

            let body = std::fs::read_to_string(path).unwrap();
            assert!(body.contains("\n  \"1293\""));
        }

        #[test]
        fn test_write_and_read_bytes() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());
            let path = store.write_bytes("raw", "t.xlsx", b"PK").unwrap();

            assert_eq!(store.read_bytes("raw", "t.xlsx").unwrap(), b"PK".to_vec());
            assert!(file_size_kb(&path).unwrap() > 0.0);
        }
    }

    mod fails {
        use super::*;

        #[test]
        fn test_write_empty_table() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());

            let err = store
                .write("processed", "empty.csv", &Table::new(["distrito"]))
                .unwrap_err();

            assert!(matches!(err, StorageError::EmptyTable { .. }));
            assert!(!store.exists("processed", "empty.csv"));
        }

        #[test]
        fn test_read_missing_file() {
            let dir = TempDir::new().unwrap();
            let store = CsvStore::new(dir.path());
            assert!(store.read("processed", "ghost.csv").is_err());
            assert!(store.read_bytes("raw", "ghost.xlsx").is_err());
        }
    }
}
