//! Mock implementations of [`DatasetCollector`] for testing.

use crate::error::{CollectorError, SourceError};
use crate::model::{Cell, DataKind, DatasetCollector, Table};
use async_trait::async_trait;

/// A mock dataset collector that can be configured to succeed or fail.
pub struct MockDatasetCollector {
    kind: DataKind,
    should_fail: bool,
    error_message: String,
    create_table: Box<dyn Fn() -> Table + Send + Sync>,
}

impl MockDatasetCollector {
    /// Creates a mock that returns a two-district table.
    pub fn new_success(kind: DataKind) -> Self {
        Self::new_with_table(kind, || {
            let rows = [("Centro", 1.0), ("Retiro", 2.0)]
                .into_iter()
                .map(|(distrito, valor)| vec![Cell::from(distrito), Cell::from(valor)])
                .collect();
            Table::from_rows(["distrito", "valor"], rows).unwrap()
        })
    }

    /// Creates a mock that fails with the given error message.
    pub fn new_failure(kind: DataKind, error_message: impl Into<String>) -> Self {
        Self {
            kind,
            should_fail: true,
            error_message: error_message.into(),
            create_table: Box::new(|| Table::new(["distrito"])),
        }
    }

    /// Creates a mock with a custom table.
    pub fn new_with_table<F>(kind: DataKind, create_fn: F) -> Self
    where
        F: Fn() -> Table + Send + Sync + 'static,
    {
        Self {
            kind,
            should_fail: false,
            error_message: String::new(),
            create_table: Box::new(create_fn),
        }
    }
}

#[async_trait]
impl DatasetCollector for MockDatasetCollector {
    fn kind(&self) -> DataKind {
        self.kind
    }

    async fn collect(&self) -> Result<Table, CollectorError> {
        if self.should_fail {
            Err(SourceError::no_data(self.error_message.clone()).into())
        } else {
            Ok((self.create_table)())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockDatasetCollector::new_success(DataKind::Weather);
        assert_eq!(mock.kind(), DataKind::Weather);
        let table = mock.collect().await.unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockDatasetCollector::new_failure(DataKind::Electricity, "offline");
        let err = mock.collect().await.unwrap_err();
        assert!(matches!(err, CollectorError::Source(SourceError::NoData(m)) if m == "offline"));
    }
}
