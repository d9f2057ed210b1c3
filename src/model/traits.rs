use crate::error::CollectorError;
use async_trait::async_trait;

use super::table::{Cell, Table};
use super::types::DataKind;

/// Trait for typed rows that can be flattened into a [`Table`].
///
/// `COLUMNS` fixes the CSV header; `to_row` must yield one cell per column
/// in the same order.
pub trait Record: Send + Sync {
    const COLUMNS: &'static [&'static str];

    fn to_row(&self) -> Vec<Cell>;
}

/// Trait for types that gather one kind of district dataset.
///
/// Implementors hide their own fallback chain: a collector only returns
/// `Err` when neither a live source nor a synthetic generator could produce
/// rows.
#[async_trait]
pub trait DatasetCollector: Send + Sync {
    fn kind(&self) -> DataKind;

    async fn collect(&self) -> Result<Table, CollectorError>;
}
