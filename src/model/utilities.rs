use futures::future::join_all;

use super::table::Table;
use super::traits::DatasetCollector;
use super::types::DataKind;

/// Runs all collectors concurrently and keeps the non-empty tables.
///
/// Failures and empty results are logged but don't stop other collectors.
pub async fn batch_collect_datasets<'a>(
    collectors: &[Box<dyn DatasetCollector + 'a>],
) -> Vec<(DataKind, Table)> {
    let results = join_all(collectors.iter().map(|c| async move {
        (c.kind(), c.collect().await)
    }))
    .await;

    results
        .into_iter()
        .filter_map(|(kind, res)| match res {
            Ok(table) if table.is_empty() => {
                tracing::warn!("No {} data collected", kind);
                None
            }
            Ok(table) => {
                tracing::info!("Collected {} {} records", table.len(), kind);
                Some((kind, table))
            }
            Err(e) => {
                tracing::error!("Failed to collect {} data: {:?}", kind, e);
                None
            }
        })
        .collect()
}
