//! Tabular model shared by every collector.
//!
//! Collectors build typed records, flatten them into [`Table`]s and hand
//! them to the storage layer or to the integrator.

pub mod table;
pub mod traits;
pub mod types;
pub mod utilities;

pub use table::{Cell, Table};
pub use traits::{DatasetCollector, Record};
pub use types::DataKind;
pub use utilities::batch_collect_datasets;
