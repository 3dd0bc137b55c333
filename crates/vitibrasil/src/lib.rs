//! Acquisition core for Brazilian viticulture statistics.
//!
//! Resolves (category, sub-table, year) requests against the Embrapa
//! VitiBrasil site, serves them from a local SQLite copy when present, and
//! otherwise fetches the page, extracts its data table, validates the rows
//! into typed records and persists them.

pub mod address;
pub mod catalog;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod quantity;
pub mod storage;
pub mod types;
pub mod validate;

pub use address::{ExternalAddress, RequestKey, ResolvedRequest, TableAddressResolver};
pub use catalog::{Category, SubTable, DEFAULT_BASE_URL, YEAR_RANGE};
pub use extract::{extract_first_table, RawTable};
pub use fetch::{HttpTableSource, TableSource, DEFAULT_TIMEOUT};
pub use pipeline::{Acquisition, AcquisitionPipeline, Origin};
pub use quantity::{normalize, IntoQuantity};
pub use storage::{DatasetStore, SqliteStore, StoredDataset};
pub use types::*;
pub use validate::{validate, ValidatedRows};
