//! Local-first acquisition with remote fallback.
//!
//! ```text
//! resolve ─┬─ force ──────────────────────┐
//!          └─ load local ── hit ─> done    │
//!                  └── miss/error ─────────┴─> fetch ─> extract ─> validate ─> save ─> done
//! ```
//!
//! Caller errors from resolution propagate untouched. Any failure on the
//! remote path surfaces as [`VitiError::AcquisitionFailed`], `forced` or
//! `unavailable`, and nothing is written: a failed forced refresh leaves the
//! previous copy in place.

use std::sync::Arc;

use serde::Serialize;

use crate::address::{ResolvedRequest, TableAddressResolver};
use crate::catalog::Category;
use crate::extract::extract_first_table;
use crate::fetch::TableSource;
use crate::storage::DatasetStore;
use crate::types::{FailureMode, TypedRecord, VitiError, VitiResult};
use crate::validate::validate;

/// Where an acquisition's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
        }
    }
}

/// Records plus provenance for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub records: Vec<TypedRecord>,
    pub origin: Origin,
    /// Rows dropped by validation when the records were fetched.
    pub rejected: usize,
}

/// Orchestrates resolver, local store and remote source.
///
/// Holds no per-request state; share one instance behind an `Arc`.
pub struct AcquisitionPipeline {
    resolver: TableAddressResolver,
    source: Arc<dyn TableSource>,
    store: Arc<dyn DatasetStore>,
}

impl AcquisitionPipeline {
    pub fn new(
        resolver: TableAddressResolver,
        source: Arc<dyn TableSource>,
        store: Arc<dyn DatasetStore>,
    ) -> Self {
        Self {
            resolver,
            source,
            store,
        }
    }

    pub fn resolver(&self) -> &TableAddressResolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    /// Records for (category, sub-table, year).
    pub async fn acquire(
        &self,
        category: Category,
        sub_table: Option<&str>,
        year: Option<u16>,
        force: bool,
    ) -> VitiResult<Vec<TypedRecord>> {
        self.acquire_detailed(category, sub_table, year, force)
            .await
            .map(|a| a.records)
    }

    /// Same as [`acquire`](Self::acquire) for a category given by name.
    pub async fn acquire_named(
        &self,
        category: &str,
        sub_table: Option<&str>,
        year: Option<u16>,
        force: bool,
    ) -> VitiResult<Vec<TypedRecord>> {
        self.acquire(category.parse()?, sub_table, year, force).await
    }

    /// Like [`acquire`](Self::acquire), also reporting origin and rejected rows.
    pub async fn acquire_detailed(
        &self,
        category: Category,
        sub_table: Option<&str>,
        year: Option<u16>,
        force: bool,
    ) -> VitiResult<Acquisition> {
        let request = self.resolver.resolve_category(category, sub_table, year)?;
        let key = request.key.storage_key();

        if force {
            tracing::info!(%key, "forced refresh, skipping local store");
            return self
                .fetch_remote(&request)
                .await
                .map_err(|e| fail(FailureMode::Forced, &key, e));
        }

        match self.store.load(&request.key) {
            Ok(dataset) => {
                tracing::info!(%key, records = dataset.records.len(), "served from local store");
                return Ok(Acquisition {
                    records: dataset.records,
                    origin: Origin::Local,
                    rejected: dataset.rejected,
                });
            }
            Err(VitiError::NotFound(_)) => {
                tracing::debug!(%key, "no local copy, fetching remote");
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "local store failed, fetching remote");
            }
        }

        self.fetch_remote(&request)
            .await
            .map_err(|e| fail(FailureMode::Unavailable, &key, e))
    }

    async fn fetch_remote(&self, request: &ResolvedRequest) -> VitiResult<Acquisition> {
        let markup = self.source.fetch(&request.address).await?;
        let table = extract_first_table(&markup)?;
        let validated = validate(&table.header, &table.rows, request.key.category);
        self.store
            .save(&request.key, &validated.records, validated.rejected)?;

        tracing::info!(
            key = %request.key,
            records = validated.records.len(),
            rejected = validated.rejected,
            "fetched and stored remote dataset"
        );

        Ok(Acquisition {
            records: validated.records,
            origin: Origin::Remote,
            rejected: validated.rejected,
        })
    }
}

fn fail(mode: FailureMode, key: &str, cause: VitiError) -> VitiError {
    tracing::warn!(%key, %mode, error = %cause, "acquisition failed");
    VitiError::acquisition_failed(mode, cause)
}
