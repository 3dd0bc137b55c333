//! Typed records and the error taxonomy.

use serde::{Deserialize, Serialize};

use crate::catalog::Category;

/// Production of grape products, in litres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecord {
    #[serde(rename = "Produto")]
    pub produto: String,
    #[serde(rename = "Quantidade (L.)")]
    pub quantidade_l: Option<i64>,
}

/// Grapes processed by the wineries, in kilograms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    #[serde(rename = "Cultivar")]
    pub cultivar: String,
    #[serde(rename = "Quantidade (Kg)")]
    pub quantidade_kg: Option<i64>,
}

/// Domestic commercialization of wines and derivatives, in litres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommercializationRecord {
    #[serde(rename = "Produto")]
    pub produto: String,
    #[serde(rename = "Quantidade (L.)")]
    pub quantidade_l: Option<i64>,
}

/// Import or export flow with one trading partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "Países")]
    pub paises: String,
    #[serde(rename = "Quantidade (Kg)")]
    pub quantidade_kg: Option<i64>,
    #[serde(rename = "Valor (US$)")]
    pub valor_usd: Option<i64>,
}

/// A validated row, shaped by the category it was acquired for.
///
/// Serializes as the bare record object. Shapes are not distinguishable on
/// the wire, so reading records back goes through [`TypedRecord::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypedRecord {
    Production(ProductionRecord),
    Processing(ProcessingRecord),
    Commercialization(CommercializationRecord),
    Import(TradeRecord),
    Export(TradeRecord),
}

impl TypedRecord {
    /// Build the record shape for `category` from its label and up to two
    /// normalized measures. Measures a shape does not carry are ignored.
    pub fn from_parts(
        category: Category,
        label: String,
        first: Option<i64>,
        second: Option<i64>,
    ) -> Self {
        match category {
            Category::Production => TypedRecord::Production(ProductionRecord {
                produto: label,
                quantidade_l: first,
            }),
            Category::Processing => TypedRecord::Processing(ProcessingRecord {
                cultivar: label,
                quantidade_kg: first,
            }),
            Category::Commercialization => {
                TypedRecord::Commercialization(CommercializationRecord {
                    produto: label,
                    quantidade_l: first,
                })
            }
            Category::Import => TypedRecord::Import(TradeRecord {
                paises: label,
                quantidade_kg: first,
                valor_usd: second,
            }),
            Category::Export => TypedRecord::Export(TradeRecord {
                paises: label,
                quantidade_kg: first,
                valor_usd: second,
            }),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            TypedRecord::Production(_) => Category::Production,
            TypedRecord::Processing(_) => Category::Processing,
            TypedRecord::Commercialization(_) => Category::Commercialization,
            TypedRecord::Import(_) => Category::Import,
            TypedRecord::Export(_) => Category::Export,
        }
    }

    /// Product, cultivar or country name.
    pub fn label(&self) -> &str {
        match self {
            TypedRecord::Production(r) => &r.produto,
            TypedRecord::Processing(r) => &r.cultivar,
            TypedRecord::Commercialization(r) => &r.produto,
            TypedRecord::Import(r) | TypedRecord::Export(r) => &r.paises,
        }
    }

    /// Quantity column, in the unit of the category.
    pub fn quantity(&self) -> Option<i64> {
        match self {
            TypedRecord::Production(r) => r.quantidade_l,
            TypedRecord::Processing(r) => r.quantidade_kg,
            TypedRecord::Commercialization(r) => r.quantidade_l,
            TypedRecord::Import(r) | TypedRecord::Export(r) => r.quantidade_kg,
        }
    }

    /// Monetary value in US$, only carried by trade records.
    pub fn value(&self) -> Option<i64> {
        match self {
            TypedRecord::Import(r) | TypedRecord::Export(r) => r.valor_usd,
            _ => None,
        }
    }
}

/// Which way an acquisition failed, reported to callers as its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// A forced refresh could not produce fresh data.
    Forced,
    /// No local copy and the remote path failed.
    Unavailable,
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureMode::Forced => f.write_str("forced"),
            FailureMode::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Errors produced by the acquisition core.
#[derive(thiserror::Error, Debug)]
pub enum VitiError {
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid sub-table '{sub_table}' for category '{category}'")]
    InvalidSubTable { category: String, sub_table: String },

    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("Acquisition failed ({mode})")]
    AcquisitionFailed {
        mode: FailureMode,
        #[source]
        source: Box<VitiError>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl VitiError {
    /// Wrap an availability failure with the mode it surfaced in.
    pub fn acquisition_failed(mode: FailureMode, source: VitiError) -> Self {
        VitiError::AcquisitionFailed {
            mode,
            source: Box::new(source),
        }
    }

    /// Bad input from the caller; never worth retrying.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            VitiError::InvalidCategory(_) | VitiError::InvalidSubTable { .. }
        )
    }

    /// The data could not be produced right now; the caller may retry later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, VitiError::AcquisitionFailed { .. })
    }

    pub fn failure_mode(&self) -> Option<FailureMode> {
        match self {
            VitiError::AcquisitionFailed { mode, .. } => Some(*mode),
            _ => None,
        }
    }
}

/// Convenience result type.
pub type VitiResult<T> = Result<T, VitiError>;
