//! Maps logical requests onto upstream URLs and canonical storage keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Category, SubTable, DEFAULT_BASE_URL};
use crate::types::VitiResult;

/// Identity of one retrievable dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub category: Category,
    pub sub_table: Option<String>,
    pub year: Option<u16>,
}

impl RequestKey {
    /// Canonical storage name: `category[_sub][_year]`.
    pub fn storage_key(&self) -> String {
        let mut key = self.category.slug().to_string();
        if let Some(sub) = &self.sub_table {
            key.push('_');
            key.push_str(sub);
        }
        if let Some(year) = self.year {
            key.push('_');
            key.push_str(&year.to_string());
        }
        key
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Fully-qualified upstream URL for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalAddress(String);

impl ExternalAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of resolution: where to fetch and where to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub key: RequestKey,
    pub address: ExternalAddress,
}

/// Resolves (category, sub-table, year) against a base URL.
#[derive(Debug, Clone)]
pub struct TableAddressResolver {
    base_url: String,
}

impl Default for TableAddressResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl TableAddressResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches(['?', '&']).to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a request whose category is given by name.
    pub fn resolve(
        &self,
        category: &str,
        sub_table: Option<&str>,
        year: Option<u16>,
    ) -> VitiResult<ResolvedRequest> {
        self.resolve_category(category.parse()?, sub_table, year)
    }

    /// Resolve a request for a known category.
    ///
    /// `year` is passed through unchecked; range checks belong to the caller.
    pub fn resolve_category(
        &self,
        category: Category,
        sub_table: Option<&str>,
        year: Option<u16>,
    ) -> VitiResult<ResolvedRequest> {
        let sub = sub_table.map(|name| category.sub_table(name)).transpose()?;
        let address = self.address(category, sub, year);
        let key = RequestKey {
            category,
            sub_table: sub.map(|s| s.name.to_string()),
            year,
        };
        Ok(ResolvedRequest { key, address })
    }

    fn address(&self, category: Category, sub: Option<SubTable>, year: Option<u16>) -> ExternalAddress {
        let opcao = format!("opcao=opt_0{}", category.code());
        let query = match (sub, year) {
            (Some(sub), Some(year)) => {
                format!("ano={year}&{opcao}&subopcao=subopt_0{}", sub.code)
            }
            (Some(sub), None) => format!("subopcao=subopt_0{}&{opcao}", sub.code),
            (None, Some(year)) => format!("ano={year}&{opcao}"),
            (None, None) => opcao,
        };
        ExternalAddress(format!("{}?{query}", self.base_url))
    }
}
