//! Fixed catalog of categories, their upstream codes, sub-tables and
//! record schemas.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::VitiError;

/// Default upstream page. Query parameters are appended by the resolver.
pub const DEFAULT_BASE_URL: &str = "http://vitibrasil.cnpuv.embrapa.br/index.php";

/// Years the upstream publishes. Checked by callers before resolution.
pub const YEAR_RANGE: RangeInclusive<u16> = 1970..=2024;

/// One of the five top-level viticulture data domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Production,
    Processing,
    Commercialization,
    Import,
    Export,
}

/// A named partition within a category and its upstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubTable {
    pub name: &'static str,
    pub code: u8,
}

/// Column layout of a category's data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Required text column (product, cultivar or country).
    pub label: &'static str,
    /// Numeric columns, in record order.
    pub measures: &'static [&'static str],
}

const PROCESSING_SUB_TABLES: &[SubTable] = &[
    SubTable { name: "Viníferas", code: 1 },
    SubTable { name: "Americanas e híbridas", code: 2 },
    SubTable { name: "Uvas de mesa", code: 3 },
    SubTable { name: "Sem classificação", code: 4 },
];

const IMPORT_SUB_TABLES: &[SubTable] = &[
    SubTable { name: "Vinhos de mesa", code: 1 },
    SubTable { name: "Espumantes", code: 2 },
    SubTable { name: "Uvas frescas", code: 3 },
    SubTable { name: "Uvas passas", code: 4 },
    SubTable { name: "Suco de uva", code: 5 },
];

const EXPORT_SUB_TABLES: &[SubTable] = &[
    SubTable { name: "Vinhos de mesa", code: 1 },
    SubTable { name: "Espumantes", code: 2 },
    SubTable { name: "Uvas frescas", code: 3 },
    SubTable { name: "Suco de uva", code: 4 },
];

const VOLUME_SCHEMA: Schema = Schema {
    label: "Produto",
    measures: &["Quantidade (L.)"],
};

const PROCESSING_SCHEMA: Schema = Schema {
    label: "Cultivar",
    measures: &["Quantidade (Kg)"],
};

const TRADE_SCHEMA: Schema = Schema {
    label: "Países",
    measures: &["Quantidade (Kg)", "Valor (US$)"],
};

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Production,
        Category::Processing,
        Category::Commercialization,
        Category::Import,
        Category::Export,
    ];

    /// Route and storage name, as used by the upstream site.
    pub fn slug(self) -> &'static str {
        match self {
            Category::Production => "producao",
            Category::Processing => "processamento",
            Category::Commercialization => "comercializacao",
            Category::Import => "importacao",
            Category::Export => "exportacao",
        }
    }

    /// Upstream `opcao` code.
    pub fn code(self) -> u8 {
        match self {
            Category::Production => 2,
            Category::Processing => 3,
            Category::Commercialization => 4,
            Category::Import => 5,
            Category::Export => 6,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Production => "Produção de uvas e vinhos no Brasil",
            Category::Processing => "Dados de processamento de uva",
            Category::Commercialization => "Comercialização de produtos vitivinícolas",
            Category::Import => "Importações de vinhos e derivados",
            Category::Export => "Exportações do setor vitivinícola",
        }
    }

    /// Legal partitions; empty when the category is not partitioned.
    pub fn sub_tables(self) -> &'static [SubTable] {
        match self {
            Category::Processing => PROCESSING_SUB_TABLES,
            Category::Import => IMPORT_SUB_TABLES,
            Category::Export => EXPORT_SUB_TABLES,
            Category::Production | Category::Commercialization => &[],
        }
    }

    pub fn is_partitioned(self) -> bool {
        !self.sub_tables().is_empty()
    }

    pub fn schema(self) -> Schema {
        match self {
            Category::Production | Category::Commercialization => VOLUME_SCHEMA,
            Category::Processing => PROCESSING_SCHEMA,
            Category::Import | Category::Export => TRADE_SCHEMA,
        }
    }

    /// Look up a sub-table by exact name (surrounding whitespace ignored).
    pub fn sub_table(self, name: &str) -> Result<SubTable, VitiError> {
        let name = name.trim();
        self.sub_tables()
            .iter()
            .find(|s| s.name == name)
            .copied()
            .ok_or_else(|| VitiError::InvalidSubTable {
                category: self.slug().to_string(),
                sub_table: name.to_string(),
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = VitiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "producao" | "production" => Ok(Category::Production),
            "processamento" | "processing" => Ok(Category::Processing),
            "comercializacao" | "commercialization" => Ok(Category::Commercialization),
            "importacao" | "import" => Ok(Category::Import),
            "exportacao" | "export" => Ok(Category::Export),
            _ => Err(VitiError::InvalidCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_roundtrip() {
        for category in Category::ALL {
            assert_eq!(category.slug().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_english_aliases() {
        assert_eq!("Export".parse::<Category>().unwrap(), Category::Export);
        assert_eq!(" processing ".parse::<Category>().unwrap(), Category::Processing);
    }

    #[test]
    fn test_unknown_category() {
        for bad in ["", "vinhos", "opt_02", "producao2"] {
            assert!(matches!(
                bad.parse::<Category>(),
                Err(VitiError::InvalidCategory(_))
            ));
        }
    }

    #[test]
    fn test_sub_table_lookup() {
        let sub = Category::Import.sub_table("Uvas passas").unwrap();
        assert_eq!(sub.code, 4);
        // Not exported, so not a legal export partition.
        assert!(Category::Export.sub_table("Uvas passas").is_err());
        assert!(Category::Production.sub_table("Viníferas").is_err());
        assert!(!Category::Commercialization.is_partitioned());
    }

    #[test]
    fn test_trade_schema_has_two_measures() {
        assert_eq!(Category::Import.schema().measures.len(), 2);
        assert_eq!(Category::Production.schema().label, "Produto");
    }
}
