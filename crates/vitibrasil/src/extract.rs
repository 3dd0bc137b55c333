//! Pull the first data table out of an upstream page.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::types::{VitiError, VitiResult};

/// Marker of the data table on VitiBrasil pages.
pub const TABLE_SELECTOR: &str = "table.tb_base.tb_dados";

/// Header plus data rows of one extracted table. Cells are trimmed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn selector(css: &str) -> VitiResult<Selector> {
    Selector::parse(css).map_err(|e| VitiError::MalformedSource(format!("bad selector {css}: {e}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Extract the first table matching [`TABLE_SELECTOR`].
///
/// Row 0 is the header; every later row with at least one cell is data.
pub fn extract_first_table(markup: &str) -> VitiResult<RawTable> {
    let document = Html::parse_document(markup);
    let table_sel = selector(TABLE_SELECTOR)?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| VitiError::MalformedSource(format!("no table matching '{TABLE_SELECTOR}'")))?;

    let mut rows = table
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty());

    let header = rows
        .next()
        .ok_or_else(|| VitiError::MalformedSource("data table has no header row".into()))?;
    let rows: Vec<Vec<String>> = rows.collect();

    tracing::debug!(
        columns = header.len(),
        rows = rows.len(),
        "extracted data table"
    );

    Ok(RawTable { header, rows })
}
