//! Raw rows to typed records.

use crate::catalog::{Category, Schema};
use crate::quantity::normalize;
use crate::types::TypedRecord;

/// Records that passed validation and how many rows did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedRows {
    pub records: Vec<TypedRecord>,
    pub rejected: usize,
}

/// Column index for each schema field, by header name with a positional
/// fallback. A fallback never lands on a column another field claimed by
/// name; such a field stays unmapped.
struct ColumnMap {
    label: Option<usize>,
    measures: Vec<Option<usize>>,
}

impl ColumnMap {
    fn new(schema: Schema, header: &[String]) -> Self {
        let named = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let mut slots: Vec<Option<usize>> = std::iter::once(schema.label)
            .chain(schema.measures.iter().copied())
            .map(named)
            .collect();

        let claimed: Vec<usize> = slots.iter().flatten().copied().collect();
        for (position, slot) in slots.iter_mut().enumerate() {
            if slot.is_none() && !claimed.contains(&position) {
                *slot = Some(position);
            }
        }

        let mut slots = slots.into_iter();
        Self {
            label: slots.next().flatten(),
            measures: slots.collect(),
        }
    }
}

/// Map `rows` onto the schema of `category`.
///
/// A row is rejected only when its label cell is missing or blank. Numeric
/// cells go through [`normalize`] and become `None` when unparseable.
pub fn validate(header: &[String], rows: &[Vec<String>], category: Category) -> ValidatedRows {
    let columns = ColumnMap::new(category.schema(), header);
    let mut out = ValidatedRows::default();

    for (index, row) in rows.iter().enumerate() {
        let label = columns
            .label
            .and_then(|col| row.get(col))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty());

        let Some(label) = label else {
            tracing::debug!(row = index, %category, "rejected row without label");
            out.rejected += 1;
            continue;
        };

        let measure = |i: usize| {
            columns
                .measures
                .get(i)
                .copied()
                .flatten()
                .and_then(|col| row.get(col))
                .and_then(|cell| normalize(cell.as_str()))
        };

        out.records
            .push(TypedRecord::from_parts(category, label.to_string(), measure(0), measure(1)));
    }

    if out.rejected > 0 {
        tracing::warn!(
            %category,
            accepted = out.records.len(),
            rejected = out.rejected,
            "dropped rows that failed validation"
        );
    }

    out
}
