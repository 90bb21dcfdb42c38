use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: column name → set of chosen values.
/// An absent column or an empty set means "no filter on this column".
/// Owned by the UI layer and passed in on every render pass.
pub type FilterSelection = BTreeMap<String, BTreeSet<CellValue>>;

/// Return indices of rows that pass all active filters.
///
/// Semantics:
/// * columns combine with AND, a column's chosen values with OR;
/// * an empty selection for a column is no constraint;
/// * a selection over a column the table does not have is vacuously true.
pub fn filtered_rows(table: &Table, selection: &FilterSelection) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            selection
                .iter()
                .filter(|(_, chosen)| !chosen.is_empty())
                .all(|(column, chosen)| {
                    if !table.has_column(column) {
                        return true;
                    }
                    match row.get(column) {
                        Some(value) => chosen.contains(value),
                        None => false,
                    }
                })
        })
        .map(|(i, _)| i)
        .collect()
}
