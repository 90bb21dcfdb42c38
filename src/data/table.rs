use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use thiserror::Error;

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Column vocabulary
// ---------------------------------------------------------------------------

/// Columns the dashboard cannot work without.
pub const REQUIRED_COLUMNS: [&str; 3] = [
    "installation_address",
    "subscriber_number",
    "product_description",
];

/// Columns offered as multi-select filters.
pub const FILTER_COLUMNS: [&str; 4] = [
    "installation_address",
    "pay_agreement_name",
    "pay_agreement_num",
    "product_description",
];

/// The CSV export projection, in output order.
pub const EXPORT_COLUMNS: [&str; 9] = [
    "installation_address",
    "subscriber_number",
    "product_description",
    "contract_name",
    "contract_end_date",
    "billing_start_date",
    "pay_agreement_num",
    "pay_agreement_name",
    "regime_name",
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the table pipeline. Both kinds halt the current render pass;
/// there is no recovery or partial output.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(
        "the sheet is missing required column(s) {}; it must contain \
         installation_address, subscriber_number and product_description",
        missing.join(", ")
    )]
    MissingColumns { missing: Vec<String> },

    #[error("failed to read workbook: {0:#}")]
    Parse(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Clean one raw column name: trim, lowercase, spaces to underscores,
/// double underscores collapsed.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace("__", "_")
}

/// Normalize a freshly loaded sheet: clean every column name and coerce
/// `pay_agreement_num` cells to strings with any trailing `.0` stripped
/// (spreadsheet readers float-coerce what is semantically an opaque id).
pub fn normalize(raw: &Table) -> Table {
    let columns: Vec<String> = raw.columns.iter().map(|c| normalize_name(c)).collect();

    let rows = raw
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(name, value)| {
                    let name = normalize_name(name);
                    let value = if name == "pay_agreement_num" {
                        coerce_pay_agreement_num(value)
                    } else {
                        value.clone()
                    };
                    (name, value)
                })
                .collect()
        })
        .collect();

    Table { columns, rows }
}

fn coerce_pay_agreement_num(value: &CellValue) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }
    let text = value.to_string();
    let text = text.strip_suffix(".0").unwrap_or(&text);
    CellValue::String(text.to_string())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the required columns are present. Absence is terminal: the caller
/// renders the error and produces no partial output.
pub fn validate(table: &Table) -> Result<(), TableError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !table.has_column(col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TableError::MissingColumns { missing })
    }
}

// ---------------------------------------------------------------------------
// Filter options
// ---------------------------------------------------------------------------

/// Sorted distinct non-null values of one column, for a multi-select widget.
/// Empty when the column is absent. Always computed from the full normalized
/// table; option lists do not cascade with other active filters.
pub fn filter_options(table: &Table, column: &str) -> BTreeSet<CellValue> {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

/// The four headline counts over the filtered table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub row_count: usize,
    pub distinct_addresses: usize,
    pub distinct_subscribers: usize,
    pub distinct_products: usize,
}

pub fn compute_summary(table: &Table, rows: &[usize]) -> Summary {
    Summary {
        row_count: rows.len(),
        distinct_addresses: distinct_count(table, rows, "installation_address"),
        distinct_subscribers: distinct_count(table, rows, "subscriber_number"),
        distinct_products: distinct_count(table, rows, "product_description"),
    }
}

fn distinct_count(table: &Table, rows: &[usize], column: &str) -> usize {
    rows.iter()
        .filter_map(|&i| table.rows[i].get(column))
        .filter(|v| !v.is_null())
        .collect::<BTreeSet<_>>()
        .len()
}

// ---------------------------------------------------------------------------
// Subscriber grouping
// ---------------------------------------------------------------------------

/// All rows sharing one subscriber number, summarized for a detail card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberGroup {
    pub subscriber: String,
    pub address: String,
    pub regime: String,
    pub contract: String,
    pub pay_agreement_name: String,
    pub pay_agreement_num: String,
    /// Minimum `billing_start_date` in the group, empty if none.
    pub billing_start: String,
    /// Maximum `contract_end_date` in the group, empty if none.
    pub contract_end: String,
    /// Distinct non-null products, in first-encounter order.
    pub products: Vec<String>,
    /// Indices (into the table) of the group's member rows.
    pub rows: Vec<usize>,
}

struct GroupAcc {
    group: SubscriberGroup,
    billing_start: Option<CellValue>,
    contract_end: Option<CellValue>,
}

/// Group the filtered rows by `subscriber_number`. Groups appear in
/// first-encounter order of the key; descriptive fields come from each
/// group's first row, date bounds from a min/max scan over the group.
pub fn group_by_subscriber(table: &Table, rows: &[usize]) -> Vec<SubscriberGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut accs: HashMap<String, GroupAcc> = HashMap::new();

    for &idx in rows {
        let row = &table.rows[idx];
        let key = cell_text(row.get("subscriber_number"));

        let acc = accs.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            GroupAcc {
                group: SubscriberGroup {
                    subscriber: key.clone(),
                    address: cell_text(row.get("installation_address")),
                    regime: cell_text(row.get("regime_name")),
                    contract: cell_text(row.get("contract_name")),
                    pay_agreement_name: cell_text(row.get("pay_agreement_name")),
                    pay_agreement_num: cell_text(row.get("pay_agreement_num")),
                    billing_start: String::new(),
                    contract_end: String::new(),
                    products: Vec::new(),
                    rows: Vec::new(),
                },
                billing_start: None,
                contract_end: None,
            }
        });

        acc.group.rows.push(idx);

        if let Some(v) = row.get("billing_start_date").filter(|v| !v.is_null()) {
            match &acc.billing_start {
                Some(cur) if cur <= v => {}
                _ => acc.billing_start = Some(v.clone()),
            }
        }
        if let Some(v) = row.get("contract_end_date").filter(|v| !v.is_null()) {
            match &acc.contract_end {
                Some(cur) if cur >= v => {}
                _ => acc.contract_end = Some(v.clone()),
            }
        }
        if let Some(p) = row.get("product_description").filter(|v| !v.is_null()) {
            let text = p.to_string();
            if !acc.group.products.contains(&text) {
                acc.group.products.push(text);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| accs.remove(&key))
        .map(|acc| {
            let mut group = acc.group;
            group.billing_start = acc.billing_start.map(|v| v.to_string()).unwrap_or_default();
            group.contract_end = acc.contract_end.map(|v| v.to_string()).unwrap_or_default();
            group
        })
        .collect()
}

fn cell_text(value: Option<&CellValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Frequency counts (histogram input)
// ---------------------------------------------------------------------------

/// Distinct non-null values of one column with their occurrence counts over
/// the filtered rows, ascending by value. Empty for absent columns.
pub fn value_counts(table: &Table, rows: &[usize], column: &str) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<CellValue, usize> = BTreeMap::new();
    for &idx in rows {
        if let Some(v) = table.rows[idx].get(column).filter(|v| !v.is_null()) {
            *counts.entry(v.clone()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(v, n)| (v.to_string(), n))
        .collect()
}

// ---------------------------------------------------------------------------
// Export table
// ---------------------------------------------------------------------------

/// The deduplicated, sorted, column-projected table offered for download.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Project the filtered rows onto the export columns actually present,
/// drop exact-duplicate rows (first occurrence wins), and sort ascending by
/// the string form of (`installation_address`, `subscriber_number`).
pub fn build_export_table(table: &Table, rows: &[usize]) -> ExportTable {
    let columns: Vec<String> = EXPORT_COLUMNS
        .iter()
        .filter(|col| table.has_column(col))
        .map(|col| col.to_string())
        .collect();

    let address_idx = columns.iter().position(|c| c == "installation_address");
    let subscriber_idx = columns.iter().position(|c| c == "subscriber_number");

    let mut seen: HashSet<Vec<CellValue>> = HashSet::new();
    let mut projected: Vec<Vec<CellValue>> = Vec::new();
    for &idx in rows {
        let row = &table.rows[idx];
        let cells: Vec<CellValue> = columns
            .iter()
            .map(|col| row.get(col).cloned().unwrap_or(CellValue::Null))
            .collect();
        if seen.insert(cells.clone()) {
            projected.push(cells);
        }
    }

    let key_text = |cells: &[CellValue], idx: Option<usize>| -> String {
        idx.map(|i| cells[i].to_string()).unwrap_or_default()
    };
    projected.sort_by_cached_key(|cells| {
        (
            key_text(cells, address_idx),
            key_text(cells, subscriber_idx),
        )
    });

    ExportTable {
        columns,
        rows: projected,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filtered_rows, FilterSelection};
    use crate::data::model::Row;

    fn s(text: &str) -> CellValue {
        CellValue::String(text.to_string())
    }

    fn row(cells: &[(&str, CellValue)]) -> Row {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn table(columns: &[&str], rows: Vec<Row>) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn all_rows(table: &Table) -> Vec<usize> {
        (0..table.len()).collect()
    }

    #[test]
    fn normalize_name_cleans_raw_headers() {
        assert_eq!(normalize_name("  Installation  Address "), "installation_address");
        assert_eq!(normalize_name("Pay Agreement Num"), "pay_agreement_num");
        assert_eq!(normalize_name("subscriber_number"), "subscriber_number");
    }

    #[test]
    fn normalize_is_idempotent_on_column_names() {
        let raw = table(
            &["Installation  Address", "Subscriber Number", "Product Description"],
            vec![],
        );
        let once = normalize(&raw);
        let twice = normalize(&once);
        assert_eq!(once.columns, twice.columns);
        assert_eq!(
            once.columns,
            vec!["installation_address", "subscriber_number", "product_description"]
        );
    }

    #[test]
    fn pay_agreement_num_becomes_a_clean_string() {
        let raw = table(
            &["Pay Agreement Num"],
            vec![
                row(&[("Pay Agreement Num", CellValue::Float(123.0))]),
                row(&[("Pay Agreement Num", s("456.0"))]),
                row(&[("Pay Agreement Num", CellValue::Integer(789))]),
                row(&[("Pay Agreement Num", CellValue::Null)]),
            ],
        );
        let normalized = normalize(&raw);
        for r in &normalized.rows {
            match &r["pay_agreement_num"] {
                CellValue::String(text) => assert!(!text.ends_with(".0"), "got {text}"),
                CellValue::Null => {}
                other => panic!("expected string, got {other:?}"),
            }
        }
        assert_eq!(normalized.rows[0]["pay_agreement_num"], s("123"));
        assert_eq!(normalized.rows[1]["pay_agreement_num"], s("456"));
        assert_eq!(normalized.rows[2]["pay_agreement_num"], s("789"));
    }

    #[test]
    fn validate_passes_iff_all_required_columns_present() {
        let ok = table(
            &["installation_address", "subscriber_number", "product_description", "extra"],
            vec![],
        );
        assert!(validate(&ok).is_ok());

        let missing_one = table(&["installation_address", "product_description"], vec![]);
        match validate(&missing_one) {
            Err(TableError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["subscriber_number"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn missing_columns_message_names_all_three_required_columns() {
        let missing_one = table(&["installation_address", "product_description"], vec![]);
        let message = validate(&missing_one).unwrap_err().to_string();
        for col in REQUIRED_COLUMNS {
            assert!(message.contains(col), "message should name {col}: {message}");
        }
    }

    #[test]
    fn filter_options_are_sorted_distinct_and_skip_nulls() {
        let t = table(
            &["product_description"],
            vec![
                row(&[("product_description", s("TV"))]),
                row(&[("product_description", s("Internet"))]),
                row(&[("product_description", CellValue::Null)]),
                row(&[("product_description", s("TV"))]),
            ],
        );
        let options: Vec<String> = filter_options(&t, "product_description")
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(options, vec!["Internet", "TV"]);
        assert!(filter_options(&t, "no_such_column").is_empty());
    }

    fn sample_table() -> Table {
        table(
            &[
                "installation_address",
                "subscriber_number",
                "product_description",
                "pay_agreement_num",
                "billing_start_date",
                "contract_end_date",
            ],
            vec![
                row(&[
                    ("installation_address", s("1 Main St")),
                    ("subscriber_number", s("S1")),
                    ("product_description", s("TV")),
                    ("pay_agreement_num", s("123")),
                    ("billing_start_date", CellValue::Date("2021-05-01".into())),
                    ("contract_end_date", CellValue::Date("2025-01-01".into())),
                ]),
                row(&[
                    ("installation_address", s("1 Main St")),
                    ("subscriber_number", s("S1")),
                    ("product_description", s("Internet")),
                    ("pay_agreement_num", s("123")),
                    ("billing_start_date", CellValue::Date("2020-02-01".into())),
                    ("contract_end_date", CellValue::Date("2026-06-30".into())),
                ]),
                row(&[
                    ("installation_address", s("2 Side Ave")),
                    ("subscriber_number", s("S2")),
                    ("product_description", s("TV")),
                    ("pay_agreement_num", s("900")),
                    ("billing_start_date", CellValue::Null),
                    ("contract_end_date", CellValue::Null),
                ]),
            ],
        )
    }

    #[test]
    fn summary_counts_are_independent_cardinalities() {
        let t = sample_table();
        let summary = compute_summary(&t, &all_rows(&t));
        assert_eq!(
            summary,
            Summary {
                row_count: 3,
                distinct_addresses: 2,
                distinct_subscribers: 2,
                distinct_products: 2,
            }
        );
    }

    #[test]
    fn groups_partition_the_rows_in_first_encounter_order() {
        let t = sample_table();
        let rows = all_rows(&t);
        let groups = group_by_subscriber(&t, &rows);

        let keys: Vec<&str> = groups.iter().map(|g| g.subscriber.as_str()).collect();
        assert_eq!(keys, vec!["S1", "S2"]);

        let mut covered: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
        covered.sort_unstable();
        assert_eq!(covered, rows);
    }

    #[test]
    fn group_fields_take_first_row_values_and_date_bounds() {
        let t = sample_table();
        let groups = group_by_subscriber(&t, &all_rows(&t));
        let s1 = &groups[0];
        assert_eq!(s1.address, "1 Main St");
        assert_eq!(s1.pay_agreement_num, "123");
        assert_eq!(s1.billing_start, "2020-02-01");
        assert_eq!(s1.contract_end, "2026-06-30");
        assert_eq!(s1.products, vec!["TV", "Internet"]);
        // Absent columns resolve to empty strings, never an error.
        assert_eq!(s1.regime, "");
        assert_eq!(s1.contract, "");
    }

    #[test]
    fn value_counts_are_ascending_by_value() {
        let t = sample_table();
        assert_eq!(
            value_counts(&t, &all_rows(&t), "product_description"),
            vec![("Internet".to_string(), 1), ("TV".to_string(), 2)]
        );
        assert!(value_counts(&t, &all_rows(&t), "no_such_column").is_empty());
    }

    #[test]
    fn export_table_projects_dedupes_and_sorts() {
        let t = table(
            &["installation_address", "subscriber_number", "product_description"],
            vec![
                row(&[
                    ("installation_address", s("2 Side Ave")),
                    ("subscriber_number", s("S2")),
                    ("product_description", s("TV")),
                ]),
                row(&[
                    ("installation_address", s("1 Main St")),
                    ("subscriber_number", s("S1")),
                    ("product_description", s("TV")),
                ]),
                row(&[
                    ("installation_address", s("1 Main St")),
                    ("subscriber_number", s("S1")),
                    ("product_description", s("TV")),
                ]),
            ],
        );
        let export = build_export_table(&t, &all_rows(&t));
        assert_eq!(
            export.columns,
            vec!["installation_address", "subscriber_number", "product_description"]
        );
        assert_eq!(export.rows.len(), 2);
        assert_eq!(export.rows[0][0], s("1 Main St"));
        assert_eq!(export.rows[1][0], s("2 Side Ave"));
    }

    #[test]
    fn export_table_is_a_fixed_point_on_its_own_output() {
        let t = sample_table();
        let export = build_export_table(&t, &all_rows(&t));

        let as_table = Table {
            columns: export.columns.clone(),
            rows: export
                .rows
                .iter()
                .map(|cells| {
                    export
                        .columns
                        .iter()
                        .cloned()
                        .zip(cells.iter().cloned())
                        .collect()
                })
                .collect(),
        };
        let again = build_export_table(&as_table, &all_rows(&as_table));
        assert_eq!(again, export);
    }

    #[test]
    fn end_to_end_two_rows_one_subscriber() {
        let raw = table(
            &[
                "Installation Address",
                "Subscriber Number",
                "Product Description",
                "Pay Agreement Num",
            ],
            vec![
                row(&[
                    ("Installation Address", s("1 Main St")),
                    ("Subscriber Number", s("S1")),
                    ("Product Description", s("TV")),
                    ("Pay Agreement Num", CellValue::Float(123.0)),
                ]),
                row(&[
                    ("Installation Address", s("1 Main St")),
                    ("Subscriber Number", s("S1")),
                    ("Product Description", s("Internet")),
                    ("Pay Agreement Num", CellValue::Float(123.0)),
                ]),
            ],
        );

        let t = normalize(&raw);
        validate(&t).unwrap();

        let rows = filtered_rows(&t, &FilterSelection::new());
        let summary = compute_summary(&t, &rows);
        assert_eq!(
            summary,
            Summary {
                row_count: 2,
                distinct_addresses: 1,
                distinct_subscribers: 1,
                distinct_products: 2,
            }
        );

        let groups = group_by_subscriber(&t, &rows);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].subscriber, "S1");
        assert_eq!(groups[0].products, vec!["TV", "Internet"]);
        assert_eq!(groups[0].pay_agreement_num, "123");
    }

    #[test]
    fn end_to_end_missing_subscriber_number_halts_the_pass() {
        let raw = table(
            &["Installation Address", "Product Description"],
            vec![row(&[
                ("Installation Address", s("1 Main St")),
                ("Product Description", s("TV")),
            ])],
        );
        let t = normalize(&raw);
        let err = validate(&t).unwrap_err();
        let message = err.to_string();
        for col in REQUIRED_COLUMNS {
            assert!(message.contains(col));
        }
    }
}
