use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the spreadsheet dtypes calamine
/// can produce. Used as `BTreeSet` keys downstream so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text so min/max is lexicographic.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) | CellValue::Date(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Row / Table – one sheet of the workbook
// ---------------------------------------------------------------------------

/// One data row: column name → cell value. Columns are not fixed a priori;
/// callers must check for presence before reading optional columns.
pub type Row = BTreeMap<String, CellValue>;

/// A single sheet as a loosely-typed table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in file order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Workbook – the complete loaded file
// ---------------------------------------------------------------------------

/// The sheet the dashboard prefers when the workbook contains it.
pub const DEFAULT_SHEET: &str = "Address_Checker_Details_Excel";

/// All sheets of one loaded file, in file order. Immutable after load.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<(String, Table)>,
}

impl Workbook {
    /// Sheet names in file order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, table)| table)
    }

    /// The sheet shown on load: `Address_Checker_Details_Excel` if present,
    /// else the first sheet in file order.
    pub fn default_sheet(&self) -> Option<&str> {
        if self.sheets.iter().any(|(n, _)| n == DEFAULT_SHEET) {
            return Some(DEFAULT_SHEET);
        }
        self.sheets.first().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str) -> (String, Table) {
        (name.to_string(), Table::default())
    }

    #[test]
    fn default_sheet_prefers_address_checker_details() {
        let wb = Workbook {
            sheets: vec![sheet("Summary"), sheet(DEFAULT_SHEET), sheet("Misc")],
        };
        assert_eq!(wb.default_sheet(), Some(DEFAULT_SHEET));
    }

    #[test]
    fn default_sheet_falls_back_to_first_in_file_order() {
        let wb = Workbook {
            sheets: vec![sheet("Summary"), sheet("Misc")],
        };
        assert_eq!(wb.default_sheet(), Some("Summary"));
        assert!(Workbook::default().default_sheet().is_none());
    }

    #[test]
    fn null_cells_display_as_empty_text() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Float(123.0).to_string(), "123");
        assert_eq!(CellValue::Float(1.5).to_string(), "1.5");
    }
}
