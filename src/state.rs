use std::collections::BTreeSet;

use crate::data::filter::{filtered_rows, FilterSelection};
use crate::data::model::{CellValue, Table, Workbook};
use crate::data::table::{self, SubscriberGroup, Summary};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// One-line feedback shown in the top bar: green for a successful load,
/// red for a failed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

impl StatusMessage {
    pub fn text(&self) -> &str {
        match self {
            StatusMessage::Info(msg) | StatusMessage::Error(msg) => msg,
        }
    }
}

/// The full UI state, independent of rendering. The pipeline itself is
/// stateless; this owns the workbook, the sheet choice and the filter
/// selection, and caches what the current render pass derived from them.
pub struct AppState {
    /// Loaded workbook (None until the user opens a file).
    pub workbook: Option<Workbook>,

    /// Name of the sheet currently shown.
    pub selected_sheet: Option<String>,

    /// Normalized, validated sheet. None while no file is loaded or when
    /// the selected sheet failed validation.
    pub table: Option<Table>,

    /// Per-column filter selections (empty set = no filter).
    pub filters: FilterSelection,

    /// Indices of rows passing the current filters (cached).
    pub visible_rows: Vec<usize>,

    /// Headline counts over the visible rows (cached).
    pub summary: Summary,

    /// Subscriber detail cards over the visible rows (cached).
    pub groups: Vec<SubscriberGroup>,

    /// Feedback shown in the UI: success note after a valid load, error
    /// message on any failed pass.
    pub status_message: Option<StatusMessage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            workbook: None,
            selected_sheet: None,
            table: None,
            filters: FilterSelection::new(),
            visible_rows: Vec::new(),
            summary: Summary::default(),
            groups: Vec::new(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded workbook and show its default sheet.
    pub fn set_workbook(&mut self, workbook: Workbook) {
        let default_sheet = workbook.default_sheet().map(str::to_string);
        self.workbook = Some(workbook);
        match default_sheet {
            Some(name) => self.select_sheet(&name),
            None => self.fail("workbook contains no sheets".to_string()),
        }
    }

    /// Normalize and validate one sheet, then reset filters and recompute
    /// the derived views. A validation failure halts the pass: no table, no
    /// partial output, one error message.
    pub fn select_sheet(&mut self, name: &str) {
        self.selected_sheet = Some(name.to_string());
        self.filters = FilterSelection::new();

        let Some(raw) = self.workbook.as_ref().and_then(|wb| wb.sheet(name)) else {
            self.fail(format!("sheet '{name}' not found in workbook"));
            return;
        };

        let normalized = table::normalize(raw);
        match table::validate(&normalized) {
            Ok(()) => {
                self.table = Some(normalized);
                self.status_message =
                    Some(StatusMessage::Info("Data loaded successfully".to_string()));
                self.refilter();
            }
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// Recompute the cached derived views after any filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.visible_rows = filtered_rows(table, &self.filters);
            self.summary = table::compute_summary(table, &self.visible_rows);
            self.groups = table::group_by_subscriber(table, &self.visible_rows);
        } else {
            self.visible_rows.clear();
            self.summary = Summary::default();
            self.groups.clear();
        }
    }

    /// Toggle a single value in a column's filter selection.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        let chosen = self.filters.entry(column.to_string()).or_default();
        if chosen.contains(value) {
            chosen.remove(value);
        } else {
            chosen.insert(value.clone());
        }
        self.refilter();
    }

    /// Drop the selection for one column (back to "no filter").
    pub fn clear_filter(&mut self, column: &str) {
        self.filters.insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    /// Record a failed pass: one message, no derived output.
    pub fn fail(&mut self, message: String) {
        self.table = None;
        self.status_message = Some(StatusMessage::Error(message));
        self.refilter();
    }
}
