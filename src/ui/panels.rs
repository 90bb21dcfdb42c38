use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::export::{to_csv_bytes, EXPORT_FILE_NAME};
use crate::data::model::CellValue;
use crate::data::table::{self, FILTER_COLUMNS};
use crate::state::{AppState, StatusMessage};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar: file actions, sheet selector, row counts.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.table.is_some(), egui::Button::new("Export CSV…"))
                .clicked()
            {
                export_csv_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        // ---- Sheet selector ----
        let sheet_names: Vec<String> = state
            .workbook
            .as_ref()
            .map(|wb| wb.sheet_names().iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        if !sheet_names.is_empty() {
            let current = state.selected_sheet.clone().unwrap_or_default();
            let mut clicked: Option<String> = None;
            egui::ComboBox::from_id_salt("sheet_selector")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &sheet_names {
                        if ui.selectable_label(current == *name, name).clicked() {
                            clicked = Some(name.clone());
                        }
                    }
                });
            if let Some(name) = clicked {
                state.select_sheet(&name);
            }
            ui.separator();
        }

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows loaded, {} visible",
                table.len(),
                state.visible_rows.len()
            ));
        }

        if let Some(status) = &state.status_message {
            let color = match status {
                StatusMessage::Info(_) => Color32::DARK_GREEN,
                StatusMessage::Error(_) => Color32::RED,
            };
            ui.label(RichText::new(status.text()).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel: one multi-select per filterable column.
/// Option lists come from the full normalized table, never from the
/// filtered one, so selecting an address does not narrow the product list.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No workbook loaded.");
        return;
    };

    // Clone the option sets so we can mutate state inside the loop.
    let columns: Vec<(String, Vec<CellValue>)> = FILTER_COLUMNS
        .iter()
        .filter(|col| table.has_column(col))
        .map(|col| {
            let options = table::filter_options(table, col).into_iter().collect();
            (col.to_string(), options)
        })
        .collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (col, options) in &columns {
                let n_selected = state.filters.get(col).map_or(0, |chosen| chosen.len());
                let n_total = options.len();
                let header_text = format!("{col}  ({n_selected}/{n_total})");

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        if ui.small_button("Clear").clicked() {
                            state.clear_filter(col);
                        }

                        for val in options {
                            let checked = state
                                .filters
                                .get(col)
                                .is_some_and(|chosen| chosen.contains(val));
                            let mut checkbox = checked;
                            if ui.checkbox(&mut checkbox, val.to_string()).changed() {
                                state.toggle_filter_value(col, val);
                            }
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open subscription workbook")
        .add_filter("Excel workbook", &["xlsx"])
        .pick_file();

    if let Some(path) = file {
        match crate::data::loader::load_workbook(&path) {
            Ok(workbook) => {
                log::info!(
                    "Loaded workbook {} with sheets {:?}",
                    path.display(),
                    workbook.sheet_names()
                );
                state.set_workbook(workbook);
            }
            Err(e) => {
                log::error!("Failed to load workbook: {e}");
                state.fail(format!("Error: {e}"));
            }
        }
    }
}

/// Build the export table over the visible rows and write it where the user
/// asks. Any failure becomes the single status message for this pass.
pub fn export_csv_dialog(state: &mut AppState) {
    let Some(table) = &state.table else {
        return;
    };

    let export = table::build_export_table(table, &state.visible_rows);
    let bytes = match to_csv_bytes(&export) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Failed to encode CSV export: {e:#}");
            state.status_message = Some(StatusMessage::Error(format!("Error: {e:#}")));
            return;
        }
    };

    let file = rfd::FileDialog::new()
        .set_title("Export filtered table")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                log::info!("Exported {} rows to {}", export.rows.len(), path.display());
            }
            Err(e) => {
                log::error!("Failed to write CSV export: {e}");
                state.status_message = Some(StatusMessage::Error(format!("Error: {e}")));
            }
        }
    }
}
