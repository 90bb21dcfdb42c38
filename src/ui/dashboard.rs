use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_plot::{Bar, BarChart, Plot};

use crate::color::generate_palette;
use crate::data::table::{self, SubscriberGroup};
use crate::state::{AppState, StatusMessage};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the dashboard: summary metrics, subscriber cards, histograms and
/// the filtered table. A failed pass shows only the error banner.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    if state.workbook.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an .xlsx workbook to explore subscriptions  (File → Open…)");
        });
        return;
    }

    let Some(table) = &state.table else {
        // Load or validation failed: one message, nothing else.
        if let Some(StatusMessage::Error(msg)) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED).heading());
        }
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            summary_row(ui, state);
            ui.separator();

            ui.heading("Subscribers");
            for group in &state.groups {
                subscriber_card(ui, group);
            }
            ui.separator();

            ui.heading("Products");
            histogram(
                ui,
                "product_histogram",
                table::value_counts(table, &state.visible_rows, "product_description"),
            );

            if table.has_column("billing_start_date") {
                ui.heading("Billing start dates");
                histogram(
                    ui,
                    "billing_start_histogram",
                    table::value_counts(table, &state.visible_rows, "billing_start_date"),
                );
            }
            ui.separator();

            ui.heading("Filtered table");
            data_grid(ui, state);
        });
}

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

fn summary_row(ui: &mut Ui, state: &AppState) {
    let summary = &state.summary;
    ui.horizontal(|ui: &mut Ui| {
        metric(ui, "Rows", summary.row_count);
        metric(ui, "Unique addresses", summary.distinct_addresses);
        metric(ui, "Unique subscribers", summary.distinct_subscribers);
        metric(ui, "Unique products", summary.distinct_products);
    });
}

fn metric(ui: &mut Ui, label: &str, value: usize) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(value.to_string()).size(22.0).strong());
            ui.label(label);
        });
    });
}

// ---------------------------------------------------------------------------
// Subscriber detail cards
// ---------------------------------------------------------------------------

fn subscriber_card(ui: &mut Ui, group: &SubscriberGroup) {
    let title = format!("Subscriber: {}  ({} rows)", group.subscriber, group.rows.len());
    egui::CollapsingHeader::new(RichText::new(title).strong())
        .id_salt(&group.subscriber)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.label(format!("Address: {}", group.address));
            ui.label(format!(
                "Contract: {} (ends {})",
                group.contract, group.contract_end
            ));
            ui.label(format!("Regime: {}", group.regime));
            ui.label(format!(
                "Pay agreement: {} (#{})",
                group.pay_agreement_name, group.pay_agreement_num
            ));
            ui.label(format!("Billing start: {}", group.billing_start));
            ui.label("Products:");
            for product in &group.products {
                ui.label(format!("  • {product}"));
            }
        });
}

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

fn histogram(ui: &mut Ui, id: &str, counts: Vec<(String, usize)>) {
    if counts.is_empty() {
        ui.label("No data for the current filters.");
        return;
    }

    let labels: Vec<String> = counts.iter().map(|(label, _)| label.clone()).collect();
    let palette = generate_palette(counts.len());

    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (label, count))| {
            Bar::new(i as f64, *count as f64)
                .name(label)
                .fill(palette[i])
        })
        .collect();

    let axis_labels = labels.clone();
    Plot::new(id)
        .height(220.0)
        .y_axis_label("Count")
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > f64::EPSILON {
                return String::new();
            }
            axis_labels
                .get(idx as usize)
                .cloned()
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

// ---------------------------------------------------------------------------
// Data grid
// ---------------------------------------------------------------------------

fn data_grid(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        return;
    };
    let columns = &table.columns;

    egui_extras::TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(400.0)
        .columns(egui_extras::Column::auto().at_least(90.0), columns.len())
        .header(20.0, |mut header| {
            for col in columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, state.visible_rows.len(), |mut row| {
                let table_row = &table.rows[state.visible_rows[row.index()]];
                for col in columns {
                    row.col(|ui: &mut Ui| {
                        let text = table_row
                            .get(col)
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        ui.label(text);
                    });
                }
            });
        });
}
