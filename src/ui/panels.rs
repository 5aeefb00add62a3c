use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use realty_lens::dashboard::{ControlDomain, Domain};
use realty_lens::schema::ControlKind;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let page = state.active();
    if page.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Clone what we need so we can mutate state inside the loop.
    let domains = page.domains.clone();
    let controls = page.controls.clone();
    let color_map = page.color_map.clone();
    let location_col = page.descriptor.roles.location.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for cd in &domains {
                let ControlDomain { control, domain } = cd;
                let col = control.column.as_str();
                match domain {
                    Domain::Values(all_values) => {
                        let selected = controls.selections.get(col).cloned().unwrap_or_default();
                        let header_text = format!(
                            "{}  ({}/{})",
                            control.label,
                            selected.len(),
                            all_values.len()
                        );

                        egui::CollapsingHeader::new(RichText::new(header_text).strong())
                            .id_salt(col)
                            .default_open(col == location_col)
                            .show(ui, |ui: &mut Ui| {
                                ui.horizontal(|ui: &mut Ui| {
                                    if ui.small_button("All").clicked() {
                                        state.select_all(col);
                                    }
                                    if ui.small_button("None").clicked() {
                                        state.select_none(col);
                                    }
                                });
                                if selected.is_empty() {
                                    ui.weak("Nothing selected: showing all");
                                }

                                for val in all_values {
                                    let mut text = RichText::new(val.to_string());
                                    if col == location_col {
                                        if let Some(cm) = &color_map {
                                            text = text.color(cm.color_for(val));
                                        }
                                    }

                                    let mut checked = selected.contains(val);
                                    if ui.checkbox(&mut checked, text).changed() {
                                        state.toggle_filter_value(col, val);
                                    }
                                }
                            });
                    }
                    Domain::Numeric(full) => {
                        ui.strong(&control.label);
                        if full.is_point() {
                            // A slider needs two distinct ends.
                            ui.label(format!("{} (only value)", full.lo()));
                        } else {
                            let step = match control.kind {
                                ControlKind::Range { step, .. } => step,
                                _ => 1.0,
                            };
                            let current = controls.ranges.get(col).copied().unwrap_or(*full);
                            let (mut lo, mut hi) = (current.lo(), current.hi());
                            let min_changed = ui
                                .add(
                                    egui::Slider::new(&mut lo, full.lo()..=full.hi())
                                        .step_by(step)
                                        .text("min"),
                                )
                                .changed();
                            let max_changed = ui
                                .add(
                                    egui::Slider::new(&mut hi, full.lo()..=full.hi())
                                        .step_by(step)
                                        .text("max"),
                                )
                                .changed();
                            if min_changed || max_changed {
                                state.set_range(col, lo, hi);
                            }
                        }
                        ui.add_space(4.0);
                    }
                    Domain::Dates(full) => {
                        ui.strong(&control.label);
                        let current = controls.dates.get(col).copied().unwrap_or(*full);
                        let (mut start, mut end) = (current.start(), current.end());
                        let mut changed = false;
                        ui.horizontal(|ui: &mut Ui| {
                            changed |= ui
                                .add(DatePickerButton::new(&mut start).id_salt(&format!("{col}_start")))
                                .changed();
                            ui.label("to");
                            changed |= ui
                                .add(DatePickerButton::new(&mut end).id_salt(&format!("{col}_end")))
                                .changed();
                        });
                        if changed {
                            state.set_dates(col, start, end);
                        }
                        ui.add_space(4.0);
                    }
                    Domain::Unavailable => {
                        ui.weak(format!("{}: no usable values", control.label));
                    }
                }
            }

            ui.separator();
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }

            let page = state.active();
            if let Some(snapshot) = &page.snapshot {
                ui.label(format!(
                    "Filtered {}: {} of {}",
                    page.descriptor.item_label,
                    snapshot.filtered.len(),
                    snapshot.total_rows
                ));
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
            if ui.button("Reload all").clicked() {
                state.reload_all();
                ui.close_menu();
            }
            let can_export = state.active().snapshot.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export CSV…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let titles: Vec<String> = state
            .dashboards
            .iter()
            .map(|d| d.descriptor.title.clone())
            .collect();
        for (i, title) in titles.iter().enumerate() {
            if ui.selectable_label(state.active == i, title).clicked() {
                state.switch_to(i);
            }
        }

        ui.separator();

        let page = state.active();
        if let Some(snapshot) = &page.snapshot {
            ui.label(format!(
                "{} {} loaded, {} visible",
                snapshot.total_rows,
                page.descriptor.item_label.to_lowercase(),
                snapshot.filtered.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Exported") {
                Color32::DARK_GREEN
            } else {
                Color32::RED
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let title = format!("Open {}", state.active().descriptor.title);
    let file = rfd::FileDialog::new()
        .set_title(&title)
        .add_filter("Supported files", &["csv", "tsv", "txt", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv", "tsv", "txt"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(&state.active().descriptor.export_file_name)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_to(&path);
    }
}
