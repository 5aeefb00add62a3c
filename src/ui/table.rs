use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use realty_lens::data::model::Value;

use crate::state::DashboardState;

// ---------------------------------------------------------------------------
// Listings table
// ---------------------------------------------------------------------------

/// Filtered rows of the descriptor's table columns. Only shown once the
/// user has picked at least one location.
pub fn listings_table(ui: &mut Ui, page: &DashboardState) {
    let Some(snapshot) = &page.snapshot else {
        return;
    };
    let descriptor = &page.descriptor;
    ui.strong(format!("{} Details", descriptor.item_label));

    if !snapshot.show_listings {
        ui.label(
            RichText::new("Please select at least one location to view the listings.").italics(),
        );
        return;
    }

    let data = &snapshot.filtered;
    let columns: Vec<(String, usize)> = descriptor
        .table_columns
        .iter()
        .filter_map(|name| data.column_index(name).map(|idx| (name.clone(), idx)))
        .collect();
    let url_col = descriptor.roles.url.as_deref();

    ui.push_id(format!("{}_listings", descriptor.id), |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(400.0)
            .columns(Column::auto().at_least(60.0), columns.len())
            .header(22.0, |mut header| {
                for (name, _) in &columns {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(20.0, data.len(), |mut row| {
                    let record = &data.rows()[row.index()];
                    for (name, idx) in &columns {
                        let value = record.get(*idx);
                        row.col(|ui: &mut Ui| match value {
                            Value::Text(url) if Some(name.as_str()) == url_col => {
                                ui.hyperlink_to("View Listing", url);
                            }
                            Value::Null => {
                                ui.weak("–");
                            }
                            other => {
                                ui.label(other.to_string());
                            }
                        });
                    }
                });
            });
    });
}
