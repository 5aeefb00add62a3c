use eframe::egui::{self, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RealtyLensApp {
    pub state: AppState,
}

impl RealtyLensApp {
    /// Wrap the state and load the starting dashboard's source file.
    pub fn new(mut state: AppState) -> Self {
        state.ensure_loaded();
        Self { state }
    }
}

impl eframe::App for RealtyLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and dashboard switch ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs, charts, listings ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    let page = self.state.active();
                    plot::dashboard_view(ui, page);
                    ui.separator();
                    table::listings_table(ui, page);
                });
        });
    }
}
