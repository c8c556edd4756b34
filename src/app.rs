use eframe::egui;

use crate::data::loader::HttpSource;
use crate::state::{AppState, CentralTab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct IpcExplorerApp {
    pub state: AppState<HttpSource>,
}

impl IpcExplorerApp {
    pub fn new(state: AppState<HttpSource>) -> Self {
        Self { state }
    }
}

impl eframe::App for IpcExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: preview or chart ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.tab {
            CentralTab::Table => table::table_preview(ui, &self.state),
            CentralTab::Chart => plot::series_plot(ui, &self.state),
        });
    }
}
