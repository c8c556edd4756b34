mod app;
mod color;
mod config;
mod data;
mod export;
mod state;
mod ui;

use anyhow::Context;
use app::IpcExplorerApp;
use config::SourceConfig;
use data::loader::{HttpSource, CATALOG};
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SourceConfig::from_env();
    log::info!("Reading published tables from {}", config.base_url);
    let source = HttpSource::new(&config).context("creating table source")?;

    let initial = CATALOG[0].0;
    let mut state = AppState::new(source, initial);
    state.select_table(initial);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "IPC – Consulta a tablas del INE",
        options,
        Box::new(|_cc| Ok(Box::new(IpcExplorerApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running viewer: {e}"))
}
