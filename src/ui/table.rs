use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::TableView;
use crate::data::loader::TableSource;
use crate::state::AppState;

/// Rows shown in the preview; the export always carries every row.
pub const PREVIEW_ROWS: usize = 100;

// ---------------------------------------------------------------------------
// Filtered table preview (central panel)
// ---------------------------------------------------------------------------

pub fn table_preview<S: TableSource>(ui: &mut Ui, state: &AppState<S>) {
    if state.loaded.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Selecciona una tabla o abre un archivo  (Archivo → Abrir…)");
        });
        return;
    }

    let Some(view) = state.visible() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No hay datos para el rango seleccionado. Cambia la selección.");
        });
        return;
    };

    ui.heading("Datos filtrados");
    ui.label(format!(
        "Mostrando {} de {} filas",
        view.len().min(PREVIEW_ROWS),
        view.len()
    ));
    ui.separator();

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        preview_grid(ui, view);
    });
}

fn preview_grid(ui: &mut Ui, view: &TableView) {
    let n_cols = view.columns().len();
    let shown: Vec<usize> = view.rows.iter().copied().take(PREVIEW_ROWS).collect();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .auto_shrink([false, false])
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), n_cols)
        .header(20.0, |mut header| {
            for name in view.columns() {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, shown.len(), |mut row| {
                let r = shown[row.index()];
                for c in 0..n_cols {
                    row.col(|ui: &mut Ui| {
                        ui.label(view.cell(r, c).to_string());
                    });
                }
            });
        });
}
