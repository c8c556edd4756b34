use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::{Dimension, PeriodRange};
use crate::data::loader::{describe, TableSource, CATALOG};
use crate::data::period::PeriodDomain;
use crate::state::{AppState, CentralTab, RangeMode};

/// Shown in a selector while nothing is chosen.
const PLACEHOLDER: &str = " Selecciona una o varias opciones ";

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel<S: TableSource>(ui: &mut Ui, state: &mut AppState<S>) {
    ui.heading("Filtros");
    ui.separator();

    let Some((domain, steps)) = state.filter_widgets() else {
        ui.label("No hay ninguna tabla cargada.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if !domain.is_empty() {
                period_range(ui, state, &domain);
                ui.separator();
            }

            let Some(steps) = &steps else {
                ui.label(
                    RichText::new("No hay datos en el rango de periodos seleccionado.")
                        .color(Color32::YELLOW),
                );
                return;
            };

            // ---- One multiselect per resolved dimension ----
            for step in steps {
                let title = match step.dimension {
                    Dimension::Location => step.column.clone(),
                    other => other.label().to_string(),
                };
                let header_text = format!(
                    "{title}  ({}/{})",
                    step.selected.len(),
                    step.options.len()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(step.dimension)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        if step.selected.is_empty() {
                            ui.label(RichText::new(PLACEHOLDER).weak());
                        } else if ui.small_button("Limpiar").clicked() {
                            state.clear_selection(step.dimension);
                        }

                        for value in &step.options {
                            let mut checked = step.selected.contains(value);
                            if ui.checkbox(&mut checked, value.to_string()).changed() {
                                state.toggle_value(step.dimension, value);
                            }
                        }
                    });
            }
        });
}

/// Period range widgets: either two sliders over the ordered domain or two
/// date pickers.
fn period_range<S: TableSource>(ui: &mut Ui, state: &mut AppState<S>, domain: &PeriodDomain) {
    ui.strong("Selecciona rango de periodos");
    ui.horizontal(|ui: &mut Ui| {
        let mut mode = state.range_mode;
        ui.radio_value(&mut mode, RangeMode::Index, "Por periodo");
        ui.radio_value(&mut mode, RangeMode::Date, "Por fecha");
        state.set_range_mode(mode);
    });

    match state.filters.period {
        Some(PeriodRange::ByIndex { start, end }) => {
            let last = domain.len() - 1;
            let (mut start, mut end) = (start.min(last), end.min(last));
            let label_of = |v: f64| domain.label(v as usize).unwrap_or_default().to_string();

            let changed_start = ui
                .add(egui::Slider::new(&mut start, 0..=last).custom_formatter(|v, _| label_of(v)))
                .changed();
            let changed_end = ui
                .add(egui::Slider::new(&mut end, 0..=last).custom_formatter(|v, _| label_of(v)))
                .changed();

            if changed_start || changed_end {
                // keep the handles ordered, as a range slider would
                if changed_start && start > end {
                    end = start;
                } else if changed_end && end < start {
                    start = end;
                }
                state.set_index_range(start, end);
            }
        }
        Some(PeriodRange::ByDate { from, to }) => {
            let (mut from, mut to) = (from, to);
            let mut changed = false;
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Desde");
                changed |= ui
                    .add(DatePickerButton::new(&mut from).id_salt("period_from"))
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Hasta");
                changed |= ui
                    .add(DatePickerButton::new(&mut to).id_salt("period_to"))
                    .changed();
            });
            if changed {
                state.set_date_range(from, to);
            }
        }
        None => {}
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar<S: TableSource>(ui: &mut Ui, state: &mut AppState<S>) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Archivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.visible().is_some(), egui::Button::new("⬇ Descargar datos filtrados"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        let current = state.selected_table;
        egui::ComboBox::from_id_salt("table_selector")
            .selected_text(format!("{current} - {}", describe(current).unwrap_or("")))
            .show_ui(ui, |ui: &mut Ui| {
                for (id, description) in CATALOG {
                    if ui
                        .selectable_label(current == *id, format!("{id} - {description}"))
                        .clicked()
                    {
                        state.select_table(*id);
                    }
                }
            });

        ui.separator();

        if let Some(table) = &state.loaded {
            ui.label(format!(
                "{} filas cargadas, {} visibles",
                table.full.len(),
                state.visible().map_or(0, |v| v.len())
            ));
        }

        ui.separator();

        ui.selectable_value(&mut state.tab, CentralTab::Table, "Datos filtrados");
        ui.selectable_value(&mut state.tab, CentralTab::Chart, "Gráfico");

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog<S: TableSource>(state: &mut AppState<S>) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir tabla")
        .add_filter("Tablas", &["csv", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}

pub fn save_file_dialog<S: TableSource>(state: &mut AppState<S>) {
    let file = rfd::FileDialog::new()
        .set_title("Descargar datos filtrados")
        .set_file_name(state.export_name())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export(&path) {
            log::error!("Failed to export: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
