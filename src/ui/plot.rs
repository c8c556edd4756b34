use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::color::ColorMap;
use crate::data::filter::PipelineOutcome;
use crate::data::loader::TableSource;
use crate::data::series::{build_series, VALUE_COLUMN};
use crate::state::AppState;

/// Beyond this many lines the chart becomes unreadable; narrow the filters.
const MAX_SERIES: usize = 40;

// ---------------------------------------------------------------------------
// Time-series chart (central panel)
// ---------------------------------------------------------------------------

/// Plot the `Total` column of the filtered rows over the period axis.
pub fn series_plot<S: TableSource>(ui: &mut Ui, state: &AppState<S>) {
    let (Some(table), Some(PipelineOutcome::Filtered(filtered))) = (&state.loaded, &state.outcome)
    else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Nada que representar con la selección actual");
        });
        return;
    };

    let series = build_series(&filtered.view, &table.dims);
    if series.is_empty() {
        ui.label(format!("La tabla no tiene valores numéricos en «{VALUE_COLUMN}»."));
        return;
    }
    if series.len() > MAX_SERIES {
        ui.label(format!(
            "{} series seleccionadas; se muestran las {MAX_SERIES} primeras. Acota los filtros.",
            series.len()
        ));
    }

    let shown = &series[..series.len().min(MAX_SERIES)];
    let colors = ColorMap::new(shown.iter().map(|s| s.name.as_str()));

    Plot::new("series_plot")
        .legend(Legend::default())
        .x_axis_label("Periodo")
        .y_axis_label(VALUE_COLUMN)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for s in shown {
                let points: PlotPoints = s.points.iter().copied().collect();
                let line = Line::new(points)
                    .name(&s.name)
                    .color(colors.color_for(&s.name))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}
