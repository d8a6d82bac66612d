use eframe::egui::Ui;
use egui_plot::{Legend, Line, LineStyle, MarkerShape, Plot, PlotPoints, Points, VLine};

use crate::color::{SeriesPalette, CUTOFF_MARKER, EVOLUTION_LINE};
use crate::data::comparison::ComparisonChart;

const EVOLUTION_HEIGHT: f32 = 250.0;
const COMPARISON_HEIGHT: f32 = 300.0;
const MARKER_RADIUS: f32 = 4.0;
/// Interpolated points per segment of a smoothed line.
const SPLINE_STEPS: usize = 12;

// ---------------------------------------------------------------------------
// Single-course charts
// ---------------------------------------------------------------------------

/// Smoothed line with markers for one course series.
pub fn evolution_chart(ui: &mut Ui, id: &str, title: &str, y_label: &str, points: &[[f64; 2]]) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong(title);
    });

    Plot::new(id)
        .height(EVOLUTION_HEIGHT)
        .x_axis_label("Ano")
        .y_axis_label(y_label)
        .x_axis_formatter(|mark, _range| format!("{:.0}", mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(smooth(points, SPLINE_STEPS)))
                    .color(EVOLUTION_LINE)
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(PlotPoints::from(points.to_vec()))
                    .shape(MarkerShape::Circle)
                    .radius(MARKER_RADIUS)
                    .filled(true)
                    .color(EVOLUTION_LINE),
            );
        });
}

// ---------------------------------------------------------------------------
// Comparison chart
// ---------------------------------------------------------------------------

/// All selected courses of one metric, with dotted forecast segments and the
/// cutoff marker.
pub fn comparison_chart(ui: &mut Ui, chart: &ComparisonChart, palette: &SeriesPalette) {
    let metric = chart.metric;
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong(metric.chart_title());
    });

    Plot::new(("comparison_plot", metric.axis_label()))
        .height(COMPARISON_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Ano")
        .y_axis_label(metric.axis_label())
        .x_axis_formatter(|mark, _range| format!("{:.0}", mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.vline(
                VLine::new(chart.cutoff_year())
                    .color(CUTOFF_MARKER)
                    .style(LineStyle::dashed_loose())
                    .name(chart.cutoff_label()),
            );

            for series in &chart.series {
                let color = palette.color_for(series.draw_index);

                plot_ui.line(
                    Line::new(PlotPoints::from(smooth(&series.points, SPLINE_STEPS)))
                        .name(&series.name)
                        .color(color)
                        .width(2.0),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from(series.points.clone()))
                        .name(&series.name)
                        .shape(MarkerShape::Circle)
                        .radius(MARKER_RADIUS)
                        .filled(true)
                        .color(color),
                );

                // Unnamed so the forecast stays out of the legend.
                if let Some(segment) = series.forecast {
                    plot_ui.line(
                        Line::new(PlotPoints::from(segment.to_vec()))
                            .color(color)
                            .width(2.0)
                            .style(LineStyle::dotted_dense()),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from(vec![segment[1]]))
                            .shape(MarkerShape::Circle)
                            .radius(MARKER_RADIUS)
                            .filled(true)
                            .color(color),
                    );
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Spline smoothing
// ---------------------------------------------------------------------------

/// Catmull-Rom interpolation through every input point.
///
/// Produces `steps` points per segment plus the final point. Inputs with
/// fewer than three points are returned unchanged.
pub fn smooth(points: &[[f64; 2]], steps: usize) -> Vec<[f64; 2]> {
    if points.len() < 3 || steps < 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut out = Vec::with_capacity(last * steps + 1);
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        for step in 0..steps {
            let t = step as f64 / steps as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let axis = |k: usize| {
                0.5 * (2.0 * p1[k]
                    + (p2[k] - p0[k]) * t
                    + (2.0 * p0[k] - 5.0 * p1[k] + 4.0 * p2[k] - p3[k]) * t2
                    + (3.0 * p1[k] - p0[k] - 3.0 * p2[k] + p3[k]) * t3)
            };
            out.push([axis(0), axis(1)]);
        }
    }
    out.push(points[last]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_short_input_unchanged() {
        let pts = vec![[2020.0, 1.0], [2021.0, 2.0]];
        assert_eq!(smooth(&pts, SPLINE_STEPS), pts);
        assert!(smooth(&[], SPLINE_STEPS).is_empty());
    }

    #[test]
    fn test_smooth_passes_through_inputs() {
        let pts = vec![[2020.0, 10.0], [2021.0, 12.0], [2022.0, 11.0], [2023.0, 13.0]];
        let out = smooth(&pts, 4);
        assert_eq!(out.len(), 3 * 4 + 1);
        for (i, p) in pts.iter().enumerate() {
            let q = out[i * 4];
            assert!((q[0] - p[0]).abs() < 1e-9 && (q[1] - p[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_smooth_straight_line_stays_straight() {
        let pts: Vec<[f64; 2]> = (0..4).map(|i| [i as f64, 2.0 * i as f64]).collect();
        for [x, y] in smooth(&pts, 5) {
            assert!((y - 2.0 * x).abs() < 1e-9);
        }
    }
}
