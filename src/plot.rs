//! Trajectory figures rendered through gnuplot.
//!
//! Requires the `gnuplot` executable at render time; building a figure does
//! not.

use std::path::Path;

use gnuplot::{AxesCommon, Caption, Color, Figure, LineWidth};

use crate::error::ExportError;
use crate::params::PlotMode;
use crate::state::{StateVector, Trajectory};

const WIDTH_PX: u32 = 1000;
const HEIGHT_PX: u32 = 600;

/// Caption, color and accessor of each compartment
const SERIES: [(&str, &str, fn(&StateVector) -> f64); 4] = [
    ("Viral Load (V)", "#FF4B4B", |s| s.v),
    ("Infected Cells (I)", "#4B4BFF", |s| s.i),
    ("CD8+ T Cells (T)", "#2CA02C", |s| s.t),
    ("Antibodies (A)", "#FF4BFF", |s| s.a),
];

/// Build the figure for `mode` without rendering it
pub fn build_figure(trajectory: &Trajectory, mode: PlotMode) -> Figure {
    let mut fg = Figure::new();
    match mode {
        PlotMode::Linear => {
            let axes = fg
                .axes2d()
                .set_title("Viral Infection & Immune Response Dynamics", &[])
                .set_x_label("Time (days)", &[])
                .set_y_label("Population", &[]);
            for (caption, color, value) in SERIES {
                axes.lines(
                    trajectory.times(),
                    trajectory.states().iter().map(value),
                    &[Caption(caption), Color(color.into()), LineWidth(2.0)],
                );
            }
        }
        PlotMode::Log => {
            let axes = fg
                .axes2d()
                .set_title("Viral Infection & Immune Response Dynamics (Log Scale)", &[])
                .set_x_label("Time (days)", &[])
                .set_y_label("Population (log scale)", &[])
                .set_y_log(Some(10.0));
            for (caption, color, value) in SERIES {
                // Zero has no place on a log axis
                let (t, y): (Vec<f64>, Vec<f64>) = trajectory
                    .iter()
                    .map(|(t, s)| (t, value(s)))
                    .filter(|&(_, y)| y > 0.0)
                    .unzip();
                axes.lines(&t, &y, &[Caption(caption), Color(color.into()), LineWidth(2.0)]);
            }
        }
        PlotMode::Phase => {
            let axes = fg
                .axes2d()
                .set_title("Phase Space Analysis", &[])
                .set_x_label("Viral Load (V)", &[])
                .set_y_label("Immune Response", &[])
                .set_x_log(Some(10.0))
                .set_y_log(Some(10.0));
            for (caption, color, value) in [SERIES[2], SERIES[3]] {
                let (x, y): (Vec<f64>, Vec<f64>) = trajectory
                    .states()
                    .iter()
                    .map(|s| (s.v, value(s)))
                    .filter(|&(x, y)| x > 0.0 && y > 0.0)
                    .unzip();
                axes.lines(&x, &y, &[Caption(caption), Color(color.into()), LineWidth(2.0)]);
            }
        }
    }
    fg
}

/// Render `mode` to a PNG file
pub fn save_png<P: AsRef<Path>>(
    trajectory: &Trajectory,
    mode: PlotMode,
    path: P,
) -> Result<(), ExportError> {
    let mut fg = build_figure(trajectory, mode);
    fg.save_to_png(path.as_ref(), WIDTH_PX, HEIGHT_PX)
        .map_err(|e| ExportError::Plot(e.to_string()))?;
    log::info!("Saved {} plot to {}", mode, path.as_ref().display());
    Ok(())
}
