//! SVG chart rendering for aggregated benchmark data.
//!
//! Charts are self-contained documents: fixed canvas, inline styles, no
//! external references. Empty input renders nothing rather than failing, so
//! one bad chart never stops the others from being produced.

pub mod bar;
pub mod line;
pub mod scale;
pub mod stacked;
pub mod svg;

pub use bar::render_bar_chart;
pub use line::render_line_chart;
pub use stacked::{render_stacked_area, stack_layers};

use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A named sequence of `(x, y)` points. Order of points does not matter.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    /// Dashed strokes mark model predictions next to measured data.
    pub dashed: bool,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
            dashed: false,
        }
    }

    pub fn dashed(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            dashed: true,
            ..Self::new(name, points)
        }
    }
}

/// Title and axis captions.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    pub title: String,
    pub x: String,
    pub y: String,
}

impl Labels {
    pub fn new(title: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Outcome of rendering one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Svg(String),
    /// Nothing to draw.
    Skipped,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RenderError {
    #[error("x value {0} cannot be placed on a logarithmic axis")]
    NonPositiveLogX(f64),
}

/// Write a rendered chart, creating parent directories. Returns whether a
/// file was written.
pub fn write_chart(path: impl AsRef<Path>, chart: &Rendered) -> anyhow::Result<bool> {
    let path = path.as_ref();
    match chart {
        Rendered::Skipped => {
            debug!(path = %path.display(), "nothing to draw, skipping chart");
            Ok(false)
        }
        Rendered::Svg(svg) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create chart directory {}", dir.display()))?;
            }
            fs::write(path, svg).with_context(|| format!("write chart {}", path.display()))?;
            info!(path = %path.display(), "wrote chart");
            Ok(true)
        }
    }
}

/// Distinct x values across all series, ascending.
pub(crate) fn x_domain(series: &[Series]) -> Vec<f64> {
    let mut xs: Vec<f64> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(x, _)| *x))
        .collect();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    xs
}
