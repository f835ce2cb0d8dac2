//! Data-to-canvas coordinate mapping.

use super::RenderError;
use super::svg::Frame;

/// Horizontal mapping over the union of all series' x values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XScale {
    min: f64,
    max: f64,
    log: bool,
}

impl XScale {
    /// `None` when there are no x values at all. On a log axis every x must
    /// be positive.
    pub fn fit(xs: &[f64], log: bool) -> Result<Option<Self>, RenderError> {
        if log {
            if let Some(&bad) = xs.iter().find(|&&x| !(x > 0.0)) {
                return Err(RenderError::NonPositiveLogX(bad));
            }
        }
        let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if xs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { min, max, log }))
    }

    /// Fraction of the plot width, in `[0, 1]` for values inside the domain.
    /// A single-valued domain maps everything to the middle.
    pub fn fraction(&self, x: f64) -> f64 {
        if self.max == self.min {
            return 0.5;
        }
        if self.log {
            (x.log2() - self.min.log2()) / (self.max.log2() - self.min.log2())
        } else {
            (x - self.min) / (self.max - self.min)
        }
    }

    pub fn pos(&self, frame: &Frame, x: f64) -> f64 {
        frame.left + self.fraction(x) * frame.plot_width()
    }
}

/// Vertical mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YScale {
    /// `[0, max]`.
    Linear { max: f64 },
    /// Decades `10^min_exp ..= 10^max_exp`.
    Log { min_exp: i32, max_exp: i32 },
}

impl YScale {
    /// Linear range `[0, max(1, 1.1 * max_y)]`.
    pub fn linear(ys: &[f64]) -> Self {
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max = if max_y.is_finite() {
            (max_y * 1.1).max(1.0)
        } else {
            1.0
        };
        YScale::Linear { max }
    }

    /// Decade range from `floor(log10(min positive))` to
    /// `ceil(log10(1.1 * max positive))`, at least one decade wide.
    pub fn log(ys: &[f64]) -> Self {
        let positive: Vec<f64> = ys.iter().copied().filter(|&y| y > 0.0).collect();
        let (lo, hi) = if positive.is_empty() {
            (1.0, 1.0)
        } else {
            (
                positive.iter().copied().fold(f64::INFINITY, f64::min),
                positive.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        let min_exp = lo.log10().floor() as i32;
        let mut max_exp = (hi * 1.1).log10().ceil() as i32;
        if max_exp <= min_exp {
            max_exp = min_exp + 1;
        }
        YScale::Log { min_exp, max_exp }
    }

    pub fn fit(ys: &[f64], log: bool) -> Self {
        if log { Self::log(ys) } else { Self::linear(ys) }
    }

    /// Fraction of the plot height above the baseline. Non-positive values on
    /// a log axis sit on the axis floor.
    pub fn fraction(&self, y: f64) -> f64 {
        match *self {
            YScale::Linear { max } => y / max,
            YScale::Log { min_exp, max_exp } => {
                if y <= 0.0 {
                    return 0.0;
                }
                (y.log10() - min_exp as f64) / (max_exp - min_exp) as f64
            }
        }
    }

    pub fn pos(&self, frame: &Frame, y: f64) -> f64 {
        frame.baseline() - self.fraction(y) * frame.plot_height()
    }

    /// Gridline values with their labels.
    pub fn ticks(&self) -> Vec<(f64, String)> {
        match *self {
            YScale::Linear { max } => (0..=5)
                .map(|i| {
                    let v = max * i as f64 / 5.0;
                    (v, format!("{v:.2}"))
                })
                .collect(),
            YScale::Log { min_exp, max_exp } => (min_exp..=max_exp)
                .map(|p| (10f64.powi(p), format!("10^{p}")))
                .collect(),
        }
    }
}
