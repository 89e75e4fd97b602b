use std::path::Path;

use crate::models::error::SonometerError;

/// Colors used by the meter view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotColor {
    Blue,
    Red,
    Green,
    Yellow,
}

impl PlotColor {
    pub fn css(&self) -> &'static str {
        match self {
            Self::Blue => "#1f77b4",
            Self::Red => "#d62728",
            Self::Green => "green",
            Self::Yellow => "yellow",
        }
    }
}

/// Rendering surface consuming intensity points and streak bands.
///
/// Coordinates are in data space: x is the circular buffer index, y the
/// intensity. The surface owns scaling.
pub trait PlotSurface: Send {
    fn clear(&mut self);

    /// Fix the x range to `[0, capacity - 1]`.
    fn set_x_range(&mut self, min: f64, max: f64);

    fn markers(&mut self, points: &[(f64, f64)], color: PlotColor);

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: PlotColor);

    /// Shade the rectangle `[x0, x1] × [lower, upper]`.
    fn fill_between(&mut self, x: (f64, f64), lower: f64, upper: f64, color: PlotColor, alpha: f32);

    fn text(&mut self, at: (f64, f64), label: &str);

    /// File extension of the saved image, without the dot.
    fn extension(&self) -> &str;

    /// Write the current view to `path`.
    fn save(&self, path: &Path) -> Result<(), SonometerError>;
}
