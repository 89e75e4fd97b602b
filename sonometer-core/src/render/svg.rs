use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::models::error::SonometerError;
use crate::traits::plot_surface::{PlotColor, PlotSurface};

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_Y: f64 = 20.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Clone)]
enum Shape {
    Marker { x: f64, y: f64, color: PlotColor },
    Line { from: (f64, f64), to: (f64, f64), color: PlotColor },
    Band { x: (f64, f64), lower: f64, upper: f64, color: PlotColor, alpha: f32 },
    Text { at: (f64, f64), label: String },
}

/// Vector plot surface producing a standalone SVG document.
///
/// Shapes are kept in data coordinates; the y range is fitted to the
/// recorded shapes when the document is generated.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    x_range: (f64, f64),
    shapes: Vec<Shape>,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x_range: (0.0, 1.0),
            shapes: Vec::new(),
        }
    }

    fn y_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut take = |y: f64| {
            if y.is_finite() {
                min = min.min(y);
                max = max.max(y);
            }
        };
        for shape in &self.shapes {
            match shape {
                Shape::Marker { y, .. } => take(*y),
                Shape::Line { from, to, .. } => {
                    take(from.1);
                    take(to.1);
                }
                Shape::Band { lower, upper, .. } => {
                    take(*lower);
                    take(*upper);
                }
                Shape::Text { .. } => {}
            }
        }
        if !min.is_finite() {
            return (0.0, 1.0);
        }
        if max - min < f64::EPSILON {
            return (min - 1.0, max + 1.0);
        }
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }

    /// Render the recorded shapes as an SVG document.
    pub fn to_svg(&self) -> String {
        let (w, h) = (self.width as f64, self.height as f64);
        let (x_min, x_max) = self.x_range;
        let (y_min, y_max) = self.y_range();
        let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
        let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = h - 2.0 * MARGIN_Y;
        let px = |x: f64| MARGIN_LEFT + (x - x_min) / x_span * plot_w;
        let py = |y: f64| MARGIN_Y + (y_max - y) / (y_max - y_min) * plot_h;

        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        );
        let _ = writeln!(out, r#"<rect width="{w}" height="{h}" fill="white"/>"#);
        let _ = writeln!(
            out,
            r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_Y}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
        );

        // y axis in scientific notation
        for i in 0..=Y_TICKS {
            let value = y_min + (y_max - y_min) * i as f64 / Y_TICKS as f64;
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{:.2e}</text>"#,
                MARGIN_LEFT - 4.0,
                py(value) + 4.0,
                value
            );
        }

        for shape in &self.shapes {
            let _ = match shape {
                Shape::Band { x, lower, upper, color, alpha } => {
                    let top = py(lower.max(*upper));
                    let bottom = py(lower.min(*upper));
                    writeln!(
                        out,
                        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="{}"/>"#,
                        px(x.0),
                        top,
                        (px(x.1) - px(x.0)).max(0.0),
                        bottom - top,
                        color.css(),
                        alpha
                    )
                }
                Shape::Line { from, to, color } => writeln!(
                    out,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}"/>"#,
                    px(from.0),
                    py(from.1),
                    px(to.0),
                    py(to.1),
                    color.css()
                ),
                Shape::Marker { x, y, color } => writeln!(
                    out,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="3" fill="{}"/>"#,
                    px(*x),
                    py(*y),
                    color.css()
                ),
                Shape::Text { at, label } => writeln!(
                    out,
                    r#"<text x="{:.2}" y="{:.2}" font-size="12">{}</text>"#,
                    px(at.0),
                    py(at.1),
                    escape(label)
                ),
            };
        }

        out.push_str("</svg>\n");
        out
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

impl PlotSurface for SvgSurface {
    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn set_x_range(&mut self, min: f64, max: f64) {
        self.x_range = (min, max);
    }

    fn markers(&mut self, points: &[(f64, f64)], color: PlotColor) {
        self.shapes
            .extend(points.iter().map(|&(x, y)| Shape::Marker { x, y, color }));
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: PlotColor) {
        self.shapes.push(Shape::Line { from, to, color });
    }

    fn fill_between(&mut self, x: (f64, f64), lower: f64, upper: f64, color: PlotColor, alpha: f32) {
        self.shapes.push(Shape::Band {
            x,
            lower,
            upper,
            color,
            alpha,
        });
    }

    fn text(&mut self, at: (f64, f64), label: &str) {
        self.shapes.push(Shape::Text {
            at,
            label: label.to_string(),
        });
    }

    fn extension(&self) -> &str {
        "svg"
    }

    fn save(&self, path: &Path) -> Result<(), SonometerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SonometerError::StorageError(format!("failed to create directory: {}", e)))?;
        }
        fs::write(path, self.to_svg())
            .map_err(|e| SonometerError::StorageError(format!("failed to write plot: {}", e)))
    }
}
