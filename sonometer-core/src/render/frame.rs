use crate::processing::streak::StreakSummary;
use crate::traits::plot_surface::{PlotColor, PlotSurface};

const BAND_ALPHA: f32 = 0.5;

/// Everything needed to draw one view, copied out of the meter state.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    /// Live series in index order.
    pub points: Vec<f64>,
    pub current_pos: usize,
    /// Streaks oldest first; the last one is drawn highlighted.
    pub streaks: Vec<StreakSummary>,
    /// Points routed since the previous frame.
    pub new_points: usize,
}

impl FrameSnapshot {
    pub fn capacity(&self) -> usize {
        self.points.len()
    }
}

/// Draw the live points, the current position and every streak.
pub fn draw_frame(surface: &mut dyn PlotSurface, frame: &FrameSnapshot) {
    surface.clear();
    let capacity = frame.capacity();
    if capacity == 0 {
        return;
    }
    surface.set_x_range(0.0, (capacity - 1) as f64);

    let points: Vec<(f64, f64)> = frame
        .points
        .iter()
        .enumerate()
        .map(|(i, &y)| (i as f64, y))
        .collect();
    surface.markers(&points, PlotColor::Blue);
    if let Some(&current) = frame.points.get(frame.current_pos) {
        surface.markers(&[(frame.current_pos as f64, current)], PlotColor::Red);
    }

    if let Some((last, older)) = frame.streaks.split_last() {
        for streak in older {
            draw_streak(surface, streak, capacity, PlotColor::Yellow);
        }
        draw_streak(surface, last, capacity, PlotColor::Green);
    }
}

/// Shade `mean ± err` over each band of the streak and draw the mean line.
pub fn draw_streak(
    surface: &mut dyn PlotSurface,
    streak: &StreakSummary,
    capacity: usize,
    color: PlotColor,
) {
    let bands = streak.span.bands(capacity);
    if bands.is_empty() {
        return;
    }
    let (mean, err) = (streak.mean, streak.err);

    for (x0, x1) in bands {
        let x = (x0 as f64, x1 as f64);
        surface.line((x.0, mean), (x.1, mean), color);
        surface.fill_between(x, mean - err, mean, color, BAND_ALPHA);
        surface.fill_between(x, mean, mean + err, color, BAND_ALPHA);
    }

    if let Some(label_x) = streak.span.label_x(capacity) {
        surface.text((label_x, mean + err), &streak.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::SonometerError;
    use crate::processing::streak::StreakSpan;
    use std::path::Path;

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear,
        Markers(usize, PlotColor),
        Line(f64, f64, PlotColor),
        Fill(f64, f64),
        Text(f64, String),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl PlotSurface for Recorder {
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn set_x_range(&mut self, _min: f64, _max: f64) {}
        fn markers(&mut self, points: &[(f64, f64)], color: PlotColor) {
            self.ops.push(Op::Markers(points.len(), color));
        }
        fn line(&mut self, from: (f64, f64), to: (f64, f64), color: PlotColor) {
            self.ops.push(Op::Line(from.0, to.0, color));
        }
        fn fill_between(&mut self, x: (f64, f64), _lower: f64, _upper: f64, _color: PlotColor, _alpha: f32) {
            self.ops.push(Op::Fill(x.0, x.1));
        }
        fn text(&mut self, at: (f64, f64), label: &str) {
            self.ops.push(Op::Text(at.0, label.to_string()));
        }
        fn extension(&self) -> &str {
            "rec"
        }
        fn save(&self, _path: &Path) -> Result<(), SonometerError> {
            Ok(())
        }
    }

    fn summary(span: StreakSpan) -> StreakSummary {
        StreakSummary {
            len: 10,
            mean: 2.0,
            err: 0.5,
            span,
            active: false,
        }
    }

    #[test]
    fn wrapped_streak_draws_two_bands_one_label() {
        let mut surface = Recorder::default();
        draw_streak(
            &mut surface,
            &summary(StreakSpan::Wrapped { start: 75, end: 4 }),
            80,
            PlotColor::Green,
        );

        let lines: Vec<_> = surface.ops.iter().filter(|op| matches!(op, Op::Line(..))).collect();
        let fills: Vec<_> = surface.ops.iter().filter(|op| matches!(op, Op::Fill(..))).collect();
        let texts: Vec<_> = surface.ops.iter().filter(|op| matches!(op, Op::Text(..))).collect();
        assert_eq!(lines, vec![&Op::Line(0.0, 4.0, PlotColor::Green), &Op::Line(75.0, 79.0, PlotColor::Green)]);
        assert_eq!(fills.len(), 4);
        assert_eq!(texts, vec![&Op::Text(0.0, "2.00 ± 0.50".into())]);
    }

    #[test]
    fn hidden_streak_draws_nothing() {
        let mut surface = Recorder::default();
        draw_streak(&mut surface, &summary(StreakSpan::Hidden), 80, PlotColor::Green);
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn frame_highlights_current_point_and_last_streak() {
        let frame = FrameSnapshot {
            points: vec![0.0, 1.0, 2.0, 3.0],
            current_pos: 2,
            streaks: vec![
                summary(StreakSpan::Contiguous { start: 0, end: 1 }),
                summary(StreakSpan::Full),
            ],
            new_points: 1,
        };
        let mut surface = Recorder::default();
        draw_frame(&mut surface, &frame);

        assert_eq!(surface.ops[0], Op::Clear);
        assert_eq!(surface.ops[1], Op::Markers(4, PlotColor::Blue));
        assert_eq!(surface.ops[2], Op::Markers(1, PlotColor::Red));
        assert!(surface.ops.contains(&Op::Line(0.0, 1.0, PlotColor::Yellow)));
        assert!(surface.ops.contains(&Op::Line(0.0, 3.0, PlotColor::Green)));
        assert!(surface.ops.contains(&Op::Text(2.0, "2.00 ± 0.50".into())));
    }
}
