use super::stats;

/// Where a streak sits on the circular index axis.
///
/// Exactly one variant applies for any streak; see [`StreakSpan::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakSpan {
    /// Fewer than two samples, or a zero-width run: nothing to draw.
    Hidden,
    /// The streak holds at least `capacity` samples and covers the axis.
    Full,
    /// `start < end`: one band `[start, end]`.
    Contiguous { start: usize, end: usize },
    /// `end < start`: the run crosses the boundary, drawn as `[0, end]`
    /// and `[start, capacity - 1]`.
    Wrapped { start: usize, end: usize },
}

impl StreakSpan {
    pub fn classify(capacity: usize, len: usize, start: usize, end: usize) -> Self {
        if len < 2 {
            Self::Hidden
        } else if len >= capacity {
            Self::Full
        } else if end > start {
            Self::Contiguous { start, end }
        } else if end < start {
            Self::Wrapped { start, end }
        } else {
            Self::Hidden
        }
    }

    /// Closed index intervals to shade, in axis order.
    pub fn bands(&self, capacity: usize) -> Vec<(usize, usize)> {
        match *self {
            Self::Hidden => Vec::new(),
            Self::Full => vec![(0, capacity - 1)],
            Self::Contiguous { start, end } => vec![(start, end)],
            Self::Wrapped { start, end } => vec![(0, end), (start, capacity - 1)],
        }
    }

    /// x position of the streak's single `mean ± err` label.
    pub fn label_x(&self, capacity: usize) -> Option<f64> {
        match *self {
            Self::Hidden => None,
            Self::Full => Some(capacity as f64 / 2.0),
            Self::Contiguous { start, .. } => Some(start as f64),
            Self::Wrapped { .. } => Some(0.0),
        }
    }
}

/// Render-ready digest of a streak, computed under the meter lock.
#[derive(Debug, Clone, PartialEq)]
pub struct StreakSummary {
    pub len: usize,
    pub mean: f64,
    pub err: f64,
    pub span: StreakSpan,
    pub active: bool,
}

impl StreakSummary {
    pub fn label(&self) -> String {
        format!("{:.2} ± {:.2}", self.mean, self.err)
    }
}

/// One operator-delimited recording session.
///
/// Positions live in the same circular index space as the live series so
/// the rendered band lines up with the plotted points. The positional
/// window stops growing once the streak holds `capacity` samples, while
/// `samples` keeps accumulating for the statistics.
#[derive(Debug, Clone)]
pub struct Streak {
    capacity: usize,
    start_pos: Option<usize>,
    end_pos: Option<usize>,
    samples: Vec<f64>,
    frozen: bool,
}

impl Streak {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            start_pos: None,
            end_pos: None,
            samples: Vec::new(),
            frozen: false,
        }
    }

    /// Record the first sample at circular position `pos`.
    pub fn add_first(&mut self, pos: usize, y: f64) {
        if self.frozen {
            log::warn!("ignoring sample for a completed streak");
            return;
        }
        self.start_pos = Some(pos);
        self.end_pos = Some(pos);
        self.samples = vec![y];
    }

    /// Append a sample after [`Streak::add_first`].
    pub fn add(&mut self, y: f64) {
        if self.frozen {
            log::warn!("ignoring sample for a completed streak");
            return;
        }
        let Some(end) = self.end_pos else {
            log::error!("streak received a sample before its first position");
            return;
        };
        if self.samples.len() < self.capacity {
            self.end_pos = Some((end + 1) % self.capacity);
        }
        self.samples.push(y);
    }

    /// Stop accepting samples.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_active(&self) -> bool {
        !self.frozen
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn start_pos(&self) -> Option<usize> {
        self.start_pos
    }

    pub fn end_pos(&self) -> Option<usize> {
        self.end_pos
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.samples)
    }

    pub fn err(&self) -> f64 {
        stats::standard_error(&self.samples)
    }

    pub fn span(&self) -> StreakSpan {
        match (self.start_pos, self.end_pos) {
            (Some(start), Some(end)) => StreakSpan::classify(self.capacity, self.len(), start, end),
            _ => StreakSpan::Hidden,
        }
    }

    pub fn summary(&self) -> StreakSummary {
        StreakSummary {
            len: self.len(),
            mean: self.mean(),
            err: self.err(),
            span: self.span(),
            active: self.is_active(),
        }
    }
}
