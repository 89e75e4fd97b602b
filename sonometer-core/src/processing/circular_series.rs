use super::stats;

/// Fixed-capacity circular array of scalar samples.
///
/// The write index advances modulo capacity before every write, so
/// `buffer[write_index]` always holds the most recent sample and the first
/// sample after a reset lands at index 1. There is no fill tracking: the
/// series is treated as logically full and silently overwrites its oldest
/// entry. Wrap in `Arc<parking_lot::Mutex<..>>` (via the meter state) for
/// cross-thread access.
#[derive(Debug, Clone)]
pub struct CircularStatSeries {
    buffer: Vec<f64>,
    write_index: usize,
    capacity: usize,
}

impl CircularStatSeries {
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "series capacity must be positive");
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
            capacity,
        }
    }

    /// Advance the write index and store `value` there. Returns the index written.
    pub fn push(&mut self, value: f64) -> usize {
        self.write_index = (self.write_index + 1) % self.capacity;
        self.buffer[self.write_index] = value;
        self.write_index
    }

    /// Index of the most recent sample.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// The most recent sample.
    pub fn latest(&self) -> f64 {
        self.buffer[self.write_index]
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.buffer.get(index).copied()
    }

    /// Raw buffer in index order, as plotted.
    pub fn values(&self) -> &[f64] {
        &self.buffer
    }

    /// All entries from oldest to newest, starting just after the write index.
    pub fn chronological(&self) -> Vec<f64> {
        let start = (self.write_index + 1) % self.capacity;
        self.buffer[start..]
            .iter()
            .chain(self.buffer[..start].iter())
            .copied()
            .collect()
    }

    pub fn mean(&self) -> f64 {
        stats::mean(&self.buffer)
    }

    pub fn err(&self) -> f64 {
        stats::standard_error(&self.buffer)
    }

    /// Zero every entry and rewind the write index.
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|v| *v = 0.0);
        self.write_index = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
