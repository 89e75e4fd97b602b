/// Engine stream lifecycle.
///
/// ```text
/// idle → streaming → stop-pending → idle
///            ↑___________________________|
/// ```
///
/// A failed (timed out) stop leaves the engine in `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Streaming,
    StopPending,
}

impl EngineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// Per-invocation answer returned to the driver by the stream callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDecision {
    /// Keep delivering chunks.
    Continue,
    /// Finish the stream after this chunk.
    Complete,
}
