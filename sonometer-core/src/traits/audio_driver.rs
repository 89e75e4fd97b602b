use crate::models::audio_models::{Device, HostApi};
use crate::models::config::StreamConfig;
use crate::models::error::SonometerError;
use crate::models::state::StreamDecision;

/// One chunk of interleaved samples as delivered by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawChunk<'a> {
    Pcm16(&'a [i16]),
    Float32(&'a [f32]),
}

impl RawChunk<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm16(samples) => samples.len(),
            Self::Float32(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sample types a driver may hand over, each mapping onto a [`RawChunk`].
pub trait ChunkSample: Copy + Default + Send + 'static {
    fn as_chunk(samples: &[Self]) -> RawChunk<'_>;
}

impl ChunkSample for i16 {
    fn as_chunk(samples: &[Self]) -> RawChunk<'_> {
        RawChunk::Pcm16(samples)
    }
}

impl ChunkSample for f32 {
    fn as_chunk(samples: &[Self]) -> RawChunk<'_> {
        RawChunk::Float32(samples)
    }
}

/// Callback installed on an input stream.
///
/// Invoked on the driver's own thread, once per filled chunk. The returned
/// decision tells the driver whether to keep the stream running.
pub type ChunkCallback = Box<dyn FnMut(RawChunk<'_>) -> StreamDecision + Send + 'static>;

/// Handle to an opened input stream.
pub trait DriverStream {
    /// Begin delivering chunks to the callback.
    fn start(&mut self) -> Result<(), SonometerError>;

    /// Close the stream and release its driver resources.
    fn close(&mut self) -> Result<(), SonometerError>;
}

/// Interface for platform audio drivers.
///
/// Implemented by:
/// - `CpalDriver` (sonometer-cpal)
/// - `FakeDriver` (tests)
pub trait AudioDriver {
    /// Enumerate host APIs. Read-only.
    fn host_apis(&self) -> Result<Vec<HostApi>, SonometerError>;

    /// Enumerate every device of the given host API, input-capable or not.
    fn devices(&self, api: usize) -> Result<Vec<Device>, SonometerError>;

    /// Open (but do not start) an input stream delivering
    /// `config.frames_per_chunk()` frames per callback.
    ///
    /// `device = None` selects the default input of host API `api`;
    /// otherwise `api` equals `device.api_index`.
    fn open_input(
        &mut self,
        api: usize,
        config: &StreamConfig,
        device: Option<&Device>,
        callback: ChunkCallback,
    ) -> Result<Box<dyn DriverStream>, SonometerError>;

    /// Release all driver resources.
    fn terminate(&mut self);
}
