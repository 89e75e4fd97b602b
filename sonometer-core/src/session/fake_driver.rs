//! In-memory driver double used by the session tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{Device, HostApi};
use crate::models::config::StreamConfig;
use crate::models::error::SonometerError;
use crate::models::state::StreamDecision;
use crate::traits::audio_driver::{AudioDriver, ChunkCallback, DriverStream, RawChunk};

#[derive(Default)]
struct FakeInner {
    callback: Option<ChunkCallback>,
    running: bool,
    completed: bool,
    opened: usize,
    closed: usize,
    terminated: usize,
    fail_open: bool,
    last_config: Option<StreamConfig>,
    last_device: Option<Device>,
    last_api: Option<usize>,
}

/// Driver double: records lifecycle calls and lets tests push chunks
/// through the installed callback.
#[derive(Clone, Default)]
pub(crate) struct FakeDriver {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one chunk the way the driver thread would.
    ///
    /// Returns `None` when no running stream is installed.
    pub fn push(&self, chunk: RawChunk<'_>) -> Option<StreamDecision> {
        let mut callback = {
            let mut inner = self.inner.lock();
            if !inner.running || inner.completed {
                return None;
            }
            inner.callback.take()?
        };
        let decision = callback(chunk);

        let mut inner = self.inner.lock();
        if inner.running {
            inner.callback = Some(callback);
        }
        if decision == StreamDecision::Complete {
            inner.completed = true;
        }
        Some(decision)
    }

    pub fn push_pcm(&self, samples: &[i16]) -> Option<StreamDecision> {
        self.push(RawChunk::Pcm16(samples))
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.inner.lock().fail_open = fail;
    }

    /// Streams opened and not yet closed.
    pub fn open_streams(&self) -> usize {
        let inner = self.inner.lock();
        inner.opened - inner.closed
    }

    pub fn opened(&self) -> usize {
        self.inner.lock().opened
    }

    pub fn terminated(&self) -> usize {
        self.inner.lock().terminated
    }

    pub fn completed(&self) -> bool {
        self.inner.lock().completed
    }

    pub fn last_config(&self) -> Option<StreamConfig> {
        self.inner.lock().last_config
    }

    pub fn last_device(&self) -> Option<Device> {
        self.inner.lock().last_device.clone()
    }

    pub fn last_api(&self) -> Option<usize> {
        self.inner.lock().last_api
    }
}

fn fake_devices(api: usize) -> Vec<Device> {
    vec![
        Device {
            api_index: api,
            device_index: 0,
            name: "Fake Microphone".into(),
            max_input_channels: 2,
        },
        Device {
            api_index: api,
            device_index: 1,
            name: "Fake Speakers".into(),
            max_input_channels: 0,
        },
        Device {
            api_index: api,
            device_index: 2,
            name: "Fake Line In".into(),
            max_input_channels: 1,
        },
    ]
}

impl AudioDriver for FakeDriver {
    fn host_apis(&self) -> Result<Vec<HostApi>, SonometerError> {
        Ok(vec![
            HostApi {
                index: 0,
                name: "Fake".into(),
                device_count: 3,
                is_default: true,
            },
            HostApi {
                index: 1,
                name: "Fake Pro".into(),
                device_count: 3,
                is_default: false,
            },
        ])
    }

    fn devices(&self, api: usize) -> Result<Vec<Device>, SonometerError> {
        if api > 1 {
            return Err(SonometerError::Driver(format!("no host api {}", api)));
        }
        Ok(fake_devices(api))
    }

    fn open_input(
        &mut self,
        api: usize,
        config: &StreamConfig,
        device: Option<&Device>,
        callback: ChunkCallback,
    ) -> Result<Box<dyn DriverStream>, SonometerError> {
        let mut inner = self.inner.lock();
        if inner.fail_open {
            return Err(SonometerError::DeviceNotAvailable);
        }
        inner.callback = Some(callback);
        inner.running = false;
        inner.completed = false;
        inner.opened += 1;
        inner.last_config = Some(*config);
        inner.last_device = device.cloned();
        inner.last_api = Some(api);
        Ok(Box::new(FakeStream {
            inner: Arc::clone(&self.inner),
            closed: false,
        }))
    }

    fn terminate(&mut self) {
        self.inner.lock().terminated += 1;
    }
}

struct FakeStream {
    inner: Arc<Mutex<FakeInner>>,
    closed: bool,
}

impl DriverStream for FakeStream {
    fn start(&mut self) -> Result<(), SonometerError> {
        self.inner.lock().running = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SonometerError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.callback = None;
        inner.closed += 1;
        Ok(())
    }
}
