use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{Device, HostApi};
use crate::models::config::StreamConfig;
use crate::models::error::SonometerError;
use crate::models::state::{EngineState, StreamDecision};
use crate::traits::audio_driver::{AudioDriver, ChunkCallback, DriverStream, RawChunk};

/// Host API used when the caller does not pick one.
pub const DEFAULT_API_INDEX: usize = 0;

/// Owns the platform driver and at most one input stream.
///
/// The engine is handed the state lock its callback works under. Every
/// chunk runs the consumer closure while holding that lock, and `stop`
/// takes the same lock with a bounded wait before signalling the stream
/// to complete:
///
/// ```text
/// [driver thread] → lock(shared) → on_chunk(&mut T, chunk) → stop flag? → Continue / Complete
/// [caller]        → try_lock_for(shared, timeout) → set stop flag → unlock → close stream
/// ```
pub struct AudioEngine<D: AudioDriver, T: Send + 'static> {
    driver: D,
    shared: Arc<Mutex<T>>,
    stream: Option<Box<dyn DriverStream>>,
    state: EngineState,
    config: Option<StreamConfig>,
    stop_requested: Arc<AtomicBool>,
    callback_panics: Arc<AtomicU64>,
    selected_api: usize,
    terminated: bool,
}

impl<D: AudioDriver, T: Send + 'static> AudioEngine<D, T> {
    pub fn new(driver: D, shared: Arc<Mutex<T>>) -> Self {
        Self {
            driver,
            shared,
            stream: None,
            state: EngineState::Idle,
            config: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
            callback_panics: Arc::new(AtomicU64::new(0)),
            selected_api: DEFAULT_API_INDEX,
            terminated: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Configuration of the active (or last started) stream.
    pub fn config(&self) -> Option<&StreamConfig> {
        self.config.as_ref()
    }

    /// Panics caught inside the stream callback so far.
    pub fn callback_panics(&self) -> u64 {
        self.callback_panics.load(Ordering::SeqCst)
    }

    pub fn selected_api(&self) -> usize {
        self.selected_api
    }

    pub fn set_selected_api(&mut self, api: usize) {
        self.selected_api = api;
    }

    pub fn list_host_apis(&self) -> Result<Vec<HostApi>, SonometerError> {
        self.driver.host_apis()
    }

    /// Input-capable devices of `api`, or of the selected API when `None`.
    pub fn list_input_devices(&self, api: Option<usize>) -> Result<Vec<Device>, SonometerError> {
        let api = api.unwrap_or(self.selected_api);
        Ok(self
            .driver
            .devices(api)?
            .into_iter()
            .filter(Device::is_input)
            .collect())
    }

    /// Open and start an input stream. Transitions: idle → streaming.
    ///
    /// `on_chunk` runs on the driver thread with the shared state locked.
    /// A panic inside it is caught and logged; the stream keeps running.
    pub fn start<F>(
        &mut self,
        config: StreamConfig,
        device: Option<&Device>,
        on_chunk: F,
    ) -> Result<(), SonometerError>
    where
        F: FnMut(&mut T, RawChunk<'_>) + Send + 'static,
    {
        if self.stream.is_some() || !self.state.is_idle() {
            return Err(SonometerError::AlreadyStreaming);
        }
        if self.terminated {
            return Err(SonometerError::Driver("engine has been terminated".into()));
        }
        config.validate().map_err(SonometerError::ConfigurationFailed)?;
        if let Some(device) = device {
            if !device.is_input() {
                return Err(SonometerError::InvalidDevice(format!(
                    "{} has no input channels",
                    device.name
                )));
            }
        }

        // fresh flag per stream so a stale request cannot end the next one
        let stop_requested = Arc::new(AtomicBool::new(false));
        let callback = Self::wrap_callback(
            Arc::clone(&self.shared),
            Arc::clone(&stop_requested),
            Arc::clone(&self.callback_panics),
            on_chunk,
        );

        let api = device.map(|d| d.api_index).unwrap_or(self.selected_api);
        let mut stream = self.driver.open_input(api, &config, device, callback)?;
        if let Err(e) = stream.start() {
            let _ = stream.close();
            return Err(e);
        }

        log::info!(
            "input stream started: {} Hz, {} ch, {} frames per chunk",
            config.sample_rate,
            config.channels,
            config.frames_per_chunk()
        );
        self.stop_requested = stop_requested;
        self.stream = Some(stream);
        self.config = Some(config);
        self.state = EngineState::Streaming;
        Ok(())
    }

    /// Stop the active stream. Transitions: streaming → stop-pending → idle.
    ///
    /// Waits at most `max(2 × chunk_secs, 1 s)` for the callback lock. On
    /// timeout nothing changes and the caller may retry.
    pub fn stop(&mut self) -> Result<(), SonometerError> {
        if self.stream.is_none() {
            return Err(SonometerError::NotStreaming);
        }
        let timeout = self
            .config
            .map(|c| c.stop_timeout())
            .unwrap_or(Duration::from_secs(1));

        let stream = {
            let Some(_guard) = self.shared.try_lock_for(timeout) else {
                log::warn!("stop timed out after {:?} waiting for the callback", timeout);
                return Err(SonometerError::Timeout);
            };
            self.stop_requested.store(true, Ordering::SeqCst);
            self.state = EngineState::StopPending;
            self.stream.take()
        };

        // Closed outside the lock: drivers may join their callback thread here.
        if let Some(mut stream) = stream {
            if let Err(e) = stream.close() {
                log::warn!("failed to close input stream: {}", e);
            }
        }
        self.state = EngineState::Idle;
        log::info!("input stream stopped");
        Ok(())
    }

    /// Stop any stream and release the driver. Safe to call repeatedly.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        if self.stream.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("stop during terminate failed: {}; closing stream anyway", e);
                if let Some(mut stream) = self.stream.take() {
                    let _ = stream.close();
                }
                self.state = EngineState::Idle;
            }
        }
        self.driver.terminate();
        self.terminated = true;
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn wrap_callback<F>(
        shared: Arc<Mutex<T>>,
        stop_requested: Arc<AtomicBool>,
        panics: Arc<AtomicU64>,
        mut on_chunk: F,
    ) -> ChunkCallback
    where
        F: FnMut(&mut T, RawChunk<'_>) + Send + 'static,
    {
        Box::new(move |chunk: RawChunk<'_>| {
            let mut state = shared.lock();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| on_chunk(&mut *state, chunk)));
            if outcome.is_err() {
                panics.fetch_add(1, Ordering::SeqCst);
                log::error!("chunk handler panicked; continuing capture");
            }
            if stop_requested.swap(false, Ordering::SeqCst) {
                StreamDecision::Complete
            } else {
                StreamDecision::Continue
            }
        })
    }
}

impl<D: AudioDriver, T: Send + 'static> Drop for AudioEngine<D, T> {
    fn drop(&mut self) {
        self.terminate();
    }
}
