use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use crate::models::audio_models::{Device, HostApi, RouterDiagnostics};
use crate::models::command_status::CommandStatus;
use crate::models::config::{SonometerConfig, StreamConfig};
use crate::models::error::SonometerError;
use crate::models::state::EngineState;
use crate::render::frame::draw_frame;
use crate::session::display::{DisplayLoop, SharedSurface};
use crate::session::engine::AudioEngine;
use crate::session::router::{display_name, MeterState};
use crate::storage::streak_file;
use crate::traits::audio_driver::{AudioDriver, RawChunk};
use crate::traits::plot_surface::PlotSurface;

/// Attempts made to recreate the stream when the interval changes.
const MAX_RESTART_ATTEMPTS: usize = 3;

/// The instrument: engine, shared meter state, display loop and the
/// command surface used by a UI.
///
/// Every command takes the meter lock for its whole (short) run and
/// reports a [`CommandStatus`] instead of failing.
///
/// ```text
/// [driver] → AudioEngine callback → MeterState::route ─┐
///                                                      ├─ Arc<Mutex<MeterState>>
/// [UI] → Sonometer commands ───────────────────────────┤
/// [DisplayLoop] → take_frame → draw_frame ─────────────┘
/// ```
pub struct Sonometer<D: AudioDriver> {
    engine: AudioEngine<D, MeterState>,
    shared: Arc<Mutex<MeterState>>,
    surface: SharedSurface,
    config: SonometerConfig,
    device: Option<Device>,
    display: Option<DisplayLoop>,
}

impl<D: AudioDriver> Sonometer<D> {
    pub fn new(
        driver: D,
        config: SonometerConfig,
        surface: Box<dyn PlotSurface>,
    ) -> Result<Self, SonometerError> {
        config.validate().map_err(SonometerError::ConfigurationFailed)?;

        let shared = Arc::new(Mutex::new(MeterState::new(&config)));
        let engine = AudioEngine::new(driver, Arc::clone(&shared));

        Ok(Self {
            engine,
            shared,
            surface: Arc::new(Mutex::new(surface)),
            config,
            device: None,
            display: None,
        })
    }

    /// Start sampling with the configured interval and device.
    pub fn start(&mut self) -> CommandStatus {
        match self.start_stream(self.config.stream) {
            Ok(()) => CommandStatus::ok("Sonometer started"),
            Err(e) => {
                log::error!("failed to start input stream: {}", e);
                CommandStatus::failed(format!("Unable to start sampling: {}", e))
            }
        }
    }

    /// Spawn the periodic display refresh.
    pub fn start_display(&mut self) -> Result<(), SonometerError> {
        if self.display.is_some() {
            return Ok(());
        }
        self.display = Some(DisplayLoop::spawn(
            Arc::clone(&self.shared),
            Arc::clone(&self.surface),
            self.config.display_period(),
        )?);
        Ok(())
    }

    pub fn start_streak(&self) -> CommandStatus {
        match self.shared.lock().start_streak() {
            Ok(()) => CommandStatus::ok("Recording streak"),
            Err(_) => CommandStatus::failed("A streak is already being recorded"),
        }
    }

    pub fn stop_streak(&self) -> CommandStatus {
        match self.shared.lock().stop_streak() {
            Ok(Some(path)) => CommandStatus::ok(format!("Data saved as {}", display_name(&path))),
            Ok(None) => CommandStatus::ok("Streak stopped"),
            Err(SonometerError::Busy(_)) => CommandStatus::failed("No streak is being recorded"),
            Err(e) => {
                log::error!("failed to save streak: {}", e);
                CommandStatus::failed(format!("Streak stopped but not saved: {}", e))
            }
        }
    }

    pub fn clear_points(&self) -> CommandStatus {
        match self.shared.lock().clear_points() {
            Ok(()) => CommandStatus::ok("Points cleared"),
            Err(_) => CommandStatus::failed("Stop the streak before clearing points"),
        }
    }

    pub fn clear_streaks(&self) -> CommandStatus {
        match self.shared.lock().clear_streaks() {
            Ok(()) => CommandStatus::ok("Streaks cleared"),
            Err(_) => CommandStatus::failed("Stop the streak before clearing streaks"),
        }
    }

    /// Change the sampling interval by recreating the stream.
    ///
    /// Values below the minimum are rejected before anything is torn down.
    pub fn change_interval(&mut self, secs: f64) -> CommandStatus {
        if secs == self.config.stream.chunk_secs {
            return CommandStatus::failed("Selected interval has not changed");
        }
        let stream = match self.interval_config(secs) {
            Ok(stream) => stream,
            Err(SonometerError::InvalidInterval(_, min)) => {
                return CommandStatus::failed(format!("Too small sampling ignored (min. {}).", min));
            }
            Err(e) => return CommandStatus::failed(format!("Invalid interval: {}", e)),
        };

        if self.engine.state().is_idle() {
            self.config.stream = stream;
            return CommandStatus::ok(format!("Sampling interval set to {}", secs));
        }

        for attempt in 1..=MAX_RESTART_ATTEMPTS {
            match self.restart_stream(stream) {
                Ok(()) => {
                    self.config.stream = stream;
                    log::info!("sampling interval set to {} s", secs);
                    return CommandStatus::ok(format!("Sampling interval set to {}", secs));
                }
                Err(e) => log::warn!("interval change attempt {} failed: {}", attempt, e),
            }
        }

        if self.engine.state().is_idle() {
            if let Err(e) = self.start_stream(self.config.stream) {
                log::error!("failed to restore previous stream: {}", e);
            }
        }
        CommandStatus::failed("Unable to change the interval.")
    }

    /// Save the current view next to the streak files.
    pub fn capture_plot(&self) -> CommandStatus {
        let state = self.shared.lock();
        let frame = state.snapshot();
        let tag = streak_file::timestamp_tag(&Local::now());

        let mut surface = self.surface.lock();
        draw_frame(&mut **surface, &frame);
        let name = streak_file::plot_file_name(&tag, surface.extension());
        let path = self.config.output_directory.join(&name);
        let status = match surface.save(&path) {
            Ok(()) => CommandStatus::ok(format!("Plot saved as {}", name)),
            Err(e) => {
                log::error!("failed to save plot: {}", e);
                CommandStatus::failed(format!("Unable to save plot: {}", e))
            }
        };
        drop(surface);
        drop(state);
        status
    }

    pub fn set_save_streaks(&mut self, enabled: bool) -> CommandStatus {
        self.shared.lock().set_save_streaks(enabled);
        self.config.save_streaks = enabled;
        if enabled {
            CommandStatus::ok("Completed streaks will be saved")
        } else {
            CommandStatus::ok("Completed streaks will not be saved")
        }
    }

    /// Automatic streak stop threshold; 0 disables it.
    pub fn set_streak_max_points(&mut self, max_points: usize) -> CommandStatus {
        self.shared.lock().set_streak_max_points(max_points);
        self.config.streak_max_points = max_points;
        if max_points == 0 {
            CommandStatus::ok("Automatic streak stop disabled")
        } else {
            CommandStatus::ok(format!("Streaks stop after {} points", max_points))
        }
    }

    pub fn list_host_apis(&self) -> Result<Vec<HostApi>, SonometerError> {
        self.engine.list_host_apis()
    }

    pub fn list_input_devices(&self, api: Option<usize>) -> Result<Vec<Device>, SonometerError> {
        self.engine.list_input_devices(api)
    }

    pub fn select_api(&mut self, api: usize) {
        self.engine.set_selected_api(api);
    }

    /// Device used by the next (re)start; `None` selects the driver default.
    pub fn select_device(&mut self, device: Option<Device>) -> CommandStatus {
        match device {
            Some(device) if !device.is_input() => {
                CommandStatus::failed(format!("{} has no input channels", device.name))
            }
            Some(device) => {
                let message = format!("Using {}", device.name);
                self.device = Some(device);
                CommandStatus::ok(message)
            }
            None => {
                self.device = None;
                CommandStatus::ok("Using the default input device")
            }
        }
    }

    /// Stop the display loop and release the driver.
    pub fn shutdown(&mut self) -> CommandStatus {
        if let Some(mut display) = self.display.take() {
            display.stop();
        }
        self.engine.terminate();
        CommandStatus::ok("Sonometer stopped")
    }

    pub fn interval(&self) -> f64 {
        self.config.stream.chunk_secs
    }

    pub fn config(&self) -> &SonometerConfig {
        &self.config
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().is_recording()
    }

    pub fn diagnostics(&self) -> RouterDiagnostics {
        self.shared.lock().diagnostics().clone()
    }

    pub fn callback_panics(&self) -> u64 {
        self.engine.callback_panics()
    }

    /// Handle to the meter state, e.g. for a UI that renders on its own.
    pub fn shared(&self) -> Arc<Mutex<MeterState>> {
        Arc::clone(&self.shared)
    }

    fn interval_config(&self, secs: f64) -> Result<StreamConfig, SonometerError> {
        let min = self.config.min_interval_secs;
        if !(secs >= min) {
            return Err(SonometerError::InvalidInterval(secs, min));
        }
        let stream = self.config.stream.with_chunk_secs(secs);
        stream.validate().map_err(SonometerError::ConfigurationFailed)?;
        Ok(stream)
    }

    fn start_stream(&mut self, stream: StreamConfig) -> Result<(), SonometerError> {
        self.engine.start(
            stream,
            self.device.as_ref(),
            |state: &mut MeterState, chunk: RawChunk<'_>| state.route(chunk),
        )
    }

    fn restart_stream(&mut self, stream: StreamConfig) -> Result<(), SonometerError> {
        if !self.engine.state().is_idle() {
            self.engine.stop()?;
        }
        self.start_stream(stream)
    }
}
