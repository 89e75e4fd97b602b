use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::SonometerError;
use crate::render::frame::draw_frame;
use crate::session::router::MeterState;
use crate::traits::plot_surface::PlotSurface;

/// Plot surface shared between the display loop and plot capture.
pub type SharedSurface = Arc<Mutex<Box<dyn PlotSurface>>>;

/// Timer-driven consumer that redraws the view when new points arrive.
///
/// Each tick takes the new-point count out of the meter state with the lock
/// held, then renders after releasing it so the driver callback is never
/// kept waiting on drawing.
pub struct DisplayLoop {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DisplayLoop {
    pub fn spawn(
        shared: Arc<Mutex<MeterState>>,
        surface: SharedSurface,
        period: Duration,
    ) -> Result<Self, SonometerError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("sonometer-display".into())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    thread::sleep(period);
                    Self::tick(&shared, &surface);
                }
            })
            .map_err(|e| SonometerError::Driver(format!("failed to spawn display thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// One refresh. Returns whether anything was drawn.
    pub fn tick(shared: &Mutex<MeterState>, surface: &Mutex<Box<dyn PlotSurface>>) -> bool {
        let (frame, notice) = {
            let mut state = shared.lock();
            (state.take_frame(), state.take_notice())
        };
        if let Some(notice) = notice {
            log::info!("{}", notice);
        }
        let Some(frame) = frame else {
            return false;
        };

        let mut surface = surface.lock();
        draw_frame(&mut **surface, &frame);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DisplayLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
