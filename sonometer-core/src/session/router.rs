use std::mem;
use std::path::PathBuf;

use chrono::Local;

use crate::models::audio_models::RouterDiagnostics;
use crate::models::config::SonometerConfig;
use crate::models::error::SonometerError;
use crate::processing::circular_series::CircularStatSeries;
use crate::processing::intensity;
use crate::processing::streak::Streak;
use crate::render::frame::FrameSnapshot;
use crate::storage::streak_file;
use crate::traits::audio_driver::RawChunk;

/// Where completed streaks are written, if anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct StreakPersistence {
    pub enabled: bool,
    pub directory: PathBuf,
}

/// State shared between the driver callback, the display loop and the
/// control surface. Always accessed through one `parking_lot::Mutex`.
///
/// The callback side is [`MeterState::route`]; everything else is a short
/// command run by the control surface with the lock held.
#[derive(Debug)]
pub struct MeterState {
    series: CircularStatSeries,
    recording: bool,
    streaks: Vec<Streak>,
    new_points: usize,
    streak_max_points: usize,
    persistence: StreakPersistence,
    diagnostics: RouterDiagnostics,
    notice: Option<String>,
}

impl MeterState {
    pub fn new(config: &SonometerConfig) -> Self {
        Self {
            series: CircularStatSeries::new(config.capacity),
            recording: false,
            streaks: Vec::new(),
            new_points: 0,
            streak_max_points: config.streak_max_points,
            persistence: StreakPersistence {
                enabled: config.save_streaks,
                directory: config.output_directory.clone(),
            },
            diagnostics: RouterDiagnostics::default(),
            notice: None,
        }
    }

    /// Callback body: reduce the chunk to its intensity and record it.
    pub fn route(&mut self, chunk: RawChunk<'_>) {
        let value = intensity::chunk_intensity(chunk);
        self.record(value);
    }

    /// Advance the live series, feed the active streak and count the point
    /// for display. Bookkeeping problems are logged, never raised.
    pub fn record(&mut self, value: f64) {
        let pos = self.series.push(value);
        self.diagnostics.chunks_routed += 1;

        if self.recording {
            match self.streaks.last_mut() {
                None => {
                    log::error!("tried to record with no streak object");
                    self.diagnostics.orphan_recordings += 1;
                }
                Some(streak) => {
                    if streak.is_empty() {
                        streak.add_first(pos, value);
                    } else {
                        streak.add(value);
                    }
                    self.diagnostics.streak_samples += 1;

                    let len = streak.len();
                    if self.streak_max_points > 0 && len > self.streak_max_points {
                        log::info!("streak reached {} points, stopping", len);
                        self.diagnostics.auto_stops += 1;
                        let notice = match self.stop_streak() {
                            Ok(Some(path)) => format!("Data saved as {}", display_name(&path)),
                            Ok(None) => "Streak stopped".to_string(),
                            Err(e) => format!("Streak stopped but not saved: {}", e),
                        };
                        self.notice = Some(notice);
                    }
                }
            }
        }

        self.new_points += 1;
    }

    pub fn current_pos(&self) -> usize {
        self.series.write_index()
    }

    pub fn series(&self) -> &CircularStatSeries {
        &self.series
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn streaks(&self) -> &[Streak] {
        &self.streaks
    }

    pub fn diagnostics(&self) -> &RouterDiagnostics {
        &self.diagnostics
    }

    pub fn persistence(&self) -> &StreakPersistence {
        &self.persistence
    }

    pub fn set_save_streaks(&mut self, enabled: bool) {
        self.persistence.enabled = enabled;
    }

    pub fn streak_max_points(&self) -> usize {
        self.streak_max_points
    }

    pub fn set_streak_max_points(&mut self, max_points: usize) {
        self.streak_max_points = max_points;
    }

    /// Status left behind by an automatic streak stop, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Begin a new, empty streak.
    pub fn start_streak(&mut self) -> Result<(), SonometerError> {
        if self.recording {
            return Err(SonometerError::Busy("a streak is already being recorded".into()));
        }
        self.streaks.push(Streak::new(self.series.capacity()));
        self.recording = true;
        Ok(())
    }

    /// Freeze the active streak and persist it when enabled.
    ///
    /// Returns the written file. A storage failure is reported after the
    /// streak has already been stopped.
    pub fn stop_streak(&mut self) -> Result<Option<PathBuf>, SonometerError> {
        if !self.recording {
            return Err(SonometerError::Busy("no streak is being recorded".into()));
        }
        self.recording = false;

        let Some(streak) = self.streaks.last_mut() else {
            return Ok(None);
        };
        streak.freeze();

        if !self.persistence.enabled {
            return Ok(None);
        }
        let tag = streak_file::timestamp_tag(&Local::now());
        streak_file::save_streak(&self.persistence.directory, &tag, streak.samples()).map(Some)
    }

    /// Zero the live series and rewind the position.
    pub fn clear_points(&mut self) -> Result<(), SonometerError> {
        if self.recording {
            return Err(SonometerError::Busy("cannot clear points while recording".into()));
        }
        self.series.reset();
        Ok(())
    }

    pub fn clear_streaks(&mut self) -> Result<(), SonometerError> {
        if self.recording {
            return Err(SonometerError::Busy("cannot clear streaks while recording".into()));
        }
        self.streaks.clear();
        Ok(())
    }

    /// Copy of the current view, leaving the new-point count in place.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            points: self.series.values().to_vec(),
            current_pos: self.series.write_index(),
            streaks: self.streaks.iter().map(Streak::summary).collect(),
            new_points: self.new_points,
        }
    }

    /// Return a frame and reset the new-point count, or `None` when
    /// nothing arrived since the last call.
    pub fn take_frame(&mut self) -> Option<FrameSnapshot> {
        let new_points = mem::take(&mut self.new_points);
        if new_points == 0 {
            return None;
        }
        let mut frame = self.snapshot();
        frame.new_points = new_points;
        Some(frame)
    }

    /// Points routed since the last frame was taken.
    pub fn new_points(&self) -> usize {
        self.new_points
    }
}

pub(crate) fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn config(capacity: usize) -> SonometerConfig {
        SonometerConfig {
            capacity,
            save_streaks: false,
            ..Default::default()
        }
    }

    #[test]
    fn route_writes_intensity_at_next_position() {
        let mut state = MeterState::new(&config(80));
        state.route(RawChunk::Pcm16(&[3, 4]));

        assert_eq!(state.current_pos(), 1);
        assert_relative_eq!(state.series().latest(), 5.0);
        assert_eq!(state.diagnostics().chunks_routed, 1);
    }

    #[test]
    fn recording_feeds_last_streak() {
        let mut state = MeterState::new(&config(80));
        state.record(1.0);
        state.start_streak().unwrap();
        state.record(2.0);
        state.record(4.0);

        let streak = &state.streaks()[0];
        assert_eq!(streak.samples(), &[2.0, 4.0]);
        assert_eq!(streak.start_pos(), Some(2));
        assert_eq!(streak.end_pos(), Some(3));
    }

    #[test]
    fn recording_without_streak_is_logged_not_fatal() {
        let mut state = MeterState::new(&config(80));
        state.recording = true;
        state.record(1.0);
        state.record(2.0);

        assert_eq!(state.diagnostics().orphan_recordings, 2);
        assert_eq!(state.current_pos(), 2);
    }

    #[test]
    fn auto_stop_fires_after_exceeding_cap() {
        let mut state = MeterState::new(&config(80));
        state.set_streak_max_points(3);
        state.start_streak().unwrap();

        for _ in 0..3 {
            state.record(1.0);
        }
        assert!(state.is_recording());

        state.record(1.0);
        assert!(!state.is_recording());
        assert_eq!(state.streaks()[0].len(), 4);
        assert!(!state.streaks()[0].is_active());
        assert_eq!(state.diagnostics().auto_stops, 1);
        assert_eq!(state.take_notice().as_deref(), Some("Streak stopped"));

        state.record(1.0);
        assert_eq!(state.streaks()[0].len(), 4);
    }

    #[test]
    fn auto_stop_persists_streak() {
        let dir = std::env::temp_dir().join("sonometer_test_auto_stop");
        fs::remove_dir_all(&dir).ok();
        let mut state = MeterState::new(&SonometerConfig {
            capacity: 10,
            streak_max_points: 1,
            save_streaks: true,
            output_directory: dir.clone(),
            ..Default::default()
        });

        state.start_streak().unwrap();
        state.record(1.5);
        state.record(2.5);

        let notice = state.take_notice().unwrap();
        assert!(notice.starts_with("Data saved as data"), "{}", notice);
        let files: Vec<_> = fs::read_dir(&dir).unwrap().flatten().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read_to_string(files[0].path()).unwrap(), "1.5,2.5\r\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn streak_commands_enforce_ordering() {
        let mut state = MeterState::new(&config(10));
        assert!(matches!(state.stop_streak(), Err(SonometerError::Busy(_))));

        state.start_streak().unwrap();
        assert!(matches!(state.start_streak(), Err(SonometerError::Busy(_))));
        assert!(state.clear_points().is_err());
        assert!(state.clear_streaks().is_err());

        assert_eq!(state.stop_streak().unwrap(), None);
        assert_eq!(state.streaks().len(), 1);
        state.clear_streaks().unwrap();
        assert!(state.streaks().is_empty());
    }

    #[test]
    fn clear_points_rewinds_series() {
        let mut state = MeterState::new(&config(10));
        state.record(3.0);
        state.record(4.0);
        state.clear_points().unwrap();

        assert_eq!(state.current_pos(), 0);
        assert!(state.series().values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn take_frame_resets_new_points() {
        let mut state = MeterState::new(&config(10));
        assert!(state.take_frame().is_none());

        state.record(1.0);
        state.record(2.0);
        let frame = state.take_frame().unwrap();
        assert_eq!(frame.new_points, 2);
        assert_eq!(frame.current_pos, 2);
        assert_eq!(frame.points.len(), 10);

        assert!(state.take_frame().is_none());
        assert_eq!(state.snapshot().new_points, 0);
    }

    #[test]
    fn snapshot_summarises_streaks() {
        let mut state = MeterState::new(&config(10));
        state.start_streak().unwrap();
        state.record(1.0);
        state.record(3.0);

        let frame = state.snapshot();
        assert_eq!(frame.streaks.len(), 1);
        assert_relative_eq!(frame.streaks[0].mean, 2.0);
        assert!(frame.streaks[0].active);
    }

    #[test]
    fn undisplayed_points_do_not_accumulate() {
        let mut state = MeterState::new(&config(80));
        for _ in 0..100_000 {
            state.route(RawChunk::Pcm16(&[3, 4]));
        }

        assert_eq!(state.new_points(), 100_000);
        assert_eq!(state.series().values().len(), 80);

        let frame = state.take_frame().unwrap();
        assert_eq!(frame.new_points, 100_000);
        assert_eq!(frame.points.len(), 80);
        assert_eq!(state.new_points(), 0);
        assert!(state.take_frame().is_none());
    }
}
