use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SonometerError;

/// Sample encoding requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Pcm16,
    Float32,
}

/// Parameters of one input stream.
///
/// The chunk length determines how many frames the driver hands over per
/// callback invocation, see [`StreamConfig::frames_per_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Number of interleaved input channels (default: 1).
    pub channels: u16,

    /// Sample encoding (default: 16-bit PCM).
    pub sample_format: SampleFormat,

    /// Seconds of audio per chunk, one intensity point each (default: 0.3).
    pub chunk_secs: f64,
}

impl StreamConfig {
    pub fn frames_per_chunk(&self) -> usize {
        (self.sample_rate as f64 * self.chunk_secs).round() as usize
    }

    /// Interleaved samples per chunk.
    pub fn samples_per_chunk(&self) -> usize {
        self.frames_per_chunk() * self.channels as usize
    }

    /// Bound on how long `stop` may wait for the callback lock.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs_f64((self.chunk_secs * 2.0).max(1.0))
    }

    pub fn with_chunk_secs(self, chunk_secs: f64) -> Self {
        Self { chunk_secs, ..self }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        if !(self.chunk_secs > 0.0) || !self.chunk_secs.is_finite() {
            return Err(format!("invalid chunk length: {}", self.chunk_secs));
        }
        if self.frames_per_chunk() == 0 {
            return Err("chunk is shorter than one frame".into());
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            sample_format: SampleFormat::Pcm16,
            chunk_secs: 0.3,
        }
    }
}

/// Top-level instrument settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonometerConfig {
    /// Points kept in the rolling view (default: 80).
    pub capacity: usize,

    pub stream: StreamConfig,

    /// Stop a streak automatically once it holds more points than this.
    /// 0 disables the automatic stop.
    pub streak_max_points: usize,

    /// Write each completed streak to a CSV file (default: true).
    pub save_streaks: bool,

    /// Directory receiving streak files and plot captures.
    pub output_directory: PathBuf,

    /// Display refresh period in milliseconds (default: 100).
    pub display_period_ms: u64,

    /// Smallest accepted sampling interval in seconds (default: 0.1).
    pub min_interval_secs: f64,
}

impl SonometerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be positive".into());
        }
        if self.display_period_ms == 0 {
            return Err("display period must be positive".into());
        }
        if self.stream.chunk_secs < self.min_interval_secs {
            return Err(format!(
                "sampling interval {} is below the minimum {}",
                self.stream.chunk_secs, self.min_interval_secs
            ));
        }
        self.stream.validate()
    }

    pub fn display_period(&self) -> Duration {
        Duration::from_millis(self.display_period_ms)
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, SonometerError> {
        let json = fs::read_to_string(path)
            .map_err(|e| SonometerError::ConfigurationFailed(format!("failed to read config: {}", e)))?;
        let config: SonometerConfig = serde_json::from_str(&json)
            .map_err(|e| SonometerError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(SonometerError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for SonometerConfig {
    fn default() -> Self {
        Self {
            capacity: 80,
            stream: StreamConfig::default(),
            streak_max_points: 0,
            save_streaks: true,
            output_directory: PathBuf::from("."),
            display_period_ms: 100,
            min_interval_secs: 0.1,
        }
    }
}
