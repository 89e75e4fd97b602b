use serde::{Deserialize, Serialize};

/// A driver-level host API (ALSA, JACK, WASAPI, CoreAudio, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostApi {
    pub index: usize,
    pub name: String,
    pub device_count: usize,
    pub is_default: bool,
}

/// Immutable snapshot of an audio device as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub api_index: usize,
    pub device_index: usize,
    pub name: String,
    pub max_input_channels: u16,
}

impl Device {
    /// Only devices with at least one input channel can feed the meter.
    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }
}

/// Counters maintained by the sample router, for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterDiagnostics {
    pub chunks_routed: u64,
    pub streak_samples: u64,
    pub orphan_recordings: u64,
    pub auto_stops: u64,
}
