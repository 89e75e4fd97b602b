//! cpal input driver.
//!
//! Devices are opened with a configuration they actually support: the
//! requested format, channel count and rate are preferred, and whatever the
//! device runs natively is converted in the data callback. Buffers arrive in
//! whatever size the backend chooses, so every stream re-chunks them through
//! a [`ChunkAssembler`] into exactly `frames_per_chunk × channels` samples
//! before calling the chunk callback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use sonometer_core::models::audio_models::{Device, HostApi};
use sonometer_core::models::config::{SampleFormat, StreamConfig};
use sonometer_core::models::error::SonometerError;
use sonometer_core::models::state::StreamDecision;
use sonometer_core::processing::chunk_assembler::ChunkAssembler;
use sonometer_core::traits::audio_driver::{AudioDriver, ChunkCallback, ChunkSample, DriverStream};

/// Audio driver over the cpal hosts available on this platform.
///
/// Host API indices follow the order of `cpal::available_hosts()`; device
/// indices follow the order of `Host::devices()`.
pub struct CpalDriver {
    hosts: Vec<cpal::HostId>,
    terminated: bool,
}

impl CpalDriver {
    pub fn new() -> Self {
        let hosts = cpal::available_hosts();
        log::debug!("cpal hosts: {:?}", hosts);
        Self {
            hosts,
            terminated: false,
        }
    }

    fn host(&self, api: usize) -> Result<cpal::Host, SonometerError> {
        let id = self
            .hosts
            .get(api)
            .copied()
            .ok_or_else(|| SonometerError::InvalidDevice(format!("no host API with index {}", api)))?;
        cpal::host_from_id(id).map_err(|e| SonometerError::Driver(format!("host unavailable: {}", e)))
    }

    /// Resolve a device snapshot back to a live cpal device.
    ///
    /// The name is checked because device order can change between
    /// enumeration and opening.
    fn resolve(&self, device: &Device) -> Result<cpal::Device, SonometerError> {
        let host = self.host(device.api_index)?;
        let found = host
            .devices()
            .map_err(|e| SonometerError::Driver(format!("device enumeration failed: {}", e)))?
            .nth(device.device_index)
            .ok_or(SonometerError::DeviceNotAvailable)?;

        let name = found.name().unwrap_or_default();
        if name != device.name {
            log::warn!(
                "device {} is now '{}', expected '{}'",
                device.device_index,
                name,
                device.name
            );
            return Err(SonometerError::DeviceNotAvailable);
        }
        Ok(found)
    }
}

impl Default for CpalDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDriver for CpalDriver {
    fn host_apis(&self) -> Result<Vec<HostApi>, SonometerError> {
        let default_id = cpal::default_host().id();
        let mut apis = Vec::with_capacity(self.hosts.len());

        for (index, id) in self.hosts.iter().enumerate() {
            let device_count = match cpal::host_from_id(*id) {
                Ok(host) => host.devices().map(|devices| devices.count()).unwrap_or(0),
                Err(e) => {
                    log::warn!("host {} unavailable: {}", id.name(), e);
                    0
                }
            };
            apis.push(HostApi {
                index,
                name: id.name().to_string(),
                device_count,
                is_default: *id == default_id,
            });
        }
        Ok(apis)
    }

    fn devices(&self, api: usize) -> Result<Vec<Device>, SonometerError> {
        let host = self.host(api)?;
        let devices = host
            .devices()
            .map_err(|e| SonometerError::Driver(format!("device enumeration failed: {}", e)))?;

        Ok(devices
            .enumerate()
            .map(|(device_index, device)| Device {
                api_index: api,
                device_index,
                name: device.name().unwrap_or_else(|_| "unknown".into()),
                max_input_channels: max_input_channels(&device),
            })
            .collect())
    }

    fn open_input(
        &mut self,
        api: usize,
        config: &StreamConfig,
        device: Option<&Device>,
        callback: ChunkCallback,
    ) -> Result<Box<dyn DriverStream>, SonometerError> {
        if self.terminated {
            return Err(SonometerError::Driver("driver terminated".into()));
        }

        let device = match device {
            Some(device) => self.resolve(device)?,
            None => self
                .host(api)?
                .default_input_device()
                .ok_or(SonometerError::DeviceNotAvailable)?,
        };
        let name = device.name().unwrap_or_else(|_| "unknown".into());

        let native = negotiate(&device, config)?;
        let kept_channels = native.channels.min(config.channels);
        let delivered = StreamConfig {
            sample_rate: native.sample_rate,
            channels: kept_channels,
            ..*config
        };
        let chunk_len = delivered.samples_per_chunk();
        if chunk_len == 0 {
            return Err(SonometerError::ConfigurationFailed(format!(
                "{} s at {} Hz is less than one frame",
                config.chunk_secs, native.sample_rate
            )));
        }

        log::info!(
            "opening input on '{}': device runs {} Hz, {} ch, {:?}; delivering {:?}, {} ch, {} frames per chunk",
            name,
            native.sample_rate,
            native.channels,
            native.format,
            config.sample_format,
            kept_channels,
            delivered.frames_per_chunk()
        );
        if native.sample_rate != config.sample_rate {
            log::warn!(
                "'{}' does not support {} Hz, sampling at {} Hz",
                name,
                config.sample_rate,
                native.sample_rate
            );
        }

        let channels = (native.channels as usize, kept_channels as usize);
        let stream = match config.sample_format {
            SampleFormat::Pcm16 => {
                build_stream(&device, native, ChunkFeed::<i16>::new(chunk_len, channels, callback))?
            }
            SampleFormat::Float32 => {
                build_stream(&device, native, ChunkFeed::<f32>::new(chunk_len, channels, callback))?
            }
        };
        Ok(Box::new(CpalStream {
            stream: Some(stream),
        }))
    }

    fn terminate(&mut self) {
        if !self.terminated {
            log::debug!("cpal driver terminated");
            self.terminated = true;
        }
    }
}

/// Largest channel count any supported input configuration offers.
fn max_input_channels(device: &cpal::Device) -> u16 {
    device
        .supported_input_configs()
        .map(|configs| configs.map(|range| range.channels()).max().unwrap_or(0))
        .unwrap_or(0)
}

/// One supported input configuration range, detached from its device.
#[derive(Debug, Clone, Copy, PartialEq)]
struct InputRange {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    format: cpal::SampleFormat,
}

/// Configuration the device stream is actually built with.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NativeConfig {
    channels: u16,
    sample_rate: u32,
    format: cpal::SampleFormat,
}

impl NativeConfig {
    fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

/// Native formats the data callback can convert from.
fn is_convertible(format: cpal::SampleFormat) -> bool {
    matches!(
        format,
        cpal::SampleFormat::I16
            | cpal::SampleFormat::I32
            | cpal::SampleFormat::U16
            | cpal::SampleFormat::F32
            | cpal::SampleFormat::F64
    )
}

fn requested_format(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::Pcm16 => cpal::SampleFormat::I16,
        SampleFormat::Float32 => cpal::SampleFormat::F32,
    }
}

/// Pick the supported range closest to `wanted`.
///
/// Running at the requested rate outweighs everything else, then the
/// requested sample format, then the channel count. The rate is clamped
/// into ranges that do not contain it.
fn select_config(ranges: &[InputRange], wanted: &StreamConfig) -> Option<NativeConfig> {
    let wanted_format = requested_format(wanted.sample_format);
    let mut best: Option<(NativeConfig, i32)> = None;

    for range in ranges {
        if range.channels == 0 || range.min_rate > range.max_rate || !is_convertible(range.format) {
            continue;
        }
        let sample_rate = wanted.sample_rate.max(range.min_rate).min(range.max_rate);

        let mut score = 0;
        if sample_rate == wanted.sample_rate {
            score += 100;
        }
        if range.format == wanted_format {
            score += 20;
        }
        if range.channels == wanted.channels {
            score += 10;
        } else if range.channels > wanted.channels {
            score += 5;
        }

        if best.map_or(true, |(_, best_score)| score > best_score) {
            let candidate = NativeConfig {
                channels: range.channels,
                sample_rate,
                format: range.format,
            };
            best = Some((candidate, score));
        }
    }
    best.map(|(config, _)| config)
}

/// Supported configuration for `device`, falling back to its default one.
fn negotiate(device: &cpal::Device, wanted: &StreamConfig) -> Result<NativeConfig, SonometerError> {
    let ranges: Vec<InputRange> = match device.supported_input_configs() {
        Ok(configs) => configs
            .map(|range| InputRange {
                channels: range.channels(),
                min_rate: range.min_sample_rate().0,
                max_rate: range.max_sample_rate().0,
                format: range.sample_format(),
            })
            .collect(),
        Err(e) => {
            log::warn!("cannot list supported input configs: {}", e);
            Vec::new()
        }
    };
    if let Some(native) = select_config(&ranges, wanted) {
        return Ok(native);
    }

    let default = device
        .default_input_config()
        .map_err(|e| SonometerError::ConfigurationFailed(format!("no usable input config: {}", e)))?;
    if !is_convertible(default.sample_format()) {
        return Err(SonometerError::ConfigurationFailed(format!(
            "unsupported sample format {:?}",
            default.sample_format()
        )));
    }
    log::debug!("falling back to the default input config");
    Ok(NativeConfig {
        channels: default.channels(),
        sample_rate: default.sample_rate().0,
        format: default.sample_format(),
    })
}

/// Data-callback body: converts native samples to `T`, keeps the first
/// `kept_channels` of every frame and hands fixed-size chunks on.
///
/// cpal streams cannot end themselves; once the callback asks to complete,
/// remaining buffers are dropped until the owner closes the stream.
struct ChunkFeed<T> {
    assembler: ChunkAssembler<T>,
    scratch: Vec<T>,
    native_channels: usize,
    kept_channels: usize,
    callback: ChunkCallback,
    completed: bool,
}

impl<T: ChunkSample + Sample> ChunkFeed<T> {
    /// `channels` is `(native, kept)`.
    fn new(chunk_len: usize, channels: (usize, usize), callback: ChunkCallback) -> Self {
        Self {
            assembler: ChunkAssembler::new(chunk_len),
            scratch: Vec::with_capacity(chunk_len),
            native_channels: channels.0.max(1),
            kept_channels: channels.1.clamp(1, channels.0.max(1)),
            callback,
            completed: false,
        }
    }

    fn feed<S>(&mut self, data: &[S])
    where
        S: Sample,
        T: FromSample<S>,
    {
        if self.completed {
            return;
        }

        self.scratch.clear();
        if self.kept_channels == self.native_channels {
            self.scratch.extend(data.iter().map(|&s| T::from_sample(s)));
        } else {
            for frame in data.chunks_exact(self.native_channels) {
                self.scratch
                    .extend(frame[..self.kept_channels].iter().map(|&s| T::from_sample(s)));
            }
        }

        let callback = &mut self.callback;
        let completed = &mut self.completed;
        self.assembler.push(&self.scratch, |chunk| {
            if !*completed && callback(T::as_chunk(chunk)) == StreamDecision::Complete {
                *completed = true;
            }
        });
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    native: NativeConfig,
    feed: ChunkFeed<T>,
) -> Result<cpal::Stream, SonometerError>
where
    T: ChunkSample
        + Sample
        + FromSample<i16>
        + FromSample<i32>
        + FromSample<u16>
        + FromSample<f32>
        + FromSample<f64>,
{
    match native.format {
        cpal::SampleFormat::I16 => build_native::<i16, T>(device, native, feed),
        cpal::SampleFormat::I32 => build_native::<i32, T>(device, native, feed),
        cpal::SampleFormat::U16 => build_native::<u16, T>(device, native, feed),
        cpal::SampleFormat::F32 => build_native::<f32, T>(device, native, feed),
        cpal::SampleFormat::F64 => build_native::<f64, T>(device, native, feed),
        other => Err(SonometerError::ConfigurationFailed(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_native<S, T>(
    device: &cpal::Device,
    native: NativeConfig,
    mut feed: ChunkFeed<T>,
) -> Result<cpal::Stream, SonometerError>
where
    S: SizedSample,
    T: ChunkSample + Sample + FromSample<S>,
{
    device
        .build_input_stream(
            &native.stream_config(),
            move |data: &[S], _: &cpal::InputCallbackInfo| feed.feed(data),
            |err| log::error!("input stream error: {}", err),
            None,
        )
        .map_err(|e| SonometerError::ConfigurationFailed(format!("failed to build input stream: {}", e)))
}

/// Owned cpal input stream.
struct CpalStream {
    stream: Option<cpal::Stream>,
}

impl DriverStream for CpalStream {
    fn start(&mut self) -> Result<(), SonometerError> {
        let stream = self.stream.as_ref().ok_or(SonometerError::NotStreaming)?;
        stream
            .play()
            .map_err(|e| SonometerError::Driver(format!("failed to start stream: {}", e)))
    }

    fn close(&mut self) -> Result<(), SonometerError> {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pause before close failed: {}", e);
            }
            // Dropping the stream joins the backend's callback thread.
            drop(stream);
        }
        Ok(())
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use sonometer_core::traits::audio_driver::RawChunk;

    fn range(channels: u16, rates: (u32, u32), format: cpal::SampleFormat) -> InputRange {
        InputRange {
            channels,
            min_rate: rates.0,
            max_rate: rates.1,
            format,
        }
    }

    /// Callback recording each chunk as f64 values; completes on chunk `stop_at`.
    fn recorder(stop_at: Option<usize>) -> (ChunkCallback, Arc<Mutex<Vec<Vec<f64>>>>) {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&chunks);
        let callback: ChunkCallback = Box::new(move |chunk: RawChunk<'_>| {
            let values: Vec<f64> = match chunk {
                RawChunk::Pcm16(samples) => samples.iter().map(|&s| s as f64).collect(),
                RawChunk::Float32(samples) => samples.iter().map(|&s| s as f64).collect(),
            };
            let mut seen = seen.lock();
            seen.push(values);
            if Some(seen.len()) == stop_at {
                StreamDecision::Complete
            } else {
                StreamDecision::Continue
            }
        });
        (callback, chunks)
    }

    #[test]
    fn shared_mode_float_device_is_accepted() {
        let ranges = [range(2, (48_000, 48_000), cpal::SampleFormat::F32)];
        let native = select_config(&ranges, &StreamConfig::default()).unwrap();
        assert_eq!(
            native,
            NativeConfig {
                channels: 2,
                sample_rate: 48_000,
                format: cpal::SampleFormat::F32,
            }
        );
    }

    #[test]
    fn exact_match_is_preferred() {
        let ranges = [
            range(2, (8_000, 96_000), cpal::SampleFormat::F32),
            range(2, (44_100, 44_100), cpal::SampleFormat::I16),
            range(1, (8_000, 96_000), cpal::SampleFormat::I16),
        ];
        let native = select_config(&ranges, &StreamConfig::default()).unwrap();
        assert_eq!(native.channels, 1);
        assert_eq!(native.sample_rate, 44_100);
        assert_eq!(native.format, cpal::SampleFormat::I16);
    }

    #[test]
    fn requested_rate_outweighs_format() {
        let ranges = [
            range(1, (48_000, 48_000), cpal::SampleFormat::I16),
            range(1, (8_000, 96_000), cpal::SampleFormat::F32),
        ];
        let native = select_config(&ranges, &StreamConfig::default()).unwrap();
        assert_eq!(native.format, cpal::SampleFormat::F32);
        assert_eq!(native.sample_rate, 44_100);
    }

    #[test]
    fn unusable_ranges_yield_nothing() {
        let ranges = [
            range(1, (44_100, 44_100), cpal::SampleFormat::U8),
            range(0, (44_100, 44_100), cpal::SampleFormat::I16),
            range(1, (48_000, 8_000), cpal::SampleFormat::I16),
        ];
        assert_eq!(select_config(&ranges, &StreamConfig::default()), None);
        assert_eq!(select_config(&[], &StreamConfig::default()), None);
    }

    #[test]
    fn feed_rechunks_driver_buffers() {
        let (callback, chunks) = recorder(None);
        let mut feed = ChunkFeed::<i16>::new(4, (1, 1), callback);

        feed.feed(&[1i16, 2, 3]);
        assert!(chunks.lock().is_empty());
        feed.feed(&[4i16, 5, 6, 7, 8, 9]);

        assert_eq!(
            *chunks.lock(),
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]
        );
        assert_eq!(feed.assembler.pending(), 1);
    }

    #[test]
    fn feed_goes_silent_after_complete() {
        let (callback, chunks) = recorder(Some(2));
        let mut feed = ChunkFeed::<i16>::new(2, (1, 1), callback);

        feed.feed(&[1i16, 1, 2, 2, 3, 3]);
        assert!(feed.completed);
        assert_eq!(chunks.lock().len(), 2);

        feed.feed(&[4i16, 4, 5, 5]);
        assert_eq!(chunks.lock().len(), 2);
    }

    #[test]
    fn feed_keeps_first_channel_of_stereo_input() {
        let (callback, chunks) = recorder(None);
        let mut feed = ChunkFeed::<f32>::new(2, (2, 1), callback);

        feed.feed(&[0.5f32, -1.0, 0.25, -1.0]);
        assert_eq!(*chunks.lock(), vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn float_input_is_scaled_to_pcm16() {
        let (callback, chunks) = recorder(None);
        let mut feed = ChunkFeed::<i16>::new(2, (1, 1), callback);

        feed.feed(&[0.5f32, 0.0]);
        let chunks = chunks.lock();
        assert!((16_383.0..=16_384.0).contains(&chunks[0][0]));
        assert_eq!(chunks[0][1], 0.0);
    }

    #[test]
    fn native_config_maps_onto_cpal() {
        let native = NativeConfig {
            channels: 2,
            sample_rate: 48_000,
            format: cpal::SampleFormat::F32,
        };
        let cpal_config = native.stream_config();
        assert_eq!(cpal_config.channels, 2);
        assert_eq!(cpal_config.sample_rate, cpal::SampleRate(48_000));
        assert_eq!(cpal_config.buffer_size, cpal::BufferSize::Default);
    }

    #[test]
    fn unknown_host_index_is_invalid() {
        let driver = CpalDriver::new();
        let index = driver.hosts.len();
        assert!(matches!(driver.devices(index), Err(SonometerError::InvalidDevice(_))));
    }

    #[test]
    fn terminated_driver_refuses_streams() {
        let mut driver = CpalDriver::new();
        driver.terminate();
        driver.terminate();
        let callback: ChunkCallback = Box::new(|_| StreamDecision::Continue);
        let result = driver.open_input(0, &StreamConfig::default(), None, callback);
        assert!(matches!(result, Err(SonometerError::Driver(_))));
    }
}
