//! Device acquisition for the live input and the playback sink.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize};

use crate::error::{AudioError, Result};

/// Latency the capture stream should be opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyHint {
    /// Smallest buffer the device advertises
    Minimum,
    /// Whatever the host picks
    Default,
}

/// Capture constraints for an instrument input
///
/// cpal hands over the device signal untouched, so the three voice
/// processing switches can only be honoured when they are off.
#[derive(Debug, Clone)]
pub struct InputConstraints {
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
    pub latency: LatencyHint,
}

impl Default for InputConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: false,
            auto_gain_control: false,
            noise_suppression: false,
            latency: LatencyHint::Minimum,
        }
    }
}

/// An opened (not yet running) capture device
pub struct InputStream {
    pub device: cpal::Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
    pub name: String,
}

impl InputStream {
    pub fn sample_rate_hz(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

/// The playback device the sink writes to
pub struct OutputSink {
    pub device: cpal::Device,
    pub config: StreamConfig,
    pub sample_format: SampleFormat,
    pub name: String,
}

/// Request the capture stream.
///
/// `preferred` selects the first input device whose name contains the
/// given text (case-insensitive); `None` takes the host default.
pub fn acquire(
    host: &cpal::Host,
    preferred: Option<&str>,
    constraints: &InputConstraints,
) -> Result<InputStream> {
    if constraints.echo_cancellation || constraints.auto_gain_control || constraints.noise_suppression
    {
        log::warn!("Voice processing is not available on raw capture; input stays unprocessed");
    }

    let device = match preferred {
        Some(wanted) => find_input_device(host, wanted)?,
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no input device found".to_string()))?,
    };

    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", name, e)))?;

    let sample_format = supported.sample_format();
    let mut config = supported.config();
    config.buffer_size = buffer_size_for(supported.buffer_size(), constraints.latency);

    log::info!(
        "Input: {} @ {}Hz, {} ch, {:?}, buffer {:?}",
        name,
        config.sample_rate.0,
        config.channels,
        sample_format,
        config.buffer_size
    );

    Ok(InputStream {
        device,
        config,
        sample_format,
        name,
    })
}

/// Open the default output at the capture sample rate.
///
/// No resampling happens between input and output, so a device that cannot
/// run at `sample_rate_hz` is reported as unavailable.
pub fn open_sink(host: &cpal::Host, sample_rate_hz: u32, latency: LatencyHint) -> Result<OutputSink> {
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceUnavailable("no output device found".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let ranges = device
        .supported_output_configs()
        .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", name, e)))?;

    let rate = SampleRate(sample_rate_hz);
    let mut matching: Vec<_> = ranges
        .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
        .collect();

    // Prefer float output, then the fewest channels
    matching.sort_by_key(|r| (r.sample_format() != SampleFormat::F32, r.channels()));
    let range = matching.into_iter().next().ok_or_else(|| {
        AudioError::DeviceUnavailable(format!("{} cannot play at {}Hz", name, sample_rate_hz))
    })?;

    let supported = range.with_sample_rate(rate);
    let sample_format = supported.sample_format();
    let mut config = supported.config();
    config.buffer_size = buffer_size_for(supported.buffer_size(), latency);

    log::info!(
        "Output: {} @ {}Hz, {} ch, {:?}",
        name,
        config.sample_rate.0,
        config.channels,
        sample_format
    );

    Ok(OutputSink {
        device,
        config,
        sample_format,
        name,
    })
}

/// Names of every input and output device on the host
pub fn list_devices(host: &cpal::Host) -> Result<(Vec<String>, Vec<String>)> {
    let inputs = host
        .input_devices()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();
    let outputs = host
        .output_devices()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();
    Ok((inputs, outputs))
}

fn find_input_device(host: &cpal::Host, wanted: &str) -> Result<cpal::Device> {
    let wanted_lower = wanted.to_lowercase();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name.to_lowercase().contains(&wanted_lower) {
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceUnavailable(format!(
        "no input device matching '{}'",
        wanted
    )))
}

fn buffer_size_for(supported: &SupportedBufferSize, latency: LatencyHint) -> BufferSize {
    match (latency, supported) {
        (LatencyHint::Minimum, SupportedBufferSize::Range { min, max }) => {
            BufferSize::Fixed(minimum_frames(*min, *max))
        }
        _ => BufferSize::Default,
    }
}

/// Some backends advertise a 0 or absurdly small minimum; keep the callback
/// large enough to be schedulable, but never above what the device allows
fn minimum_frames(min: u32, max: u32) -> u32 {
    const FLOOR: u32 = 64;
    min.max(FLOOR).min(max).max(min)
}
