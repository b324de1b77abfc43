//! Error taxonomy for the audio core.
//!
//! None of these are fatal to the process: device failures put the session
//! into degraded (silent) mode, encoder failures disable recording, and bad
//! control input is clamped or dropped where it arrives.

use std::fmt;

#[derive(Debug)]
pub enum AudioError {
    /// No input stream could be obtained (no device, permission denied,
    /// unsupported configuration).
    DeviceUnavailable(String),

    /// Recording has nothing to capture from.
    EncoderUnavailable(String),

    /// A control value that could not be turned into a number.
    InvalidParameterValue { control: String, raw: String },

    /// A stream was obtained but could not be built or started.
    Stream(String),

    /// Settings rejected before any device is touched.
    InvalidConfig(String),

    Io(std::io::Error),

    Encode(hound::Error),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable(reason) => write!(f, "Audio device unavailable: {}", reason),
            Self::EncoderUnavailable(reason) => write!(f, "Encoder unavailable: {}", reason),
            Self::InvalidParameterValue { control, raw } => {
                write!(f, "Invalid value {:?} for control '{}'", raw, control)
            }
            Self::Stream(reason) => write!(f, "Audio stream error: {}", reason),
            Self::InvalidConfig(reason) => write!(f, "Invalid configuration: {}", reason),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Encode(e) => write!(f, "WAV encoding error: {}", e),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AudioError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(e: cpal::BuildStreamError) -> Self {
        Self::Stream(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(e: cpal::PlayStreamError) -> Self {
        Self::Stream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
