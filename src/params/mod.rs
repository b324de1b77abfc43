//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables live here with:
//! - Physical units (Hz, dB, seconds, pixels)
//! - Documented ranges and meanings
//! - Validation where a bad value would break the audio path

mod audio;
mod eq;
mod render;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig};
pub use eq::{BandConfig, ControlRange, ControlValues, EqConfig};
pub use render::{RecordSource, RecordingConfig, VisualizerConfig};
