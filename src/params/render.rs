//! Visualizer and recording configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Visualizer window configuration
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    /// Initial window width (logical pixels)
    pub window_width: u32,

    /// Initial window height (logical pixels)
    pub window_height: u32,

    /// Background left behind by each frame clear (RGBA, linear)
    pub clear_color: [f64; 4],
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            window_width: 960,
            window_height: 360,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Which point of the stream the recorder listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordSource {
    /// Straight from the input device, before EQ and gain
    #[default]
    Raw,

    /// After EQ and master gain
    Processed,
}

/// Recording configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Directory the finished recording is saved into
    pub output_dir: PathBuf,

    /// File name without extension (extension follows the encoder)
    pub file_stem: String,

    /// Elapsed display / segment collection period
    pub tick_interval: Duration,

    pub source: RecordSource,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_stem: "recording".to_string(),
            tick_interval: Duration::from_millis(10),
            source: RecordSource::Raw,
        }
    }
}

impl RecordingConfig {
    /// Where an artifact with the given file name ends up
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
