//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::params::{AnalyserConfig, ControlValues, RecordSource};
use crate::session::SessionConfig;

/// Recording tap point as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Input before EQ and gain
    Raw,
    /// Output of the EQ chain
    Processed,
}

impl From<SourceArg> for RecordSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Raw => RecordSource::Raw,
            SourceArg::Processed => RecordSource::Processed,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "tonescope")]
#[command(about = "Live instrument EQ with spectrum display and recorder", long_about = None)]
pub struct Args {
    /// Initial master volume (0..1)
    #[arg(long, value_name = "GAIN", default_value_t = 1.0)]
    pub volume: f32,

    /// Initial bass shelf gain (dB, -10..10)
    #[arg(long, value_name = "DB", default_value_t = 0.0, allow_negative_numbers = true)]
    pub bass: f32,

    /// Initial mid peak gain (dB, -10..10)
    #[arg(long, value_name = "DB", default_value_t = 0.0, allow_negative_numbers = true)]
    pub mid: f32,

    /// Initial treble shelf gain (dB, -10..10)
    #[arg(long, value_name = "DB", default_value_t = 0.0, allow_negative_numbers = true)]
    pub treble: f32,

    /// Analyser FFT size (power of two, 32..32768)
    #[arg(long, value_name = "SAMPLES", default_value_t = 256)]
    pub fft_size: usize,

    /// Analyser smoothing between frames (0..1)
    #[arg(long, value_name = "FACTOR", default_value_t = 0.8)]
    pub smoothing: f32,

    /// Directory the recording is saved into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Which point of the stream gets recorded
    #[arg(long, value_enum, default_value_t = SourceArg::Raw)]
    pub record_source: SourceArg,

    /// Use the first input device whose name contains this text
    #[arg(long, value_name = "NAME")]
    pub input_device: Option<String>,

    /// Print available audio devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Args {
    /// Build the session configuration, rejecting invalid analyser settings
    pub fn session_config(&self) -> Result<SessionConfig, String> {
        let analyser = AnalyserConfig {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            ..AnalyserConfig::default()
        };
        analyser.validate()?;

        let requested = ControlValues {
            volume: self.volume,
            bass_db: self.bass,
            mid_db: self.mid,
            treble_db: self.treble,
        };
        for (name, value) in [
            ("volume", requested.volume),
            ("bass", requested.bass_db),
            ("mid", requested.mid_db),
            ("treble", requested.treble_db),
        ] {
            if !value.is_finite() {
                return Err(format!("--{} must be a finite number, got {}", name, value));
            }
        }
        let controls = requested.clamped();
        if controls != requested {
            log::warn!("Initial control values clamped to their ranges");
        }

        let mut config = SessionConfig {
            analyser,
            controls,
            input_device: self.input_device.clone(),
            ..SessionConfig::default()
        };
        config.recording.output_dir = self.output_dir.clone();
        config.recording.source = self.record_source.into();

        if !config.recording.output_dir.is_dir() {
            return Err(format!(
                "Output directory {} does not exist",
                config.recording.output_dir.display()
            ));
        }

        Ok(config)
    }
}
