//! Audio analysis configuration and constants.

/// Spectrum analyser configuration
///
/// Defaults mirror a browser analyser node created with `fftSize: 256`.
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Temporal smoothing between snapshots (0 = none, must be < 1)
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of magnitude bins in each snapshot (fft_size / 2)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if !(audio_constants::MIN_FFT_SIZE..=audio_constants::MAX_FFT_SIZE)
            .contains(&self.fft_size)
        {
            return Err(format!(
                "FFT size must be within {}..={}, got {}",
                audio_constants::MIN_FFT_SIZE,
                audio_constants::MAX_FFT_SIZE,
                self.fft_size
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be within [0, 1), got {}",
                self.smoothing
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            ));
        }
        Ok(())
    }
}

/// Audio constants
pub mod audio_constants {
    /// Time constant for every parameter ramp (seconds)
    pub const RAMP_TIME_CONSTANT_S: f32 = 0.01;

    /// Input → output bridge capacity (seconds of mono audio)
    pub const PLAYBACK_BRIDGE_S: f32 = 0.1;

    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32_768;
}
