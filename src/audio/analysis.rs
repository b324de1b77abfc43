//! Spectrum analysis off the analysis tap.
//!
//! The audio thread copies the chain output into a [`TapBuffer`]; the render
//! loop calls [`AnalysisSampler::sample`] once per frame, which windows the
//! newest `fft_size` samples, runs the FFT and maps magnitudes to bytes the
//! way a browser analyser node does.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use crate::params::AnalyserConfig;

/// Circular store of the most recent time-domain samples
#[derive(Debug)]
pub struct TapBuffer {
    samples: Vec<f32>,
    write_pos: usize,
}

impl TapBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len.max(1)],
            write_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a block, overwriting the oldest samples
    pub fn push(&mut self, block: &[f32]) {
        let len = self.samples.len();

        // Only the tail of an oversized block survives anyway
        let block = if block.len() > len {
            &block[block.len() - len..]
        } else {
            block
        };

        let first = (len - self.write_pos).min(block.len());
        self.samples[self.write_pos..self.write_pos + first].copy_from_slice(&block[..first]);
        let rest = block.len() - first;
        self.samples[..rest].copy_from_slice(&block[first..]);
        self.write_pos = (self.write_pos + block.len()) % len;
    }

    /// Copy the buffer out oldest-first
    pub fn copy_latest(&self, out: &mut [f32]) {
        let len = self.samples.len();
        for (i, slot) in out.iter_mut().enumerate().take(len) {
            *slot = self.samples[(self.write_pos + i) % len];
        }
    }
}

/// Shared handle the audio thread writes through
pub type SharedTap = Arc<Mutex<TapBuffer>>;

pub fn shared_tap(len: usize) -> SharedTap {
    Arc::new(Mutex::new(TapBuffer::new(len)))
}

/// One frame of byte magnitudes, `fft_size / 2` bins, low to high frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySnapshot {
    bins: Vec<u8>,
}

impl FrequencySnapshot {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    pub fn silent(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn is_silent(&self) -> bool {
        self.bins.iter().all(|&b| b == 0)
    }
}

/// Pulls magnitude snapshots from the analysis tap
pub struct AnalysisSampler {
    config: AnalyserConfig,
    tap: Option<SharedTap>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time_domain: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl AnalysisSampler {
    /// Sampler reading from a live tap
    pub fn new(config: AnalyserConfig, tap: SharedTap) -> Self {
        Self::build(config, Some(tap))
    }

    /// Sampler for a session without an audio graph: every snapshot is zero
    pub fn silent(config: AnalyserConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: AnalyserConfig, tap: Option<SharedTap>) -> Self {
        let n = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            window: (0..n).map(|i| blackman_window(i, n)).collect(),
            time_domain: vec![0.0; n],
            spectrum: vec![Complex::new(0.0, 0.0); n],
            scratch,
            smoothed: vec![0.0; config.bin_count()],
            fft,
            tap,
            config,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    #[cfg(test)]
    fn is_live(&self) -> bool {
        self.tap.is_some()
    }

    /// Current magnitude distribution as a fresh snapshot
    pub fn sample(&mut self) -> FrequencySnapshot {
        let Some(tap) = &self.tap else {
            return FrequencySnapshot::silent(self.bin_count());
        };

        match tap.lock() {
            Ok(buffer) => buffer.copy_latest(&mut self.time_domain),
            // A panicked audio callback leaves nothing worth reading
            Err(_) => return FrequencySnapshot::silent(self.bin_count()),
        }

        let n = self.config.fft_size;
        for ((out, &x), &w) in self
            .spectrum
            .iter_mut()
            .zip(&self.time_domain)
            .zip(&self.window)
        {
            *out = Complex::new(x * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let tau = self.config.smoothing;
        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;

        let bins = self
            .smoothed
            .iter_mut()
            .zip(&self.spectrum)
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() / n as f32;
                *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
                if !smoothed.is_finite() {
                    *smoothed = 0.0;
                }
                to_byte(*smoothed, min_db, range_db)
            })
            .collect();

        FrequencySnapshot::new(bins)
    }
}

/// Map a linear magnitude onto 0..=255 across the decibel window
fn to_byte(magnitude: f32, min_db: f32, range_db: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / range_db * (db - min_db)).floor();
    scaled.clamp(0.0, 255.0) as u8
}

/// Blackman window (alpha = 0.16)
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = 2.0 * PI * index as f32 / size as f32;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}
