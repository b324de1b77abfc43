//! Biquad EQ filter with browser-compatible coefficients.
//!
//! Shelf and peaking formulas from the Audio EQ Cookbook, with the shelf
//! slope fixed at S = 1 as browser biquad nodes do. State is kept in f64
//! (Direct Form II Transposed) so slow gain sweeps stay quiet.

use std::f64::consts::PI;

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Boost/cut below the corner frequency
    LowShelf,
    /// Boost/cut a band around the centre frequency
    Peaking,
    /// Boost/cut above the corner frequency
    HighShelf,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowShelf => "lowshelf",
            Self::Peaking => "peaking",
            Self::HighShelf => "highshelf",
        }
    }
}

/// Normalised biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn design(kind: FilterKind, frequency_hz: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        if sample_rate <= 0.0 || frequency_hz <= 0.0 || frequency_hz >= nyquist {
            // Corner outside the audible band: the filter degenerates to a
            // plain gain (shelves) or nothing at all (peaking)
            return Self::degenerate(kind, frequency_hz, nyquist, gain_db);
        }

        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * frequency_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::Peaking => {
                let alpha = sin_w0 / (2.0 * q.max(1e-4));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            FilterKind::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * sin_w0 / 2.0 * 2f64.sqrt();
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterKind::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * sin_w0 / 2.0 * 2f64.sqrt();
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        // Normalize by a0
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn degenerate(kind: FilterKind, frequency_hz: f64, nyquist: f64, gain_db: f64) -> Self {
        let gain = 10f64.powf(gain_db / 20.0);
        let whole_band = match kind {
            FilterKind::Peaking => false,
            FilterKind::LowShelf => frequency_hz >= nyquist,
            FilterKind::HighShelf => frequency_hz <= 0.0,
        };

        if whole_band {
            Self {
                b0: gain,
                ..Self::IDENTITY
            }
        } else {
            Self::IDENTITY
        }
    }
}

/// A second-order IIR EQ section
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    frequency_hz: f64,
    q: f64,
    gain_db: f64,
    sample_rate: f64,
    coeffs: Coefficients,

    // State (Direct Form II Transposed)
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(kind: FilterKind, frequency_hz: f32, q: f32, gain_db: f32, sample_rate_hz: u32) -> Self {
        let mut filter = Self {
            kind,
            frequency_hz: frequency_hz as f64,
            q: q as f64,
            gain_db: gain_db as f64,
            sample_rate: sample_rate_hz as f64,
            coeffs: Coefficients::IDENTITY,
            z1: 0.0,
            z2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz as f32
    }

    pub fn q(&self) -> f32 {
        self.q as f32
    }

    /// Change the gain, redesigning only when it actually moved
    #[inline]
    pub fn set_gain_db(&mut self, gain_db: f32) {
        let gain_db = gain_db as f64;
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.update_coefficients();
        }
    }

    fn update_coefficients(&mut self) {
        self.coeffs = Coefficients::design(
            self.kind,
            self.frequency_hz,
            self.q,
            self.gain_db,
            self.sample_rate,
        );
    }

    /// Process a single sample through the filter
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let x = input as f64;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y as f32
    }

    /// Reset filter state
    #[cfg(test)]
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 48_000;

    fn settle_dc(filter: &mut Biquad) -> f32 {
        let mut out = 0.0;
        for _ in 0..20_000 {
            out = filter.process(1.0);
        }
        out
    }

    fn settle_nyquist(filter: &mut Biquad) -> f32 {
        let mut out = 0.0;
        for i in 0..20_000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            out = filter.process(x);
        }
        out.abs()
    }

    fn db(gain: f32) -> f32 {
        20.0 * gain.log10()
    }

    #[test]
    fn test_flat_at_zero_gain() {
        for kind in [FilterKind::LowShelf, FilterKind::Peaking, FilterKind::HighShelf] {
            let mut f = Biquad::new(kind, 1000.0, 0.707, 0.0, FS);
            let out = settle_dc(&mut f);
            assert!((out - 1.0).abs() < 1e-4, "{:?} not flat: {}", kind, out);
        }
    }

    #[test]
    fn test_low_shelf_boosts_dc_only() {
        let mut f = Biquad::new(FilterKind::LowShelf, 500.0, 1.0, 6.0, FS);
        assert!((db(settle_dc(&mut f)) - 6.0).abs() < 0.05);

        f.reset();
        assert!(db(settle_nyquist(&mut f)).abs() < 0.05);
    }

    #[test]
    fn test_high_shelf_boosts_nyquist_only() {
        let mut f = Biquad::new(FilterKind::HighShelf, 3000.0, 1.0, -6.0, FS);
        assert!((db(settle_nyquist(&mut f)) + 6.0).abs() < 0.05);

        f.reset();
        assert!(db(settle_dc(&mut f)).abs() < 0.05);
    }

    #[test]
    fn test_peaking_leaves_extremes_alone() {
        let mut f = Biquad::new(FilterKind::Peaking, 1500.0, 0.707, 9.0, FS);
        assert!(db(settle_dc(&mut f)).abs() < 0.05);
        f.reset();
        assert!(db(settle_nyquist(&mut f)).abs() < 0.05);
    }

    #[test]
    fn test_peaking_boosts_centre() {
        let mut f = Biquad::new(FilterKind::Peaking, 1500.0, 0.707, 6.0, FS);
        let w = 2.0 * std::f32::consts::PI * 1500.0 / FS as f32;

        let mut peak: f32 = 0.0;
        for n in 0..FS as usize {
            let y = f.process((w * n as f32).sin());
            if n > FS as usize / 2 {
                peak = peak.max(y.abs());
            }
        }
        assert!((db(peak) - 6.0).abs() < 0.1, "centre gain {} dB", db(peak));
    }

    #[test]
    fn test_set_gain_skips_redundant_redesign() {
        let mut f = Biquad::new(FilterKind::LowShelf, 500.0, 1.0, 3.0, FS);
        let before = f.coeffs;
        f.set_gain_db(3.0);
        assert_eq!(before, f.coeffs);
        f.set_gain_db(4.0);
        assert_ne!(before, f.coeffs);
    }

    #[test]
    fn test_corner_above_nyquist_degenerates() {
        let mut f = Biquad::new(FilterKind::LowShelf, 30_000.0, 1.0, 6.0, FS);
        assert!((db(settle_nyquist(&mut f)) - 6.0).abs() < 0.01);

        let mut f = Biquad::new(FilterKind::Peaking, 30_000.0, 1.0, 6.0, FS);
        assert_eq!(f.process(0.5), 0.5);
    }
}
