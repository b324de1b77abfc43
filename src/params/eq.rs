//! Equalizer topology and control ranges.

use crate::audio::FilterKind;

/// One EQ band of the fixed three-band topology
#[derive(Debug, Clone, Copy)]
pub struct BandConfig {
    pub kind: FilterKind,

    /// Corner (shelves) or centre (peaking) frequency (Hz)
    pub frequency_hz: f32,

    /// Quality factor (only shapes the peaking band)
    pub q: f32,
}

/// Fixed bass → mid → treble layout
#[derive(Debug, Clone)]
pub struct EqConfig {
    pub bass: BandConfig,
    pub mid: BandConfig,
    pub treble: BandConfig,
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            bass: BandConfig {
                kind: FilterKind::LowShelf,
                frequency_hz: 500.0,
                q: 1.0,
            },
            mid: BandConfig {
                kind: FilterKind::Peaking,
                frequency_hz: 1500.0,
                q: std::f32::consts::FRAC_1_SQRT_2,
            },
            treble: BandConfig {
                kind: FilterKind::HighShelf,
                frequency_hz: 3000.0,
                q: 1.0,
            },
        }
    }
}

/// Bounds of a continuous range control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    pub min: f32,
    pub max: f32,

    /// Increment of one keyboard nudge
    pub step: f32,

    pub default: f32,
}

impl ControlRange {
    /// Master volume as a linear gain factor
    pub const VOLUME: ControlRange = ControlRange {
        min: 0.0,
        max: 1.0,
        step: 0.01,
        default: 1.0,
    };

    /// Shelf/peak gain (dB)
    pub const BAND_GAIN_DB: ControlRange = ControlRange {
        min: -10.0,
        max: 10.0,
        step: 0.5,
        default: 0.0,
    };

    /// Clamp onto the range; NaN falls back to the default position
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

/// Initial control positions (what the sliders show at startup)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlValues {
    pub volume: f32,
    pub bass_db: f32,
    pub mid_db: f32,
    pub treble_db: f32,
}

impl Default for ControlValues {
    fn default() -> Self {
        Self {
            volume: ControlRange::VOLUME.default,
            bass_db: ControlRange::BAND_GAIN_DB.default,
            mid_db: ControlRange::BAND_GAIN_DB.default,
            treble_db: ControlRange::BAND_GAIN_DB.default,
        }
    }
}

impl ControlValues {
    /// Clamp every value into its control range
    pub fn clamped(self) -> Self {
        Self {
            volume: ControlRange::VOLUME.clamp(self.volume),
            bass_db: ControlRange::BAND_GAIN_DB.clamp(self.bass_db),
            mid_db: ControlRange::BAND_GAIN_DB.clamp(self.mid_db),
            treble_db: ControlRange::BAND_GAIN_DB.clamp(self.treble_db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_topology() {
        let eq = EqConfig::default();
        assert_eq!(eq.bass.kind, FilterKind::LowShelf);
        assert_eq!(eq.mid.kind, FilterKind::Peaking);
        assert_eq!(eq.treble.kind, FilterKind::HighShelf);
        assert!(eq.bass.frequency_hz < eq.mid.frequency_hz);
        assert!(eq.mid.frequency_hz < eq.treble.frequency_hz);
        assert!((eq.mid.q - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn test_control_values_clamped() {
        let values = ControlValues {
            volume: 3.0,
            bass_db: -40.0,
            mid_db: 2.0,
            treble_db: 11.0,
        }
        .clamped();

        assert_eq!(values.volume, 1.0);
        assert_eq!(values.bass_db, -10.0);
        assert_eq!(values.mid_db, 2.0);
        assert_eq!(values.treble_db, 10.0);
    }

    #[test]
    fn test_nan_clamps_to_default() {
        assert_eq!(ControlRange::VOLUME.clamp(f32::NAN), 1.0);
        assert_eq!(ControlRange::BAND_GAIN_DB.clamp(f32::NAN), 0.0);
        assert_eq!(ControlRange::BAND_GAIN_DB.clamp(f32::INFINITY), 10.0);

        let values = ControlValues {
            volume: f32::NAN,
            ..Default::default()
        }
        .clamped();
        assert_eq!(values.volume, 1.0);
    }
}
