//! Click-free parameter smoothing.
//!
//! A ramp follows `v(t) = target + (v0 - target) * e^(-(t - t0) / tau)`,
//! evaluated one audio sample at a time. Retargeting restarts the curve
//! from the value the ramp currently holds, so a new target never produces
//! a step in the output.

/// Exponential approach of an audio-rate parameter toward a target
#[derive(Debug, Clone)]
pub struct ParameterRamp {
    current: f32,
    target: f32,
    /// Per-sample decay factor e^(-1 / (tau * fs))
    decay: f32,
}

/// Below this distance the ramp lands exactly on its target
const SETTLE_EPSILON: f32 = 1e-6;

impl ParameterRamp {
    /// Create a ramp resting at `initial`
    pub fn new(initial: f32, time_constant_s: f32, sample_rate_hz: u32) -> Self {
        Self {
            current: initial,
            target: initial,
            decay: decay_per_sample(time_constant_s, sample_rate_hz),
        }
    }

    /// Aim at a new target from the current audio-clock position.
    ///
    /// Non-finite targets are ignored; the ramp keeps its previous target.
    pub fn set_target(&mut self, target: f32) {
        if target.is_finite() {
            self.target = target;
        }
    }

    /// Advance one sample and return the new value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.is_settled() {
            return self.current;
        }

        let next = self.target + (self.current - self.target) * self.decay;
        // Once the remaining step rounds away in f32 the curve has stalled
        // one ulp short; land on the target instead
        if next == self.current
            || (next - self.target).abs() <= SETTLE_EPSILON * self.target.abs().max(1.0)
        {
            self.current = self.target;
        } else {
            self.current = next;
        }
        self.current
    }

    /// Advance `frames` samples without reading them
    pub fn advance(&mut self, frames: usize) {
        for _ in 0..frames {
            if self.is_settled() {
                break;
            }
            self.next_value();
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }
}

fn decay_per_sample(time_constant_s: f32, sample_rate_hz: u32) -> f32 {
    let samples = time_constant_s * sample_rate_hz.max(1) as f32;
    if samples <= 0.0 {
        // Zero time constant: jump straight to the target
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}
