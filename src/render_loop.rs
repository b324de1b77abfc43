//! Per-refresh sample → render driver.
//!
//! The event loop calls [`RenderLoop::frame`] once per display refresh
//! (`RedrawRequested`) and then requests the next redraw; there is no
//! recursion and no cancel handle. Only [`RenderLoop::teardown`] ends it,
//! and a stopped loop cannot be started again.

use crate::audio::AnalysisSampler;
use crate::visualizer::{Canvas, VisualizerRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    frames: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::NotStarted,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Begin ticking. Returns false if the loop was already torn down.
    pub fn start(&mut self) -> bool {
        match self.state {
            LoopState::NotStarted => {
                self.state = LoopState::Running;
                log::debug!("Render loop started");
                true
            }
            LoopState::Running => true,
            LoopState::Stopped => {
                log::warn!("Render loop cannot be restarted after teardown");
                false
            }
        }
    }

    /// One display-refresh tick: sample, then draw at the current size.
    ///
    /// Returns whether the caller should schedule another tick.
    pub fn frame(
        &mut self,
        sampler: &mut AnalysisSampler,
        renderer: &VisualizerRenderer,
        canvas: &mut dyn Canvas,
    ) -> bool {
        if self.state != LoopState::Running {
            return false;
        }

        let snapshot = sampler.sample();
        renderer.render_frame(&snapshot, canvas);
        self.frames += 1;
        true
    }

    /// Process teardown: no further frames
    pub fn teardown(&mut self) {
        if self.state != LoopState::Stopped {
            log::debug!("Render loop stopped after {} frames", self.frames);
        }
        self.state = LoopState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalyserConfig;
    use crate::visualizer::{Rect, Resolution};

    #[derive(Default)]
    struct CountingCanvas {
        clears: usize,
        bars: usize,
    }

    impl Canvas for CountingCanvas {
        fn clear(&mut self) {
            self.clears += 1;
        }

        fn fill_rect(&mut self, _rect: Rect, _color: [f32; 3]) {
            self.bars += 1;
        }
    }

    fn fixtures() -> (AnalysisSampler, VisualizerRenderer) {
        (
            AnalysisSampler::silent(AnalyserConfig::default()),
            VisualizerRenderer::new(Resolution {
                width: 256,
                height: 100,
            }),
        )
    }

    #[test]
    fn test_no_frames_before_start() {
        let (mut sampler, renderer) = fixtures();
        let mut canvas = CountingCanvas::default();
        let mut render_loop = RenderLoop::new();

        assert!(!render_loop.frame(&mut sampler, &renderer, &mut canvas));
        assert_eq!(canvas.clears, 0);
    }

    #[test]
    fn test_each_frame_samples_and_renders() {
        let (mut sampler, renderer) = fixtures();
        let mut canvas = CountingCanvas::default();
        let mut render_loop = RenderLoop::new();

        assert!(render_loop.start());
        for _ in 0..3 {
            assert!(render_loop.frame(&mut sampler, &renderer, &mut canvas));
        }

        assert_eq!(render_loop.frames(), 3);
        assert_eq!(canvas.clears, 3);
        // Silent sampler still yields a full-length snapshot
        assert_eq!(canvas.bars, 3 * 128);
    }

    #[test]
    fn test_teardown_is_final() {
        let (mut sampler, renderer) = fixtures();
        let mut canvas = CountingCanvas::default();
        let mut render_loop = RenderLoop::new();

        render_loop.start();
        render_loop.teardown();
        assert_eq!(render_loop.state(), LoopState::Stopped);
        assert!(!render_loop.start());
        assert!(!render_loop.frame(&mut sampler, &renderer, &mut canvas));
        assert_eq!(canvas.clears, 0);
    }
}
