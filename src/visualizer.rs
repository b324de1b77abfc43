//! Spectrum bar chart layout.
//!
//! The renderer knows nothing about audio or GPUs: it turns a
//! [`FrequencySnapshot`] into clear + filled rectangles on any [`Canvas`].

use crate::audio::FrequencySnapshot;

/// Backing-store size of the drawing surface (physical pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in canvas pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 2D drawing surface
pub trait Canvas {
    /// Wipe the whole surface
    fn clear(&mut self);

    /// Fill a rectangle with an sRGB colour (components in 0..=1)
    fn fill_rect(&mut self, rect: Rect, color: [f32; 3]);
}

/// Convert HSL (hue in degrees, any range) to sRGB
pub fn hsl_to_rgb(hue_deg: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let h = hue_deg.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Hue sweep across the full bar height (degrees; wraps past red)
const HUE_SPAN_DEG: f32 = 400.0;

/// Maps magnitude snapshots to bar-chart frames
#[derive(Debug, Clone)]
pub struct VisualizerRenderer {
    resolution: Resolution,
}

impl VisualizerRenderer {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Recompute the backing resolution from display size and pixel density
    pub fn resize(&mut self, display_width: f64, display_height: f64, pixel_density: f64) -> Resolution {
        self.resolution = Resolution {
            width: scaled(display_width, pixel_density),
            height: scaled(display_height, pixel_density),
        };
        self.resolution
    }

    /// Draw at the current backing resolution
    pub fn render_frame(&self, snapshot: &FrequencySnapshot, canvas: &mut dyn Canvas) {
        self.render(
            snapshot,
            self.resolution.width as f32,
            self.resolution.height as f32,
            canvas,
        );
    }

    /// Clear, then draw one bottom-aligned bar per bin, left to right
    pub fn render(
        &self,
        snapshot: &FrequencySnapshot,
        canvas_width: f32,
        canvas_height: f32,
        canvas: &mut dyn Canvas,
    ) {
        canvas.clear();

        if snapshot.is_empty() || canvas_width <= 0.0 || canvas_height <= 0.0 {
            return;
        }

        let bar_width = canvas_width / snapshot.len() as f32;
        for (index, &value) in snapshot.bins().iter().enumerate() {
            let bar_height = (value as f32 / 255.0) * canvas_height;
            let hue = (bar_height / canvas_height) * HUE_SPAN_DEG;

            canvas.fill_rect(
                Rect {
                    x: bar_width * index as f32,
                    y: canvas_height - bar_height,
                    width: bar_width,
                    height: bar_height,
                },
                hsl_to_rgb(hue, 1.0, 0.5),
            );
        }
    }
}

fn scaled(length: f64, density: f64) -> u32 {
    let value = length * density;
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear,
        Fill(Rect, [f32; 3]),
    }

    #[derive(Default)]
    struct RecordingCanvas {
        ops: Vec<Op>,
    }

    impl Canvas for RecordingCanvas {
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }

        fn fill_rect(&mut self, rect: Rect, color: [f32; 3]) {
            self.ops.push(Op::Fill(rect, color));
        }
    }

    fn fills(canvas: &RecordingCanvas) -> Vec<(Rect, [f32; 3])> {
        canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Fill(r, c) => Some((*r, *c)),
                Op::Clear => None,
            })
            .collect()
    }

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_hsl_primaries() {
        assert!(approx(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
        assert!(approx(hsl_to_rgb(120.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
        assert!(approx(hsl_to_rgb(240.0, 1.0, 0.5), [0.0, 0.0, 1.0]));
        // 400° wraps to 40° (orange)
        assert!(approx(hsl_to_rgb(400.0, 1.0, 0.5), hsl_to_rgb(40.0, 1.0, 0.5)));
        assert!(approx(hsl_to_rgb(40.0, 1.0, 0.5), [1.0, 2.0 / 3.0, 0.0]));
    }

    #[test]
    fn test_clears_before_drawing() {
        let renderer = VisualizerRenderer::new(Resolution {
            width: 256,
            height: 100,
        });
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&FrequencySnapshot::new(vec![10, 20]), &mut canvas);

        assert_eq!(canvas.ops[0], Op::Clear);
        assert_eq!(canvas.ops.iter().filter(|op| **op == Op::Clear).count(), 1);
        assert_eq!(fills(&canvas).len(), 2);
    }

    #[test]
    fn test_bar_geometry() {
        let renderer = VisualizerRenderer::new(Resolution {
            width: 400,
            height: 255,
        });
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&FrequencySnapshot::new(vec![0, 51, 255, 102]), &mut canvas);

        let bars = fills(&canvas);
        assert_eq!(
            bars.iter().map(|(r, _)| *r).collect::<Vec<_>>(),
            vec![
                Rect { x: 0.0, y: 255.0, width: 100.0, height: 0.0 },
                Rect { x: 100.0, y: 204.0, width: 100.0, height: 51.0 },
                Rect { x: 200.0, y: 0.0, width: 100.0, height: 255.0 },
                Rect { x: 300.0, y: 153.0, width: 100.0, height: 102.0 },
            ]
        );

        // Hue = height fraction * 400°
        assert!(approx(bars[0].1, hsl_to_rgb(0.0, 1.0, 0.5)));
        assert!(approx(bars[1].1, hsl_to_rgb(80.0, 1.0, 0.5)));
        assert!(approx(bars[2].1, hsl_to_rgb(400.0, 1.0, 0.5)));
    }

    #[test]
    fn test_bars_tile_without_overlap() {
        let renderer = VisualizerRenderer::new(Resolution {
            width: 1000,
            height: 300,
        });
        let snapshot = FrequencySnapshot::new((0..128).map(|i| (i * 2) as u8).collect());
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&snapshot, &mut canvas);

        let bars = fills(&canvas);
        assert_eq!(bars.len(), 128);
        for pair in bars.windows(2) {
            let (a, b) = (pair[0].0, pair[1].0);
            assert!(b.x > a.x);
            assert!((a.x + a.width - b.x).abs() < 1e-3);
        }
    }

    #[test]
    fn test_extreme_snapshots_render() {
        let renderer = VisualizerRenderer::new(Resolution {
            width: 640,
            height: 480,
        });
        for fill in [0u8, 255u8] {
            let mut canvas = RecordingCanvas::default();
            renderer.render_frame(&FrequencySnapshot::new(vec![fill; 128]), &mut canvas);

            let bars = fills(&canvas);
            assert_eq!(bars.len(), 128);
            for (rect, color) in bars {
                assert!(rect.y >= 0.0 && rect.y + rect.height <= 480.0 + 1e-3);
                assert!(color.iter().all(|c| (0.0..=1.0).contains(c)));
            }
        }
    }

    #[test]
    fn test_degenerate_canvas_only_clears() {
        let renderer = VisualizerRenderer::new(Resolution { width: 0, height: 0 });
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&FrequencySnapshot::new(vec![255; 128]), &mut canvas);
        assert_eq!(canvas.ops, vec![Op::Clear]);

        let renderer = VisualizerRenderer::new(Resolution { width: 100, height: 100 });
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&FrequencySnapshot::new(vec![]), &mut canvas);
        assert_eq!(canvas.ops, vec![Op::Clear]);
    }

    #[test]
    fn test_resize_multiplies_by_density() {
        let mut renderer = VisualizerRenderer::new(Resolution { width: 1, height: 1 });

        assert_eq!(
            renderer.resize(800.0, 300.0, 2.0),
            Resolution { width: 1600, height: 600 }
        );
        assert_eq!(
            renderer.resize(640.0, 360.0, 1.5),
            Resolution { width: 960, height: 540 }
        );

        // Next render uses the new size
        let mut canvas = RecordingCanvas::default();
        renderer.render_frame(&FrequencySnapshot::new(vec![255]), &mut canvas);
        assert_eq!(
            fills(&canvas)[0].0,
            Rect { x: 0.0, y: 0.0, width: 960.0, height: 540.0 }
        );
    }
}
