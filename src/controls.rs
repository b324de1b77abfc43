//! UI controls and the single-threaded event queue.
//!
//! The keyboard stands in for the four range sliders and the record toggle.
//! Each key press becomes a [`ControlEvent`] carrying the same numeric string
//! a slider would emit; the session drains the queue once per loop
//! iteration and handles every event to completion.

use std::collections::VecDeque;

use winit::keyboard::KeyCode;

use crate::audio::NodeId;
use crate::params::{ControlRange, ControlValues};

/// Named UI events
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// A range control moved; `raw` is its value as text
    ValueChanged { node: NodeId, raw: String },
    ToggleRecording,
    /// Viewport resized (logical size and device pixel ratio)
    Resized {
        width: f64,
        height: f64,
        scale_factor: f64,
    },
}

/// FIFO of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<ControlEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControlEvent) {
        self.pending.push_back(event);
    }

    pub fn pop(&mut self) -> Option<ControlEvent> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// One continuous-range control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub node: NodeId,
    pub range: ControlRange,
    pub value: f32,
}

impl Control {
    pub fn new(node: NodeId, value: f32) -> Self {
        let range = node.range();
        Self {
            node,
            range,
            value: range.clamp(value),
        }
    }

    /// Move by whole steps and return the new value as the control would
    /// report it
    pub fn nudge(&mut self, steps: i32) -> String {
        let stepped = self.value + steps as f32 * self.range.step;
        let snapped = (stepped / self.range.step).round() * self.range.step;
        self.value = self.range.clamp(snapped);
        self.display_value()
    }

    /// Value formatted to the step's precision
    pub fn display_value(&self) -> String {
        format!("{:.*}", self.decimals(), self.value)
    }

    fn decimals(&self) -> usize {
        (0..6)
            .find(|&d| {
                let scaled = self.range.step * 10f32.powi(d as i32);
                (scaled - scaled.round()).abs() < 1e-3
            })
            .unwrap_or(6)
    }
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Nudge { node: NodeId, steps: i32 },
    ToggleRecording,
}

/// Keyboard layout: Up/Down volume, Q/A bass, W/S mid, E/D treble,
/// R or Space record
pub fn bind_key(key: KeyCode) -> Option<KeyAction> {
    let nudge = |node, steps| Some(KeyAction::Nudge { node, steps });
    match key {
        KeyCode::ArrowUp => nudge(NodeId::Volume, 1),
        KeyCode::ArrowDown => nudge(NodeId::Volume, -1),
        KeyCode::KeyQ => nudge(NodeId::Bass, 1),
        KeyCode::KeyA => nudge(NodeId::Bass, -1),
        KeyCode::KeyW => nudge(NodeId::Mid, 1),
        KeyCode::KeyS => nudge(NodeId::Mid, -1),
        KeyCode::KeyE => nudge(NodeId::Treble, 1),
        KeyCode::KeyD => nudge(NodeId::Treble, -1),
        KeyCode::KeyR | KeyCode::Space => Some(KeyAction::ToggleRecording),
        _ => None,
    }
}

/// The four range controls, in display order
#[derive(Debug, Clone)]
pub struct ControlPanel {
    controls: [Control; 4],
}

impl ControlPanel {
    pub fn new(values: &ControlValues) -> Self {
        Self {
            controls: NodeId::ALL.map(|node| Control::new(node, node.initial_value(values))),
        }
    }

    pub fn get(&self, node: NodeId) -> &Control {
        &self.controls[Self::index(node)]
    }

    /// Turn a key press into the event the matching control would emit
    pub fn handle_key(&mut self, key: KeyCode) -> Option<ControlEvent> {
        match bind_key(key)? {
            KeyAction::Nudge { node, steps } => {
                let raw = self.controls[Self::index(node)].nudge(steps);
                Some(ControlEvent::ValueChanged { node, raw })
            }
            KeyAction::ToggleRecording => Some(ControlEvent::ToggleRecording),
        }
    }

    /// Record the value the graph accepted
    pub fn set(&mut self, node: NodeId, value: f32) {
        let control = &mut self.controls[Self::index(node)];
        control.value = control.range.clamp(value);
    }

    /// Compact readout, e.g. `vol 1.00 | bass +0.0 dB | ...`
    pub fn summary(&self) -> String {
        self.controls
            .iter()
            .map(|c| match c.node {
                NodeId::Volume => format!("vol {}", c.display_value()),
                _ => format!("{} {:+.1} dB", c.node.as_str(), c.value),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn index(node: NodeId) -> usize {
        match node {
            NodeId::Volume => 0,
            NodeId::Bass => 1,
            NodeId::Mid => 2,
            NodeId::Treble => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = EventQueue::new();
        queue.push(ControlEvent::ToggleRecording);
        queue.push(ControlEvent::ValueChanged {
            node: NodeId::Mid,
            raw: "1.5".to_string(),
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(ControlEvent::ToggleRecording));
        assert!(matches!(
            queue.pop(),
            Some(ControlEvent::ValueChanged { node: NodeId::Mid, .. })
        ));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nudge_steps_and_clamps() {
        let mut bass = Control::new(NodeId::Bass, 0.0);
        assert_eq!(bass.nudge(1), "0.5");
        assert_eq!(bass.nudge(-3), "-1.0");
        assert_eq!(bass.nudge(100), "10.0");

        let mut volume = Control::new(NodeId::Volume, 1.0);
        assert_eq!(volume.nudge(1), "1.00");
        assert_eq!(volume.nudge(-1), "0.99");
        assert_eq!(volume.nudge(-1000), "0.00");
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            bind_key(KeyCode::KeyQ),
            Some(KeyAction::Nudge { node: NodeId::Bass, steps: 1 })
        );
        assert_eq!(
            bind_key(KeyCode::KeyD),
            Some(KeyAction::Nudge { node: NodeId::Treble, steps: -1 })
        );
        assert_eq!(bind_key(KeyCode::Space), Some(KeyAction::ToggleRecording));
        assert_eq!(bind_key(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_panel_emits_numeric_strings() {
        let mut panel = ControlPanel::new(&ControlValues::default());

        let event = panel.handle_key(KeyCode::KeyW);
        assert_eq!(
            event,
            Some(ControlEvent::ValueChanged {
                node: NodeId::Mid,
                raw: "0.5".to_string()
            })
        );
        assert_eq!(panel.get(NodeId::Mid).value, 0.5);
        assert_eq!(panel.handle_key(KeyCode::KeyR), Some(ControlEvent::ToggleRecording));
        assert_eq!(panel.handle_key(KeyCode::Escape), None);
    }

    #[test]
    fn test_summary_lists_all_controls() {
        let panel = ControlPanel::new(&ControlValues::default());
        let summary = panel.summary();
        for node in NodeId::ALL {
            if node != NodeId::Volume {
                assert!(summary.contains(node.as_str()));
            }
        }
        assert!(summary.starts_with("vol 1.00"));
    }
}
