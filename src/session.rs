//! The owning context created at startup and torn down explicitly.
//!
//! Startup is two-phase: acquire the input device, then build the graph and
//! start the loops. When acquisition fails the session still runs in a
//! degraded mode (silent spectrum, recorder disabled) after one warning.
//!
//! Everything after startup happens on the event-loop thread: UI events go
//! through the [`EventQueue`], the recorder tick through the [`Scheduler`],
//! and frames through the [`RenderLoop`].

use std::path::PathBuf;
use std::time::Instant;

use crate::audio::{
    acquire, parse_parameter, AnalysisSampler, AudioGraph, GraphOptions, InputConstraints, NodeId,
};
use crate::controls::{ControlEvent, ControlPanel, EventQueue};
use crate::error::{AudioError, Result};
use crate::params::{AnalyserConfig, ControlValues, EqConfig, RecordingConfig, VisualizerConfig};
use crate::recording::{
    Artifact, RecorderState, RecorderUi, RecordingController, Transition, WavEncoder,
};
use crate::render_loop::RenderLoop;
use crate::scheduler::{Scheduler, TimerId};
use crate::visualizer::{Canvas, Resolution, VisualizerRenderer};

/// Everything needed to start a session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub analyser: AnalyserConfig,
    pub eq: EqConfig,
    pub controls: ControlValues,
    pub visualizer: VisualizerConfig,
    pub recording: RecordingConfig,

    /// Input device name filter (`None` = host default)
    pub input_device: Option<String>,
    pub constraints: InputConstraints,
}

/// UI side of the recorder: toggle state, elapsed text, and saving the take
#[derive(Debug)]
struct Readout {
    active: bool,
    elapsed: String,
    recording: RecordingConfig,
    last_saved: Option<PathBuf>,
}

impl RecorderUi for Readout {
    fn show_active(&mut self, active: bool) {
        self.active = active;
    }

    fn show_elapsed(&mut self, text: &str) {
        self.elapsed.clear();
        self.elapsed.push_str(text);
    }

    fn offer_artifact(&mut self, artifact: &Artifact) {
        let path = self.recording.artifact_path(&artifact.file_name);
        match artifact.write_wav(&path) {
            Ok(()) => {
                log::info!(
                    "Saved {} ({} bytes, {} {})",
                    path.display(),
                    artifact.len(),
                    artifact.format.mime_type(),
                    artifact.format.codec()
                );
                self.last_saved = Some(path);
            }
            Err(e) => log::error!("Could not save {}: {}", path.display(), e),
        }
    }
}

/// Device part of the window title
fn input_label(name: &str, sample_rate_hz: u32, playback: bool) -> String {
    let mut label = format!("{} @ {} Hz", name, sample_rate_hz);
    if !playback {
        label.push_str(", muted");
    }
    label
}

pub struct Session {
    graph: Option<AudioGraph>,
    sampler: AnalysisSampler,
    renderer: VisualizerRenderer,
    render_loop: RenderLoop,
    recorder: RecordingController,
    recorder_timer: Option<TimerId>,
    scheduler: Scheduler,
    controls: ControlPanel,
    events: EventQueue,
    readout: Readout,
    config: SessionConfig,
}

impl Session {
    /// Two-phase startup against a real audio host
    pub fn start(config: SessionConfig, host: &cpal::Host) -> Self {
        let mut graph = match Self::build_graph(&config, host) {
            Ok(graph) => Some(graph),
            Err(e) => {
                log::warn!("Audio unavailable, showing silence: {}", e);
                None
            }
        };

        let sampler = match &graph {
            Some(graph) => AnalysisSampler::new(config.analyser.clone(), graph.analysis_tap()),
            None => AnalysisSampler::silent(config.analyser.clone()),
        };

        let stem = config.recording.file_stem.clone();
        let recorder = match graph.as_mut().and_then(AudioGraph::take_capture_tap) {
            Some(tap) => RecordingController::new(Box::new(WavEncoder::new(tap)), stem),
            None => {
                log::warn!(
                    "{}",
                    AudioError::EncoderUnavailable("no input stream to encode".to_string())
                );
                RecordingController::unavailable(stem)
            }
        };

        Self::assemble(config, graph, sampler, recorder)
    }

    /// Session without an audio graph, built from explicit parts
    pub fn with_parts(
        config: SessionConfig,
        sampler: AnalysisSampler,
        recorder: RecordingController,
    ) -> Self {
        Self::assemble(config, None, sampler, recorder)
    }

    fn build_graph(config: &SessionConfig, host: &cpal::Host) -> Result<AudioGraph> {
        // Phase 1: acquire
        let input = acquire(host, config.input_device.as_deref(), &config.constraints)?;

        // Phase 2: build and start
        let options = GraphOptions {
            eq: config.eq.clone(),
            analyser: config.analyser.clone(),
            controls: config.controls,
            record_source: config.recording.source,
            latency: config.constraints.latency,
        };
        AudioGraph::construct(host, input, &options)
    }

    fn assemble(
        config: SessionConfig,
        graph: Option<AudioGraph>,
        sampler: AnalysisSampler,
        recorder: RecordingController,
    ) -> Self {
        let mut render_loop = RenderLoop::new();
        render_loop.start();

        let resolution = Resolution {
            width: config.visualizer.window_width,
            height: config.visualizer.window_height,
        };

        Self {
            graph,
            sampler,
            renderer: VisualizerRenderer::new(resolution),
            render_loop,
            recorder,
            recorder_timer: None,
            scheduler: Scheduler::new(),
            controls: ControlPanel::new(&config.controls.clamped()),
            events: EventQueue::new(),
            readout: Readout {
                active: false,
                elapsed: crate::recording::IDLE_DISPLAY.to_string(),
                recording: config.recording.clone(),
                last_saved: None,
            },
            config,
        }
    }

    pub fn has_audio(&self) -> bool {
        self.graph.is_some()
    }

    pub fn controls(&self) -> &ControlPanel {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlPanel {
        &mut self.controls
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn elapsed_display(&self) -> &str {
        &self.readout.elapsed
    }

    pub fn last_saved(&self) -> Option<&PathBuf> {
        self.readout.last_saved.as_ref()
    }

    pub fn resolution(&self) -> Resolution {
        self.renderer.resolution()
    }

    pub fn frames(&self) -> u64 {
        self.render_loop.frames()
    }

    pub fn push_event(&mut self, event: ControlEvent) {
        self.events.push(event);
    }

    /// Handle every queued event, oldest first
    pub fn dispatch_pending(&mut self, now: Instant) {
        while let Some(event) = self.events.pop() {
            self.handle(event, now);
        }
    }

    fn handle(&mut self, event: ControlEvent, now: Instant) {
        match event {
            ControlEvent::ValueChanged { node, raw } => self.set_parameter(node, &raw),
            ControlEvent::ToggleRecording => self.toggle_recording(now),
            ControlEvent::Resized {
                width,
                height,
                scale_factor,
            } => {
                self.resize(width, height, scale_factor);
            }
        }
    }

    fn set_parameter(&mut self, node: NodeId, raw: &str) {
        let accepted = match &self.graph {
            Some(graph) => graph.set_parameter(node, raw),
            None => parse_parameter(node, raw),
        };
        match accepted {
            Ok(value) => self.controls.set(node, value),
            Err(e) => log::debug!("Ignored control input: {}", e),
        }
    }

    fn toggle_recording(&mut self, now: Instant) {
        match self.recorder.toggle(now, &mut self.readout) {
            Ok(Transition::Started) => {
                let tick = self.config.recording.tick_interval;
                self.recorder_timer = Some(self.scheduler.every(tick, now));
            }
            Ok(Transition::Stopped { .. }) => {
                if let Some(timer) = self.recorder_timer.take() {
                    self.scheduler.cancel(timer);
                }
            }
            Ok(Transition::Unavailable) => log::debug!("Record toggle ignored: no encoder"),
            Err(e) => log::warn!("Could not start recording: {}", e),
        }
    }

    /// Run whatever timers are due
    pub fn poll_timers(&mut self, now: Instant) {
        for id in self.scheduler.due(now) {
            if Some(id) == self.recorder_timer {
                self.recorder.tick(now, &mut self.readout);
            }
        }
    }

    /// When the event loop next needs to wake for a timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// One display-refresh tick; false once torn down
    pub fn frame(&mut self, canvas: &mut dyn Canvas) -> bool {
        self.render_loop
            .frame(&mut self.sampler, &self.renderer, canvas)
    }

    pub fn resize(&mut self, width: f64, height: f64, scale_factor: f64) -> Resolution {
        let resolution = self.renderer.resize(width, height, scale_factor);
        log::debug!("Canvas resized to {}x{}", resolution.width, resolution.height);
        resolution
    }

    /// Window title doubling as the elapsed-time readout
    pub fn title(&self) -> String {
        let status = if self.readout.active {
            format!("● REC {}", self.readout.elapsed)
        } else if !self.recorder.is_available() {
            "rec n/a".to_string()
        } else {
            self.readout.elapsed.clone()
        };
        let input = match &self.graph {
            Some(graph) => {
                input_label(graph.input_name(), graph.sample_rate_hz(), graph.has_playback())
            }
            None => "no input".to_string(),
        };
        format!(
            "tonescope [{}] {} | {}",
            input,
            status,
            self.controls.summary()
        )
    }

    /// Stop recording (saving the take), then stop the loop and the streams
    pub fn teardown(&mut self, now: Instant) {
        if self.recorder.state() == RecorderState::Recording {
            self.toggle_recording(now);
        }
        self.render_loop.teardown();
        if self.graph.take().is_some() {
            log::info!("Audio graph stopped");
        }
    }
}
