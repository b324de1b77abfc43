//! Recording session state machine.
//!
//! `Idle ⇄ Recording`, driven only by [`RecordingController::toggle`]. While
//! recording, a 10 ms timer calls [`RecordingController::tick`], which
//! collects encoded segments and refreshes the `MM:SS:CC` readout.

mod capture;
mod encoder;

pub use capture::{capture_channel, CaptureFeed, CaptureTap};
pub use encoder::{Artifact, ArtifactFormat, Encoder, Segment, WavEncoder};

use std::time::{Duration, Instant};

use crate::error::Result;

/// Readout shown whenever no session is running
pub const IDLE_DISPLAY: &str = "00:00:00";

/// Format an elapsed duration as `MM:SS:CC` (minutes, seconds, centiseconds)
pub fn format_elapsed(elapsed: Duration) -> String {
    let centis = elapsed.as_millis() / 10;
    let minutes = centis / 6_000;
    let seconds = (centis / 100) % 60;
    let hundredths = centis % 100;
    format!("{:02}:{:02}:{:02}", minutes, seconds, hundredths)
}

/// Where the recorder reports to (the UI boundary)
pub trait RecorderUi {
    /// Toggle control shows active/inactive
    fn show_active(&mut self, active: bool);

    /// Elapsed-time readout
    fn show_elapsed(&mut self, text: &str);

    /// The finished recording is offered for saving. The artifact is
    /// released as soon as this returns.
    fn offer_artifact(&mut self, artifact: &Artifact);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// Result of a toggle, for whoever owns the tick timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Entered Recording; start the tick timer
    Started,
    /// Back to Idle; cancel the tick timer
    Stopped { bytes: usize, segments: usize },
    /// No encoder to record with; nothing changed
    Unavailable,
}

struct ActiveSession {
    started_at: Instant,
    segments: Vec<Segment>,
}

impl ActiveSession {
    fn append(&mut self, segment: Option<Segment>) {
        if let Some(segment) = segment.filter(|s| !s.is_empty()) {
            self.segments.push(segment);
        }
    }
}

/// Two-state recorder over a pluggable encoder
pub struct RecordingController {
    encoder: Option<Box<dyn Encoder>>,
    file_stem: String,
    session: Option<ActiveSession>,
    display: String,
}

impl RecordingController {
    pub fn new(encoder: Box<dyn Encoder>, file_stem: impl Into<String>) -> Self {
        Self {
            encoder: Some(encoder),
            file_stem: file_stem.into(),
            session: None,
            display: IDLE_DISPLAY.to_string(),
        }
    }

    /// Recorder without capture capability; toggling is a no-op
    pub fn unavailable(file_stem: impl Into<String>) -> Self {
        Self {
            encoder: None,
            file_stem: file_stem.into(),
            session: None,
            display: IDLE_DISPLAY.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.encoder.is_some()
    }

    pub fn state(&self) -> RecorderState {
        if self.session.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// Segments collected so far in the running session
    pub fn segment_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.segments.len())
    }

    /// Start or stop, depending on the current state
    pub fn toggle(&mut self, now: Instant, ui: &mut dyn RecorderUi) -> Result<Transition> {
        match self.session.take() {
            None => self.start(now, ui),
            Some(session) => Ok(self.stop(session, ui)),
        }
    }

    fn start(&mut self, now: Instant, ui: &mut dyn RecorderUi) -> Result<Transition> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(Transition::Unavailable);
        };

        encoder.start()?;
        self.session = Some(ActiveSession {
            started_at: now,
            segments: Vec::new(),
        });

        self.display = IDLE_DISPLAY.to_string();
        ui.show_elapsed(&self.display);
        ui.show_active(true);
        log::info!("Recording started");
        Ok(Transition::Started)
    }

    fn stop(&mut self, mut session: ActiveSession, ui: &mut dyn RecorderUi) -> Transition {
        let format = match self.encoder.as_mut() {
            Some(encoder) => {
                session.append(encoder.stop());
                encoder.format()
            }
            // Unreachable in practice: a session only exists with an encoder
            None => ArtifactFormat::pcm16_mono(0),
        };

        let segments = session.segments.len();
        let artifact = Artifact::assemble(&self.file_stem, format, session.segments);
        let bytes = artifact.len();
        log::info!(
            "Recording stopped: {} segments, {} bytes ({:.2}s)",
            segments,
            bytes,
            artifact.duration_secs()
        );

        ui.offer_artifact(&artifact);
        drop(artifact);

        self.display = IDLE_DISPLAY.to_string();
        ui.show_elapsed(&self.display);
        ui.show_active(false);
        Transition::Stopped { bytes, segments }
    }

    /// Timer callback: collect new segments and refresh the readout
    pub fn tick(&mut self, now: Instant, ui: &mut dyn RecorderUi) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(encoder) = self.encoder.as_mut() {
            while let Some(segment) = encoder.poll() {
                session.append(Some(segment));
            }
        }

        self.display = format_elapsed(now.saturating_duration_since(session.started_at));
        ui.show_elapsed(&self.display);
    }
}
