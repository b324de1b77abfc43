//! Live input processing: EQ chain, parameter smoothing and analysis.
//!
//! The cpal callbacks host the chain; everything the rest of the app
//! touches (parameter targets, the analysis tap, the capture tap) is shared
//! through lock-free or `try_lock` handles so the audio thread never waits.

mod analysis;
mod filter;
mod graph;
mod input;
mod ramp;

// Re-export public types
pub use analysis::{blackman_window, shared_tap, AnalysisSampler, FrequencySnapshot, SharedTap, TapBuffer};
pub use filter::{Biquad, FilterKind};
pub use graph::{parse_parameter, AudioGraph, AudioNode, GraphOptions, NodeId, ParameterBank, SignalChain};
pub use input::{acquire, list_devices, open_sink, InputConstraints, InputStream, LatencyHint, OutputSink};
pub use ramp::ParameterRamp;
