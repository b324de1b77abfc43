//! Fixed EQ signal chain and the device streams that host it.
//!
//! Topology (never changes after construction):
//!
//! ```text
//! Source → bass (low shelf) → mid (peaking) → treble (high shelf)
//!        → Gain → AnalysisTap → Sink
//! ```
//!
//! The chain itself ([`SignalChain`]) is plain processing state moved into
//! the input callback. Control changes reach it through a [`ParameterBank`]
//! of atomics, read once per block, so the UI side never locks or allocates
//! on the audio path.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::analysis::{shared_tap, SharedTap};
use super::filter::{Biquad, FilterKind};
use super::input::{self, InputStream, LatencyHint, OutputSink};
use super::ramp::ParameterRamp;
use crate::error::{AudioError, Result};
use crate::params::{
    audio_constants::{PLAYBACK_BRIDGE_S, RAMP_TIME_CONSTANT_S},
    AnalyserConfig, BandConfig, ControlRange, ControlValues, EqConfig, RecordSource,
};
use crate::recording::{capture_channel, CaptureFeed, CaptureTap};

/// Largest block the input callback processes in one go (frames)
const MAX_BLOCK_FRAMES: usize = 4096;

/// Addressable parameter of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Volume,
    Bass,
    Mid,
    Treble,
}

impl NodeId {
    pub const ALL: [NodeId; 4] = [NodeId::Volume, NodeId::Bass, NodeId::Mid, NodeId::Treble];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Bass => "bass",
            Self::Mid => "mid",
            Self::Treble => "treble",
        }
    }

    /// Valid input range for this parameter
    pub fn range(&self) -> ControlRange {
        match self {
            Self::Volume => ControlRange::VOLUME,
            Self::Bass | Self::Mid | Self::Treble => ControlRange::BAND_GAIN_DB,
        }
    }

    pub fn initial_value(&self, values: &ControlValues) -> f32 {
        match self {
            Self::Volume => values.volume,
            Self::Bass => values.bass_db,
            Self::Mid => values.mid_db,
            Self::Treble => values.treble_db,
        }
    }
}

/// One stage of the chain, as described to callers
#[derive(Debug, Clone, PartialEq)]
pub enum AudioNode {
    Source,
    Filter {
        band: NodeId,
        kind: FilterKind,
        center_frequency_hz: f32,
        gain_db: f32,
        q: f32,
    },
    Gain {
        level: f32,
    },
    AnalysisTap {
        fft_size: usize,
    },
    Sink,
}

impl fmt::Display for AudioNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Filter {
                band,
                kind,
                center_frequency_hz,
                gain_db,
                q,
            } => write!(
                f,
                "{} {} {}Hz q={} {:+.1}dB",
                band.as_str(),
                kind.as_str(),
                center_frequency_hz,
                q,
                gain_db
            ),
            Self::Gain { level } => write!(f, "gain {:.2}", level),
            Self::AnalysisTap { fft_size } => write!(f, "analyser fft={}", fft_size),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// Turn a raw control value into a parameter target.
///
/// Non-numeric input is rejected; numbers outside the control range are
/// clamped onto it.
pub fn parse_parameter(node: NodeId, raw: &str) -> Result<f32> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| AudioError::InvalidParameterValue {
            control: node.as_str().to_string(),
            raw: raw.to_string(),
        })?;

    if !value.is_finite() {
        return Err(AudioError::InvalidParameterValue {
            control: node.as_str().to_string(),
            raw: raw.to_string(),
        });
    }

    Ok(node.range().clamp(value))
}

/// f32 stored in an atomic (bit pattern)
#[derive(Debug)]
struct SharedParam(AtomicU32);

impl SharedParam {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Parameter targets shared between the control side and the audio thread
#[derive(Debug)]
pub struct ParameterBank {
    volume: SharedParam,
    bass: SharedParam,
    mid: SharedParam,
    treble: SharedParam,
}

impl ParameterBank {
    pub fn new(values: ControlValues) -> Self {
        let values = values.clamped();
        Self {
            volume: SharedParam::new(values.volume),
            bass: SharedParam::new(values.bass_db),
            mid: SharedParam::new(values.mid_db),
            treble: SharedParam::new(values.treble_db),
        }
    }

    fn slot(&self, node: NodeId) -> &SharedParam {
        match node {
            NodeId::Volume => &self.volume,
            NodeId::Bass => &self.bass,
            NodeId::Mid => &self.mid,
            NodeId::Treble => &self.treble,
        }
    }

    pub fn target(&self, node: NodeId) -> f32 {
        self.slot(node).load()
    }

    /// Parse, clamp and publish a new target; returns the value applied
    pub fn set_parameter(&self, node: NodeId, raw: &str) -> Result<f32> {
        let value = parse_parameter(node, raw)?;
        self.slot(node).store(value);
        Ok(value)
    }
}

struct EqBand {
    node: NodeId,
    filter: Biquad,
    gain_db: ParameterRamp,
}

impl EqBand {
    fn new(node: NodeId, config: &BandConfig, initial_db: f32, sample_rate_hz: u32) -> Self {
        Self {
            node,
            filter: Biquad::new(
                config.kind,
                config.frequency_hz,
                config.q,
                initial_db,
                sample_rate_hz,
            ),
            gain_db: ParameterRamp::new(initial_db, RAMP_TIME_CONSTANT_S, sample_rate_hz),
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        if !self.gain_db.is_settled() {
            let gain = self.gain_db.next_value();
            self.filter.set_gain_db(gain);
        }
        self.filter.process(x)
    }
}

/// The processing state of the whole chain, owned by the audio thread
pub struct SignalChain {
    params: Arc<ParameterBank>,
    bands: [EqBand; 3],
    volume: ParameterRamp,
    analysis: SharedTap,
    fft_size: usize,
    capture: Option<CaptureFeed>,
}

impl SignalChain {
    pub fn new(
        eq: &EqConfig,
        analyser: &AnalyserConfig,
        params: Arc<ParameterBank>,
        analysis: SharedTap,
        capture: Option<CaptureFeed>,
        sample_rate_hz: u32,
    ) -> Self {
        let bands = [
            EqBand::new(NodeId::Bass, &eq.bass, params.target(NodeId::Bass), sample_rate_hz),
            EqBand::new(NodeId::Mid, &eq.mid, params.target(NodeId::Mid), sample_rate_hz),
            EqBand::new(
                NodeId::Treble,
                &eq.treble,
                params.target(NodeId::Treble),
                sample_rate_hz,
            ),
        ];
        let volume = ParameterRamp::new(
            params.target(NodeId::Volume),
            RAMP_TIME_CONSTANT_S,
            sample_rate_hz,
        );

        Self {
            params,
            bands,
            volume,
            analysis,
            fft_size: analyser.fft_size,
            capture,
        }
    }

    /// The chain in signal order
    pub fn topology(&self) -> Vec<AudioNode> {
        let mut nodes = Vec::with_capacity(7);
        nodes.push(AudioNode::Source);
        for band in &self.bands {
            nodes.push(AudioNode::Filter {
                band: band.node,
                kind: band.filter.kind(),
                center_frequency_hz: band.filter.frequency_hz(),
                gain_db: band.gain_db.value(),
                q: band.filter.q(),
            });
        }
        nodes.push(AudioNode::Gain {
            level: self.volume.value(),
        });
        nodes.push(AudioNode::AnalysisTap {
            fft_size: self.fft_size,
        });
        nodes.push(AudioNode::Sink);
        nodes
    }

    /// Current (ramped) value of a parameter
    pub fn current_value(&self, node: NodeId) -> f32 {
        match node {
            NodeId::Volume => self.volume.value(),
            NodeId::Bass => self.bands[0].gain_db.value(),
            NodeId::Mid => self.bands[1].gain_db.value(),
            NodeId::Treble => self.bands[2].gain_db.value(),
        }
    }

    /// Pick up new targets at the start of a block
    fn pull_targets(&mut self) {
        for band in &mut self.bands {
            let target = self.params.target(band.node);
            if target != band.gain_db.target() {
                band.gain_db.set_target(target);
            }
        }
        let volume = self.params.target(NodeId::Volume);
        if volume != self.volume.target() {
            self.volume.set_target(volume);
        }
    }

    /// Run one mono block through the chain.
    ///
    /// `output` must be at least as long as `input`.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.pull_targets();

        if let Some(capture) = self.capture.as_mut() {
            capture.offer(RecordSource::Raw, input);
        }

        let output = &mut output[..input.len()];
        for (x, y) in input.iter().zip(output.iter_mut()) {
            let mut s = *x;
            for band in &mut self.bands {
                s = band.process(s);
            }
            *y = s * self.volume.next_value();
        }

        if let Some(capture) = self.capture.as_mut() {
            capture.offer(RecordSource::Processed, output);
        }

        // Lossy by intent: skipping a block is better than waiting on the
        // render thread
        if let Ok(mut tap) = self.analysis.try_lock() {
            tap.push(output);
        }
    }
}

/// Everything the graph needs besides the devices
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub eq: EqConfig,
    pub analyser: AnalyserConfig,
    pub controls: ControlValues,
    pub record_source: RecordSource,
    pub latency: LatencyHint,
}

impl GraphOptions {
    /// Reject settings the chain cannot be built with
    pub fn validate(&self) -> Result<()> {
        self.analyser
            .validate()
            .map_err(|e| AudioError::InvalidConfig(format!("analyser: {}", e)))
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            eq: EqConfig::default(),
            analyser: AnalyserConfig::default(),
            controls: ControlValues::default(),
            record_source: RecordSource::Raw,
            latency: LatencyHint::Minimum,
        }
    }
}

/// The running graph: chain on the input callback, sink on the output device
pub struct AudioGraph {
    params: Arc<ParameterBank>,
    analysis: SharedTap,
    capture: Option<CaptureTap>,
    sample_rate_hz: u32,
    input_name: String,
    playback: bool,

    /// Device streams (kept alive for the graph's lifetime)
    _input_stream: cpal::Stream,
    _output_stream: Option<cpal::Stream>,
}

impl AudioGraph {
    /// Build and start the fixed chain on an acquired input stream.
    ///
    /// A missing or incompatible output device leaves the graph running
    /// without playback; analysis and recording still work.
    pub fn construct(host: &cpal::Host, input: InputStream, options: &GraphOptions) -> Result<Self> {
        options.validate()?;

        let sample_rate_hz = input.sample_rate_hz();
        let params = Arc::new(ParameterBank::new(options.controls));
        let analysis = shared_tap(options.analyser.fft_size);
        let (feed, capture) = capture_channel(sample_rate_hz, options.record_source);

        let chain = SignalChain::new(
            &options.eq,
            &options.analyser,
            Arc::clone(&params),
            Arc::clone(&analysis),
            Some(feed),
            sample_rate_hz,
        );
        let topology = chain.topology();
        log::debug!(
            "Chain: {}",
            topology
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let (output_stream, bridge) = match input::open_sink(host, sample_rate_hz, options.latency) {
            Ok(sink) => {
                let capacity = (sample_rate_hz as f32 * PLAYBACK_BRIDGE_S) as usize;
                let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
                match start_output(&sink, consumer) {
                    Ok(stream) => (Some(stream), Some(producer)),
                    Err(e) => {
                        log::warn!("Playback disabled: {}", e);
                        (None, None)
                    }
                }
            }
            Err(e) => {
                log::warn!("Playback disabled: {}", e);
                (None, None)
            }
        };
        let playback = output_stream.is_some();

        let input_stream = start_input(&input, chain, bridge)?;

        log::info!(
            "Audio graph running: {} nodes, {}Hz, playback {}",
            topology.len(),
            sample_rate_hz,
            if playback { "on" } else { "off" }
        );

        Ok(Self {
            params,
            analysis,
            capture: Some(capture),
            sample_rate_hz,
            input_name: input.name,
            playback,
            _input_stream: input_stream,
            _output_stream: output_stream,
        })
    }

    /// Hand a raw control value to the matching node's ramp
    pub fn set_parameter(&self, node: NodeId, raw: &str) -> Result<f32> {
        self.params.set_parameter(node, raw)
    }

    pub fn analysis_tap(&self) -> SharedTap {
        Arc::clone(&self.analysis)
    }

    /// Recorder side of the capture ring; there is only one, so the first
    /// caller gets it
    pub fn take_capture_tap(&mut self) -> Option<CaptureTap> {
        self.capture.take()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn has_playback(&self) -> bool {
        self.playback
    }
}

fn start_input(
    input: &InputStream,
    chain: SignalChain,
    bridge: Option<HeapProd<f32>>,
) -> Result<cpal::Stream> {
    let stream = match input.sample_format {
        SampleFormat::F32 => build_input_stream::<f32>(input, chain, bridge)?,
        SampleFormat::I16 => build_input_stream::<i16>(input, chain, bridge)?,
        SampleFormat::I32 => build_input_stream::<i32>(input, chain, bridge)?,
        SampleFormat::U16 => build_input_stream::<u16>(input, chain, bridge)?,
        other => {
            return Err(AudioError::DeviceUnavailable(format!(
                "unsupported input sample format {:?}",
                other
            )))
        }
    };
    stream.play()?;
    Ok(stream)
}

fn build_input_stream<T>(
    input: &InputStream,
    chain: SignalChain,
    bridge: Option<HeapProd<f32>>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut processor = InputProcessor::new(input.channels(), chain, bridge);

    let stream = input.device.build_input_stream(
        &input.config,
        move |data: &[T], _: &cpal::InputCallbackInfo| processor.process(data),
        |err| log::error!("Input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Work done on every input callback: downmix, run the chain, feed playback.
///
/// Scratch buffers are sized once; callbacks longer than `MAX_BLOCK_FRAMES`
/// are processed in consecutive slices.
struct InputProcessor {
    channels: usize,
    mono: Vec<f32>,
    processed: Vec<f32>,
    chain: SignalChain,
    bridge: Option<HeapProd<f32>>,
}

impl InputProcessor {
    fn new(channels: usize, chain: SignalChain, bridge: Option<HeapProd<f32>>) -> Self {
        Self {
            channels: channels.max(1),
            mono: vec![0.0; MAX_BLOCK_FRAMES],
            processed: vec![0.0; MAX_BLOCK_FRAMES],
            chain,
            bridge,
        }
    }

    fn process<T>(&mut self, data: &[T])
    where
        T: Sample,
        f32: FromSample<T>,
    {
        for chunk in data.chunks(self.channels * MAX_BLOCK_FRAMES) {
            let frames = chunk.len() / self.channels;
            downmix(chunk, self.channels, &mut self.mono[..frames]);
            self.chain
                .process_block(&self.mono[..frames], &mut self.processed[..frames]);

            if let Some(bridge) = self.bridge.as_mut() {
                // A full bridge means the sink stalled; drop rather than block
                bridge.push_slice(&self.processed[..frames]);
            }
        }
    }
}

fn start_output(sink: &OutputSink, bridge: HeapCons<f32>) -> Result<cpal::Stream> {
    let stream = match sink.sample_format {
        SampleFormat::F32 => build_output_stream::<f32>(sink, bridge)?,
        SampleFormat::I16 => build_output_stream::<i16>(sink, bridge)?,
        SampleFormat::I32 => build_output_stream::<i32>(sink, bridge)?,
        SampleFormat::U16 => build_output_stream::<u16>(sink, bridge)?,
        other => {
            return Err(AudioError::DeviceUnavailable(format!(
                "unsupported output sample format {:?}",
                other
            )))
        }
    };
    stream.play()?;
    Ok(stream)
}

fn build_output_stream<T>(sink: &OutputSink, mut bridge: HeapCons<f32>) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = (sink.config.channels as usize).max(1);

    let stream = sink.device.build_output_stream(
        &sink.config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                // Underrun plays silence
                let sample = T::from_sample(bridge.try_pop().unwrap_or(0.0));
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
        },
        |err| log::error!("Output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Average interleaved frames down to mono
fn downmix<T>(interleaved: &[T], channels: usize, out: &mut [f32])
where
    T: Sample,
    f32: FromSample<T>,
{
    let scale = 1.0 / channels as f32;
    for (frame, slot) in interleaved.chunks_exact(channels).zip(out.iter_mut()) {
        *slot = frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>() * scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::AnalysisSampler;

    const FS: u32 = 48_000;

    fn chain_with(values: ControlValues) -> (SignalChain, Arc<ParameterBank>, SharedTap) {
        let params = Arc::new(ParameterBank::new(values));
        let analyser = AnalyserConfig::default();
        let tap = shared_tap(analyser.fft_size);
        let chain = SignalChain::new(
            &EqConfig::default(),
            &analyser,
            Arc::clone(&params),
            Arc::clone(&tap),
            None,
            FS,
        );
        (chain, params, tap)
    }

    fn run(chain: &mut SignalChain, input: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; input.len()];
        for (i, o) in input.chunks(256).zip(out.chunks_mut(256)) {
            chain.process_block(i, o);
        }
        out
    }

    #[test]
    fn test_fixed_topology_order() {
        let (chain, _, _) = chain_with(ControlValues::default());
        let nodes = chain.topology();

        assert_eq!(nodes.len(), 7);
        assert_eq!(nodes[0], AudioNode::Source);
        let bands: Vec<_> = nodes[1..4]
            .iter()
            .map(|n| match n {
                AudioNode::Filter {
                    band,
                    kind,
                    center_frequency_hz,
                    ..
                } => (*band, *kind, *center_frequency_hz),
                other => panic!("expected filter, got {:?}", other),
            })
            .collect();
        assert_eq!(
            bands,
            vec![
                (NodeId::Bass, FilterKind::LowShelf, 500.0),
                (NodeId::Mid, FilterKind::Peaking, 1500.0),
                (NodeId::Treble, FilterKind::HighShelf, 3000.0),
            ]
        );
        assert_eq!(nodes[4], AudioNode::Gain { level: 1.0 });
        assert_eq!(nodes[5], AudioNode::AnalysisTap { fft_size: 256 });
        assert_eq!(nodes[6], AudioNode::Sink);
    }

    #[test]
    fn test_flat_chain_passes_signal_through() {
        let (mut chain, _, _) = chain_with(ControlValues::default());
        let input: Vec<f32> = (0..1024).map(|i| ((i as f32) * 0.05).sin() * 0.3).collect();
        let output = run(&mut chain, &input);

        for (x, y) in input.iter().zip(&output) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_parse_parameter_clamps_and_rejects() {
        assert_eq!(parse_parameter(NodeId::Bass, "6").unwrap(), 6.0);
        assert_eq!(parse_parameter(NodeId::Bass, " 25.5 ").unwrap(), 10.0);
        assert_eq!(parse_parameter(NodeId::Volume, "-1").unwrap(), 0.0);
        assert!(matches!(
            parse_parameter(NodeId::Mid, "loud"),
            Err(AudioError::InvalidParameterValue { .. })
        ));
        assert!(parse_parameter(NodeId::Treble, "NaN").is_err());
        assert!(parse_parameter(NodeId::Treble, "inf").is_err());
    }

    #[test]
    fn test_invalid_value_leaves_target_untouched() {
        let (_, params, _) = chain_with(ControlValues::default());
        params.set_parameter(NodeId::Mid, "3").unwrap();
        assert!(params.set_parameter(NodeId::Mid, "").is_err());
        assert_eq!(params.target(NodeId::Mid), 3.0);
    }

    #[test]
    fn test_volume_change_is_ramped_not_stepped() {
        let (mut chain, params, _) = chain_with(ControlValues::default());
        let dc = vec![0.5f32; 4800];
        run(&mut chain, &dc);

        params.set_parameter(NodeId::Volume, "0").unwrap();
        let output = run(&mut chain, &dc);

        // First sample after the change barely moves
        assert!(output[0] > 0.49, "stepped to {}", output[0]);

        for pair in output.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-7);
        }
        // Five time constants (2400 samples) later it is ~silent
        assert!(output[2400] < 0.5 * 0.01);
    }

    #[test]
    fn test_bass_ramp_reaches_target_within_five_time_constants() {
        let (mut chain, params, _) = chain_with(ControlValues::default());
        params.set_parameter(NodeId::Bass, "6").unwrap();

        // 50 ms at 48 kHz
        run(&mut chain, &vec![0.0; 2400]);
        assert!(chain.current_value(NodeId::Bass) >= 0.99 * 6.0);
    }

    #[test]
    fn test_analysis_tap_observes_output() {
        let (mut chain, _, tap) = chain_with(ControlValues::default());
        let mut sampler = AnalysisSampler::new(
            AnalyserConfig {
                smoothing: 0.0,
                ..Default::default()
            },
            tap,
        );
        assert!(sampler.sample().is_silent());

        let tone: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / FS as f32).sin() * 0.5)
            .collect();
        run(&mut chain, &tone);
        assert!(!sampler.sample().is_silent());
    }

    #[test]
    fn test_capture_sees_raw_or_processed() {
        let params = Arc::new(ParameterBank::new(ControlValues {
            volume: 0.5,
            ..Default::default()
        }));
        let analyser = AnalyserConfig::default();
        let (raw_feed, mut raw) = capture_channel(FS, RecordSource::Raw);
        let (processed_feed, mut processed) = capture_channel(FS, RecordSource::Processed);
        raw.arm();
        processed.arm();

        let mut chains: Vec<SignalChain> = [raw_feed, processed_feed]
            .into_iter()
            .map(|feed| {
                SignalChain::new(
                    &EqConfig::default(),
                    &analyser,
                    Arc::clone(&params),
                    shared_tap(analyser.fft_size),
                    Some(feed),
                    FS,
                )
            })
            .collect();

        for chain in &mut chains {
            run(chain, &[0.8; 64]);
        }

        let mut raw_out = Vec::new();
        raw.drain_into(&mut raw_out);
        let mut processed_out = Vec::new();
        processed.drain_into(&mut processed_out);

        assert_eq!(raw_out, vec![0.8; 64]);
        assert!(processed_out.iter().all(|&s| (s - 0.4).abs() < 1e-3));
    }

    #[test]
    fn test_bad_analyser_is_a_config_error() {
        let options = GraphOptions {
            analyser: AnalyserConfig {
                fft_size: 300,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(AudioError::InvalidConfig(_))));
        assert!(GraphOptions::default().validate().is_ok());
    }

    #[test]
    fn test_node_display_names_filter_kind() {
        let (chain, _, _) = chain_with(ControlValues::default());
        let described: Vec<String> = chain.topology().iter().map(ToString::to_string).collect();

        assert_eq!(described[0], "source");
        assert_eq!(described[1], "bass lowshelf 500Hz q=1 +0.0dB");
        assert!(described[2].starts_with("mid peaking 1500Hz"));
        assert!(described[3].starts_with("treble highshelf 3000Hz"));
        assert_eq!(described[4], "gain 1.00");
        assert_eq!(described[5], "analyser fft=256");
        assert_eq!(described[6], "sink");
    }

    /// Interleaved stereo ramp whose downmix is `i / frames` for frame `i`
    fn stereo_ramp(frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let v = i as f32 / frames as f32;
                [v + 0.1, v - 0.1]
            })
            .collect()
    }

    #[test]
    fn test_long_callback_is_processed_whole_and_in_order() {
        const FRAMES: usize = 10_000;
        assert!(FRAMES > MAX_BLOCK_FRAMES);

        let (chain, _, _) = chain_with(ControlValues::default());
        let (producer, mut consumer) = HeapRb::<f32>::new(FRAMES * 2).split();
        let mut processor = InputProcessor::new(2, chain, Some(producer));

        processor.process(&stereo_ramp(FRAMES));

        let played: Vec<f32> = std::iter::from_fn(|| consumer.try_pop()).collect();
        assert_eq!(played.len(), FRAMES);
        for (i, y) in played.iter().enumerate() {
            let expected = i as f32 / FRAMES as f32;
            assert!((y - expected).abs() < 1e-3, "frame {}: {} vs {}", i, y, expected);
        }
    }

    #[test]
    fn test_long_callback_reaches_capture_in_full() {
        const FRAMES: usize = 10_000;

        let params = Arc::new(ParameterBank::new(ControlValues::default()));
        let analyser = AnalyserConfig::default();
        let (feed, mut tap) = capture_channel(FS, RecordSource::Raw);
        tap.arm();
        let chain = SignalChain::new(
            &EqConfig::default(),
            &analyser,
            params,
            shared_tap(analyser.fft_size),
            Some(feed),
            FS,
        );
        // Playback bridge far too small: overflow is dropped, not a panic
        let (producer, _consumer) = HeapRb::<f32>::new(16).split();
        let mut processor = InputProcessor::new(2, chain, Some(producer));

        let input = stereo_ramp(FRAMES);
        processor.process(&input);

        let mut captured = Vec::new();
        tap.drain_into(&mut captured);
        assert_eq!(captured.len(), FRAMES);
        for (i, s) in captured.iter().enumerate() {
            assert!((s - i as f32 / FRAMES as f32).abs() < 1e-6);
        }
    }

    #[test]
    fn test_odd_callback_lengths_without_playback() {
        let (chain, _, _) = chain_with(ControlValues::default());
        let mut processor = InputProcessor::new(1, chain, None);

        let lengths = [
            0,
            1,
            MAX_BLOCK_FRAMES - 1,
            MAX_BLOCK_FRAMES,
            MAX_BLOCK_FRAMES + 1,
            3 * MAX_BLOCK_FRAMES + 7,
        ];
        for len in lengths {
            processor.process(&vec![0.25f32; len]);
        }
        assert_eq!(processor.chain.current_value(NodeId::Volume), 1.0);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let interleaved = [1.0f32, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mut out = [9.0f32; 3];
        downmix(&interleaved, 2, &mut out);
        assert_eq!(out, [0.5, 0.5, 0.0]);

        let ints = [i16::MAX, i16::MAX];
        let mut out = [0.0f32; 1];
        downmix(&ints, 2, &mut out);
        assert!((out[0] - 1.0).abs() < 1e-3);
    }
}
