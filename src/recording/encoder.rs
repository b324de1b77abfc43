//! Segment encoders and the assembled recording artifact.

use std::path::Path;

use super::capture::CaptureTap;
use crate::error::{AudioError, Result};

/// Container/codec the artifact is declared as.
///
/// The file extension and WAV header are derived from the same value the
/// encoder produces, so the name never claims a format the bytes are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactFormat {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl ArtifactFormat {
    /// Mono 16-bit little-endian PCM in a RIFF/WAVE container
    pub fn pcm16_mono(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    pub fn extension(&self) -> &'static str {
        "wav"
    }

    pub fn mime_type(&self) -> &'static str {
        "audio/wav"
    }

    pub fn codec(&self) -> &'static str {
        "pcm_s16le"
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

/// One opaque chunk of encoded audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment(Vec<u8>);

impl Segment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A finished recording, offered to the user under a fixed name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub format: ArtifactFormat,
    data: Vec<u8>,
}

impl Artifact {
    /// Concatenate segments in arrival order
    pub fn assemble(file_stem: &str, format: ArtifactFormat, segments: Vec<Segment>) -> Self {
        let total = segments.iter().map(Segment::len).sum();
        let mut data = Vec::with_capacity(total);
        for segment in segments {
            data.extend_from_slice(segment.as_bytes());
        }

        Self {
            file_name: format!("{}.{}", file_stem, format.extension()),
            format,
            data,
        }
    }

    /// Encoded payload (no container header)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Playback length of the payload
    pub fn duration_secs(&self) -> f32 {
        let bytes_per_frame =
            self.format.channels as usize * (self.format.bits_per_sample as usize / 8);
        if bytes_per_frame == 0 || self.format.sample_rate_hz == 0 {
            return 0.0;
        }
        (self.data.len() / bytes_per_frame) as f32 / self.format.sample_rate_hz as f32
    }

    /// Write the payload as a WAV file
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let mut writer = hound::WavWriter::create(path, self.format.wav_spec())?;
        for pair in self.data.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Produces encoded segments from the live stream while attached
pub trait Encoder {
    fn format(&self) -> ArtifactFormat;

    /// Attach to the stream and start producing
    fn start(&mut self) -> Result<()>;

    /// Next pending segment. Called repeatedly on each tick until it
    /// returns `None`, which it must do once everything pending is drained.
    fn poll(&mut self) -> Option<Segment>;

    /// Detach and flush the final segment
    fn stop(&mut self) -> Option<Segment>;
}

/// 16-bit PCM encoder fed by the capture tap
pub struct WavEncoder {
    tap: CaptureTap,
    scratch: Vec<f32>,
}

impl WavEncoder {
    pub fn new(tap: CaptureTap) -> Self {
        Self {
            tap,
            scratch: Vec::new(),
        }
    }

    fn encode_pending(&mut self) -> Option<Segment> {
        self.scratch.clear();
        self.tap.drain_into(&mut self.scratch);
        if self.scratch.is_empty() {
            return None;
        }

        let mut bytes = Vec::with_capacity(self.scratch.len() * 2);
        for &sample in &self.scratch {
            bytes.extend_from_slice(&to_pcm16(sample).to_le_bytes());
        }
        Some(Segment::new(bytes))
    }
}

impl Encoder for WavEncoder {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::pcm16_mono(self.tap.sample_rate_hz())
    }

    fn start(&mut self) -> Result<()> {
        if self.tap.sample_rate_hz() == 0 {
            return Err(AudioError::EncoderUnavailable(
                "capture stream reports no sample rate".to_string(),
            ));
        }
        self.tap.arm();
        Ok(())
    }

    fn poll(&mut self) -> Option<Segment> {
        self.encode_pending()
    }

    fn stop(&mut self) -> Option<Segment> {
        self.tap.disarm();
        let dropped = self.tap.dropped();
        if dropped > 0 {
            log::warn!("Recording lost {} samples to a full capture buffer", dropped);
        }
        self.encode_pending()
    }
}

/// Clip to [-1, 1] and scale to 16 bits
fn to_pcm16(sample: f32) -> i16 {
    let clipped = if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (clipped * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RecordSource;
    use crate::recording::capture_channel;

    #[test]
    fn test_assemble_preserves_arrival_order() {
        let segments = vec![
            Segment::new(vec![1, 2]),
            Segment::new(vec![3]),
            Segment::new(vec![4, 5, 6]),
        ];
        let artifact = Artifact::assemble("recording", ArtifactFormat::pcm16_mono(48_000), segments);

        assert_eq!(artifact.file_name, "recording.wav");
        assert_eq!(artifact.format.mime_type(), "audio/wav");
        assert_eq!(artifact.data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_empty_artifact() {
        let artifact = Artifact::assemble("recording", ArtifactFormat::pcm16_mono(48_000), vec![]);
        assert!(artifact.is_empty());
        assert_eq!(artifact.duration_secs(), 0.0);
    }

    #[test]
    fn test_pcm16_clips() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.5), i16::MAX);
        assert_eq!(to_pcm16(-1.5), -i16::MAX);
        assert_eq!(to_pcm16(f32::NAN), 0);
    }

    #[test]
    fn test_wav_encoder_segments_follow_tap() {
        let (mut feed, tap) = capture_channel(8_000, RecordSource::Raw);
        let mut encoder = WavEncoder::new(tap);

        // Nothing flows before start
        feed.offer(RecordSource::Raw, &[0.5]);
        encoder.start().unwrap();
        assert!(encoder.poll().is_none());

        feed.offer(RecordSource::Raw, &[0.5, -0.5]);
        let first = encoder.poll().unwrap();
        assert_eq!(first.len(), 4);

        feed.offer(RecordSource::Raw, &[1.0]);
        let last = encoder.stop().unwrap();
        assert_eq!(last.as_bytes(), &i16::MAX.to_le_bytes());

        // Detached
        feed.offer(RecordSource::Raw, &[1.0]);
        assert!(encoder.poll().is_none());
    }

    #[test]
    fn test_wav_encoder_needs_a_sample_rate() {
        let (_feed, tap) = capture_channel(0, RecordSource::Raw);
        let mut encoder = WavEncoder::new(tap);
        assert!(matches!(
            encoder.start(),
            Err(AudioError::EncoderUnavailable(_))
        ));
    }

    #[test]
    fn test_write_wav_round_trips_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.wav");

        let samples: Vec<u8> = [0i16, 1000, -1000, i16::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let artifact = Artifact::assemble(
            "recording",
            ArtifactFormat::pcm16_mono(22_050),
            vec![Segment::new(samples)],
        );
        artifact.write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0, 1000, -1000, i16::MAX]);
    }
}
