//! Parallel capture tap on the live input stream.
//!
//! The audio graph owns the stream and the [`CaptureFeed`]; the recorder owns
//! the [`CaptureTap`], arms and disarms it, and drains what accumulated
//! between timer ticks. The two halves share a fixed-size lock-free ring, so
//! the audio callback never blocks or allocates. When the drain falls behind,
//! the newest samples are dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::params::RecordSource;

/// Audio kept between drains before samples start being dropped
const CAPACITY_S: usize = 2;

struct CaptureShared {
    armed: AtomicBool,
    dropped: AtomicUsize,
    sample_rate_hz: u32,
    source: RecordSource,
}

/// Create the audio-thread feed and the recorder-side tap for one stream
pub fn capture_channel(sample_rate_hz: u32, source: RecordSource) -> (CaptureFeed, CaptureTap) {
    let capacity = (sample_rate_hz as usize * CAPACITY_S).max(1);
    capture_channel_with_capacity(sample_rate_hz, source, capacity)
}

fn capture_channel_with_capacity(
    sample_rate_hz: u32,
    source: RecordSource,
    capacity: usize,
) -> (CaptureFeed, CaptureTap) {
    let shared = Arc::new(CaptureShared {
        armed: AtomicBool::new(false),
        dropped: AtomicUsize::new(0),
        sample_rate_hz,
        source,
    });
    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

    (
        CaptureFeed {
            shared: Arc::clone(&shared),
            producer,
        },
        CaptureTap { shared, consumer },
    )
}

/// Audio-thread half, owned by the signal chain
pub struct CaptureFeed {
    shared: Arc<CaptureShared>,
    producer: HeapProd<f32>,
}

impl CaptureFeed {
    /// Push a mono block if armed and `at` matches the configured source
    #[inline]
    pub fn offer(&mut self, at: RecordSource, block: &[f32]) {
        if at != self.shared.source || !self.shared.armed.load(Ordering::Acquire) {
            return;
        }
        let written = self.producer.push_slice(block);
        if written < block.len() {
            self.shared
                .dropped
                .fetch_add(block.len() - written, Ordering::Relaxed);
        }
    }
}

/// Recorder half: arm, disarm, drain
pub struct CaptureTap {
    shared: Arc<CaptureShared>,
    consumer: HeapCons<f32>,
}

impl CaptureTap {
    pub fn sample_rate_hz(&self) -> u32 {
        self.shared.sample_rate_hz
    }

    /// Samples the ring can hold between drains
    pub fn capacity(&self) -> usize {
        self.consumer.capacity().get()
    }

    pub fn is_armed(&self) -> bool {
        self.shared.armed.load(Ordering::Acquire)
    }

    /// Samples lost to a full ring since the last arm
    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Start accepting samples (discards anything left from a previous take)
    pub fn arm(&mut self) {
        self.consumer.clear();
        self.shared.dropped.store(0, Ordering::Relaxed);
        self.shared.armed.store(true, Ordering::Release);
    }

    /// Stop accepting samples; already pending ones stay drainable
    pub fn disarm(&mut self) {
        self.shared.armed.store(false, Ordering::Release);
    }

    /// Move everything captured so far onto the end of `out`
    pub fn drain_into(&mut self, out: &mut Vec<f32>) {
        let start = out.len();
        out.resize(start + self.consumer.occupied_len(), 0.0);
        let read = self.consumer.pop_slice(&mut out[start..]);
        out.truncate(start + read);
    }
}
