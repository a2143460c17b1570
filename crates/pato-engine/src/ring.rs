//! Thread-safe sidechain sample buffer.
//!
//! The capture thread pushes frames in whenever the bound source
//! produces them; the processing thread pulls fixed-size blocks out
//! once per audio block. One mutex serializes the two, with critical
//! sections bounded by a memcpy of the block. Missing data is silence,
//! never a wait: the consumer must not block on the producer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::source::CaptureTap;

/// Growable circular sample queue.
///
/// A thin abstraction over `VecDeque` that moves samples by count, so
/// length bookkeeping lives in one place instead of being threaded
/// through every call site.
#[derive(Debug, Default)]
pub struct Ring<T> {
    inner: VecDeque<T>,
}

impl<T: Copy + Default> Ring<T> {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the ring holds no samples.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Append all samples from `samples`.
    pub fn push_slice(&mut self, samples: &[T]) {
        self.inner.extend(samples.iter().copied());
    }

    /// Append `count` default-valued (zero) samples.
    pub fn push_zeros(&mut self, count: usize) {
        self.inner.resize(self.inner.len() + count, T::default());
    }

    /// Pop exactly `out.len()` samples into `out`.
    ///
    /// Returns `false` and pops nothing when fewer samples are
    /// buffered.
    pub fn pop_into(&mut self, out: &mut [T]) -> bool {
        if self.inner.len() < out.len() {
            return false;
        }
        for slot in out.iter_mut() {
            // Length was checked above; drain in order.
            if let Some(sample) = self.inner.pop_front() {
                *slot = sample;
            }
        }
        true
    }

    /// Drop the oldest `count` samples (fewer if the ring is shorter).
    pub fn discard(&mut self, count: usize) {
        let n = count.min(self.inner.len());
        self.inner.drain(..n);
    }

    /// Remove all samples.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[derive(Debug)]
struct RingState {
    channels: Vec<Ring<f32>>,
    /// High-water mark of frames seen in a single push or pull; the
    /// trim policy keys off it to bound steady-state memory.
    max_frames_seen: usize,
}

/// Per-channel sidechain buffer shared between the capture thread and
/// the processing thread.
///
/// All channel queues stay the same length at all times: pushes and
/// pops always move whole frames across every channel.
#[derive(Debug)]
pub struct SidechainRing {
    state: Mutex<RingState>,
}

impl SidechainRing {
    /// Create a ring for `channels` channels.
    pub fn new(channels: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                channels: (0..channels).map(|_| Ring::new()).collect(),
                max_frames_seen: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        // A poisoned lock still holds usable sample data; silence on
        // one channel beats killing the audio thread.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.lock().channels.len()
    }

    /// Number of buffered frames (identical across channels).
    pub fn buffered_frames(&self) -> usize {
        self.lock().channels.first().map_or(0, Ring::len)
    }

    /// Change the channel count, dropping all buffered samples.
    ///
    /// No-op when the count is unchanged.
    pub fn set_channels(&self, channels: usize) {
        let mut state = self.lock();
        if state.channels.len() != channels {
            state.channels = (0..channels).map(|_| Ring::new()).collect();
            state.max_frames_seen = 0;
        }
    }

    /// Drop all buffered samples.
    pub fn clear(&self) {
        let mut state = self.lock();
        for ring in &mut state.channels {
            ring.clear();
        }
    }

    /// Push one captured block (producer side).
    ///
    /// Muted blocks are pushed as zeros so timing stays intact. When
    /// the buffered length exceeds twice the high-water mark, the
    /// oldest high-water-mark's worth of samples is discarded from
    /// every channel first: bursts are tolerated, steady-state memory
    /// is bounded.
    pub fn push(&self, frames: &[&[f32]], frame_count: usize, muted: bool) {
        if frame_count == 0 {
            return;
        }
        let mut state = self.lock();
        if state.max_frames_seen < frame_count {
            state.max_frames_seen = frame_count;
        }

        let trim = state.max_frames_seen;
        let buffered = state.channels.first().map_or(0, Ring::len);
        if buffered > trim * 2 {
            for ring in &mut state.channels {
                ring.discard(trim);
            }
        }

        for (i, ring) in state.channels.iter_mut().enumerate() {
            match frames.get(i) {
                Some(data) if !muted => ring.push_slice(&data[..frame_count.min(data.len())]),
                // A source with fewer channels than the engine still
                // advances every queue, keeping lengths equal.
                _ => ring.push_zeros(frame_count),
            }
        }
        debug_assert!(
            state
                .channels
                .windows(2)
                .all(|pair| pair[0].len() == pair[1].len()),
            "channel queues diverged"
        );
    }

    /// Pull exactly `frame_count` frames per channel (consumer side).
    ///
    /// When any channel holds fewer than `frame_count` samples, `out`
    /// is zero-filled and nothing is popped; returns whether real data
    /// was delivered. Never blocks waiting for the producer.
    pub fn pull(&self, out: &mut [Vec<f32>], frame_count: usize) -> bool {
        if frame_count == 0 {
            return true;
        }
        let mut state = self.lock();
        if state.max_frames_seen < frame_count {
            state.max_frames_seen = frame_count;
        }

        let buffered = state.channels.first().map_or(0, Ring::len);
        if buffered < frame_count {
            drop(state);
            for channel in out.iter_mut() {
                channel[..frame_count].fill(0.0);
            }
            return false;
        }

        let popped = state.channels.len();
        for (ring, channel) in state.channels.iter_mut().zip(out.iter_mut()) {
            ring.pop_into(&mut channel[..frame_count]);
        }
        drop(state);
        // Output channels beyond the ring's count (possible briefly
        // during a channel-count change) read as silence, not stale data.
        for channel in out.iter_mut().skip(popped) {
            channel[..frame_count].fill(0.0);
        }
        true
    }
}

impl CaptureTap for SidechainRing {
    fn on_frames(&self, channels: &[&[f32]], frame_count: usize, muted: bool) {
        self.push(channels, frame_count, muted);
    }
}
