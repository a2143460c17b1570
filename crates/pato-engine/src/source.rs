//! Host-side audio source interfaces.
//!
//! The engine never enumerates or owns audio sources; the host does.
//! These traits are the whole boundary: the host resolves a name to a
//! [`CaptureSource`], and a subscribed [`CaptureTap`] receives that
//! source's raw frames as they are produced, on whatever thread the
//! host captures on.
//!
//! [`MemoryRegistry`] and [`BroadcastSource`] are ready-made in-memory
//! implementations for simple hosts and for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Receiver for captured audio frames.
///
/// Implementations must be cheap and non-blocking: `on_frames` is
/// called from the capture thread, which may itself be real-time.
pub trait CaptureTap: Send + Sync {
    /// Deliver one block of captured audio.
    ///
    /// `channels` holds one buffer per channel; only the first
    /// `frame_count` samples of each are valid. `muted` means the
    /// source is currently muted and the frames should count as
    /// silence regardless of their contents.
    fn on_frames(&self, channels: &[&[f32]], frame_count: usize, muted: bool);
}

/// An audio-producing source that capture taps can subscribe to.
pub trait CaptureSource: Send + Sync {
    /// Start delivering this source's frames to `tap`.
    ///
    /// Subscribing the same tap twice is a no-op.
    fn subscribe(&self, tap: Arc<dyn CaptureTap>);

    /// Stop delivering frames to `tap`. Unknown taps are ignored.
    fn unsubscribe(&self, tap: &Arc<dyn CaptureTap>);
}

/// Name-to-source lookup provided by the host.
pub trait SourceRegistry: Send + Sync {
    /// Resolve a source by its registered name.
    ///
    /// Returns `None` when no source with that name currently exists;
    /// the caller is expected to retry later rather than treat this as
    /// an error.
    fn get_source(&self, name: &str) -> Option<Arc<dyn CaptureSource>>;
}

fn ignore_poison<T>(result: Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// A [`CaptureSource`] that fans captured frames out to every
/// subscribed tap.
///
/// Hosts feed it via [`deliver`](BroadcastSource::deliver) from their
/// capture callback.
#[derive(Default)]
pub struct BroadcastSource {
    taps: Mutex<Vec<Arc<dyn CaptureTap>>>,
}

impl BroadcastSource {
    /// Create a source with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one block of frames to every subscribed tap.
    pub fn deliver(&self, channels: &[&[f32]], frame_count: usize, muted: bool) {
        let taps = ignore_poison(self.taps.lock());
        for tap in taps.iter() {
            tap.on_frames(channels, frame_count, muted);
        }
    }

    /// Number of currently subscribed taps.
    pub fn tap_count(&self) -> usize {
        ignore_poison(self.taps.lock()).len()
    }
}

impl CaptureSource for BroadcastSource {
    fn subscribe(&self, tap: Arc<dyn CaptureTap>) {
        let mut taps = ignore_poison(self.taps.lock());
        if !taps.iter().any(|t| Arc::ptr_eq(t, &tap)) {
            taps.push(tap);
        }
    }

    fn unsubscribe(&self, tap: &Arc<dyn CaptureTap>) {
        let mut taps = ignore_poison(self.taps.lock());
        taps.retain(|t| !Arc::ptr_eq(t, tap));
    }
}

/// In-memory [`SourceRegistry`] keyed by source name.
///
/// Holds weak references so a dropped source disappears from lookups
/// without explicit removal, matching host source lifecycles where the
/// registry must not keep sources alive.
#[derive(Default)]
pub struct MemoryRegistry {
    sources: Mutex<HashMap<String, Weak<BroadcastSource>>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<String>, source: &Arc<BroadcastSource>) {
        let mut sources = ignore_poison(self.sources.lock());
        sources.insert(name.into(), Arc::downgrade(source));
    }

    /// Remove the entry for `name`, if any.
    pub fn remove(&self, name: &str) {
        let mut sources = ignore_poison(self.sources.lock());
        sources.remove(name);
    }
}

impl SourceRegistry for MemoryRegistry {
    fn get_source(&self, name: &str) -> Option<Arc<dyn CaptureSource>> {
        let sources = ignore_poison(self.sources.lock());
        let source = sources.get(name)?.upgrade()?;
        Some(source)
    }
}
