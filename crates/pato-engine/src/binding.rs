//! Sidechain source binding lifecycle.
//!
//! The engine is configured with a source *name*; the live source
//! behind that name can appear, disappear, and reappear at any time.
//! [`BindingManager`] owns the weak reference and the re-resolution
//! clock, exposing swap-and-return-old semantics so teardown of a
//! previous source (unsubscribing its capture callback) always happens
//! outside the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::source::{CaptureSource, CaptureTap, SourceRegistry};

/// Minimum interval between name-resolution attempts, in seconds.
///
/// Lookup walks host data structures and must stay out of the hot
/// path; an unresolvable name is retried at most this often.
pub const RESOLVE_INTERVAL_S: f32 = 3.0;

#[derive(Default)]
struct BindingState {
    /// Configured source name; `None` means explicitly unbound.
    name: Option<String>,
    /// Weak reference to the resolved source, if any.
    source: Option<Weak<dyn CaptureSource>>,
    /// Seconds accumulated since the last resolution attempt.
    since_resolve_s: f32,
}

/// Owns the current sidechain binding under its own mutex.
///
/// The lock is only ever held long enough to snapshot or swap the
/// reference; resolution, subscription, and teardown all run outside
/// it. This mutex and the ring buffer's are never held simultaneously.
#[derive(Default)]
pub struct BindingManager {
    state: Mutex<BindingState>,
}

impl BindingManager {
    /// Create an unbound manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the binding at a new source name.
    ///
    /// Returns the previously bound live source, if any; the caller
    /// must unsubscribe its capture tap outside this call's locks.
    /// Re-targeting to the current name is a no-op. An empty name
    /// unbinds, like `None`.
    pub fn retarget(&self, name: Option<&str>) -> Option<Arc<dyn CaptureSource>> {
        let name = name.filter(|n| !n.is_empty());
        let mut state = self.lock();
        if state.name.as_deref() == name {
            return None;
        }

        let old = state.source.take().and_then(|weak| weak.upgrade());
        state.name = name.map(str::to_owned);
        // Let the next tick resolve immediately instead of waiting a
        // full interval.
        state.since_resolve_s = RESOLVE_INTERVAL_S;
        drop(state);

        match name {
            Some(n) => tracing::debug!(source = n, "sidechain retargeted"),
            None => tracing::debug!("sidechain unbound"),
        }
        old
    }

    /// Snapshot the currently bound source, if it is still alive.
    ///
    /// Called once per audio block; holds the lock only for the weak
    /// upgrade.
    pub fn snapshot(&self) -> Option<Arc<dyn CaptureSource>> {
        self.lock().source.as_ref()?.upgrade()
    }

    /// Configured source name, if any.
    pub fn target_name(&self) -> Option<String> {
        self.lock().name.clone()
    }

    /// Drive periodic re-resolution.
    ///
    /// Accumulates `elapsed_s`; when a name is configured but no live
    /// source is bound and at least [`RESOLVE_INTERVAL_S`] has passed
    /// since the last attempt, performs one registry lookup and
    /// subscribes `tap` to the result. Both the lookup and the
    /// subscription run outside the binding lock. Returns whether a
    /// new source was bound.
    pub fn tick(
        &self,
        elapsed_s: f32,
        registry: &dyn SourceRegistry,
        tap: &Arc<dyn CaptureTap>,
    ) -> bool {
        let pending = {
            let mut state = self.lock();
            let Some(name) = state.name.clone() else {
                return false;
            };
            let live = state
                .source
                .as_ref()
                .is_some_and(|weak| weak.strong_count() > 0);
            if live {
                return false;
            }
            state.since_resolve_s += elapsed_s;
            if state.since_resolve_s < RESOLVE_INTERVAL_S {
                return false;
            }
            state.since_resolve_s = 0.0;
            name
        };

        let Some(source) = registry.get_source(&pending) else {
            tracing::debug!(source = %pending, "sidechain source not found");
            return false;
        };

        let stored = {
            let mut state = self.lock();
            // A concurrent retarget may have changed the name while we
            // were resolving; only adopt the source if it still matches.
            if state.name.as_deref() == Some(pending.as_str()) {
                state.source = Some(Arc::downgrade(&source));
                true
            } else {
                false
            }
        };

        if stored {
            source.subscribe(Arc::clone(tap));
            tracing::info!(source = %pending, "sidechain bound");
        }
        stored
    }

    /// Unbind and return the live source for teardown, if any.
    pub fn take(&self) -> Option<Arc<dyn CaptureSource>> {
        let mut state = self.lock();
        state.name = None;
        state.source.take().and_then(|weak| weak.upgrade())
    }
}
