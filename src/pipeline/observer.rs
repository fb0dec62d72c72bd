//! Events pushed to the presentation layer.

use crate::core::error::{DecodeError, EngineFailure};
use crate::core::types::{FilterKind, ParameterName};
use parking_lot::Mutex;
use std::sync::Arc;

/// A change in pipeline state the presentation layer may want to show.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A new source image was installed.
    SourceLoaded { width: u32, height: u32 },
    /// Picker bytes could not be decoded; the previous preview stays.
    DecodeFailed { error: DecodeError },
    /// The current filter was replaced.
    FilterChanged { kind: FilterKind },
    /// A slider value was accepted.
    ParameterChanged { name: ParameterName, value: f64 },
    /// A render finished and is now the output.
    OutputUpdated { generation: u64 },
    /// A render failed; there is no output until the next state change.
    OutputCleared { generation: u64, failure: EngineFailure },
    /// Ask the user for an app review.
    ReviewRequested,
}

/// Callback type for pipeline events.
pub type ObserverCallback = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Shared list of subscribers.
///
/// Clones share the list, so the worker handle can subscribe callbacks on
/// a pipeline that lives on another thread.
#[derive(Clone, Default)]
pub struct Observers {
    callbacks: Arc<Mutex<Vec<ObserverCallback>>>,
}

impl Observers {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Arc::new(callback));
    }

    /// Deliver an event to every subscriber.
    pub fn notify(&self, event: PipelineEvent) {
        // Snapshot so a callback may subscribe without deadlocking
        let callbacks: Vec<ObserverCallback> = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Check if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("callbacks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_reaches_all_subscribers() {
        let observers = Observers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |event| seen.lock().push(event.clone()));
        }
        observers.notify(PipelineEvent::ReviewRequested);

        assert_eq!(observers.len(), 2);
        assert_eq!(*seen.lock(), vec![PipelineEvent::ReviewRequested; 2]);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let observers = Observers::new();
        let handle = observers.clone();
        handle.subscribe(|_| {});
        assert_eq!(observers.len(), 1);
    }
}
