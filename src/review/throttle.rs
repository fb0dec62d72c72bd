//! Counts filter changes and decides when to ask for a review.

use crate::review::store::{CounterStore, MemoryStore};
use log::{debug, warn};

/// Number of filter changes between review prompts.
pub const DEFAULT_REVIEW_THRESHOLD: u32 = 5;

/// Key the counter is persisted under.
pub const FILTER_COUNT_KEY: &str = "filter_count";

/// One-shot signal that the presentation layer should ask for a review.
///
/// Fire and forget: whether the platform actually shows a prompt is not
/// the pipeline's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ReviewRequest;

/// Review-prompt throttle.
///
/// The counter stays in `[0, threshold)`: reaching the threshold emits a
/// [`ReviewRequest`] and resets to zero in the same call.
pub struct ReviewThrottle {
    store: Box<dyn CounterStore>,
    count: u32,
    threshold: u32,
}

impl ReviewThrottle {
    /// Create a throttle, reading the counter from `store`.
    ///
    /// A store that cannot be read starts the counter at zero. A persisted
    /// value at or past the threshold is pulled back to `threshold - 1`, so
    /// the next change prompts.
    pub fn new(store: Box<dyn CounterStore>, threshold: u32) -> Self {
        let threshold = threshold.max(1);
        let count = match store.read(FILTER_COUNT_KEY) {
            Ok(Some(value)) => value.min(threshold - 1),
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read review counter, starting at 0: {}", e);
                0
            }
        };
        debug!("Review counter starts at {}/{}", count, threshold);

        Self {
            store,
            count,
            threshold,
        }
    }

    /// Throttle with a fresh in-memory counter and the default threshold.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), DEFAULT_REVIEW_THRESHOLD)
    }

    /// Record a filter change.
    ///
    /// Every selection counts, including re-selecting the current filter.
    pub fn on_filter_changed(&mut self) -> Option<ReviewRequest> {
        self.count += 1;

        let request = if self.count >= self.threshold {
            self.count = 0;
            Some(ReviewRequest)
        } else {
            None
        };

        if let Err(e) = self.store.write(FILTER_COUNT_KEY, self.count) {
            warn!("Failed to persist review counter: {}", e);
        }
        request
    }

    /// Current counter value.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Changes between prompts.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl std::fmt::Debug for ReviewThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewThrottle")
            .field("count", &self.count)
            .field("threshold", &self.threshold)
            .finish()
    }
}
