//! Review-prompt throttle.
//!
//! Counts filter changes and asks for an app review once every
//! [`DEFAULT_REVIEW_THRESHOLD`] changes. The counter survives restarts
//! through a [`CounterStore`].

pub mod store;
pub mod throttle;

pub use store::{CounterStore, JsonFileStore, MemoryStore};
pub use throttle::{ReviewRequest, ReviewThrottle, DEFAULT_REVIEW_THRESHOLD, FILTER_COUNT_KEY};
