//! Core types for the Instafilter processing pipeline.
//!
//! This module contains the foundational types shared by every other part
//! of the crate:
//! - Filter kinds and parameter names (the closed sets the UI works with)
//! - Parameter ranges and slider definitions
//! - Source and output image wrappers
//! - Error types

pub mod types;
pub mod parameter;
pub mod error;

// Re-export commonly used types
pub use types::{BoundParameters, FilterKind, OutputImage, ParameterName, ParameterSet, SourceImage};
pub use parameter::{ParameterDefinition, ParameterRange, UiHint};
pub use error::{DecodeError, EngineFailure, InstafilterError, RangeError};
