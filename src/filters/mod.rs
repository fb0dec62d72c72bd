//! Filter module.
//!
//! Contains the filter registry, the engine seam and the built-in kernels.

pub mod registry;
pub mod engine;
pub mod builtin;

pub use registry::{Category, FilterDescriptor, FilterRegistry};
pub use engine::{BuiltinEngine, FilterEngine};
