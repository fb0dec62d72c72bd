//! # Instafilter - Photo Filter Pipeline
//!
//! Instafilter applies one of a fixed set of image filters to a picked photo
//! and keeps the filtered preview in sync with the user's slider and filter
//! choices.
//!
//! ## Features
//!
//! - **Filter Registry**: Eight filters, each declaring which sliders it uses
//! - **Live Reconciliation**: Every change reprocesses the full-resolution source
//! - **Background Rendering**: Decode and render off the caller's thread; the
//!   latest request always wins
//! - **Review Throttle**: Asks for an app review once every five filter changes,
//!   persisted across restarts
//! - **Sharing**: Encode the current output as PNG or JPEG
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use instafilter::prelude::*;
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.load_source(&std::fs::read("photo.jpg")?)?;
//!
//! pipeline.set_filter_kind(FilterKind::Vignette);
//! pipeline.set_parameter(ParameterName::Radius, 150.0)?;
//!
//! let asset = pipeline.export(ShareFormat::Png)?;
//! asset.write_to_path(Path::new("filtered.png"))?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Core types, parameter ranges and error handling
//! - [`filters`]: Filter registry, engine seam and built-in kernels
//! - [`pipeline`]: The state owner, its events and the background worker
//! - [`review`]: Review-prompt throttle and counter storage
//! - [`share`]: Encoding the output for a share target
//! - [`config`]: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod filters;
pub mod pipeline;
pub mod review;
pub mod share;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use instafilter::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{
        BoundParameters, FilterKind, OutputImage, ParameterName, ParameterSet, SourceImage,
    };

    // Parameter definitions
    pub use crate::core::parameter::{ParameterDefinition, ParameterRange, UiHint};

    // Errors
    pub use crate::core::error::{
        ConfigError, DecodeError, EngineFailure, InstafilterError, InstafilterResult, RangeError,
        ShareError, StoreError,
    };

    // Filters
    pub use crate::filters::{BuiltinEngine, Category, FilterDescriptor, FilterEngine, FilterRegistry};

    // Pipeline
    pub use crate::pipeline::{
        FormatDecoder, ImageDecoder, Pipeline, PipelineBuilder, PipelineEvent, PipelineSnapshot,
        PipelineWorker,
    };

    // Review
    pub use crate::review::{CounterStore, JsonFileStore, MemoryStore, ReviewThrottle};

    // Sharing and configuration
    pub use crate::config::AppConfig;
    pub use crate::share::{ShareFormat, SharedAsset};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "instafilter");
    }

    #[test]
    fn test_registry_covers_every_kind() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.len(), FilterKind::ALL.len());
        for kind in FilterKind::ALL {
            assert!(registry.descriptor(kind).is_some(), "{kind}");
        }
    }

    #[test]
    fn test_end_to_end_share() {
        let image = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            10,
            10,
            image::Rgba([200, 120, 40, 255]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let mut pipeline = Pipeline::new();
        pipeline.load_source(&bytes).unwrap();
        pipeline.set_filter_kind(FilterKind::GaussianBlur);
        pipeline.set_parameter(ParameterName::Radius, 3.0).unwrap();

        let asset = pipeline.export(ShareFormat::Png).unwrap();
        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }
}
