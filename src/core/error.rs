//! Error types for Instafilter.
//!
//! Uses thiserror for structured errors. None of these are fatal: a decode or
//! range failure rejects one call and leaves state alone, an engine failure
//! clears the output, a store failure is logged and ignored.

use crate::core::types::ParameterName;
use thiserror::Error;

/// Top-level error type for Instafilter.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum InstafilterError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    #[error("Engine failure: {0}")]
    Engine(#[from] EngineFailure),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Share error: {0}")]
    Share(#[from] ShareError),

    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Pipeline worker is not running: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw bytes from the picker could not be turned into a raster.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("No image data")]
    Empty,

    #[error("Unrecognised image format")]
    UnknownFormat,

    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    #[error("Malformed image data: {0}")]
    Malformed(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Unsupported(e) => DecodeError::Unsupported(e.to_string()),
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

/// A parameter value lies outside the fixed range for its name.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{name} value {value} is outside [{min}, {max}]")]
pub struct RangeError {
    /// The parameter that was rejected.
    pub name: ParameterName,
    /// The rejected value.
    pub value: f64,
    /// Lower bound of the range.
    pub min: f64,
    /// Upper bound of the range.
    pub max: f64,
}

/// The filter engine could not produce an output for its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineFailure {
    #[error("Unsupported image extent {width}x{height} (max edge {max_extent})")]
    UnsupportedExtent {
        width: u32,
        height: u32,
        max_extent: u32,
    },

    #[error("{0}")]
    Internal(String),
}

/// Errors from persisted key-value storage.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed store: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Value for '{key}' is not a counter: {value}")]
    InvalidValue { key: String, value: String },
}

/// Errors while loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Read { path: String, error: std::io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid default parameter: {0}")]
    Parameter(#[from] RangeError),

    #[error("{0}")]
    Invalid(String),
}

/// Errors while turning an output into a shareable asset.
#[derive(Error, Debug)]
pub enum ShareError {
    #[error("There is no output image to share")]
    NoOutput,

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write asset: {0}")]
    Io(#[from] std::io::Error),
}

impl InstafilterError {
    /// Check whether the process can carry on after this error.
    ///
    /// Only a dead worker thread is unrecoverable; everything else rejects a
    /// single call.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, InstafilterError::Worker(_))
    }
}

/// Result type alias for Instafilter operations.
pub type InstafilterResult<T> = Result<T, InstafilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_message() {
        let error = RangeError {
            name: ParameterName::Radius,
            value: 250.0,
            min: 0.0,
            max: 200.0,
        };
        assert_eq!(error.to_string(), "Radius value 250 is outside [0, 200]");
    }

    #[test]
    fn test_decode_error_from_image_error() {
        let error = image::load_from_memory(b"definitely not an image").unwrap_err();
        let decode: DecodeError = error.into();
        assert!(matches!(
            decode,
            DecodeError::Unsupported(_) | DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn test_recoverable() {
        assert!(InstafilterError::from(DecodeError::Empty).is_recoverable());
        assert!(!InstafilterError::Worker("gone".to_string()).is_recoverable());
    }
}
