//! Turning picker bytes into a [`SourceImage`].

use crate::core::error::DecodeError;
use crate::core::types::SourceImage;
use crate::pipeline::panic_message;
use std::panic::{self, AssertUnwindSafe};

/// Decodes raw bytes from the image picker.
///
/// Called from background threads by the worker.
pub trait ImageDecoder: Send + Sync {
    /// Decode `bytes` into a raster.
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, DecodeError>;
}

/// Decoder that sniffs the container format from the bytes themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDecoder;

impl ImageDecoder for FormatDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SourceImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let format = image::guess_format(bytes).map_err(|_| DecodeError::UnknownFormat)?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        Ok(SourceImage::new(decoded).with_format(format))
    }
}

/// Decode with `decoder`, reporting a panic as [`DecodeError::Malformed`].
pub fn decode_guarded(decoder: &dyn ImageDecoder, bytes: &[u8]) -> Result<SourceImage, DecodeError> {
    panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(bytes))).unwrap_or_else(|payload| {
        Err(DecodeError::Malformed(format!(
            "decoder panicked: {}",
            panic_message(&*payload)
        )))
    })
}
