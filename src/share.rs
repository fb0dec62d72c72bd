//! Handing the filtered image to a share sheet.

use crate::core::error::ShareError;
use crate::core::types::OutputImage;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

/// Title shown alongside the shared image.
pub const SHARE_TITLE: &str = "Instafilter image";

/// Default JPEG quality for shared images.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encoding used for a shared image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum ShareFormat {
    Png,
    Jpeg { quality: u8 },
}

impl ShareFormat {
    /// JPEG at [`DEFAULT_JPEG_QUALITY`].
    pub fn jpeg() -> Self {
        ShareFormat::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Pick a format from a file extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("jpg") | Some("jpeg") => Self::jpeg(),
            _ => ShareFormat::Png,
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ShareFormat::Png => "image/png",
            ShareFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ShareFormat::Png => "png",
            ShareFormat::Jpeg { .. } => "jpg",
        }
    }
}

impl Default for ShareFormat {
    fn default() -> Self {
        ShareFormat::Png
    }
}

/// An encoded image ready to hand to a share target.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedAsset {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: &'static str,
    /// Title for the share sheet.
    pub title: &'static str,
    format: ShareFormat,
}

impl SharedAsset {
    /// Format the bytes were encoded with.
    pub fn format(&self) -> ShareFormat {
        self.format
    }

    /// File extension matching the encoding.
    pub fn file_extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Encode as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    /// Write the encoded bytes to `path`.
    pub fn write_to_path(&self, path: &Path) -> Result<(), ShareError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Encode an output image for sharing.
pub fn export(output: &OutputImage, format: ShareFormat) -> Result<SharedAsset, ShareError> {
    let mut buffer = Cursor::new(Vec::new());

    match format {
        ShareFormat::Png => {
            output.image().write_to(&mut buffer, ImageFormat::Png)?;
        }
        ShareFormat::Jpeg { quality } => {
            // JPEG has no alpha channel
            let rgb = output.image().to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            encoder.encode(
                &rgb,
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )?;
        }
    }

    Ok(SharedAsset {
        bytes: buffer.into_inner(),
        mime_type: format.mime_type(),
        title: SHARE_TITLE,
        format,
    })
}
