//! Image formats and reference images.

use crate::DataUri;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drawplus_error::{GenerationError, GenerationErrorKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Encoded image formats the provider is known to return.
///
/// The string form is the MIME subtype, and doubles as the file extension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Portable Network Graphics
    #[default]
    Png,
    /// JPEG, spelled `jpeg`
    Jpeg,
    /// JPEG, spelled `jpg`
    Jpg,
    /// WebP
    Webp,
    /// GIF
    Gif,
}

impl ImageFormat {
    /// Parse a MIME subtype, falling back to PNG for anything unrecognised.
    pub fn from_subtype(subtype: &str) -> Self {
        match ImageFormat::from_str(subtype.trim()) {
            Ok(format) => format,
            Err(_) => {
                tracing::warn!(subtype, "Unknown image subtype, storing as png");
                ImageFormat::Png
            }
        }
    }

    /// Guess the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', ..] => Some(ImageFormat::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageFormat::Jpeg),
            [b'G', b'I', b'F', b'8', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => {
                Some(ImageFormat::Webp)
            }
            _ => None,
        }
    }

    /// File extension used when persisting this format.
    pub fn extension(&self) -> &str {
        self.as_ref()
    }

    /// Full MIME type, e.g. `image/png`.
    pub fn mime_type(&self) -> String {
        format!("image/{}", self.as_ref())
    }
}

/// A decoded reference image supplied by the caller for editing.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct ReferenceImage {
    /// Raw encoded image bytes
    bytes: Vec<u8>,
    /// Best-guess format tag
    format: ImageFormat,
}

impl ReferenceImage {
    /// Create a reference image with an explicit format tag.
    pub fn new(bytes: Vec<u8>, format: ImageFormat) -> Self {
        Self { bytes, format }
    }

    /// Create a reference image, sniffing the format and defaulting to PNG.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let format = ImageFormat::sniff(&bytes).unwrap_or_default();
        Self { bytes, format }
    }

    /// Create a reference image from a bare base64 string or a `data:image/` URI.
    ///
    /// A data URI keeps its declared subtype; bare base64 is sniffed.
    ///
    /// # Errors
    ///
    /// Returns a `Decode` error if the payload is not valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, GenerationError> {
        let trimmed = encoded.trim();
        if trimmed.starts_with("data:image/") {
            let uri = DataUri::parse(trimmed)?;
            let bytes = uri.decode()?;
            return Ok(Self::new(bytes, *uri.format()));
        }

        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|e| GenerationError::new(GenerationErrorKind::Decode(e.to_string())))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Encode this image as a `data:image/<subtype>;base64,` URI.
    pub fn to_data_uri(&self) -> String {
        DataUri::encode(&self.bytes, self.format)
    }
}
