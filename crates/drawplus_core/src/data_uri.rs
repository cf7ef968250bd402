//! Parsing and building `data:image/<subtype>;base64,<payload>` URIs.

use crate::ImageFormat;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use drawplus_error::{GenerationError, GenerationErrorKind};
use regex::Regex;
use std::sync::LazyLock;

static EMBEDDED_DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/([^;]+);base64,([A-Za-z0-9+/=]+)").expect("data URI pattern is valid")
});

/// A base64 image data URI split into its format tag and encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct DataUri {
    /// Format named in the URI header
    format: ImageFormat,
    /// Base64 payload, still encoded
    payload: String,
}

impl DataUri {
    /// Parse a complete data URI.
    ///
    /// # Errors
    ///
    /// Returns a `Decode` error when the URI is not an image data URI, lacks the
    /// `;base64` tag, or has no payload.
    pub fn parse(uri: &str) -> Result<Self, GenerationError> {
        let rest = uri.trim().strip_prefix("data:image/").ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Decode(
                "not an image data URI".to_string(),
            ))
        })?;

        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Decode(
                "data URI has no payload separator".to_string(),
            ))
        })?;

        let (subtype, encoding) = header.split_once(';').ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Decode(
                "data URI has no encoding tag".to_string(),
            ))
        })?;

        if !encoding.eq_ignore_ascii_case("base64") {
            return Err(GenerationError::new(GenerationErrorKind::Decode(format!(
                "unsupported data URI encoding: {}",
                encoding
            ))));
        }

        if payload.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::Decode(
                "data URI payload is empty".to_string(),
            )));
        }

        Ok(Self {
            format: ImageFormat::from_subtype(subtype),
            payload: payload.to_string(),
        })
    }

    /// Find the first data URI embedded anywhere in free text.
    pub fn find_in_text(text: &str) -> Option<Self> {
        let captures = EMBEDDED_DATA_URI.captures(text)?;
        let subtype = captures.get(1)?.as_str();
        let payload = captures.get(2)?.as_str();
        Some(Self {
            format: ImageFormat::from_subtype(subtype),
            payload: payload.to_string(),
        })
    }

    /// Decode the payload into raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns a `Decode` error if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, GenerationError> {
        STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|e| GenerationError::new(GenerationErrorKind::Decode(e.to_string())))
    }

    /// Build a data URI string from raw bytes.
    pub fn encode(bytes: &[u8], format: ImageFormat) -> String {
        format!("data:image/{};base64,{}", format, STANDARD.encode(bytes))
    }
}
