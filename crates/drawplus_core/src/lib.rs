//! Core data types for drawplus.
//!
//! Plain types shared by the rate limiter, the image store, and the provider
//! clients: image formats, reference images, data URIs, generation requests,
//! per-attempt outcomes, and stored image handles.

mod data_uri;
mod image;
mod observability;
mod outcome;
mod request;
mod stored;

pub use data_uri::DataUri;
pub use image::{ImageFormat, ReferenceImage};
pub use observability::init_tracing;
pub use outcome::GenerationOutcome;
pub use request::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GenerationRequest,
    GenerationRequestBuilder, GenerationRequestBuilderError,
};
pub use stored::{StoredImage, file_url};
