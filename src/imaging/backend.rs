//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the trim engine
//! needs from a codec: identify (header-only size read) and crop (decode,
//! crop, re-encode, write back over the original).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on the `image` crate.

use super::params::CropParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// Implementations are shared across the trimmer's worker threads.
pub trait ImageBackend: Send + Sync {
    /// Read pixel dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the image at `params.path`, crop it to `params.rect`, and
    /// replace the file with the result in its original format.
    ///
    /// Errors before the pixel data is available are [`BackendError::Decode`].
    fn crop(&self, params: &CropParams) -> Result<(), BackendError>;
}
