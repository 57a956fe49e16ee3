//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the trim engine (which decides what to crop) and the
//! [`backend`](super::backend) (which does the pixel work), so the engine can
//! be tested against a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy re-encode quality (1–100, default 90). Clamped on construction.
//! - [`CropRect`]: Region of the source image to keep.
//! - [`CropParams`]: Full specification for an in-place crop: path, region, quality.

use serde::Serialize;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for CropRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Crop the image at `path` to `rect` and overwrite it.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub path: PathBuf,
    pub rect: CropRect,
    pub quality: Quality,
}
