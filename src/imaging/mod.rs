//! Image codec boundary: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Crop** | `crop_imm` + re-encode in the source format |
//! | **Write-back** | `tempfile` sibling file, renamed over the original |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{fits_within, status_bar_crop};
pub use params::{CropParams, CropRect, Quality};
pub use rust_backend::RustBackend;
