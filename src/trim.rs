//! Trim job engine: decides what to do with one screenshot and does it.
//!
//! A job reads the image size, matches it against the
//! [device profiles](crate::profiles), and then takes one of three paths:
//!
//! ```text
//! untrimmed profile size  →  crop status bar, overwrite file   (Trimmed / ImageNotRetina)
//! trimmed profile size    →  reject, file untouched            (ImageAlreadyTrimmed)
//! anything else           →  skip, file untouched              (Skipped)
//! ```
//!
//! Scale-1 profiles are cropped like every other profile, and the job then
//! reports [`TrimErrorKind::ImageNotRetina`] so callers know the screenshot
//! came from a non-Retina screen. The file is trimmed either way.
//!
//! [`plan_trim`] is the side-effect-free half (used by `status-trim check`);
//! [`trim_file`] runs a whole job synchronously. Queuing and per-file
//! exclusion live in [`crate::queue`].

use crate::imaging::{BackendError, CropParams, CropRect, ImageBackend, Quality, status_bar_crop};
use crate::profiles::{DeviceProfile, Orientation, classify, classify_trimmed};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stable classification of a [`TrimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrimErrorKind {
    CannotCreateImageSourceFromFile,
    CannotCreateImageFromSource,
    CannotWriteImageToFile,
    ImageAlreadyTrimmed,
    ImageNotRetina,
}

impl TrimErrorKind {
    /// Numeric error code, 1 through 5.
    pub fn code(self) -> u32 {
        match self {
            TrimErrorKind::CannotCreateImageSourceFromFile => 1,
            TrimErrorKind::CannotCreateImageFromSource => 2,
            TrimErrorKind::CannotWriteImageToFile => 3,
            TrimErrorKind::ImageAlreadyTrimmed => 4,
            TrimErrorKind::ImageNotRetina => 5,
        }
    }

    /// Failures caused by I/O or codec problems, as opposed to the image
    /// content being rejected.
    pub fn is_io(self) -> bool {
        matches!(
            self,
            TrimErrorKind::CannotCreateImageSourceFromFile
                | TrimErrorKind::CannotCreateImageFromSource
                | TrimErrorKind::CannotWriteImageToFile
        )
    }
}

#[derive(Error, Debug)]
pub enum TrimError {
    #[error("Cannot read image {}: {source}", .path.display())]
    CannotCreateImageSourceFromFile {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Cannot decode image {}: {source}", .path.display())]
    CannotCreateImageFromSource {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Cannot write image {}: {source}", .path.display())]
    CannotWriteImageToFile {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Image {} is already trimmed ({width}x{height})", .path.display())]
    ImageAlreadyTrimmed {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    #[error("Image {} is not Retina resolution (trimmed to {crop})", .path.display())]
    ImageNotRetina { path: PathBuf, crop: CropRect },
}

impl TrimError {
    pub fn kind(&self) -> TrimErrorKind {
        match self {
            TrimError::CannotCreateImageSourceFromFile { .. } => {
                TrimErrorKind::CannotCreateImageSourceFromFile
            }
            TrimError::CannotCreateImageFromSource { .. } => {
                TrimErrorKind::CannotCreateImageFromSource
            }
            TrimError::CannotWriteImageToFile { .. } => TrimErrorKind::CannotWriteImageToFile,
            TrimError::ImageAlreadyTrimmed { .. } => TrimErrorKind::ImageAlreadyTrimmed,
            TrimError::ImageNotRetina { .. } => TrimErrorKind::ImageNotRetina,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TrimError::CannotCreateImageSourceFromFile { path, .. }
            | TrimError::CannotCreateImageFromSource { path, .. }
            | TrimError::CannotWriteImageToFile { path, .. }
            | TrimError::ImageAlreadyTrimmed { path, .. }
            | TrimError::ImageNotRetina { path, .. } => path,
        }
    }
}

/// What a successful job did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrimOutcome {
    Trimmed {
        profile: DeviceProfile,
        orientation: Orientation,
        crop: CropRect,
    },
    /// Not a known screen size; the file was left alone.
    Skipped { width: u32, height: u32 },
}

/// What a job would do, decided from the image size alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum TrimPlan {
    Crop {
        profile: DeviceProfile,
        orientation: Orientation,
        crop: CropRect,
    },
    AlreadyTrimmed {
        profile: DeviceProfile,
        orientation: Orientation,
    },
    Unknown { width: u32, height: u32 },
}

/// Classify the image at `path` without touching it.
pub fn plan_trim(backend: &dyn ImageBackend, path: &Path) -> Result<TrimPlan, TrimError> {
    let dims = backend
        .identify(path)
        .map_err(|source| TrimError::CannotCreateImageSourceFromFile {
            path: path.to_path_buf(),
            source,
        })?;
    let size = (dims.width, dims.height);

    if let Some((profile, orientation)) = classify(dims.width, dims.height) {
        // Profile heights always exceed the status bar, so the crop exists
        if let Some(crop) = status_bar_crop(size, profile.status_bar_pixels()) {
            return Ok(TrimPlan::Crop {
                profile,
                orientation,
                crop,
            });
        }
    }

    if let Some((profile, orientation)) = classify_trimmed(dims.width, dims.height) {
        return Ok(TrimPlan::AlreadyTrimmed {
            profile,
            orientation,
        });
    }

    Ok(TrimPlan::Unknown {
        width: dims.width,
        height: dims.height,
    })
}

/// Run one trim job to completion on the calling thread.
///
/// The file at `path` is overwritten only on the crop path; every other
/// outcome leaves it byte-identical.
pub fn trim_file(
    backend: &dyn ImageBackend,
    path: &Path,
    quality: Quality,
) -> Result<TrimOutcome, TrimError> {
    let (profile, orientation, crop) = match plan_trim(backend, path)? {
        TrimPlan::Crop {
            profile,
            orientation,
            crop,
        } => (profile, orientation, crop),
        TrimPlan::AlreadyTrimmed { profile, orientation } => {
            let (width, height) = profile.trimmed_size_in(orientation);
            return Err(TrimError::ImageAlreadyTrimmed {
                path: path.to_path_buf(),
                width,
                height,
            });
        }
        TrimPlan::Unknown { width, height } => {
            return Ok(TrimOutcome::Skipped { width, height });
        }
    };

    backend
        .crop(&CropParams {
            path: path.to_path_buf(),
            rect: crop,
            quality,
        })
        .map_err(|source| match source {
            BackendError::Decode(_) => TrimError::CannotCreateImageFromSource {
                path: path.to_path_buf(),
                source,
            },
            _ => TrimError::CannotWriteImageToFile {
                path: path.to_path_buf(),
                source,
            },
        })?;

    if !profile.is_retina() {
        return Err(TrimError::ImageNotRetina {
            path: path.to_path_buf(),
            crop,
        });
    }

    Ok(TrimOutcome::Trimmed {
        profile,
        orientation,
        crop,
    })
}
