//! Pure Rust codec backend on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Decode (PNG, JPEG, TIFF, WebP, BMP, GIF) | `ImageReader::decode` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode | same format as the source; JPEG through `JpegEncoder` at the configured quality |
//! | Write-back | `tempfile::NamedTempFile` in the target directory, persisted over the original |
//!
//! The format is sniffed from the file content, so screenshots with a wrong
//! or missing extension are handled.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fits_within;
use super::params::CropParams;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> std::io::Result<ImageReader<BufReader<File>>> {
    ImageReader::open(path)?.with_guessed_format()
}

/// Load and decode an image from disk, keeping track of its format.
fn load_image(path: &Path) -> Result<(DynamicImage, ImageFormat), BackendError> {
    let reader = open_reader(path).map_err(|e| {
        BackendError::Decode(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let format = reader.format().ok_or_else(|| {
        BackendError::Decode(format!("Unrecognized image format: {}", path.display()))
    })?;
    let img = reader.decode().map_err(|e| {
        BackendError::Decode(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok((img, format))
}

fn encode<W: Write + Seek>(
    img: &DynamicImage,
    writer: &mut W,
    format: ImageFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let encoder = JpegEncoder::new_with_quality(writer, quality as u8);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        other => img.write_to(writer, other),
    };
    result.map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))
}

/// Replace `path` with `img` encoded as `format`.
///
/// The image is written to a temporary file next to `path` and renamed over
/// it, so readers see either the old file or the complete new one.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        encode(img, &mut writer, format, quality)?;
        writer.flush()?;
    }
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let reader = open_reader(path)?;
        let (width, height) = reader.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Dimensions { width, height })
    }

    fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
        let (img, format) = load_image(&params.path)?;
        let rect = params.rect;

        if !fits_within(&rect, (img.width(), img.height())) {
            return Err(BackendError::Decode(format!(
                "Crop {} outside {}x{} image",
                rect,
                img.width(),
                img.height()
            )));
        }

        let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
        save_image(&cropped, &params.path, format, params.quality.value())
    }
}
