//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::CropRect;

/// Crop rectangle that removes a strip of `strip_height` pixels from the top.
///
/// Returns `None` when the strip would consume the whole image.
///
/// # Examples
/// ```
/// # use status_trim::imaging::status_bar_crop;
/// // iPhone 6 portrait at 2× drops a 40px status bar
/// let rect = status_bar_crop((750, 1334), 40).unwrap();
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 40, 750, 1294));
/// ```
pub fn status_bar_crop(image: (u32, u32), strip_height: u32) -> Option<CropRect> {
    let (width, height) = image;
    if strip_height >= height {
        return None;
    }
    Some(CropRect {
        x: 0,
        y: strip_height,
        width,
        height: height - strip_height,
    })
}

/// Whether `rect` lies entirely inside an image of the given size.
pub fn fits_within(rect: &CropRect, image: (u32, u32)) -> bool {
    let (width, height) = image;
    rect.width > 0
        && rect.height > 0
        && rect.x.checked_add(rect.width).is_some_and(|r| r <= width)
        && rect.y.checked_add(rect.height).is_some_and(|b| b <= height)
}
