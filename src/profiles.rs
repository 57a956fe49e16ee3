//! Known iOS screen sizes.
//!
//! Every screenshot the trimmer touches must match one of these profiles
//! exactly, in portrait or landscape form. The status bar is 20 points on all
//! of them; the scale factor turns that into pixels.
//!
//! | Portrait size | Scale | Status bar |
//! |---|---|---|
//! | 320×480 | 1× | 20px |
//! | 640×960 | 1× | 20px |
//! | 768×1024 | 1× | 20px |
//! | 640×1136 | 2× | 40px |
//! | 750×1334 | 2× | 40px |
//! | 1536×2048 | 2× | 40px |
//! | 1242×2208 | 3× | 60px |
//!
//! No untrimmed size (either orientation) equals a trimmed size of any
//! profile, so [`classify`] and [`classify_trimmed`] never both match.

use serde::Serialize;

/// Height of the iOS status bar in points.
pub const STATUS_BAR_HEIGHT_POINTS: u32 = 20;

/// Which way round an image matched a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Portrait, Orientation::Landscape];
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// One recognized screen configuration, in portrait pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
}

impl DeviceProfile {
    const fn new(width: u32, height: u32, scale: u32) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    pub fn status_bar_pixels(&self) -> u32 {
        STATUS_BAR_HEIGHT_POINTS * self.scale
    }

    pub fn is_retina(&self) -> bool {
        self.scale >= 2
    }

    /// Untrimmed screenshot size as `(width, height)`.
    pub fn size_in(&self, orientation: Orientation) -> (u32, u32) {
        match orientation {
            Orientation::Portrait => (self.width, self.height),
            Orientation::Landscape => (self.height, self.width),
        }
    }

    /// Screenshot size once the status bar has been removed.
    pub fn trimmed_size_in(&self, orientation: Orientation) -> (u32, u32) {
        let (w, h) = self.size_in(orientation);
        (w, h - self.status_bar_pixels())
    }
}

pub static PROFILES: &[DeviceProfile] = &[
    DeviceProfile::new(320, 480, 1),
    DeviceProfile::new(640, 960, 1),
    DeviceProfile::new(768, 1024, 1),
    DeviceProfile::new(640, 1136, 2),
    DeviceProfile::new(750, 1334, 2),
    DeviceProfile::new(1536, 2048, 2),
    DeviceProfile::new(1242, 2208, 3),
];

fn find(
    width: u32,
    height: u32,
    size_of: impl Fn(&DeviceProfile, Orientation) -> (u32, u32),
) -> Option<(DeviceProfile, Orientation)> {
    PROFILES.iter().find_map(|profile| {
        Orientation::ALL
            .into_iter()
            .find(|&o| size_of(profile, o) == (width, height))
            .map(|o| (*profile, o))
    })
}

/// Match an untrimmed screenshot size against the table.
pub fn classify(width: u32, height: u32) -> Option<(DeviceProfile, Orientation)> {
    find(width, height, DeviceProfile::size_in)
}

/// Match a screenshot size that already had its status bar removed.
pub fn classify_trimmed(width: u32, height: u32) -> Option<(DeviceProfile, Orientation)> {
    find(width, height, DeviceProfile::trimmed_size_in)
}
