//! # status-trim
//!
//! Removes the status bar from iOS screenshots, overwriting each file with
//! the cropped image. Only screenshots whose pixel size matches a known
//! device screen are touched; everything else is left exactly as it was.
//!
//! # Architecture
//!
//! ```text
//! path ──► Trimmer::submit ──► worker ──► identify ──► classify ──► crop + write ──► callback
//!                                               │
//!                                               ├─► trimmed size  → ImageAlreadyTrimmed
//!                                               └─► unknown size  → Skipped
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`profiles`] | Known device screen sizes and their scale factors |
//! | [`imaging`] | Codec boundary: identify, crop, atomic write-back |
//! | [`trim`] | One trim job: classification, crop geometry, typed errors |
//! | [`queue`] | Bounded worker pool with per-file exclusion and a shared instance |
//! | [`config`] | Optional TOML config: worker count, JPEG quality |
//! | [`output`] | CLI output formatting and `--json` reports |
//!
//! # Design Decisions
//!
//! ## Exact Sizes Only
//!
//! A screenshot is recognized by its exact pixel size, in portrait or
//! landscape. There is no tolerance and no content inspection: an image that
//! happens to be 750×1334 is treated as an iPhone screenshot. The trimmed size
//! of every profile is recognized too, which is what makes re-running the
//! tool over the same files safe.
//!
//! ## Non-Retina Screenshots Are Trimmed
//!
//! Scale-1 screens still have a 20px status bar, so their screenshots are
//! cropped like any other. The job then reports
//! [`TrimErrorKind::ImageNotRetina`](trim::TrimErrorKind::ImageNotRetina) so
//! callers can tell these apart.
//!
//! ## One Writer Per File
//!
//! Two submissions for the same file never run at the same time; the second
//! waits for the first and then sees an already-trimmed image. Different files
//! are processed in parallel on a rayon pool sized from config.
//!
//! ## Whole-File Replacement
//!
//! The cropped image is written to a temporary file beside the original and
//! renamed over it. A failed encode or write leaves the original in place.

pub mod config;
pub mod imaging;
pub mod output;
pub mod profiles;
pub mod queue;
pub mod trim;

pub use queue::{Completion, JobState, TrimHandle, TrimResult, Trimmer, TrimmerError};
pub use trim::{TrimError, TrimErrorKind, TrimOutcome, TrimPlan, plan_trim, trim_file};

#[cfg(test)]
pub(crate) mod test_helpers;
