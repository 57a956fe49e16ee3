//! CLI output formatting for the `trim` and `check` commands.
//!
//! # Information-First Display
//!
//! Every file gets a header line (positional index + file name) followed by
//! indented context lines saying what happened to it. The full path is shown
//! as a `Source:` line so the output stays readable when many files come from
//! the same directory.
//!
//! # Output Format
//!
//! ## Trim
//!
//! ```text
//! 001 IMG_0001.png
//!     Source: shots/IMG_0001.png
//!     Trimmed: 750x1334 portrait @2x, kept (0, 40, 750, 1294)
//! 002 diagram.png
//!     Source: shots/diagram.png
//!     Skipped: 123x456 is not a known screen size
//!
//! Trimmed 1, not Retina 0, already trimmed 0, skipped 1, failed 0
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 IMG_0001.png
//!     Source: shots/IMG_0001.png
//!     Would trim: 750x1334 portrait @2x, keep (0, 40, 750, 1294)
//! ```
//!
//! # Architecture
//!
//! `format_*` functions return `Vec<String>` and are pure; `print_*` wrappers
//! write to stdout. [`TrimReport`] and [`PlanReport`] are the `--json` forms.

use crate::profiles::{DeviceProfile, Orientation};
use crate::queue::TrimResult;
use crate::trim::{TrimError, TrimErrorKind, TrimOutcome, TrimPlan};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Header line plus `Source:` context line for one file.
fn file_header(index: usize, path: &Path) -> Vec<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    vec![
        format!("{} {}", format_index(index), name),
        format!("    Source: {}", path.display()),
    ]
}

fn profile_line(profile: &DeviceProfile, orientation: Orientation) -> String {
    let (w, h) = profile.size_in(orientation);
    format!("{}x{} {} @{}x", w, h, orientation, profile.scale)
}

fn error_line(err: &TrimError) -> String {
    format!("Error {}: {}", err.kind().code(), err)
}

// ============================================================================
// Trim output
// ============================================================================

/// Format the result of one trim job.
pub fn format_trim_result(index: usize, path: &Path, result: &TrimResult) -> Vec<String> {
    let mut lines = file_header(index, path);
    let detail = match result {
        Ok(TrimOutcome::Trimmed {
            profile,
            orientation,
            crop,
        }) => format!(
            "Trimmed: {}, kept {}",
            profile_line(profile, *orientation),
            crop
        ),
        Ok(TrimOutcome::Skipped { width, height }) => {
            format!("Skipped: {}x{} is not a known screen size", width, height)
        }
        Err(TrimError::ImageAlreadyTrimmed { width, height, .. }) => {
            format!("Already trimmed: {}x{}", width, height)
        }
        Err(TrimError::ImageNotRetina { crop, .. }) => {
            format!("Trimmed, not Retina: kept {}", crop)
        }
        Err(err) => error_line(err),
    };
    lines.push(format!("    {}", detail));
    lines
}

/// Print trim results followed by a summary line.
pub fn print_trim_results(results: &[(PathBuf, TrimResult)]) {
    for (i, (path, result)) in results.iter().enumerate() {
        for line in format_trim_result(i + 1, path, result) {
            println!("{}", line);
        }
    }
    println!();
    println!("{}", Summary::from_results(results.iter().map(|(_, r)| r)));
}

// ============================================================================
// Check output
// ============================================================================

/// Format the plan for one file.
pub fn format_plan(index: usize, path: &Path, plan: &Result<TrimPlan, TrimError>) -> Vec<String> {
    let mut lines = file_header(index, path);
    let detail = match plan {
        Ok(TrimPlan::Crop {
            profile,
            orientation,
            crop,
        }) if profile.is_retina() => format!(
            "Would trim: {}, keep {}",
            profile_line(profile, *orientation),
            crop
        ),
        Ok(TrimPlan::Crop {
            profile,
            orientation,
            crop,
        }) => format!(
            "Would trim (not Retina): {}, keep {}",
            profile_line(profile, *orientation),
            crop
        ),
        Ok(TrimPlan::AlreadyTrimmed {
            profile,
            orientation,
        }) => format!("Already trimmed: {}", profile_line(profile, *orientation)),
        Ok(TrimPlan::Unknown { width, height }) => {
            format!("Unknown size: {}x{}, would skip", width, height)
        }
        Err(err) => error_line(err),
    };
    lines.push(format!("    {}", detail));
    lines
}

/// Print plans for every file.
pub fn print_plans(plans: &[(PathBuf, Result<TrimPlan, TrimError>)]) {
    for (i, (path, plan)) in plans.iter().enumerate() {
        for line in format_plan(i + 1, path, plan) {
            println!("{}", line);
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Per-outcome counts over a batch of trim results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub trimmed: usize,
    pub not_retina: usize,
    pub already_trimmed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TrimResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(TrimOutcome::Trimmed { .. }) => summary.trimmed += 1,
                Ok(TrimOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(e) => match e.kind() {
                    TrimErrorKind::ImageNotRetina => summary.not_retina += 1,
                    TrimErrorKind::ImageAlreadyTrimmed => summary.already_trimmed += 1,
                    _ => summary.failed += 1,
                },
            }
        }
        summary
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trimmed {}, not Retina {}, already trimmed {}, skipped {}, failed {}",
            self.trimmed, self.not_retina, self.already_trimmed, self.skipped, self.failed
        )
    }
}

// ============================================================================
// JSON reports
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: TrimErrorKind,
    pub code: u32,
    pub message: String,
}

impl From<&TrimError> for ErrorReport {
    fn from(err: &TrimError) -> Self {
        Self {
            kind: err.kind(),
            code: err.kind().code(),
            message: err.to_string(),
        }
    }
}

/// `--json` record for one trimmed file.
#[derive(Debug, Serialize)]
pub struct TrimReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TrimOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl TrimReport {
    pub fn new(path: &Path, result: &TrimResult) -> Self {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome.clone()), None),
            Err(err) => (None, Some(ErrorReport::from(err))),
        };
        Self {
            path: path.display().to_string(),
            outcome,
            error,
        }
    }
}

/// `--json` record for one checked file.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TrimPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl PlanReport {
    pub fn new(path: &Path, plan: &Result<TrimPlan, TrimError>) -> Self {
        let (plan, error) = match plan {
            Ok(plan) => (Some(plan.clone()), None),
            Err(err) => (None, Some(ErrorReport::from(err))),
        };
        Self {
            path: path.display().to_string(),
            plan,
            error,
        }
    }
}
