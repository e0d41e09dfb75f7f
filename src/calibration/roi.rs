//! Persisted region of interest.
//!
//! The record is a small JSON document with `left`, `top`, `width` and
//! `height` fractions of the game window. Loading never fails: a missing or
//! corrupt record falls back to the default top-right strip.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::capture::Rectangle;

/// Smallest width/height a region may have after clamping.
pub const MIN_EXTENT: f64 = 1e-4;

/// A rectangle in window-relative coordinates (0.0 to 1.0).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FractionalRoi {
    /// Left edge (0.0 = window left, 1.0 = window right)
    #[serde(alias = "Left")]
    pub left: f64,
    /// Top edge (0.0 = window top, 1.0 = window bottom)
    #[serde(alias = "Top")]
    pub top: f64,
    /// Width as fraction of window width
    #[serde(alias = "Width")]
    pub width: f64,
    /// Height as fraction of window height
    #[serde(alias = "Height")]
    pub height: f64,
}

impl Default for FractionalRoi {
    /// Small strip in the top-right corner, where the HUD prints zone and position.
    fn default() -> Self {
        Self {
            left: 0.70,
            top: 0.04,
            width: 0.28,
            height: 0.06,
        }
    }
}

impl FractionalRoi {
    /// Returns a copy with every field pulled back into range so that
    /// `left + width <= 1` and `top + height <= 1` hold.
    pub fn clamped(&self) -> Self {
        let left = self.left.clamp(0.0, 1.0 - MIN_EXTENT);
        let top = self.top.clamp(0.0, 1.0 - MIN_EXTENT);
        Self {
            left,
            top,
            width: self.width.clamp(MIN_EXTENT, (1.0 - left).max(MIN_EXTENT)),
            height: self.height.clamp(MIN_EXTENT, (1.0 - top).max(MIN_EXTENT)),
        }
    }

    /// Converts the fractions to an absolute screen rectangle inside `window`.
    /// Width and height are at least one pixel.
    pub fn to_absolute(&self, window: &Rectangle) -> Rectangle {
        let w = window.width as f64;
        let h = window.height as f64;
        Rectangle {
            x: window.x + (w * self.left) as i32,
            y: window.y + (h * self.top) as i32,
            width: ((w * self.width) as u32).max(1),
            height: ((h * self.height) as u32).max(1),
        }
    }
}

/// Loads and saves the calibration record.
pub struct RoiStore {
    path: PathBuf,
}

impl RoiStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default per-user location.
    pub fn open_default() -> Self {
        Self::new(crate::paths::get_roi_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored region, clamped. Falls back to the default region
    /// when the record is missing or cannot be read.
    pub fn load_or_default(&self) -> FractionalRoi {
        if !self.path.exists() {
            crate::log(&format!(
                "No calibration at {}. Using default ROI.",
                self.path.display()
            ));
            return FractionalRoi::default();
        }

        match self.load() {
            Ok(roi) => roi,
            Err(e) => {
                crate::log(&format!("Failed to load calibration: {:#}. Using default ROI.", e));
                FractionalRoi::default()
            }
        }
    }

    fn load(&self) -> Result<FractionalRoi> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let roi: FractionalRoi = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(roi.clamped())
    }

    /// Clamps and writes the region. The file is written to a temporary
    /// sibling first and then moved over the old record.
    pub fn save(&self, roi: &FractionalRoi) -> Result<FractionalRoi> {
        let roi = roi.clamped();
        let json = serde_json::to_string_pretty(&roi)?;

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;

        crate::log(&format!(
            "Saved ROI L={:.4} T={:.4} W={:.4} H={:.4} to {}",
            roi.left,
            roi.top,
            roi.width,
            roi.height,
            self.path.display()
        ));
        Ok(roi)
    }
}
