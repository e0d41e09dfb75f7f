//! Image artifacts for diagnosing bad readings.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Saves the one-shot capture taken when a session starts as `roi_raw.png`.
pub fn save_probe(dir: &Path, image: &DynamicImage) -> Result<PathBuf> {
    save_png(dir, "roi_raw.png", image)
}

/// Saves the current line images as `stale_top_HHMMSS.png` and
/// `stale_bot_HHMMSS.png`. Zero-area images are skipped.
pub fn save_stale_snapshot(
    dir: &Path,
    top: &DynamicImage,
    bottom: &DynamicImage,
    at: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let stamp = at.format("%H%M%S").to_string();
    let mut saved = Vec::new();
    for (prefix, image) in [("stale_top", top), ("stale_bot", bottom)] {
        if image.width() == 0 || image.height() == 0 {
            continue;
        }
        saved.push(save_png(dir, &format!("{}_{}.png", prefix, stamp), image)?);
    }
    Ok(saved)
}

fn save_png(dir: &Path, name: &str, image: &DynamicImage) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(name);
    image
        .save(&path)
        .with_context(|| format!("saving {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn gray(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([128])))
    }

    #[test]
    fn test_save_probe() {
        let dir = tempdir().unwrap();
        let path = save_probe(dir.path(), &gray(10, 4)).unwrap();
        assert_eq!(path, dir.path().join("roi_raw.png"));

        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (10, 4));
    }

    #[test]
    fn test_stale_snapshot_names() {
        let dir = tempdir().unwrap();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap();
        let saved = save_stale_snapshot(dir.path(), &gray(10, 4), &gray(10, 5), at).unwrap();

        assert_eq!(
            saved,
            vec![
                dir.path().join("stale_top_090703.png"),
                dir.path().join("stale_bot_090703.png"),
            ]
        );
        assert!(saved.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_stale_snapshot_skips_empty_line() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("diagnostics");
        let saved = save_stale_snapshot(&nested, &gray(10, 1), &gray(10, 0), Local::now()).unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].file_name().unwrap().to_string_lossy().starts_with("stale_top_"));
    }
}
