//! Screen-rectangle capture.
//!
//! Captures the monitor containing the requested rectangle and crops to it.
//! Any failure produces the empty frame sentinel. A region split across
//! monitors is rejected; each distinct failure reason is logged once.

use anyhow::{bail, Context, Result};
use std::sync::Mutex;
use xcap::Monitor;

use super::{FrameSource, RawFrame, Rectangle};

/// Captures absolute screen rectangles from the attached monitors.
#[derive(Default)]
pub struct ScreenFrameSource {
    /// Reason of the current failure streak, already logged
    last_failure: Mutex<Option<String>>,
}

impl ScreenFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_capture(rect: &Rectangle) -> Result<RawFrame> {
        let monitors = Monitor::all().context("Failed to get monitors")?;
        let bounds: Vec<Rectangle> = monitors
            .iter()
            .map(|m| Rectangle {
                x: m.x(),
                y: m.y(),
                width: m.width(),
                height: m.height(),
            })
            .collect();

        let index = pick_monitor(&bounds, rect)?;
        let (monitor, screen) = (&monitors[index], bounds[index]);

        let image = monitor
            .capture_image()
            .context("Failed to capture screen")?;

        let local_x = (rect.x - screen.x) as u32;
        let local_y = (rect.y - screen.y) as u32;
        if local_x + rect.width > image.width() || local_y + rect.height > image.height() {
            bail!(
                "Region {:?} exceeds captured monitor image {}x{}",
                rect,
                image.width(),
                image.height()
            );
        }

        let cropped =
            xcap::image::imageops::crop_imm(&image, local_x, local_y, rect.width, rect.height)
                .to_image();

        Ok(RawFrame::from_rgba(
            cropped.width(),
            cropped.height(),
            cropped.into_raw(),
        ))
    }

    /// Logs `reason` unless it is the one already logged for this streak.
    /// Returns whether a line was written.
    fn report_failure(&self, reason: String) -> bool {
        let Ok(mut last) = self.last_failure.lock() else {
            return false;
        };
        if last.as_deref() == Some(reason.as_str()) {
            return false;
        }
        crate::log(&format!("Screen capture failed: {}", reason));
        *last = Some(reason);
        true
    }

    fn clear_failure(&self) {
        if let Ok(mut last) = self.last_failure.lock() {
            *last = None;
        }
    }
}

/// Index of the monitor that fully contains `rect`.
pub fn pick_monitor(monitors: &[Rectangle], rect: &Rectangle) -> Result<usize> {
    if let Some(index) = monitors.iter().position(|m| m.contains(rect)) {
        return Ok(index);
    }
    let overlapping = monitors.iter().filter(|m| m.intersects(rect)).count();
    if overlapping > 1 {
        bail!(
            "Region {:?} spans {} monitors; move the game window onto a single monitor",
            rect,
            overlapping
        );
    }
    bail!("No monitor contains region {:?}", rect)
}

impl FrameSource for ScreenFrameSource {
    fn capture(&self, rect: &Rectangle) -> RawFrame {
        match Self::try_capture(rect) {
            Ok(frame) => {
                self.clear_failure();
                frame
            }
            Err(e) => {
                self.report_failure(format!("{:#}", e));
                RawFrame::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_monitors() -> Vec<Rectangle> {
        vec![
            Rectangle { x: 0, y: 0, width: 1920, height: 1080 },
            Rectangle { x: 1920, y: 0, width: 2560, height: 1440 },
        ]
    }

    #[test]
    fn test_pick_monitor_containing_region() {
        let rect = Rectangle { x: 2000, y: 50, width: 400, height: 60 };
        assert_eq!(pick_monitor(&dual_monitors(), &rect).unwrap(), 1);
    }

    #[test]
    fn test_region_across_monitors_names_the_reason() {
        let rect = Rectangle { x: 1800, y: 50, width: 400, height: 60 };
        let err = pick_monitor(&dual_monitors(), &rect).unwrap_err();
        assert!(err.to_string().contains("spans 2 monitors"), "{}", err);

        let off_screen = Rectangle { x: -500, y: -500, width: 10, height: 10 };
        let err = pick_monitor(&dual_monitors(), &off_screen).unwrap_err();
        assert!(err.to_string().starts_with("No monitor contains"), "{}", err);
    }

    #[test]
    fn test_failure_reason_logged_once_per_streak() {
        let source = ScreenFrameSource::new();
        assert!(source.report_failure("spans 2 monitors".to_string()));
        assert!(!source.report_failure("spans 2 monitors".to_string()));
        assert!(source.report_failure("No monitor contains region".to_string()));

        source.clear_failure();
        assert!(source.report_failure("No monitor contains region".to_string()));
    }
}
