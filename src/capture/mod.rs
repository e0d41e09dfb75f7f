//! Screen capture for the game HUD region.
//!
//! This module provides:
//! - The collaborator traits used by the tracker (`RegionProvider`, `FrameSource`)
//! - Window discovery (`WindowLocator`)
//! - Screen-rectangle capture (`ScreenFrameSource`)

pub mod screen;
pub mod window;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::time::{Duration, Instant};

pub use screen::ScreenFrameSource;
pub use window::WindowLocator;

/// Integer rectangle in absolute screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// True if `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        (other.x as i64) < self.right()
            && (self.x as i64) < other.right()
            && (other.y as i64) < self.bottom()
            && (self.y as i64) < other.bottom()
    }
}

/// A captured frame: interleaved 8-bit pixels with 1, 3 or 4 channels.
///
/// A frame with no pixels is the "acquisition failed" sentinel. It is not an
/// error; the tick that receives it is simply skipped.
#[derive(Clone, Debug, Default)]
pub struct RawFrame {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl RawFrame {
    /// The empty sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps an interleaved buffer. Returns the empty sentinel when the buffer
    /// length does not match the dimensions or the channel count is unsupported.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        let expected = width as usize * height as usize * channels as usize;
        if !matches!(channels, 1 | 3 | 4) || data.len() != expected {
            return Self::empty();
        }
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::from_raw(width, height, 4, data)
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(gray) => {
                Self::from_raw(gray.width(), gray.height(), 1, gray.as_raw().clone())
            }
            DynamicImage::ImageRgb8(rgb) => {
                Self::from_raw(rgb.width(), rgb.height(), 3, rgb.as_raw().clone())
            }
            other => {
                let rgba = other.to_rgba8();
                Self::from_rgba(rgba.width(), rgba.height(), rgba.into_raw())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Converts the frame to an `image` buffer, or `None` for the empty sentinel.
    pub fn to_image(&self) -> Option<DynamicImage> {
        if self.is_empty() {
            return None;
        }
        let data = self.data.clone();
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}

/// Finds the absolute rectangle of the target window.
pub trait RegionProvider {
    /// Non-blocking probe.
    fn try_locate(&self) -> Option<Rectangle>;

    /// Blocks, polling every `poll`, until the window is found.
    fn await_locate(&self, poll: Duration) -> Rectangle {
        loop {
            if let Some(rect) = self.try_locate() {
                return rect;
            }
            std::thread::sleep(poll);
        }
    }

    /// Polls like `await_locate` but gives up after `timeout`.
    fn locate_within(&self, poll: Duration, timeout: Duration) -> Option<Rectangle> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(rect) = self.try_locate() {
                return Some(rect);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(poll);
        }
    }
}

/// Grabs the pixels of a screen rectangle.
pub trait FrameSource {
    /// Returns the captured pixels, or `RawFrame::empty()` on failure.
    fn capture(&self, rect: &Rectangle) -> RawFrame;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FoundOnThirdTry {
        calls: Cell<u32>,
    }

    impl RegionProvider for FoundOnThirdTry {
        fn try_locate(&self) -> Option<Rectangle> {
            self.calls.set(self.calls.get() + 1);
            (self.calls.get() >= 3).then_some(Rectangle { x: 1, y: 2, width: 300, height: 200 })
        }
    }

    struct NeverFound;

    impl RegionProvider for NeverFound {
        fn try_locate(&self) -> Option<Rectangle> {
            None
        }
    }

    #[test]
    fn test_await_locate_polls_until_found() {
        let provider = FoundOnThirdTry { calls: Cell::new(0) };
        let rect = provider.await_locate(Duration::from_millis(1));
        assert_eq!(rect.width, 300);
        assert_eq!(provider.calls.get(), 3);
    }

    #[test]
    fn test_locate_within_times_out() {
        let rect = NeverFound.locate_within(Duration::from_millis(5), Duration::from_millis(20));
        assert!(rect.is_none());
    }

    #[test]
    fn test_raw_frame_rejects_mismatched_buffer() {
        assert!(RawFrame::from_raw(2, 2, 4, vec![0; 15]).is_empty());
        assert!(RawFrame::from_raw(2, 2, 2, vec![0; 8]).is_empty());
        assert!(RawFrame::empty().to_image().is_none());
    }

    #[test]
    fn test_rectangle_contains_and_intersects() {
        let screen = Rectangle { x: 0, y: 0, width: 1920, height: 1080 };
        let inside = Rectangle { x: 100, y: 100, width: 400, height: 60 };
        let straddling = Rectangle { x: 1800, y: 100, width: 400, height: 60 };
        let beyond = Rectangle { x: 1920, y: 0, width: 10, height: 10 };

        assert!(screen.contains(&inside));
        assert!(!screen.contains(&straddling));
        assert!(screen.intersects(&straddling));
        assert!(!screen.intersects(&beyond));
    }

    #[test]
    fn test_raw_frame_to_image() {
        let frame = RawFrame::from_raw(3, 2, 3, (0..18).collect());
        assert_eq!((frame.width(), frame.height(), frame.channels()), (3, 2, 3));
        let img = frame.to_image().unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.to_rgb8().get_pixel(1, 0).0, [3, 4, 5]);
    }
}
