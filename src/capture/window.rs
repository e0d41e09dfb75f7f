//! Window discovery for the game window.

use xcap::Window;

use super::{Rectangle, RegionProvider};

/// Windows at or below this size in either dimension are ignored
/// (launchers, splash screens, tool windows).
const MIN_WINDOW_SIDE: u32 = 100;

/// Finds the game window by matching visible window titles.
pub struct WindowLocator {
    /// Lowercase title fragments; a window matches if its title contains any of them.
    targets: Vec<String>,
}

impl WindowLocator {
    pub fn new(targets: &[String]) -> Self {
        Self {
            targets: targets.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Enumerates visible windows as (title, rectangle) pairs.
    fn list_windows() -> Vec<(String, Rectangle)> {
        let windows = match Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                crate::log(&format!("Failed to enumerate windows: {}", e));
                return Vec::new();
            }
        };

        windows
            .into_iter()
            .filter(|w| !w.is_minimized() && !w.title().is_empty())
            .map(|w| {
                (
                    w.title().to_string(),
                    Rectangle {
                        x: w.x(),
                        y: w.y(),
                        width: w.width(),
                        height: w.height(),
                    },
                )
            })
            .collect()
    }
}

/// Picks the largest window whose title contains one of `targets`.
pub fn pick_best_match(windows: &[(String, Rectangle)], targets: &[String]) -> Option<Rectangle> {
    windows
        .iter()
        .filter(|(title, _)| {
            let lower = title.to_lowercase();
            targets.iter().any(|t| lower.contains(t.as_str()))
        })
        .map(|(_, rect)| *rect)
        .filter(|r| r.width > MIN_WINDOW_SIDE && r.height > MIN_WINDOW_SIDE)
        .max_by_key(|r| r.area())
}

impl RegionProvider for WindowLocator {
    fn try_locate(&self) -> Option<Rectangle> {
        pick_best_match(&Self::list_windows(), &self.targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(width: u32, height: u32) -> Rectangle {
        Rectangle { x: 0, y: 0, width, height }
    }

    #[test]
    fn test_pick_largest_matching_window() {
        let targets = vec!["star citizen".to_string()];
        let windows = vec![
            ("Star Citizen Launcher".to_string(), rect(800, 600)),
            ("Notepad".to_string(), rect(3000, 2000)),
            ("Star Citizen".to_string(), rect(2560, 1440)),
        ];
        assert_eq!(pick_best_match(&windows, &targets), Some(rect(2560, 1440)));
    }

    #[test]
    fn test_ignores_tiny_windows() {
        let targets = vec!["star citizen".to_string()];
        let windows = vec![("STAR CITIZEN".to_string(), rect(100, 600))];
        assert_eq!(pick_best_match(&windows, &targets), None);
    }

    #[test]
    fn test_locator_lowercases_targets() {
        let locator = WindowLocator::new(&["SC Alpha".to_string()]);
        assert_eq!(locator.targets, vec!["sc alpha".to_string()]);
    }
}
