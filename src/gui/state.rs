//! GUI application state management.
//!
//! Tracks user input values and tracker status for display.

use std::time::Instant;

use crate::calibration::FractionalRoi;
use crate::tracker::{Published, TickStatus};

/// Tracker status for display in GUI.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TrackerStatus {
    /// Not running, ready to start
    #[default]
    Idle,
    /// Looking for the game window and initializing OCR
    Starting { since: Instant },
    /// Reading the HUD
    Running { hz: u32 },
    /// The region could not be captured on the last tick
    RegionNotVisible,
    /// Start failed or the tracker died
    Error(String),
}

impl TrackerStatus {
    /// Get display text for current status.
    pub fn status_text(&self) -> String {
        match self {
            Self::Idle => "Stopped".to_string(),
            Self::Starting { since } => {
                format!("Starting... ({} s)", since.elapsed().as_secs())
            }
            Self::Running { hz } => format!("Running ({} Hz)", hz),
            Self::RegionNotVisible => "Region not visible".to_string(),
            Self::Error(msg) => format!("Error: {}", msg),
        }
    }

    /// A session exists or is being started.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Starting { .. } | Self::Running { .. } | Self::RegionNotVisible
        )
    }
}

/// GUI application state.
#[derive(Debug)]
pub struct GuiState {
    /// Requested tick rate (user input).
    pub tick_rate: u32,
    /// ROI being edited; saved on request.
    pub roi: FractionalRoi,
    /// Last published display text.
    pub display_text: String,
    /// Last published staleness flag.
    pub stale: bool,
    /// Current tracker status.
    pub status: TrackerStatus,
    /// Keep the viewer above the game window.
    pub stay_on_top: bool,
    /// Result of the last ROI save, shown under the editor.
    pub roi_message: Option<String>,
}

impl GuiState {
    pub fn new(tick_rate: u32, roi: FractionalRoi) -> Self {
        Self {
            tick_rate,
            roi,
            display_text: String::new(),
            stale: false,
            status: TrackerStatus::Idle,
            stay_on_top: true,
            roi_message: None,
        }
    }

    /// Applies one update from the tracker.
    pub fn apply(&mut self, update: Published) {
        self.display_text = update.text;
        self.stale = update.stale;
        self.status = match update.status {
            TickStatus::Running { hz } => TrackerStatus::Running { hz },
            TickStatus::RegionNotVisible => TrackerStatus::RegionNotVisible,
        };
    }

    /// Clears the readout, e.g. when a session ends.
    pub fn clear_readout(&mut self) {
        self.display_text.clear();
        self.stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_updates_readout_and_status() {
        let mut state = GuiState::new(10, FractionalRoi::default());
        state.apply(Published {
            text: "Zone: A  Pos: 1 m 2 m 3 m".into(),
            stale: true,
            status: TickStatus::Running { hz: 10 },
        });
        assert_eq!(state.display_text, "Zone: A  Pos: 1 m 2 m 3 m");
        assert!(state.stale);
        assert_eq!(state.status, TrackerStatus::Running { hz: 10 });

        state.apply(Published {
            text: "Zone: A  Pos: 1 m 2 m 3 m".into(),
            stale: false,
            status: TickStatus::RegionNotVisible,
        });
        assert_eq!(state.status.status_text(), "Region not visible");
        assert!(state.status.is_active());

        state.clear_readout();
        assert!(state.display_text.is_empty());
        assert!(!state.stale);
    }

    #[test]
    fn test_status_activity() {
        assert!(!TrackerStatus::Idle.is_active());
        assert!(!TrackerStatus::Error("x".into()).is_active());
        assert!(TrackerStatus::Starting { since: Instant::now() }.is_active());
        assert_eq!(TrackerStatus::Running { hz: 30 }.status_text(), "Running (30 Hz)");
    }
}
