//! Calibration of the HUD region of interest.
//!
//! The region is stored as resolution-independent fractions of the game
//! window and converted to absolute screen coordinates at session start.

pub mod roi;

pub use roi::{FractionalRoi, RoiStore};
