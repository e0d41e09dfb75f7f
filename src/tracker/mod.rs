//! Live HUD tracking.
//!
//! This module provides:
//! - The output gate holding the last good reading (`OutputGate`)
//! - The single-slot UI mailbox (`Mailbox`)
//! - Diagnostic image artifacts
//! - Session start/stop and the worker loop (`Session`, `start_tracking`)

pub mod diagnostics;
pub mod gate;
pub mod mailbox;
pub mod runner;

pub use gate::{GateTimings, GateView, OutputGate};
pub use mailbox::Mailbox;
pub use runner::{start_tracking, Published, Session, TickStatus};
