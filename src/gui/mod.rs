//! GUI module for the application.
//!
//! A small always-on-top viewer built with egui/eframe: start/stop, tick rate,
//! ROI editing and the live zone/position readout.

pub mod render;
pub mod state;

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use eframe::egui::{self, Vec2};

use crate::calibration::{FractionalRoi, RoiStore};
use crate::config::{clamp_tick_rate, get_config, AppConfig};
use crate::tracker::{start_tracking, Session};

use state::{GuiState, TrackerStatus};

/// Main GUI application struct.
pub struct GuiApp {
    /// Application state.
    state: GuiState,
    /// Configuration snapshot used for new sessions.
    config: AppConfig,
    /// Calibration record.
    roi_store: RoiStore,
    /// The running session, if any.
    session: Option<Session>,
    /// Result of a start request still in progress.
    pending_start: Option<Receiver<Result<Session>>>,
}

impl GuiApp {
    /// Create a new GUI application instance.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = get_config().clone();
        let roi_store = RoiStore::open_default();
        let roi = roi_store.load_or_default();
        let state = GuiState::new(clamp_tick_rate(config.tick_rate_hz), roi);

        Self::apply_window_level(&cc.egui_ctx, state.stay_on_top);

        Self {
            state,
            config,
            roi_store,
            session: None,
            pending_start: None,
        }
    }

    fn apply_window_level(ctx: &egui::Context, on_top: bool) {
        let level = if on_top {
            egui::WindowLevel::AlwaysOnTop
        } else {
            egui::WindowLevel::Normal
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(level));
    }

    /// Handle start button click. Locating the window can take seconds, so
    /// the session is started on a helper thread.
    fn handle_start(&mut self) {
        let mut config = self.config.clone();
        config.tick_rate_hz = self.state.tick_rate;
        let roi = self.state.roi.clamped();

        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("tracker-start".to_string())
            .spawn(move || {
                let _ = sender.send(start_tracking(&config, &roi));
            });

        match spawned {
            Ok(_) => {
                self.pending_start = Some(receiver);
                self.state.status = TrackerStatus::Starting { since: Instant::now() };
                crate::log("GUI: Starting tracker");
            }
            Err(e) => {
                self.state.status = TrackerStatus::Error(e.to_string());
                crate::log(&format!("GUI: Failed to start tracker: {}", e));
            }
        }
    }

    /// Picks up the result of a pending start.
    fn poll_start(&mut self) {
        let Some(receiver) = &self.pending_start else {
            return;
        };

        match receiver.try_recv() {
            Ok(Ok(session)) => {
                crate::log("GUI: Tracker started");
                session.set_tick_rate(self.state.tick_rate);
                self.session = Some(session);
                self.state.status = TrackerStatus::Running { hz: self.state.tick_rate };
                self.pending_start = None;
            }
            Ok(Err(e)) => {
                crate::log(&format!("GUI: Failed to start tracker: {:#}", e));
                self.state.status = TrackerStatus::Error(format!("{:#}", e));
                self.pending_start = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.state.status = TrackerStatus::Error("start thread exited".to_string());
                self.pending_start = None;
            }
        }
    }

    /// Drains the session mailbox into the display state.
    fn poll_session(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        if let Some(update) = session.latest() {
            self.state.apply(update);
        }

        if !session.is_running() {
            crate::log("GUI: Tracker thread exited unexpectedly");
            self.session = None;
            self.state.status = TrackerStatus::Error("tracker stopped".to_string());
        }
    }

    /// Handle stop button click.
    fn handle_stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        // A start still in flight is dropped; its session stops when the
        // helper thread's send fails and the value is dropped.
        self.pending_start = None;
        self.state.status = TrackerStatus::Idle;
        self.state.clear_readout();
        crate::log("GUI: Tracker stopped");
    }

    fn handle_tick_rate_changed(&mut self) {
        if let Some(session) = &self.session {
            let hz = session.set_tick_rate(self.state.tick_rate);
            crate::log(&format!("GUI: Tick rate set to {} Hz", hz));
        }
    }

    fn handle_save_roi(&mut self) {
        match self.roi_store.save(&self.state.roi) {
            Ok(saved) => {
                self.state.roi = saved;
                self.state.roi_message = Some(format!(
                    "Saved to {} (applies on next start)",
                    self.roi_store.path().display()
                ));
            }
            Err(e) => {
                crate::log(&format!("GUI: Failed to save ROI: {:#}", e));
                self.state.roi_message = Some(format!("Save failed: {:#}", e));
            }
        }
    }

    fn handle_reset_roi(&mut self) {
        self.state.roi = FractionalRoi::default();
        self.state.roi_message = Some("Default region restored (not saved yet)".to_string());
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_start();
        self.poll_session();

        // Keep polling while a session is active
        if self.state.status.is_active() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            render::render_readout(ui, &self.state);

            let events = render::render_controls(ui, &mut self.state);
            if events.start {
                self.handle_start();
            }
            if events.stop {
                self.handle_stop();
            }
            if events.tick_rate_changed {
                self.handle_tick_rate_changed();
            }
            if events.stay_on_top_changed {
                Self::apply_window_level(ctx, self.state.stay_on_top);
            }

            let (save_clicked, reset_clicked) = render::render_roi_editor(ui, &mut self.state);
            if save_clicked {
                self.handle_save_roi();
            }
            if reset_clicked {
                self.handle_reset_roi();
            }

            render::render_status(ui, &self.state);
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui() -> eframe::Result<()> {
    crate::log("GUI: Creating native options...");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(460.0, 380.0))
            .with_min_inner_size(Vec2::new(320.0, 260.0))
            .with_title("SC HUD Telemetry")
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "SC HUD Telemetry",
        options,
        Box::new(|cc| {
            crate::log("GUI: Creating GuiApp instance...");
            Ok(Box::new(GuiApp::new(cc)))
        }),
    )
}
