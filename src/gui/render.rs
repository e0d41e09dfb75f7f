//! GUI rendering functions.
//!
//! Contains UI layout and component rendering logic.

use eframe::egui::{self, Color32, RichText};

use super::state::{GuiState, TrackerStatus};
use crate::config::{MAX_TICK_RATE, MIN_TICK_RATE};

const FRESH_COLOR: Color32 = Color32::from_rgb(120, 220, 255);
const STALE_COLOR: Color32 = Color32::from_rgb(140, 140, 140);

/// Render the zone/position readout.
pub fn render_readout(ui: &mut egui::Ui, state: &GuiState) {
    let text = if state.display_text.is_empty() {
        "--"
    } else {
        state.display_text.as_str()
    };
    let color = if state.stale { STALE_COLOR } else { FRESH_COLOR };

    ui.label(RichText::new(text).monospace().size(18.0).color(color));

    if state.stale {
        ui.label(RichText::new("STALE").strong().color(Color32::from_rgb(220, 160, 0)));
    }
}

/// Controls emitted by `render_controls`.
#[derive(Default)]
pub struct ControlEvents {
    pub start: bool,
    pub stop: bool,
    pub tick_rate_changed: bool,
    pub stay_on_top_changed: bool,
}

/// Render start/stop, tick rate and window options.
pub fn render_controls(ui: &mut egui::Ui, state: &mut GuiState) -> ControlEvents {
    let mut events = ControlEvents::default();

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.horizontal(|ui| {
        let active = state.status.is_active();

        ui.add_enabled_ui(!active, |ui| {
            if ui.button(RichText::new("▶ Start").size(16.0)).clicked() {
                events.start = true;
            }
        });

        ui.add_space(20.0);

        ui.add_enabled_ui(active, |ui| {
            if ui.button(RichText::new("◼ Stop").size(16.0)).clicked() {
                events.stop = true;
            }
        });
    });

    ui.add_space(8.0);

    ui.horizontal(|ui| {
        ui.label("Tick rate:");
        let response = ui.add(
            egui::Slider::new(&mut state.tick_rate, MIN_TICK_RATE..=MAX_TICK_RATE).text("Hz"),
        );
        events.tick_rate_changed = response.changed();
    });

    events.stay_on_top_changed = ui.checkbox(&mut state.stay_on_top, "Stay on top").changed();

    events
}

/// Render the ROI editor. Returns (save_clicked, reset_clicked).
pub fn render_roi_editor(ui: &mut egui::Ui, state: &mut GuiState) -> (bool, bool) {
    let mut save_clicked = false;
    let mut reset_clicked = false;

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("Region (fraction of game window)").strong());

    egui::Grid::new("roi_grid").num_columns(2).show(ui, |ui| {
        for (label, value) in [
            ("Left", &mut state.roi.left),
            ("Top", &mut state.roi.top),
            ("Width", &mut state.roi.width),
            ("Height", &mut state.roi.height),
        ] {
            ui.label(label);
            ui.add(
                egui::DragValue::new(value)
                    .range(0.0..=1.0)
                    .speed(0.001)
                    .fixed_decimals(4),
            );
            ui.end_row();
        }
    });

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            save_clicked = true;
        }
        if ui.button("Reset to default").clicked() {
            reset_clicked = true;
        }
    });

    if let Some(message) = &state.roi_message {
        ui.label(RichText::new(message).small());
    }

    (save_clicked, reset_clicked)
}

/// Render the status line.
pub fn render_status(ui: &mut egui::Ui, state: &GuiState) {
    ui.add_space(8.0);
    ui.separator();

    ui.horizontal(|ui| {
        ui.label("Status:");

        let status_color = match &state.status {
            TrackerStatus::Idle => Color32::GRAY,
            TrackerStatus::Starting { .. } => Color32::from_rgb(0, 120, 200),
            TrackerStatus::Running { .. } => Color32::from_rgb(0, 150, 0),
            TrackerStatus::RegionNotVisible => Color32::from_rgb(200, 150, 0),
            TrackerStatus::Error(_) => Color32::from_rgb(200, 0, 0),
        };

        ui.label(RichText::new(state.status.status_text()).color(status_color));
    });
}
