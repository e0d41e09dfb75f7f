//! SC HUD Telemetry
//!
//! Reads the zone and position lines from the Star Citizen HUD with OCR and
//! shows them in a small always-on-top viewer (or on the console with
//! `--headless`).

mod calibration;
mod capture;
mod config;
mod gui;
mod ocr;
mod paths;
mod tracker;

use anyhow::{anyhow, bail, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::thread;
use std::time::Duration;

use calibration::RoiStore;
use tracker::{Published, TickStatus};

const LOG_FILE_NAME: &str = "sc_hud_telemetry.log";

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    // Set up panic hook to log panics
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));

    // Ensure output directories exist
    paths::ensure_directories()?;

    // Load configuration
    config::init_config();
    let config = config::get_config();

    let headless = config.headless || std::env::args().any(|a| a == "--headless");
    if headless {
        log("Headless mode - printing readings to the console");
        run_headless()
    } else {
        log("Starting GUI application...");
        match gui::run_gui() {
            Ok(()) => {
                log("GUI application exited normally");
                Ok(())
            }
            Err(e) => {
                log(&format!("GUI error: {}", e));
                Err(anyhow!("GUI error: {}", e))
            }
        }
    }
}

/// Tracks until the process is killed, logging every change of reading.
fn run_headless() -> Result<()> {
    let config = config::get_config();
    let roi = RoiStore::open_default().load_or_default();
    let session = tracker::start_tracking(config, &roi)?;
    log("Tracking. Press Ctrl+C to quit.");

    let mut last: Option<Published> = None;
    loop {
        if let Some(update) = session.latest() {
            if last.as_ref() != Some(&update) {
                log(&describe(&update));
                last = Some(update);
            }
        }
        if !session.is_running() {
            bail!("Tracker stopped unexpectedly");
        }
        thread::sleep(Duration::from_millis(100));
    }
}

fn describe(update: &Published) -> String {
    let text = if update.text.is_empty() {
        "--".to_string()
    } else {
        update.text.replace('\n', " | ")
    };
    match update.status {
        TickStatus::RegionNotVisible => format!("{} [region not visible]", text),
        TickStatus::Running { .. } if update.stale => format!("{} [stale]", text),
        TickStatus::Running { .. } => text,
    }
}
