//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides tick timing,
//! staleness thresholds, window matching and Tesseract options.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Lowest and highest accepted tick rates (Hz).
pub const MIN_TICK_RATE: u32 = 1;
pub const MAX_TICK_RATE: u32 = 60;

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ticks per second for the capture loop (clamped to 1-60)
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// Lower bound for the OCR upscale target height (pixels)
    #[serde(default = "default_ocr_min_height")]
    pub ocr_min_height: u32,
    /// Upper bound for the OCR upscale target height (pixels)
    #[serde(default = "default_ocr_max_height")]
    pub ocr_max_height: u32,
    /// Time without a valid parse before the output is flagged stale
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
    /// Time without a valid parse before a diagnostic snapshot is written
    #[serde(default = "default_snapshot_after_ms")]
    pub snapshot_after_ms: u64,
    /// How far back the acceptance clock is set after a snapshot
    #[serde(default = "default_snapshot_rewind_ms")]
    pub snapshot_rewind_ms: u64,
    /// Sleep after a failed capture before retrying
    #[serde(default = "default_capture_retry_ms")]
    pub capture_retry_ms: u64,
    /// Poll interval while waiting for the game window
    #[serde(default = "default_locate_poll_ms")]
    pub locate_poll_ms: u64,
    /// Give up locating the game window after this long
    #[serde(default = "default_locate_timeout_ms")]
    pub locate_timeout_ms: u64,
    /// Minimum interval between raw OCR text log lines
    #[serde(default = "default_raw_log_interval_ms")]
    pub raw_log_interval_ms: u64,
    /// Lowercase window title fragments identifying the game window
    #[serde(default = "default_window_titles")]
    pub window_titles: Vec<String>,
    /// Explicit tesseract executable (searched on PATH and common locations when None)
    #[serde(default)]
    pub tesseract_path: Option<String>,
    /// Explicit tessdata directory containing eng.traineddata
    #[serde(default)]
    pub tessdata_dir: Option<String>,
    /// Download eng.traineddata when no tessdata directory is found
    #[serde(default = "default_download_tessdata")]
    pub download_tessdata: bool,
    /// Characters Tesseract is allowed to emit
    #[serde(default = "default_char_whitelist")]
    pub char_whitelist: String,
    /// Run without the viewer window, printing readings to the console
    #[serde(default)]
    pub headless: bool,
}

fn default_tick_rate_hz() -> u32 {
    10
}

fn default_ocr_min_height() -> u32 {
    80
}

fn default_ocr_max_height() -> u32 {
    140
}

fn default_stale_after_ms() -> u64 {
    2000
}

fn default_snapshot_after_ms() -> u64 {
    5000
}

fn default_snapshot_rewind_ms() -> u64 {
    3000
}

fn default_capture_retry_ms() -> u64 {
    200
}

fn default_locate_poll_ms() -> u64 {
    400
}

fn default_locate_timeout_ms() -> u64 {
    10_000
}

fn default_raw_log_interval_ms() -> u64 {
    1000
}

/// Windows titles plus the forms Wine/Proton windows carry on Linux.
fn default_window_titles() -> Vec<String> {
    [
        "star citizen",
        "star citizen ptu",
        "star citizen evocati",
        "sc alpha",
        "star-citizen",
        "starcitizen",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_download_tessdata() -> bool {
    true
}

fn default_char_whitelist() -> String {
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ:;_-+., ".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            ocr_min_height: default_ocr_min_height(),
            ocr_max_height: default_ocr_max_height(),
            stale_after_ms: default_stale_after_ms(),
            snapshot_after_ms: default_snapshot_after_ms(),
            snapshot_rewind_ms: default_snapshot_rewind_ms(),
            capture_retry_ms: default_capture_retry_ms(),
            locate_poll_ms: default_locate_poll_ms(),
            locate_timeout_ms: default_locate_timeout_ms(),
            raw_log_interval_ms: default_raw_log_interval_ms(),
            window_titles: default_window_titles(),
            tesseract_path: None,
            tessdata_dir: None,
            download_tessdata: default_download_tessdata(),
            char_whitelist: default_char_whitelist(),
            headless: false,
        }
    }
}

impl AppConfig {
    /// Target height for the OCR upscale: twice the crop height, kept within
    /// the configured bounds.
    pub fn ocr_target_height(&self, crop_height: u32) -> u32 {
        let lo = self.ocr_min_height.min(self.ocr_max_height);
        let hi = self.ocr_max_height.max(self.ocr_min_height);
        crop_height.saturating_mul(2).clamp(lo, hi)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn snapshot_after(&self) -> Duration {
        Duration::from_millis(self.snapshot_after_ms)
    }

    pub fn snapshot_rewind(&self) -> Duration {
        Duration::from_millis(self.snapshot_rewind_ms)
    }
}

/// Clamps a tick rate to the supported 1-60 Hz range.
pub fn clamp_tick_rate(hz: u32) -> u32 {
    hz.clamp(MIN_TICK_RATE, MAX_TICK_RATE)
}

/// Parses configuration JSON, falling back to defaults for missing fields.
pub fn parse_config(contents: &str) -> serde_json::Result<AppConfig> {
    serde_json::from_str(contents)
}

/// Loads configuration from the given path or returns defaults.
fn load_config_from(config_path: &Path) -> AppConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match parse_config(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    AppConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&crate::paths::get_config_path()));
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = parse_config(r#"{ "tick_rate_hz": 30, "headless": true }"#).unwrap();
        assert_eq!(config.tick_rate_hz, 30);
        assert!(config.headless);
        assert_eq!(config.stale_after_ms, 2000);
        assert_eq!(config.snapshot_after_ms, 5000);
        assert_eq!(config.snapshot_rewind_ms, 3000);
        assert_eq!(config.window_titles.len(), 6);
        assert!(config.download_tessdata);
    }

    #[test]
    fn test_default_titles_match_linux_window_names() {
        use crate::capture::{Rectangle, window::pick_best_match};

        let titles = AppConfig::default().window_titles;
        let rect = Rectangle { x: 0, y: 0, width: 1920, height: 1080 };
        for name in ["star-citizen", "StarCitizen.exe", "Star Citizen"] {
            let windows = vec![(name.to_string(), rect)];
            assert_eq!(pick_best_match(&windows, &titles), Some(rect), "{}", name);
        }
    }

    #[test]
    fn test_ocr_target_height() {
        let config = AppConfig::default();
        assert_eq!(config.ocr_target_height(20), 80);
        assert_eq!(config.ocr_target_height(50), 100);
        assert_eq!(config.ocr_target_height(300), 140);
    }

    #[test]
    fn test_clamp_tick_rate() {
        assert_eq!(clamp_tick_rate(0), 1);
        assert_eq!(clamp_tick_rate(15), 15);
        assert_eq!(clamp_tick_rate(500), 60);
    }

    #[test]
    fn test_load_config_falls_back_on_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.tick_rate_hz, 10);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json"));
        assert_eq!(config.locate_timeout_ms, 10_000);
    }
}
