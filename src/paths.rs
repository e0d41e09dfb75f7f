use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Application folder name used under the platform config/data directories.
pub const APP_DIR_NAME: &str = "sc-hud-telemetry";

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the per-user data directory: `<config_dir>/sc-hud-telemetry/`.
/// Falls back to the executable directory when the platform has no config dir.
pub fn get_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| get_exe_dir().clone())
}

/// Returns the logs directory: `<data_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Returns the diagnostics directory for probe and stale snapshots: `<data_dir>/diagnostics/`
pub fn get_diagnostics_dir() -> PathBuf {
    get_data_dir().join("diagnostics")
}

/// Returns the calibration record path: `<data_dir>/roi.json`
pub fn get_roi_path() -> PathBuf {
    get_data_dir().join("roi.json")
}

/// Returns the config file path: `<exe_dir>/config.json`
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_diagnostics_dir())?;
    Ok(())
}
