use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::AppConfig;
use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINEDDATA: &str = "eng.traineddata";

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::paths::APP_DIR_NAME)
        .join("tesseract")
}

fn executable_name() -> &'static str {
    if cfg!(windows) { "tesseract.exe" } else { "tesseract" }
}

/// Resolves the Tesseract executable and a tessdata directory holding
/// eng.traineddata. Downloads the trained data when allowed and missing.
pub fn ensure_tesseract(config: &AppConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
    log(&format!("Tesseract executable: {}", executable.display()));

    let tessdata = match find_tessdata_dir(config.tessdata_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) if config.download_tessdata => {
            log(&format!("{}. Downloading {}...", e, TRAINEDDATA));
            let dir = get_tesseract_dir().join("tessdata");
            download_tessdata(&dir)?;
            dir
        }
        Err(e) => return Err(e),
    };
    log(&format!("Tesseract data: {}", tessdata.display()));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Finds the Tesseract executable: explicit override, our local dir, PATH,
/// then common install locations.
pub fn find_tesseract_executable(override_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
        return Err(anyhow!("Configured tesseract_path does not exist: {}", path));
    }

    let local_exe = get_tesseract_dir().join(executable_name());
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let common_paths = [
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR (https://github.com/UB-Mannheim/tesseract/releases on Windows), \
         add it to PATH or set tesseract_path in config.json."
    ))
}

/// Directories searched for eng.traineddata, in priority order.
fn tessdata_candidates(override_dir: Option<&str>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = override_dir {
        candidates.push(PathBuf::from(dir));
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(prefix));
    }
    candidates.extend(
        [
            r"C:\Program Files\Tesseract-OCR\tessdata",
            r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
            "/usr/share/tesseract-ocr/5/tessdata",
            "/usr/share/tesseract-ocr/4.00/tessdata",
            "/usr/share/tessdata",
            "/usr/local/share/tessdata",
            "/opt/homebrew/share/tessdata",
        ]
        .iter()
        .map(PathBuf::from),
    );
    candidates
}

/// First candidate holding eng.traineddata, either directly or in a
/// `tessdata` subdirectory.
pub fn first_with_traineddata(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find_map(|dir| {
        if dir.join(TRAINEDDATA).exists() {
            Some(dir.clone())
        } else if dir.join("tessdata").join(TRAINEDDATA).exists() {
            Some(dir.join("tessdata"))
        } else {
            None
        }
    })
}

/// Finds the tessdata directory
pub fn find_tessdata_dir(override_dir: Option<&str>) -> Result<PathBuf> {
    first_with_traineddata(&tessdata_candidates(override_dir))
        .ok_or_else(|| anyhow!("tessdata directory with {} not found", TRAINEDDATA))
}

/// Downloads English trained data into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("creating {}", tessdata_dir.display()))?;

    let url = format!("{}/{}", TESSDATA_REPO, TRAINEDDATA);
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", crate::paths::APP_DIR_NAME)
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINEDDATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // A partial download must never look like valid trained data
    let mut tmp = NamedTempFile::new_in(tessdata_dir)?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.persist(tessdata_dir.join(TRAINEDDATA))
        .context("saving downloaded trained data")?;

    log(&format!("Downloaded {} ({} bytes)", TRAINEDDATA, bytes.len()));
    Ok(())
}
